//! `lockbox restore`: register a backup file as a new vault.

use std::path::Path;

use crate::cli::output;
use crate::cli::{load_registry, log_audit, Cli};
use crate::errors::Result;

/// Execute the `restore` command.
pub fn execute(cli: &Cli, backup: &Path, name: &str) -> Result<()> {
    let mut registry = load_registry(cli)?;
    let info = registry.restore(backup, name)?;

    log_audit(cli, "restore", name, Some(&backup.display().to_string()));
    output::success(&format!(
        "Restored '{name}' from {} into {}",
        backup.display(),
        info.location.display()
    ));
    output::tip("The restored vault opens with the password it had when backed up.");

    Ok(())
}
