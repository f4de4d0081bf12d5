//! `lockbox rename`: rename a vault.  Only the registry changes.

use crate::cli::output;
use crate::cli::{load_registry, log_audit, Cli};
use crate::errors::Result;

/// Execute the `rename` command.
pub fn execute(cli: &Cli, old_name: &str, new_name: &str) -> Result<()> {
    let mut registry = load_registry(cli)?;
    registry.rename(old_name, new_name)?;

    log_audit(cli, "rename", new_name, Some(&format!("from '{old_name}'")));
    output::success(&format!("Renamed vault '{old_name}' to '{new_name}'"));

    Ok(())
}
