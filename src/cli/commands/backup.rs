//! `lockbox backup`: copy a vault's encrypted file somewhere safe.
//!
//! The file is copied verbatim; no password is needed.

use std::path::Path;

use crate::cli::output;
use crate::cli::{load_registry, log_audit, Cli};
use crate::errors::Result;

/// Execute the `backup` command.
pub fn execute(cli: &Cli, name: &str, destination: &Path) -> Result<()> {
    let registry = load_registry(cli)?;
    let digest = registry.backup(name, destination)?;

    log_audit(
        cli,
        "backup",
        name,
        Some(&destination.display().to_string()),
    );
    output::success(&format!(
        "Backed up '{name}' to {}",
        destination.display()
    ));
    output::info(&format!("SHA-256: {digest}"));

    Ok(())
}
