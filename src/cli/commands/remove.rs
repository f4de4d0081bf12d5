//! `lockbox remove`: delete a vault and its file.

use crate::cli::output;
use crate::cli::{confirm, load_registry, log_audit, Cli};
use crate::errors::Result;

/// Execute the `remove` command.
pub fn execute(cli: &Cli, name: &str, force: bool) -> Result<()> {
    let mut registry = load_registry(cli)?;
    // Fail on unknown names before asking for confirmation.
    let location = registry.location(name)?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force && !confirm(&format!("Permanently delete vault '{name}' and all its entries?"))? {
        output::info("Cancelled.");
        return Ok(());
    }

    registry.remove(name)?;

    log_audit(cli, "remove", name, None);
    output::success(&format!(
        "Removed vault '{name}' ({})",
        location.display()
    ));

    Ok(())
}
