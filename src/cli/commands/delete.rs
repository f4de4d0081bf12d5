//! `lockbox delete`: remove an entry from a vault.

use crate::cli::output;
use crate::cli::{confirm, log_audit, open_vault, Cli};
use crate::errors::Result;
use crate::vault::EntryId;

/// Execute the `delete` command.
pub fn execute(cli: &Cli, vault: &str, id: u64, force: bool) -> Result<()> {
    let id = EntryId(id);
    let (_registry, session) = open_vault(cli, vault)?;
    let entry = session.get(id)?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force && !confirm(&format!("Delete '{}' ({id})?", entry.service))? {
        output::info("Cancelled.");
        return Ok(());
    }

    session.delete(id)?;
    session.save()?;
    session.close();

    log_audit(cli, "delete", vault, Some(&format!("entry {id}")));
    output::success(&format!("Deleted '{}' ({id})", entry.service));

    Ok(())
}
