//! `lockbox get`: show one entry.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;
use crate::vault::EntryId;

/// Execute the `get` command.
pub fn execute(cli: &Cli, vault: &str, id: u64, show: bool) -> Result<()> {
    let (_registry, session) = open_vault(cli, vault)?;

    let entry = session.get(EntryId(id))?;
    output::print_entry(&entry, show);

    Ok(())
}
