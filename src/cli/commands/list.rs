//! `lockbox list`: list entries, optionally filtered by a search term.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli, vault: &str, search: Option<&str>) -> Result<()> {
    let (_registry, session) = open_vault(cli, vault)?;

    let entries = match search {
        Some(query) => session.find(query)?,
        None => session.list()?,
    };
    output::print_entries_table(vault, &entries);

    Ok(())
}
