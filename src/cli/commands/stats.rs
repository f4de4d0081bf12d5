//! `lockbox stats`: entry counts and vault parameters.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `stats` command.
pub fn execute(cli: &Cli, vault: &str) -> Result<()> {
    let (_registry, session) = open_vault(cli, vault)?;
    output::print_stats(vault, &session.stats()?);
    Ok(())
}
