//! `lockbox vaults`: list registered vaults.

use crate::cli::output;
use crate::cli::{load_registry, Cli};
use crate::errors::Result;

/// Execute the `vaults` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let registry = load_registry(cli)?;
    output::print_vaults_table(&registry.list());
    Ok(())
}
