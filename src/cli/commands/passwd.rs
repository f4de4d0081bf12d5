//! `lockbox passwd`: change a vault's master password.
//!
//! The vault is re-encrypted under a key derived from the new password
//! with a fresh salt and the KDF parameters from `lockbox.toml`.

use crate::cli::output;
use crate::cli::{log_audit, open_vault, prompt_new_password, Cli, NEW_PASSWORD_ENV};
use crate::errors::Result;

/// Execute the `passwd` command.
pub fn execute(cli: &Cli, vault: &str) -> Result<()> {
    output::info("Enter the current master password.");
    let (_registry, session) = open_vault(cli, vault)?;

    output::info("Choose the new master password.");
    let new_password = prompt_new_password(NEW_PASSWORD_ENV)?;
    session.change_password(new_password.as_bytes())?;
    let count = session.stats()?.total_entries;
    session.close();

    log_audit(
        cli,
        "passwd",
        vault,
        Some(&format!("{count} entries re-encrypted")),
    );
    output::success(&format!(
        "Password changed for '{vault}' ({count} entries re-encrypted)"
    ));

    Ok(())
}
