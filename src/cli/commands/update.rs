//! `lockbox update`: change fields of an existing entry.

use crate::cli::output;
use crate::cli::{log_audit, open_vault, Cli};
use crate::errors::{LockboxError, Result};
use crate::generator::{self, PasswordPolicy};
use crate::vault::{EntryId, EntryPatch};

/// Execute the `update` command.
pub fn execute(cli: &Cli, vault: &str, id: u64, mut patch: EntryPatch, generate: bool) -> Result<()> {
    if patch.is_empty() && !generate {
        return Err(LockboxError::CommandFailed(
            "nothing to update; pass at least one field".into(),
        ));
    }

    let (registry, session) = open_vault(cli, vault)?;

    if generate {
        let policy = PasswordPolicy::with_length(registry.settings().generator_length);
        patch.password = Some(generator::generate(&policy)?);
    }

    let id = EntryId(id);
    session.update(id, patch)?;
    session.save()?;
    session.close();

    log_audit(cli, "update", vault, Some(&format!("entry {id}")));
    output::success(&format!("Updated {id} in '{vault}'"));

    Ok(())
}
