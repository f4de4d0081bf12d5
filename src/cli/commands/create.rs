//! `lockbox create`: create a new, empty vault.

use crate::cli::output;
use crate::cli::{load_registry, log_audit, prompt_new_password, Cli, PASSWORD_ENV};
use crate::errors::{LockboxError, Result};
use crate::registry::validate_name;

/// Execute the `create` command.
pub fn execute(cli: &Cli, name: &str) -> Result<()> {
    let mut registry = load_registry(cli)?;

    // Catch bad or taken names before asking for a password.
    validate_name(name)?;
    if registry.contains(name) {
        return Err(LockboxError::DuplicateName(name.to_string()));
    }

    let password = prompt_new_password(PASSWORD_ENV)?;
    let info = registry.create(name, password.as_bytes())?;

    log_audit(cli, "create", name, None);
    output::success(&format!(
        "Created vault '{name}' at {}",
        info.location.display()
    ));
    output::tip(&format!(
        "Run `lockbox add {name} <SERVICE>` to add your first entry."
    ));

    Ok(())
}
