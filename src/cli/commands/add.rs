//! `lockbox add`: add an entry to a vault.
//!
//! The entry password comes from `--password`, `--generate`, or an
//! interactive prompt, in that order.

use crate::cli::output;
use crate::cli::{log_audit, open_vault, prompt_entry_password, Cli};
use crate::errors::Result;
use crate::generator::PasswordPolicy;
use crate::vault::EntryFields;

/// Field values given on the command line.
pub struct AddArgs<'a> {
    pub service: &'a str,
    pub username: &'a str,
    pub password: Option<&'a str>,
    pub url: &'a str,
    pub notes: &'a str,
    pub generate: bool,
    pub length: Option<usize>,
}

/// Execute the `add` command.
pub fn execute(cli: &Cli, vault: &str, args: AddArgs<'_>) -> Result<()> {
    let (registry, session) = open_vault(cli, vault)?;

    let fields = EntryFields::new(args.service)
        .username(args.username)
        .url(args.url)
        .notes(args.notes);

    let id = if args.generate {
        let length = args
            .length
            .unwrap_or(registry.settings().generator_length);
        session.add_generated(fields, &PasswordPolicy::with_length(length))?
    } else {
        let password = match args.password {
            Some(pw) => zeroize::Zeroizing::new(pw.to_string()),
            None => prompt_entry_password(args.service)?,
        };
        session.add(fields.password(password.as_str()))?
    };

    session.save()?;
    session.close();

    log_audit(cli, "add", vault, Some(&format!("entry {id}")));
    output::success(&format!("Added '{}' to '{vault}' as {id}", args.service));

    Ok(())
}
