//! `lockbox generate`: print a random password.

use crate::cli::{vaults_dir, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::generator::{self, PasswordPolicy};

/// Character-class switches from the command line.
pub struct GenerateArgs {
    pub length: Option<usize>,
    pub no_uppercase: bool,
    pub no_digits: bool,
    pub no_symbols: bool,
}

/// Execute the `generate` command.
pub fn execute(cli: &Cli, args: &GenerateArgs) -> Result<()> {
    let length = match args.length {
        Some(length) => length,
        None => Settings::load(&vaults_dir(cli)?)?.generator_length,
    };

    let policy = PasswordPolicy {
        length,
        uppercase: !args.no_uppercase,
        digits: !args.no_digits,
        symbols: !args.no_symbols,
    };
    let password = generator::generate(&policy)?;
    println!("{}", password.expose());

    Ok(())
}
