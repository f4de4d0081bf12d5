//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{LockboxError, Result};
use crate::registry::VaultRegistry;
use crate::vault::VaultSession;

/// Minimum master password length to prevent trivially weak passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// Environment variable holding the master password for scripted use.
pub const PASSWORD_ENV: &str = "LOCKBOX_PASSWORD";

/// Environment variable holding the new master password for `passwd`.
pub const NEW_PASSWORD_ENV: &str = "LOCKBOX_NEW_PASSWORD";

/// Lockbox CLI: local multi-vault credential store.
#[derive(Parser)]
#[command(
    name = "lockbox",
    about = "Local multi-vault encrypted credential store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding the vaults, the registry and lockbox.toml
    #[arg(long, default_value = "vaults", env = "LOCKBOX_VAULTS_DIR", global = true)]
    pub vaults_dir: String,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new vault
    Create {
        /// Vault name
        name: String,
    },

    /// List all registered vaults
    Vaults,

    /// Rename a vault
    Rename {
        /// Current name
        old_name: String,
        /// New name
        new_name: String,
    },

    /// Delete a vault and its file
    Remove {
        /// Vault name
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Copy a vault's encrypted file to a backup location
    Backup {
        /// Vault name
        name: String,
        /// Destination file (must not exist)
        destination: PathBuf,
    },

    /// Register a backup file as a new vault
    Restore {
        /// Backup file to restore
        backup: PathBuf,
        /// Name for the restored vault
        name: String,
    },

    /// Add an entry to a vault
    Add {
        /// Vault name
        vault: String,
        /// Service or site name
        service: String,
        #[arg(short, long, default_value = "")]
        username: String,
        /// Entry password (prompted if omitted)
        #[arg(short, long, conflicts_with = "generate")]
        password: Option<String>,
        #[arg(long, default_value = "")]
        url: String,
        #[arg(short, long, default_value = "")]
        notes: String,
        /// Generate a random password for the entry
        #[arg(short, long)]
        generate: bool,
        /// Length of the generated password (default from lockbox.toml)
        #[arg(short, long, requires = "generate")]
        length: Option<usize>,
    },

    /// Show one entry
    Get {
        /// Vault name
        vault: String,
        /// Entry id
        id: u64,
        /// Print the password in clear
        #[arg(short, long)]
        show: bool,
    },

    /// List the entries of a vault
    List {
        /// Vault name
        vault: String,
        /// Only entries whose service, username, url or notes contain this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Change fields of an entry
    Update {
        /// Vault name
        vault: String,
        /// Entry id
        id: u64,
        #[arg(long)]
        service: Option<String>,
        #[arg(short, long)]
        username: Option<String>,
        #[arg(short, long, conflicts_with = "generate")]
        password: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
        /// Replace the password with a generated one
        #[arg(short, long)]
        generate: bool,
    },

    /// Delete an entry
    Delete {
        /// Vault name
        vault: String,
        /// Entry id
        id: u64,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Change a vault's master password
    Passwd {
        /// Vault name
        vault: String,
    },

    /// Show entry counts and vault parameters
    Stats {
        /// Vault name
        vault: String,
    },

    /// Export entries as plaintext JSON
    Export {
        /// Vault name
        vault: String,
        /// Output file path (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import entries from an export file
    Import {
        /// Vault name
        vault: String,
        /// JSON file produced by `lockbox export`
        file: PathBuf,
        /// What to do with entries matching service and username:
        /// create, skip or replace
        #[arg(long, default_value = "create")]
        policy: String,
    },

    /// Generate a random password
    Generate {
        /// Password length (default from lockbox.toml)
        #[arg(short, long)]
        length: Option<usize>,
        #[arg(long)]
        no_uppercase: bool,
        #[arg(long)]
        no_digits: bool,
        #[arg(long)]
        no_symbols: bool,
    },

    /// View the audit log of vault operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get a vault's master password, trying in order:
/// 1. `LOCKBOX_PASSWORD` env var (scripts)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password(vault: &str) -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env(PASSWORD_ENV) {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt(format!("Master password for '{vault}'"))
        .interact()
        .map_err(|e| LockboxError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new master password with confirmation.
///
/// Reads `env_var` first for scripted use.  Enforces a minimum length.
pub fn prompt_new_password(env_var: &str) -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env(env_var) {
        if pw.len() < MIN_PASSWORD_LEN {
            return Err(LockboxError::CommandFailed(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        return Ok(pw);
    }

    loop {
        let password = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Choose master password")
                .with_confirmation(
                    "Confirm master password",
                    "Passwords do not match, try again",
                )
                .interact()
                .map_err(|e| LockboxError::CommandFailed(format!("password prompt: {e}")))?,
        );

        if password.len() < MIN_PASSWORD_LEN {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(password);
    }
}

/// Prompt for an entry's password (may be empty).
pub fn prompt_entry_password(service: &str) -> Result<Zeroizing<String>> {
    let pw = dialoguer::Password::new()
        .with_prompt(format!("Password for '{service}'"))
        .allow_empty_password(true)
        .interact()
        .map_err(|e| LockboxError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

fn password_from_env(var: &str) -> Option<Zeroizing<String>> {
    std::env::var(var)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

/// Ask a yes/no question, defaulting to no.
pub fn confirm(prompt: &str) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| LockboxError::CommandFailed(format!("confirm prompt: {e}")))
}

/// Absolute path of the vaults directory.
pub fn vaults_dir(cli: &Cli) -> Result<PathBuf> {
    let dir = PathBuf::from(&cli.vaults_dir);
    if dir.is_absolute() {
        Ok(dir)
    } else {
        Ok(std::env::current_dir()?.join(dir))
    }
}

/// Load settings and the registry for the vaults directory.
pub fn load_registry(cli: &Cli) -> Result<VaultRegistry> {
    let dir = vaults_dir(cli)?;
    let settings = Settings::load(&dir)?;
    VaultRegistry::load(dir, settings)
}

/// Load the registry, ask for the master password and unlock `vault`.
pub fn open_vault(cli: &Cli, vault: &str) -> Result<(VaultRegistry, Arc<VaultSession>)> {
    let mut registry = load_registry(cli)?;
    // Fail on unknown names before prompting.
    registry.location(vault)?;

    let password = prompt_password(vault)?;
    let session = registry.open(vault, password.as_bytes())?;
    log_audit(cli, "open", vault, None);
    Ok((registry, session))
}

/// Record an operation in the audit log, if compiled in.
///
/// Never fails the calling command.
pub fn log_audit(cli: &Cli, operation: &str, vault: &str, details: Option<&str>) {
    #[cfg(feature = "audit-log")]
    {
        if let Ok(dir) = vaults_dir(cli) {
            crate::audit::log_audit(&dir, operation, vault, details);
        }
    }

    #[cfg(not(feature = "audit-log"))]
    let _ = (cli, operation, vault, details);
}
