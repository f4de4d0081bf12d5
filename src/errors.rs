use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in Lockbox.
#[derive(Debug, Error)]
pub enum LockboxError {
    // crypto
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Tag mismatch, truncated input or wrong key at the cipher level.
    #[error("Authentication failed: ciphertext rejected")]
    AuthenticationFailed,

    /// The vault could not be unlocked. Never says which of the two it was.
    #[error("Incorrect password or corrupted vault")]
    WrongPasswordOrCorrupted,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("KDF parameters below the safety floor: {0}")]
    WeakKdfParameters(String),

    // vault
    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    #[error("Invalid vault format: {0}")]
    InvalidVaultFormat(String),

    #[error("Vault at {0} is already open")]
    AlreadyOpen(PathBuf),

    #[error("Vault session is closed; reopen the vault with its password")]
    SessionClosed,

    #[error("Entry #{0} not found")]
    EntryNotFound(u64),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    // registry
    #[error("A vault named '{0}' is already registered")]
    DuplicateName(String),

    #[error("No vault named '{0}' in the registry")]
    UnknownVault(String),

    #[error("Invalid vault name: {0}")]
    InvalidName(String),

    // generator
    #[error("Password generator: {0}")]
    GeneratorError(String),

    // config
    #[error("Config file error: {0}")]
    ConfigError(String),

    // io
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // serialization
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // cli
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Operation cancelled")]
    UserCancelled,

    #[error("Audit error: {0}")]
    AuditError(String),
}

/// Convenience type alias for Lockbox results.
pub type Result<T> = std::result::Result<T, LockboxError>;
