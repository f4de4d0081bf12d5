//! Vault module: encrypted credential storage.
//!
//! This module provides:
//! - `Entry`, `EntryFields`, `EntryPatch` and `SecretText` (`entry`)
//! - The sealed entry payload (`codec`)
//! - Binary vault file format and atomic writes (`format`)
//! - The per-vault lock file (`lock`)
//! - `VaultStore` for creating and opening vaults (`store`)
//! - `VaultSession`, the decrypted view of an open vault (`session`)
//! - Plaintext export and merge-import (`transfer`)

pub mod codec;
pub mod entry;
pub mod format;
pub mod lock;
pub mod session;
pub mod store;
pub mod transfer;

// Re-export the most commonly used items.
pub use codec::EntrySet;
pub use entry::{Entry, EntryFields, EntryId, EntryPatch, SecretText};
pub use format::{VaultFile, VaultHeader};
pub use session::{VaultSession, VaultStats};
pub use store::VaultStore;
pub use transfer::{ExportedEntry, ImportPolicy, ImportReport, VaultExport};
