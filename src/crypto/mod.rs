//! Cryptographic primitives for Lockbox.
//!
//! This module provides:
//! - Argon2id password-based key derivation (`kdf`)
//! - The zeroize-on-drop vault key (`keys`)
//! - AES-256-GCM sealing and opening with associated data (`cipher`)

pub mod cipher;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{seal, open, derive_key, ...};
pub use cipher::{open, seal, Sealed, NONCE_LEN, TAG_LEN};
pub use kdf::{derive_key, generate_salt, KdfParams, SALT_LEN};
pub use keys::{MasterKey, KEY_LEN};
