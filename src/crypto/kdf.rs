//! Password-based key derivation using Argon2id.
//!
//! Argon2id is a memory-hard KDF that protects against brute-force and
//! GPU-based attacks.  The cost parameters are chosen at vault creation
//! (from `Settings` or the defaults below) and persisted in the vault
//! header, so a later open reproduces the exact same key.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use super::keys::{MasterKey, KEY_LEN};
use crate::errors::{LockboxError, Result};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// The weakest parameters `derive_key` accepts (8 MB, 1 pass, 1 lane).
    pub const MINIMUM: Self = Self {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    };

    /// Upper bound for values read from a vault header (4 GB, 64, 64).
    pub const MAXIMUM: Self = Self {
        memory_kib: 4_194_304,
        iterations: 64,
        parallelism: 64,
    };

    /// Reject parameters below the safety floor.
    ///
    /// Stops a tampered header from silently weakening derivation.
    pub fn check_floor(&self) -> Result<()> {
        let min = Self::MINIMUM;
        if self.memory_kib < min.memory_kib {
            return Err(LockboxError::WeakKdfParameters(format!(
                "memory_kib must be at least {} (got {})",
                min.memory_kib, self.memory_kib
            )));
        }
        if self.iterations < min.iterations {
            return Err(LockboxError::WeakKdfParameters(format!(
                "iterations must be at least {} (got {})",
                min.iterations, self.iterations
            )));
        }
        if self.parallelism < min.parallelism {
            return Err(LockboxError::WeakKdfParameters(format!(
                "parallelism must be at least {} (got {})",
                min.parallelism, self.parallelism
            )));
        }
        Ok(())
    }

    /// Returns `true` if every parameter is at or below `MAXIMUM`.
    pub fn is_plausible(&self) -> bool {
        let max = Self::MAXIMUM;
        self.memory_kib <= max.memory_kib
            && self.iterations <= max.iterations
            && self.parallelism <= max.parallelism
    }
}

/// Derive a 32-byte master key from a password and salt using Argon2id.
///
/// The same password + salt + params will always produce the same key.
/// The password is only read, never stored or logged.
pub fn derive_key(password: &[u8], salt: &[u8], kdf_params: &KdfParams) -> Result<MasterKey> {
    kdf_params.check_floor()?;
    if !kdf_params.is_plausible() {
        return Err(LockboxError::KeyDerivationFailed(format!(
            "parameters exceed the supported maximum ({kdf_params:?})"
        )));
    }

    let params = Params::new(
        kdf_params.memory_kib,
        kdf_params.iterations,
        kdf_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| LockboxError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    // Derive straight into the zeroize-on-drop buffer so no stray copy
    // of the key is left on the stack.
    let mut key = MasterKey::zeroed();
    argon2
        .hash_password_into(password, salt, key.as_mut_bytes())
        .map_err(|e| LockboxError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    tracing::debug!(
        memory_kib = kdf_params.memory_kib,
        iterations = kdf_params.iterations,
        parallelism = kdf_params.parallelism,
        "derived vault key"
    );

    Ok(key)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_pass_the_floor() {
        assert!(KdfParams::default().check_floor().is_ok());
        assert!(KdfParams::MINIMUM.check_floor().is_ok());
    }

    #[test]
    fn low_memory_is_weak() {
        let params = KdfParams {
            memory_kib: 1024,
            ..KdfParams::MINIMUM
        };
        assert!(matches!(
            params.check_floor(),
            Err(LockboxError::WeakKdfParameters(_))
        ));
    }

    #[test]
    fn zero_iterations_is_weak() {
        let params = KdfParams {
            iterations: 0,
            ..KdfParams::MINIMUM
        };
        let result = derive_key(b"pw", &[0u8; SALT_LEN], &params);
        assert!(matches!(result, Err(LockboxError::WeakKdfParameters(_))));
    }

    #[test]
    fn zero_parallelism_is_weak() {
        let params = KdfParams {
            parallelism: 0,
            ..KdfParams::MINIMUM
        };
        assert!(params.check_floor().is_err());
    }

    #[test]
    fn oversized_params_are_implausible() {
        let params = KdfParams {
            memory_kib: u32::MAX,
            ..KdfParams::MINIMUM
        };
        assert!(!params.is_plausible());
        assert!(derive_key(b"pw", &[0u8; SALT_LEN], &params).is_err());
    }

    #[test]
    fn salts_are_random() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
