//! Durable persistence of one vault file.
//!
//! `VaultStore` ties the crypto layer, the entry codec and the binary
//! format together.  It is a cheap handle (a path plus the KDF policy
//! for new keys); all decrypted state lives in the `VaultSession` that
//! `open` returns.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::crypto::{self, derive_key, generate_salt, KdfParams, MasterKey};
use crate::errors::{LockboxError, Result};

use super::codec::{self, EntrySet};
use super::format::{self, VaultFile, VaultHeader};
use super::lock::VaultLock;
use super::session::VaultSession;

/// Handle to a vault file at a fixed location.
#[derive(Debug, Clone)]
pub struct VaultStore {
    /// Path to the `.vault` file on disk.
    path: PathBuf,

    /// KDF parameters used whenever a new key is derived (create and
    /// password change).  Opening always uses the parameters stored in
    /// the file header.
    kdf_policy: KdfParams,
}

impl VaultStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// A handle for an existing vault, using the default KDF policy.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kdf_policy: KdfParams::default(),
        }
    }

    /// Replace the KDF policy used for newly derived keys.
    pub fn with_kdf_policy(mut self, kdf_policy: KdfParams) -> Self {
        self.kdf_policy = kdf_policy;
        self
    }

    /// Create a brand-new vault file at `path`.
    ///
    /// Generates a random salt and vault id, derives the key from the
    /// password and writes an empty entry set.
    pub fn create(path: &Path, password: &[u8], kdf_policy: &KdfParams) -> Result<Self> {
        kdf_policy.check_floor()?;
        if path.exists() {
            return Err(LockboxError::VaultAlreadyExists(path.to_path_buf()));
        }

        // Hold the lock so a concurrent create of the same path loses.
        let _lock = VaultLock::acquire(path)?;
        if path.exists() {
            return Err(LockboxError::VaultAlreadyExists(path.to_path_buf()));
        }

        let store = Self {
            path: path.to_path_buf(),
            kdf_policy: *kdf_policy,
        };

        let header = VaultHeader::new(Uuid::new_v4(), *kdf_policy, generate_salt());
        let key = derive_key(password, &header.salt, &header.kdf_params)?;
        store.persist(&header, &key, &EntrySet::new())?;

        tracing::info!(
            path = %path.display(),
            vault_id = %header.vault_id,
            "created vault"
        );

        Ok(store)
    }

    // ------------------------------------------------------------------
    // Open
    // ------------------------------------------------------------------

    /// Unlock the vault and return the decrypted session.
    ///
    /// Fails with `AlreadyOpen` if any session (in this or another
    /// process) holds the file, and with `WrongPasswordOrCorrupted` if
    /// authentication fails.  The two causes of an authentication
    /// failure are deliberately indistinguishable.
    pub fn open(&self, password: &[u8]) -> Result<VaultSession> {
        if !self.path.exists() {
            return Err(LockboxError::VaultNotFound(self.path.clone()));
        }

        // The lock is released again on every early return below.
        let lock = VaultLock::acquire(&self.path)?;

        let file = format::read_vault(&self.path)?;
        file.header.kdf_params.check_floor()?;

        let key = derive_key(password, &file.header.salt, &file.header.kdf_params)?;

        let plaintext = crypto::open(&key, &file.sealed, &file.header_bytes).map_err(|_| {
            tracing::debug!(path = %self.path.display(), "vault authentication failed");
            LockboxError::WrongPasswordOrCorrupted
        })?;

        let entries = codec::decode(&plaintext)?;

        tracing::info!(
            path = %self.path.display(),
            entries = entries.len(),
            "opened vault"
        );

        Ok(VaultSession::new(self.clone(), file.header, key, entries, lock))
    }

    // ------------------------------------------------------------------
    // Persistence (driven by the session)
    // ------------------------------------------------------------------

    /// Encode, seal and atomically write the entry set.
    pub(crate) fn persist(
        &self,
        header: &VaultHeader,
        key: &MasterKey,
        entries: &EntrySet,
    ) -> Result<()> {
        let plaintext = codec::encode(entries)?;
        let header_bytes = header.to_bytes();
        let sealed = crypto::seal(key, &plaintext, &header_bytes)?;

        format::write_vault(&self.path, &VaultFile::new(header.clone(), sealed))?;

        tracing::debug!(
            path = %self.path.display(),
            entries = entries.len(),
            "saved vault"
        );
        Ok(())
    }

    /// Derive a key from `new_password` under a fresh salt and the
    /// current KDF policy, then re-seal and replace the file.
    ///
    /// Returns the new header and key only once the write succeeded.
    pub(crate) fn rekey(
        &self,
        vault_id: Uuid,
        new_password: &[u8],
        entries: &EntrySet,
    ) -> Result<(VaultHeader, MasterKey)> {
        self.kdf_policy.check_floor()?;

        let header = VaultHeader::new(vault_id, self.kdf_policy, generate_salt());
        let key = derive_key(new_password, &header.salt, &header.kdf_params)?;
        self.persist(&header, &key, entries)?;

        tracing::info!(path = %self.path.display(), "vault password changed");
        Ok((header, key))
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the path to the vault file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the KDF policy used for new keys.
    pub fn kdf_policy(&self) -> &KdfParams {
        &self.kdf_policy
    }

    /// Returns `true` if the vault file exists on disk.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_refuses_weak_policy() {
        let dir = TempDir::new().unwrap();
        let weak = KdfParams {
            memory_kib: 64,
            ..KdfParams::MINIMUM
        };
        let result = VaultStore::create(&dir.path().join("v.vault"), b"pw", &weak);
        assert!(matches!(result, Err(LockboxError::WeakKdfParameters(_))));
        assert!(!dir.path().join("v.vault").exists());
    }

    #[test]
    fn create_releases_its_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("v.vault");
        VaultStore::create(&path, b"pw", &KdfParams::MINIMUM).unwrap();
        assert!(!VaultLock::path_for(&path).exists());
    }

    #[test]
    fn failed_open_releases_its_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("v.vault");
        let store = VaultStore::create(&path, b"right", &KdfParams::MINIMUM).unwrap();

        assert!(store.open(b"wrong").is_err());
        assert!(!VaultLock::path_for(&path).exists());
        assert!(store.open(b"right").is_ok());
    }

    #[test]
    fn weak_params_in_header_are_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("v.vault");
        let store = VaultStore::create(&path, b"pw", &KdfParams::MINIMUM).unwrap();

        // Rewrite memory_kib (offset 24) below the floor.
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[24..28].copy_from_slice(&1024u32.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            store.open(b"pw"),
            Err(LockboxError::WeakKdfParameters(_))
        ));
    }
}
