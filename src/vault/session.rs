//! The decrypted, mutable view of an open vault.
//!
//! A `VaultSession` owns the derived key, the decoded entry set and the
//! vault's lock file.  Edits only touch memory until `save`; `close`
//! (or dropping the session) wipes the key and every decrypted entry
//! and releases the lock.  Once closed, every operation fails with
//! `SessionClosed`.
//!
//! All state sits behind one mutex, so entry mutation and `save` are
//! serialized even when the session is shared across threads.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::crypto::{KdfParams, MasterKey};
use crate::errors::{LockboxError, Result};
use crate::generator::{self, PasswordPolicy};

use super::codec::EntrySet;
use super::entry::{Entry, EntryFields, EntryId, EntryPatch};
use super::format::VaultHeader;
use super::lock::VaultLock;
use super::store::VaultStore;
use super::transfer::{self, ImportPolicy, ImportReport, VaultExport};

/// Summary counts for an open vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultStats {
    pub total_entries: usize,
    pub with_password: usize,
    pub with_url: usize,
    pub format_version: u32,
    pub kdf_params: KdfParams,
    /// Most recent `updated_at` across all entries.
    pub last_updated: Option<DateTime<Utc>>,
    pub unsaved_changes: bool,
}

struct SessionState {
    header: VaultHeader,
    key: MasterKey,
    entries: EntrySet,
    dirty: bool,
    lock: Option<VaultLock>,
    closed: bool,
}

impl SessionState {
    /// Zero the key, drop every entry and release the lock.
    fn wipe(&mut self) {
        self.key.zeroize();
        self.entries.wipe();
        self.dirty = false;
        self.lock = None;
        self.closed = true;
    }
}

/// An unlocked vault.
pub struct VaultSession {
    store: VaultStore,
    state: Mutex<SessionState>,
}

impl VaultSession {
    pub(crate) fn new(
        store: VaultStore,
        header: VaultHeader,
        key: MasterKey,
        entries: EntrySet,
        lock: VaultLock,
    ) -> Self {
        Self {
            store,
            state: Mutex::new(SessionState {
                header,
                key,
                entries,
                dirty: false,
                lock: Some(lock),
                closed: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        // A panic mid-edit leaves the in-memory set as it was at that
        // point; it is still safe to save or wipe.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the state and fail if the session is closed.
    fn open_state(&self) -> Result<MutexGuard<'_, SessionState>> {
        let state = self.state();
        if state.closed {
            return Err(LockboxError::SessionClosed);
        }
        Ok(state)
    }

    // ------------------------------------------------------------------
    // Entry mutation
    // ------------------------------------------------------------------

    /// Add a new entry and return its id.  Not persisted until `save`.
    pub fn add(&self, fields: EntryFields) -> Result<EntryId> {
        validate_service(&fields.service)?;

        let mut state = self.open_state()?;
        let id = state.entries.allocate_id();
        state
            .entries
            .insert(Entry::from_fields(id, fields, Utc::now()));
        state.dirty = true;

        tracing::debug!(entry = %id, "entry added");
        Ok(id)
    }

    /// Add a new entry whose password is generated from `policy`.
    /// Any password already in `fields` is replaced.
    pub fn add_generated(&self, mut fields: EntryFields, policy: &PasswordPolicy) -> Result<EntryId> {
        fields.password = generator::generate(policy)?;
        self.add(fields)
    }

    /// Apply a partial update.  `updated_at` is refreshed even when the
    /// patch is empty.
    pub fn update(&self, id: EntryId, patch: EntryPatch) -> Result<()> {
        if let Some(service) = &patch.service {
            validate_service(service)?;
        }

        let mut state = self.open_state()?;
        let entry = state
            .entries
            .get_mut(id)
            .ok_or(LockboxError::EntryNotFound(id.0))?;
        entry.apply(patch, Utc::now());
        state.dirty = true;

        tracing::debug!(entry = %id, "entry updated");
        Ok(())
    }

    /// Remove an entry.  Its id is never handed out again.
    pub fn delete(&self, id: EntryId) -> Result<()> {
        let mut state = self.open_state()?;
        state
            .entries
            .remove(id)
            .ok_or(LockboxError::EntryNotFound(id.0))?;
        state.dirty = true;

        tracing::debug!(entry = %id, "entry deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// A copy of one entry, including its plaintext password.
    pub fn get(&self, id: EntryId) -> Result<Entry> {
        let state = self.open_state()?;
        state
            .entries
            .get(id)
            .cloned()
            .ok_or(LockboxError::EntryNotFound(id.0))
    }

    /// Every entry, ordered by id.
    pub fn list(&self) -> Result<Vec<Entry>> {
        self.search(|_| true)
    }

    /// Entries for which `predicate` returns `true`, ordered by id.
    pub fn search<F>(&self, predicate: F) -> Result<Vec<Entry>>
    where
        F: Fn(&Entry) -> bool,
    {
        let state = self.open_state()?;
        Ok(state
            .entries
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect())
    }

    /// Case-insensitive text search over service, username, url and notes.
    pub fn find(&self, query: &str) -> Result<Vec<Entry>> {
        self.search(|e| e.matches(query))
    }

    pub fn stats(&self) -> Result<VaultStats> {
        let state = self.open_state()?;
        let entries = &state.entries;
        Ok(VaultStats {
            total_entries: entries.len(),
            with_password: entries.iter().filter(|e| !e.password.is_empty()).count(),
            with_url: entries.iter().filter(|e| !e.url.is_empty()).count(),
            format_version: state.header.format_version,
            kdf_params: state.header.kdf_params,
            last_updated: entries.iter().map(|e| e.updated_at).max(),
            unsaved_changes: state.dirty,
        })
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Re-encrypt the whole entry set and atomically replace the file.
    ///
    /// On failure nothing in memory changes: the edits and the dirty
    /// flag are kept so the caller can retry.
    pub fn save(&self) -> Result<()> {
        let mut state = self.open_state()?;
        self.store
            .persist(&state.header, &state.key, &state.entries)?;
        state.dirty = false;

        tracing::info!(
            path = %self.store.path().display(),
            entries = state.entries.len(),
            "vault saved"
        );
        Ok(())
    }

    /// Re-key the vault under `new_password` with a fresh salt and the
    /// store's current KDF policy.
    ///
    /// The full entry set (including unsaved edits) is written under the
    /// new key.  The old key is wiped as soon as the write succeeds; if
    /// it fails the session keeps the old key and the old file stays.
    pub fn change_password(&self, new_password: &[u8]) -> Result<()> {
        let mut state = self.open_state()?;
        let (header, key) = self
            .store
            .rekey(state.header.vault_id, new_password, &state.entries)?;

        // Assigning drops the old key, which zeroizes it.
        state.key = key;
        state.header = header;
        state.dirty = false;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Export / import
    // ------------------------------------------------------------------

    /// Plaintext dump of every entry for the caller to serialize.
    pub fn export(&self) -> Result<VaultExport> {
        let state = self.open_state()?;
        Ok(transfer::export(&state.entries, Utc::now()))
    }

    /// Merge an export document into this vault.  Nothing is saved.
    ///
    /// Every imported entry is validated first; if one is invalid the
    /// vault is left untouched.
    pub fn import(&self, doc: &VaultExport, policy: ImportPolicy) -> Result<ImportReport> {
        for item in &doc.entries {
            validate_service(&item.service)?;
        }

        let mut state = self.open_state()?;
        let report = transfer::import(&mut state.entries, doc, policy, Utc::now());
        if report.changed() {
            state.dirty = true;
        }

        tracing::info!(
            created = report.created,
            skipped = report.skipped,
            replaced = report.replaced,
            "entries imported"
        );
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Wipe the key and entries and release the lock.  Unsaved edits
    /// are discarded.  Closing twice is a no-op.
    pub fn close(&self) {
        let mut state = self.state();
        if state.closed {
            return;
        }
        if state.dirty {
            tracing::warn!(
                path = %self.store.path().display(),
                "closing vault with unsaved changes"
            );
        }
        state.wipe();
        tracing::info!(path = %self.store.path().display(), "vault closed");
    }

    pub fn is_open(&self) -> bool {
        !self.state().closed
    }

    /// Returns `true` if there are edits not yet saved.
    pub fn is_dirty(&self) -> bool {
        self.state().dirty
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// The vault's persistent identifier (unchanged by password changes).
    pub fn vault_id(&self) -> Uuid {
        self.state().header.vault_id
    }

    #[cfg(test)]
    pub(crate) fn key_is_wiped(&self) -> bool {
        self.state().key.is_wiped()
    }
}

impl Drop for VaultSession {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if !state.closed {
            state.wipe();
        }
    }
}

impl std::fmt::Debug for VaultSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSession")
            .field("path", &self.store.path())
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

fn validate_service(service: &str) -> Result<()> {
    if service.trim().is_empty() {
        return Err(LockboxError::InvalidEntry("service cannot be empty".into()));
    }
    Ok(())
}
