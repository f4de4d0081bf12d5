//! Registry of named vaults.
//!
//! The registry is an unencrypted JSON index (`registry.json` by
//! default) inside the vaults directory that maps a vault name to its
//! file location and timestamps.  It holds no secrets.
//!
//! Vaults created through the registry live in the vaults directory as
//! `<uuid>.vault`, so renaming a vault only rewrites the index.
//!
//! Several processes may share one directory.  Every mutation takes the
//! index lock (`registry.json.lock`), re-reads the index from disk,
//! applies its change and writes the whole index atomically before the
//! lock is released.  The in-memory copy is replaced only after the write
//! succeeds, so a failed change leaves the previous state intact.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::{ListOrder, Settings};
use crate::errors::{LockboxError, Result};
use crate::vault::format::{self, VaultFile};
use crate::vault::lock::VaultLock;
use crate::vault::{VaultSession, VaultStore};

/// Version of the registry index layout.
pub const REGISTRY_VERSION: u32 = 1;

/// Longest accepted vault name, in characters.
pub const MAX_NAME_LEN: usize = 64;

/// Persisted metadata for one vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    /// Vault file path.  Relative paths are resolved against the vaults
    /// directory.
    pub location: PathBuf,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_opened_at: Option<DateTime<Utc>>,
}

/// A registry record together with its name and resolved location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultInfo {
    pub name: String,
    pub location: PathBuf,
    pub created_at: DateTime<Utc>,
    pub last_opened_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    version: u32,
    vaults: BTreeMap<String, VaultRecord>,
}

/// Named vaults under one directory.
pub struct VaultRegistry {
    root: PathBuf,
    settings: Settings,
    records: BTreeMap<String, VaultRecord>,
    sessions: HashMap<String, Weak<VaultSession>>,
}

impl VaultRegistry {
    /// Load the registry in `root`, creating the directory if needed.
    ///
    /// A missing index means an empty registry; an index that cannot be
    /// parsed is an error.
    pub fn load(root: impl Into<PathBuf>, settings: Settings) -> Result<Self> {
        let root = root.into();
        ensure_dir(&root)?;

        let records = read_index(&settings.registry_path(&root))?;

        tracing::debug!(root = %root.display(), vaults = records.len(), "loaded registry");

        Ok(Self {
            root,
            settings,
            records,
            sessions: HashMap::new(),
        })
    }

    // ------------------------------------------------------------------
    // Create / adopt
    // ------------------------------------------------------------------

    /// Create a new, empty vault named `name`.
    pub fn create(&mut self, name: &str, password: &[u8]) -> Result<VaultInfo> {
        check_new_name(&self.records, name)?;

        let file_name = PathBuf::from(format!("{}.vault", Uuid::new_v4()));
        let path = self.root.join(&file_name);
        VaultStore::create(&path, password, &self.settings.kdf_params())?;

        let record = VaultRecord {
            location: file_name,
            created_at: Utc::now(),
            last_opened_at: None,
        };
        if let Err(e) = self.insert_new(name, record) {
            discard_file(&path);
            return Err(e);
        }

        tracing::info!(vault = name, path = %path.display(), "registered new vault");
        self.get(name)
    }

    /// Register an existing vault file under `name` without copying it.
    pub fn register(&mut self, name: &str, location: &Path) -> Result<VaultInfo> {
        check_new_name(&self.records, name)?;

        // Validates the layout without a password.
        format::read_header(location)?;

        let canonical = location.canonicalize()?;
        let root = self.root.clone();
        self.update(|records| {
            check_new_name(records, name)?;
            let taken = records.values().any(|record| {
                root.join(&record.location)
                    .canonicalize()
                    .is_ok_and(|p| p == canonical)
            });
            if taken {
                return Err(LockboxError::VaultAlreadyExists(canonical.clone()));
            }
            records.insert(
                name.to_string(),
                VaultRecord {
                    location: canonical.clone(),
                    created_at: Utc::now(),
                    last_opened_at: None,
                },
            );
            Ok(())
        })?;

        tracing::info!(vault = name, "registered existing vault");
        self.get(name)
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Unlock the vault named `name`.
    ///
    /// The registry keeps a weak handle so `close` and `remove` can wipe
    /// the session; dropping every `Arc` also closes it.
    pub fn open(&mut self, name: &str, password: &[u8]) -> Result<Arc<VaultSession>> {
        let path = self.location(name)?;

        if self
            .sessions
            .get(name)
            .and_then(Weak::upgrade)
            .is_some_and(|s| s.is_open())
        {
            return Err(LockboxError::AlreadyOpen(path));
        }

        let store = VaultStore::new(&path).with_kdf_policy(self.settings.kdf_params());
        let session = Arc::new(store.open(password)?);
        self.sessions
            .insert(name.to_string(), Arc::downgrade(&session));

        // The timestamp is bookkeeping only; a failed write does not
        // undo a successful unlock.
        let stamped = self.update(|records| {
            if let Some(record) = records.get_mut(name) {
                record.last_opened_at = Some(Utc::now());
            }
            Ok(())
        });
        if let Err(e) = stamped {
            tracing::warn!(vault = name, error = %e, "could not record last-opened time");
        }

        Ok(session)
    }

    /// Close the session opened for `name`, if any.
    pub fn close(&mut self, name: &str) -> Result<()> {
        if !self.records.contains_key(name) {
            return Err(LockboxError::UnknownVault(name.to_string()));
        }
        if let Some(session) = self.sessions.remove(name).and_then(|w| w.upgrade()) {
            session.close();
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Rename / remove
    // ------------------------------------------------------------------

    /// Rename a vault.  The vault file itself is not touched.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if !self.records.contains_key(old_name) {
            return Err(LockboxError::UnknownVault(old_name.to_string()));
        }
        if old_name == new_name {
            return Ok(());
        }
        check_new_name(&self.records, new_name)?;

        self.update(|records| {
            let record = records
                .remove(old_name)
                .ok_or_else(|| LockboxError::UnknownVault(old_name.to_string()))?;
            check_new_name(records, new_name)?;
            records.insert(new_name.to_string(), record);
            Ok(())
        })?;

        if let Some(session) = self.sessions.remove(old_name) {
            self.sessions.insert(new_name.to_string(), session);
        }

        tracing::info!(from = old_name, to = new_name, "renamed vault");
        Ok(())
    }

    /// Close any session for `name`, unregister it and delete its file.
    ///
    /// Fails with `AlreadyOpen` if another process holds the vault.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let path = self.location(name)?;
        self.close(name)?;

        // Keeps other processes out while the file goes away.
        let lock = VaultLock::acquire(&path)?;

        let root = self.root.clone();
        self.update(|records| match records.get(name) {
            // Another process may have re-pointed the name since we loaded.
            Some(record) if root.join(&record.location) == path => {
                records.remove(name);
                Ok(())
            }
            _ => Err(LockboxError::UnknownVault(name.to_string())),
        })?;

        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        drop(lock);

        tracing::info!(vault = name, path = %path.display(), "removed vault");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Backup / restore
    // ------------------------------------------------------------------

    /// Copy the encrypted vault file verbatim to `destination`.
    ///
    /// Never decrypts.  Refuses to overwrite an existing file and checks
    /// the copy against a SHA-256 digest of the source.  Returns the
    /// digest as lowercase hex.
    pub fn backup(&self, name: &str, destination: &Path) -> Result<String> {
        let source = self.location(name)?;
        let bytes = fs::read(&source)?;
        VaultFile::from_bytes(&bytes)?;
        let expected = hex_digest(&bytes);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(destination)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => {
                    LockboxError::VaultAlreadyExists(destination.to_path_buf())
                }
                _ => e.into(),
            })?;
        format::restrict_permissions(destination)?;
        let written = file
            .write_all(&bytes)
            .and_then(|()| file.sync_all());
        drop(file);
        if let Err(e) = written {
            discard_file(destination);
            return Err(e.into());
        }

        let actual = hex_digest(&fs::read(destination)?);
        if actual != expected {
            discard_file(destination);
            return Err(LockboxError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("backup of '{name}' failed verification"),
            )));
        }

        tracing::info!(vault = name, destination = %destination.display(), "backed up vault");
        Ok(expected)
    }

    /// Copy a backup file into the vaults directory and register it as
    /// `name`.
    pub fn restore(&mut self, backup: &Path, name: &str) -> Result<VaultInfo> {
        check_new_name(&self.records, name)?;

        let file = format::read_vault(backup)?;
        let bytes = file.to_bytes()?;

        let file_name = PathBuf::from(format!("{}.vault", Uuid::new_v4()));
        let path = self.root.join(&file_name);
        format::write_atomic(&path, &bytes)?;

        let record = VaultRecord {
            location: file_name,
            created_at: Utc::now(),
            last_opened_at: None,
        };
        if let Err(e) = self.insert_new(name, record) {
            discard_file(&path);
            return Err(e);
        }

        tracing::info!(vault = name, backup = %backup.display(), "restored vault");
        self.get(name)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// All vaults, ordered by the configured `list_order`.
    pub fn list(&self) -> Vec<VaultInfo> {
        let mut vaults: Vec<VaultInfo> = self
            .records
            .iter()
            .map(|(name, record)| self.info(name, record))
            .collect();

        match self.settings.list_order {
            ListOrder::Created => {
                vaults.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
            }
            ListOrder::Name => vaults.sort_by(|a, b| a.name.cmp(&b.name)),
            // `None` sorts before `Some`, so reverse to put never-opened last.
            ListOrder::LastOpened => vaults.sort_by(|a, b| {
                b.last_opened_at
                    .cmp(&a.last_opened_at)
                    .then(a.name.cmp(&b.name))
            }),
        }
        vaults
    }

    pub fn get(&self, name: &str) -> Result<VaultInfo> {
        self.records
            .get(name)
            .map(|record| self.info(name, record))
            .ok_or_else(|| LockboxError::UnknownVault(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Resolved path of the vault file for `name`.
    pub fn location(&self, name: &str) -> Result<PathBuf> {
        self.resolve(name)
            .ok_or_else(|| LockboxError::UnknownVault(name.to_string()))
    }

    /// The directory holding the index and registry-created vaults.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.records
            .get(name)
            .map(|record| self.root.join(&record.location))
    }

    fn info(&self, name: &str, record: &VaultRecord) -> VaultInfo {
        VaultInfo {
            name: name.to_string(),
            location: self.root.join(&record.location),
            created_at: record.created_at,
            last_opened_at: record.last_opened_at,
        }
    }

    fn insert_new(&mut self, name: &str, record: VaultRecord) -> Result<()> {
        self.update(|records| {
            check_new_name(records, name)?;
            records.insert(name.to_string(), record);
            Ok(())
        })
    }

    /// Apply `change` to the current on-disk index under the index lock
    /// and write the result.  Nothing is written if `change` fails.
    fn update<T>(
        &mut self,
        change: impl FnOnce(&mut BTreeMap<String, VaultRecord>) -> Result<T>,
    ) -> Result<T> {
        let index = self.settings.registry_path(&self.root);
        let _guard = VaultLock::acquire_blocking(&index)?;

        let mut records = read_index(&index)?;
        let out = change(&mut records)?;

        let file = RegistryFile {
            version: REGISTRY_VERSION,
            vaults: records,
        };
        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| LockboxError::SerializationError(format!("registry: {e}")))?;
        format::write_atomic(&index, &json)?;

        self.records = file.vaults;
        Ok(out)
    }
}

fn check_new_name(records: &BTreeMap<String, VaultRecord>, name: &str) -> Result<()> {
    validate_name(name)?;
    if records.contains_key(name) {
        return Err(LockboxError::DuplicateName(name.to_string()));
    }
    Ok(())
}

/// Read the index at `path`.  A missing index is an empty registry.
fn read_index(path: &Path) -> Result<BTreeMap<String, VaultRecord>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.into()),
    };
    let file: RegistryFile = serde_json::from_slice(&bytes).map_err(|e| {
        LockboxError::SerializationError(format!("registry {}: {e}", path.display()))
    })?;
    if file.version != REGISTRY_VERSION {
        return Err(LockboxError::SerializationError(format!(
            "registry {}: unsupported version {}",
            path.display(),
            file.version
        )));
    }
    Ok(file.vaults)
}

/// Vault names are case-sensitive, 1 to 64 characters, without control
/// characters or surrounding whitespace.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(LockboxError::InvalidName("vault name cannot be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(LockboxError::InvalidName(format!(
            "vault name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(LockboxError::InvalidName(format!(
            "vault name '{}' contains control characters",
            name.escape_debug()
        )));
    }
    if name.trim() != name {
        return Err(LockboxError::InvalidName(format!(
            "vault name '{name}' has leading or trailing whitespace"
        )));
    }
    Ok(())
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Best-effort removal of a file we just wrote.
fn discard_file(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "could not remove file");
    }
}
