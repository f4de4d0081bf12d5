//! Plaintext export and merge-import of a vault's entries.
//!
//! `VaultExport` is a plain serde tree; the caller picks the file format
//! (the CLI writes pretty JSON).  Importing never overwrites anything
//! unless the caller explicitly asks for `ImportPolicy::ReplaceExisting`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::codec::EntrySet;
use super::entry::{Entry, EntryFields, EntryPatch, SecretText};

/// Version of the export document layout.
pub const EXPORT_VERSION: u32 = 1;

/// One entry in an export document.  Ids are vault-local and not exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedEntry {
    pub service: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: SecretText,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Entry> for ExportedEntry {
    fn from(entry: &Entry) -> Self {
        Self {
            service: entry.service.clone(),
            username: entry.username.clone(),
            password: entry.password.clone(),
            url: entry.url.clone(),
            notes: entry.notes.clone(),
            created_at: Some(entry.created_at),
            updated_at: Some(entry.updated_at),
        }
    }
}

/// Structured plaintext dump of a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultExport {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub entries: Vec<ExportedEntry>,
}

/// What to do when an imported entry has the same `service` and
/// `username` as an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportPolicy {
    /// Add the imported entry alongside the existing one.
    #[default]
    CreateNew,
    /// Keep the existing entry and ignore the imported one.
    SkipExisting,
    /// Overwrite the existing entry's fields with the imported ones.
    ReplaceExisting,
}

impl std::str::FromStr for ImportPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "create" | "create-new" => Ok(Self::CreateNew),
            "skip" => Ok(Self::SkipExisting),
            "replace" => Ok(Self::ReplaceExisting),
            other => Err(format!(
                "unknown import policy '{other}' (expected 'create', 'skip' or 'replace')"
            )),
        }
    }
}

/// Counts of what an import did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub created: usize,
    pub skipped: usize,
    pub replaced: usize,
}

impl ImportReport {
    /// Returns `true` if the import changed the entry set.
    pub fn changed(&self) -> bool {
        self.created + self.replaced > 0
    }
}

/// Build an export document from the entry set (ordered by id).
pub fn export(entries: &EntrySet, now: DateTime<Utc>) -> VaultExport {
    VaultExport {
        version: EXPORT_VERSION,
        exported_at: now,
        entries: entries.iter().map(ExportedEntry::from).collect(),
    }
}

/// Merge `doc` into `entries` according to `policy`.
///
/// Imported entries get fresh ids.  Timestamps from the document are
/// kept for new entries; replaced entries get `updated_at = now`.
pub fn import(
    entries: &mut EntrySet,
    doc: &VaultExport,
    policy: ImportPolicy,
    now: DateTime<Utc>,
) -> ImportReport {
    let mut report = ImportReport::default();

    for item in &doc.entries {
        let existing = entries
            .iter()
            .find(|e| e.service == item.service && e.username == item.username)
            .map(|e| e.id);

        match (existing, policy) {
            (Some(_), ImportPolicy::SkipExisting) => report.skipped += 1,
            (Some(id), ImportPolicy::ReplaceExisting) => {
                let patch = EntryPatch {
                    service: Some(item.service.clone()),
                    username: Some(item.username.clone()),
                    password: Some(item.password.clone()),
                    url: Some(item.url.clone()),
                    notes: Some(item.notes.clone()),
                };
                if let Some(entry) = entries.get_mut(id) {
                    entry.apply(patch, now);
                    report.replaced += 1;
                }
            }
            _ => {
                let id = entries.allocate_id();
                let fields = EntryFields {
                    service: item.service.clone(),
                    username: item.username.clone(),
                    password: item.password.clone(),
                    url: item.url.clone(),
                    notes: item.notes.clone(),
                };
                let mut entry = Entry::from_fields(id, fields, now);
                if let Some(created) = item.created_at {
                    entry.created_at = created;
                }
                if let Some(updated) = item.updated_at {
                    entry.updated_at = updated;
                }
                entries.insert(entry);
                report.created += 1;
            }
        }
    }

    report
}
