//! Encoding of the entry set into the plaintext that gets sealed.
//!
//! The payload is a small versioned JSON document:
//!
//! ```text
//! { "version": 1, "next_id": 3, "entries": [ {..}, {..} ] }
//! ```
//!
//! Decoding is strict.  A wrong version, duplicate ids or a `next_id`
//! that would reissue an existing id are all `InvalidVaultFormat`;
//! nothing is ever dropped or repaired silently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::entry::{Entry, EntryId};
use crate::errors::{LockboxError, Result};

/// Version of the sealed entry payload.
pub const PAYLOAD_VERSION: u32 = 1;

/// The decrypted working set of a vault, ordered by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySet {
    next_id: u64,
    entries: BTreeMap<EntryId, Entry>,
}

impl Default for EntrySet {
    fn default() -> Self {
        Self {
            next_id: 1,
            entries: BTreeMap::new(),
        }
    }
}

impl EntrySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next unused id.
    pub fn allocate_id(&mut self) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Insert an entry, keeping `next_id` ahead of every stored id.
    pub fn insert(&mut self, entry: Entry) {
        self.next_id = self.next_id.max(entry.id.0 + 1);
        self.entries.insert(entry.id, entry);
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        self.entries.get_mut(&id)
    }

    pub fn remove(&mut self, id: EntryId) -> Option<Entry> {
        self.entries.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Drop every entry; each password is zeroized as it is dropped.
    pub fn wipe(&mut self) {
        self.entries.clear();
    }
}

#[derive(Serialize)]
struct PayloadRef<'a> {
    version: u32,
    next_id: u64,
    entries: Vec<&'a Entry>,
}

#[derive(Deserialize)]
struct Payload {
    version: u32,
    next_id: u64,
    entries: Vec<Entry>,
}

/// Serialize the entry set.  The output holds plaintext passwords and
/// is returned in a `Zeroizing` buffer.
pub fn encode(set: &EntrySet) -> Result<Zeroizing<Vec<u8>>> {
    let payload = PayloadRef {
        version: PAYLOAD_VERSION,
        next_id: set.next_id,
        entries: set.entries.values().collect(),
    };
    serde_json::to_vec(&payload)
        .map(Zeroizing::new)
        .map_err(|e| LockboxError::SerializationError(format!("entry payload: {e}")))
}

/// Parse bytes produced by `encode`.
pub fn decode(bytes: &[u8]) -> Result<EntrySet> {
    let payload: Payload = serde_json::from_slice(bytes)
        .map_err(|e| LockboxError::InvalidVaultFormat(format!("entry payload: {e}")))?;

    if payload.version != PAYLOAD_VERSION {
        return Err(LockboxError::InvalidVaultFormat(format!(
            "unsupported entry payload version {}, expected {PAYLOAD_VERSION}",
            payload.version
        )));
    }

    let mut entries = BTreeMap::new();
    for entry in payload.entries {
        if entry.id.0 == 0 || entry.id.0 >= payload.next_id {
            return Err(LockboxError::InvalidVaultFormat(format!(
                "entry id {} is outside the allocated range (next_id {})",
                entry.id.0, payload.next_id
            )));
        }
        let id = entry.id;
        if entries.insert(id, entry).is_some() {
            return Err(LockboxError::InvalidVaultFormat(format!(
                "duplicate entry id {}",
                id.0
            )));
        }
    }

    Ok(EntrySet {
        next_id: payload.next_id,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::entry::EntryFields;
    use chrono::Utc;

    fn set_with(fields: Vec<EntryFields>) -> EntrySet {
        let mut set = EntrySet::new();
        for f in fields {
            let id = set.allocate_id();
            set.insert(Entry::from_fields(id, f, Utc::now()));
        }
        set
    }

    #[test]
    fn empty_set_roundtrips() {
        let set = EntrySet::new();
        let bytes = encode(&set).unwrap();
        assert_eq!(decode(&bytes).unwrap(), set);
    }

    #[test]
    fn unicode_and_long_fields_roundtrip() {
        let long = "x".repeat(64 * 1024);
        let set = set_with(vec![
            EntryFields::new("Почта ✉️")
                .username("用户@例子.中国")
                .password("pässwörd-🔐")
                .notes("line one\nline \"two\"\t\u{0}"),
            EntryFields::new("long").password(long.clone()).url(long),
            EntryFields::new("blank"),
        ]);
        let decoded = decode(&encode(&set).unwrap()).unwrap();
        assert_eq!(decoded, set);
    }

    #[test]
    fn next_id_survives_deletion() {
        let mut set = set_with(vec![EntryFields::new("a"), EntryFields::new("b")]);
        set.remove(EntryId(2));
        let mut decoded = decode(&encode(&set).unwrap()).unwrap();
        assert_eq!(decoded.allocate_id(), EntryId(3));
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let set = set_with(vec![EntryFields::new("a").password("p")]);
        let bytes = encode(&set).unwrap();
        let cut = &bytes[..bytes.len() - 5];
        assert!(matches!(
            decode(cut),
            Err(LockboxError::InvalidVaultFormat(_))
        ));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let raw = br#"{"version":99,"next_id":1,"entries":[]}"#;
        assert!(matches!(
            decode(raw),
            Err(LockboxError::InvalidVaultFormat(_))
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let set = set_with(vec![EntryFields::new("a")]);
        let entry = serde_json::to_string(set.get(EntryId(1)).unwrap()).unwrap();
        let raw = format!(r#"{{"version":1,"next_id":2,"entries":[{entry},{entry}]}}"#);
        assert!(decode(raw.as_bytes()).is_err());
    }

    #[test]
    fn stale_next_id_is_rejected() {
        let set = set_with(vec![EntryFields::new("a"), EntryFields::new("b")]);
        let entries: Vec<&Entry> = set.iter().collect();
        let raw = serde_json::json!({ "version": 1, "next_id": 2, "entries": entries });
        assert!(decode(raw.to_string().as_bytes()).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode(b"\x00\x01not json").is_err());
        assert!(decode(b"").is_err());
    }
}
