//! Credential entries and the types used to create and edit them.
//!
//! Password plaintext lives in `SecretText`, a zeroize-on-drop string
//! that is redacted from `Debug` output and only readable through
//! `expose`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Vault-local entry identifier.  Assigned by the session, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Plaintext secret text that is wiped from memory when dropped.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretText(String);

impl SecretText {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the plaintext.  Keep the borrow short.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Run `f` with the plaintext and return its result.
    pub fn with_exposed<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Zeroizing<String>> for SecretText {
    fn from(value: Zeroizing<String>) -> Self {
        Self(value.as_str().to_owned())
    }
}

impl fmt::Debug for SecretText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretText(<redacted>)")
    }
}

impl Serialize for SecretText {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SecretText {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self)
    }
}

/// One credential record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub service: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: SecretText,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    pub(crate) fn from_fields(id: EntryId, fields: EntryFields, now: DateTime<Utc>) -> Self {
        Self {
            id,
            service: fields.service,
            username: fields.username,
            password: fields.password,
            url: fields.url,
            notes: fields.notes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply every field present in `patch` and refresh `updated_at`.
    pub(crate) fn apply(&mut self, patch: EntryPatch, now: DateTime<Utc>) {
        if let Some(service) = patch.service {
            self.service = service;
        }
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(password) = patch.password {
            self.password = password;
        }
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        self.updated_at = now;
    }

    /// Case-insensitive substring match over the non-secret text fields.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        [&self.service, &self.username, &self.url, &self.notes]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Field values for a new entry.
#[derive(Debug, Clone, Default)]
pub struct EntryFields {
    pub service: String,
    pub username: String,
    pub password: SecretText,
    pub url: String,
    pub notes: String,
}

impl EntryFields {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = SecretText::new(password);
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// A partial update: `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub service: Option<String>,
    pub username: Option<String>,
    pub password: Option<SecretText>,
    pub url: Option<String>,
    pub notes: Option<String>,
}

impl EntryPatch {
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretText::new(password));
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.service.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.url.is_none()
            && self.notes.is_none()
    }
}
