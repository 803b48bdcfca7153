//! Path-addressed document store and the profile client built on top of it.
//!
//! The store is laid out as a JSON tree:
//!
//! ```text
//! data/
//!   <uid>/
//!     ctf_names = "<name>␞<name>␞..."
//! ```
//!
//! Each user record has a single child, `ctf_names`, holding the whole list as
//! one delimited string. Limiting the length of that one value is how the
//! number and size of entries is bounded, so the rules in [`check_write`] must
//! stay in sync with [`MAX_CTF_NAMES_LENGTH`].

use json::JsonValue;
use thiserror::Error;

pub mod memory;
pub mod profile;
pub mod store;

pub use memory::MemoryStore;
pub use profile::ProfileClient;
pub use store::FileStore;

/// Separates entries in the stored `ctf_names` string.
pub const ENTRY_SEPARATOR: &str = "␞";

pub const UID_PLACEHOLDER: &str = "##UID##";
pub const DATA_ROOT: &str = "data";
pub const PATH_TO_USER_DATA: &str = "data/##UID##/";
pub const KEY_USER_CTF_NAMES: &str = "ctf_names";
pub const PATH_TO_CTF_NAMES: &str = "data/##UID##/ctf_names";

/// Upper bound (exclusive) on the length of the stored `ctf_names` string.
pub const MAX_CTF_NAMES_LENGTH: usize = 620;

/// Maximum amount of CTFs a user can follow.
pub const MAX_CTF_ENTRIES: usize = 10;

/// Maximum length of a single CTF name. Leaves room for the separators.
pub const MAX_ENTRY_NAME_LEN: usize = (MAX_CTF_NAMES_LENGTH - MAX_CTF_ENTRIES) / MAX_CTF_ENTRIES;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Invalid DB key: {0}")]
    InvalidKey(String),
    #[error("Permission denied: {0}")]
    Rejected(String),
    #[error("Database unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed record at {0}")]
    Corrupt(String),
}

#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    /// Returns `None` when nothing is stored at `path`.
    async fn read(&self, path: &str) -> Result<Option<JsonValue>, StoreError>;
    /// Replaces whatever is stored at `path`.
    async fn write(&self, path: &str, value: JsonValue) -> Result<(), StoreError>;
    /// Removing a path that holds nothing succeeds.
    async fn remove(&self, path: &str) -> Result<(), StoreError>;
}

/// A store path resolved to the user record it touches.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct RecordPath<'a> {
    pub uid: &'a str,
    pub key: Option<&'a str>,
}

/// Whether `key` can be used as a single segment of a store path.
pub fn is_legal_key(key: &str) -> bool {
    !key.is_empty()
        && !key.chars().any(|c| matches!(c, '.' | '$' | '#' | '[' | ']' | '/') || c.is_ascii_control())
}

pub(crate) fn parse_path(path: &str) -> Result<RecordPath<'_>, StoreError> {
    let mut segments = path.trim_end_matches('/').split('/');
    if segments.next() != Some(DATA_ROOT) {
        return Err(StoreError::Rejected(path.to_string()));
    }
    let uid = segments.next().ok_or_else(|| StoreError::Rejected(path.to_string()))?;
    if !is_legal_key(uid) {
        return Err(StoreError::InvalidKey(uid.to_string()));
    }
    let key = segments.next();
    if let Some(key) = key {
        if !is_legal_key(key) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
    }
    if segments.next().is_some() {
        return Err(StoreError::Rejected(path.to_string()));
    }
    Ok(RecordPath { uid, key })
}

/// The write rules of the store: only `ctf_names` is writable under a user
/// record, and it must be a string shorter than [`MAX_CTF_NAMES_LENGTH`].
pub(crate) fn check_write(path: &RecordPath, value: &JsonValue) -> Result<(), StoreError> {
    match (path.key, value.as_str()) {
        (Some(KEY_USER_CTF_NAMES), Some(names)) if names.chars().count() < MAX_CTF_NAMES_LENGTH => Ok(()),
        (Some(KEY_USER_CTF_NAMES), _) => Err(StoreError::Rejected(format!(
            "{KEY_USER_CTF_NAMES} must be a string shorter than {MAX_CTF_NAMES_LENGTH} characters"
        ))),
        _ => Err(StoreError::Rejected(format!("data/{}/{}", path.uid, path.key.unwrap_or_default()))),
    }
}

/// Reads `path.key` out of a whole user record.
pub(crate) fn read_child(record: &JsonValue, path: &RecordPath) -> Option<JsonValue> {
    let value = match path.key {
        Some(key) => record[key].clone(),
        None => record.clone(),
    };
    (!value.is_null()).then_some(value)
}
