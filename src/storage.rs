//! Durable key-value storage for session persistence.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session mirrors its identity, token, and verification flag into a
//! string key-value store that survives restarts. Reads and writes are
//! synchronous and never fail the caller: unreadable entries decode to
//! "absent" and failed writes are logged.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Storage keys used by the session core.
pub mod keys {
    pub const USER: &str = "user";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const EMAIL_VERIFIED: &str = "email_verified";

    /// Current visa request pointer written by the visa-request screens.
    pub const VISA_REQUEST_ID: &str = "visaRequestId";
    /// Older spelling of the visa request pointer still found in storage.
    pub const VISA_REQUEST_ID_LEGACY: &str = "visarequestId";
    /// Applicant selected by an agent or admin.
    pub const CURRENT_USER_ID: &str = "user_id";

    /// Keys mirroring the session itself.
    pub const SESSION: &[&str] = &[USER, ACCESS_TOKEN, EMAIL_VERIFIED];

    /// Feature pointers that must not outlive the session.
    pub const FEATURE_POINTERS: &[&str] = &[VISA_REQUEST_ID, VISA_REQUEST_ID_LEGACY, CURRENT_USER_ID];
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Synchronous string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

// =============================================================================
// JSON HELPERS
// =============================================================================

/// Decode a raw stored value.
///
/// Absent entries, the literal strings `"undefined"` and `"null"`, and
/// malformed JSON all yield `None`.
#[must_use]
pub fn safe_parse<T: DeserializeOwned>(raw: Option<&str>) -> Option<T> {
    let raw = raw?;
    if raw.is_empty() || raw == "undefined" || raw == "null" {
        return None;
    }
    serde_json::from_str(raw).ok()
}

/// Load a JSON value stored under `key`.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    safe_parse(store.get(key).as_deref())
}

/// Save a JSON value under `key`.
pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, &raw),
        Err(e) => tracing::warn!(%key, error = %e, "failed to encode storage entry"),
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).remove(key);
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// Store backed by a single JSON object file.
///
/// The file is read once on open; every mutation rewrites it through a
/// temporary sibling and a rename so a crash never leaves half a file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`. A missing or corrupt file opens empty.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = read_entries(&path);
        Self { path, entries: Mutex::new(entries) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut entries);
        if let Err(e) = write_entries(&self.path, &entries) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist storage file");
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.mutate(|entries| {
            entries.insert(key.to_owned(), value.to_owned());
        });
    }

    fn remove(&self, key: &str) {
        self.mutate(|entries| {
            entries.remove(key);
        });
    }
}

fn read_entries(path: &Path) -> BTreeMap<String, String> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "storage file unreadable; starting empty");
            return BTreeMap::new();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "storage file corrupt; starting empty");
        BTreeMap::new()
    })
}

fn write_entries(path: &Path, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let raw = serde_json::to_string_pretty(entries)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, raw)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
