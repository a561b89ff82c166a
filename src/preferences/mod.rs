//! Durable key/value preferences.
//!
//! A flat namespace of boolean, integer and string values loaded once at
//! startup and then read and written from any thread. Writes are durable and
//! visible to every thread as soon as the setter returns.
//!
//! - [`PreferenceStore`]: the interface the rest of the crate depends on
//! - [`YamlPreferenceStore`]: file-backed store, write-through on every set
//! - [`InMemoryPreferenceStore`]: volatile store for tests and embedding
//! - [`keys`]: the preference keys this crate reads and writes

mod file_store;

pub use file_store::YamlPreferenceStore;

use camino::Utf8PathBuf;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

/// Preference keys used by the core
pub mod keys {
    /// User toggle for repository downloads (default `true`)
    pub const ENABLE_DOWNLOADS: &str = "enable_downloads";

    /// Set once obsolete installer archives were removed from external storage
    pub const CLEANED_EXTERNAL_STORAGE: &str = "cleaned_up_sdcard";

    /// Set once the obsolete debug logs were removed
    pub const CLEANED_DEBUG_LOG: &str = "cleaned_up_debug_log";

    /// User-chosen accent color as packed ARGB
    pub const ACCENT_COLOR: &str = "colors";
}

/// A stored preference value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    Bool(bool),
    Int(i64),
    String(String),
}

/// Errors from reading or persisting preferences
#[derive(Error, Debug)]
pub enum PreferenceError {
    #[error("I/O error on preference file {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse preference file {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("Failed to serialize preferences: {0}")]
    Serialize(#[source] serde_yaml_ng::Error),
}

/// Durable key/value store shared by every thread.
///
/// Only [`get`](Self::get) and [`set`](Self::set) are required; the typed
/// accessors fall back to `default` when a key is absent or holds a value of
/// another type.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<PreferenceValue>;

    /// Store `value` under `key`; durable once this returns `Ok`.
    fn set(&self, key: &str, value: PreferenceValue) -> Result<(), PreferenceError>;

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(PreferenceValue::Bool(value)) => value,
            _ => default,
        }
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), PreferenceError> {
        self.set(key, PreferenceValue::Bool(value))
    }

    fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.get(key) {
            Some(PreferenceValue::Int(value)) => value,
            _ => default,
        }
    }

    fn set_int(&self, key: &str, value: i64) -> Result<(), PreferenceError> {
        self.set(key, PreferenceValue::Int(value))
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(PreferenceValue::String(value)) => value,
            _ => default.to_string(),
        }
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.set(key, PreferenceValue::String(value.to_string()))
    }
}

/// Volatile preference store
#[derive(Debug, Default)]
pub struct InMemoryPreferenceStore {
    values: RwLock<IndexMap<String, PreferenceValue>>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`
    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, PreferenceValue)>,
        K: Into<String>,
    {
        Self {
            values: RwLock::new(entries.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<PreferenceValue> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: PreferenceValue) -> Result<(), PreferenceError> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_absent() {
        let store = InMemoryPreferenceStore::new();

        assert!(store.get_bool(keys::ENABLE_DOWNLOADS, true));
        assert!(!store.get_bool(keys::CLEANED_DEBUG_LOG, false));
        assert_eq!(store.get_int(keys::ACCENT_COLOR, 7), 7);
        assert_eq!(store.get_string("missing", "fallback"), "fallback");
    }

    #[test]
    fn test_typed_round_trip() {
        let store = InMemoryPreferenceStore::new();

        store.set_bool(keys::ENABLE_DOWNLOADS, false).unwrap();
        store.set_int(keys::ACCENT_COLOR, 0xFF33_6699).unwrap();

        assert!(!store.get_bool(keys::ENABLE_DOWNLOADS, true));
        assert_eq!(store.get_int(keys::ACCENT_COLOR, 0), 0xFF33_6699);
    }

    #[test]
    fn test_type_mismatch_uses_default() {
        let store = InMemoryPreferenceStore::with_entries([(
            keys::ENABLE_DOWNLOADS,
            PreferenceValue::String("yes".to_string()),
        )]);

        assert!(!store.get_bool(keys::ENABLE_DOWNLOADS, false));
        assert_eq!(store.get_string(keys::ENABLE_DOWNLOADS, ""), "yes");
    }

    #[test]
    fn test_untagged_yaml_values() {
        let parsed: IndexMap<String, PreferenceValue> =
            serde_yaml_ng::from_str("a: true\nb: 42\nc: text\n").unwrap();

        assert_eq!(parsed["a"], PreferenceValue::Bool(true));
        assert_eq!(parsed["b"], PreferenceValue::Int(42));
        assert_eq!(parsed["c"], PreferenceValue::String("text".to_string()));
    }
}
