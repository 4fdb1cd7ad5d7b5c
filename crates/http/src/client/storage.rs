//! Key/value stores backing the credential scopes
//!
//! Stores never surface I/O failures to callers. A store that cannot persist
//! logs the failure and keeps serving its in-memory view.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Minimal string key/value storage, shaped after the browser storage API
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str);

    /// Remove a value; removing a missing key is a no-op
    fn remove(&self, key: &str);
}

/// In-process store; contents live as long as the value
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// Store persisted as a flat JSON object, written through on every change
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, loading existing entries if the file exists
    ///
    /// A missing or unreadable file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) {
        if let Err(e) = write_entries(&self.path, entries) {
            warn!(path = %self.path.display(), error = %e, "Failed to persist credential store");
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.persist(&entries);
        }
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read credential store");
            return BTreeMap::new();
        }
    };

    // Only string values are meaningful; anything else is dropped
    match serde_json::from_str::<BTreeMap<String, Value>>(&content) {
        Ok(map) => map
            .into_iter()
            .filter_map(|(k, v)| match v {
                Value::String(s) => Some((k, s)),
                _ => None,
            })
            .collect(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed credential store");
            BTreeMap::new()
        }
    }
}

fn write_entries(path: &Path, entries: &BTreeMap<String, String>) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(entries)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("qs_access"), None);

        store.set("qs_access", "A1");
        store.set("qs_access", "A2");
        assert_eq!(store.get("qs_access").as_deref(), Some("A2"));

        store.remove("qs_access");
        store.remove("qs_access");
        assert_eq!(store.get("qs_access"), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let store = FileStore::open(&path);
        store.set("qs_access", "A1");
        store.set("qs_refresh", "R1");
        store.remove("qs_access");
        drop(store);

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("qs_access"), None);
        assert_eq!(reopened.get("qs_refresh").as_deref(), Some("R1"));
    }

    #[test]
    fn file_store_ignores_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path);
        assert_eq!(store.get("qs_access"), None);

        store.set("qs_access", "A1");
        assert_eq!(FileStore::open(&path).get("qs_access").as_deref(), Some("A1"));
    }

    #[test]
    fn file_store_drops_non_string_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"qs_access": "A1", "qs_pref_storage": 3}"#).unwrap();

        let store = FileStore::open(&path);
        assert_eq!(store.get("qs_access").as_deref(), Some("A1"));
        assert_eq!(store.get("qs_pref_storage"), None);
    }
}
