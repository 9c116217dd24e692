//! Key/value blob storage

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Database;
use crate::error::{Error, Result};

/// Opaque get/set blob storage used for every persisted value
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when the key was never written
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value; missing keys are not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// Read a JSON-encoded value.
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    store
        .get(key)?
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(Error::from)
}

/// Write a value as JSON.
pub fn set_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    store.set(key, &serde_json::to_string(value)?)
}

/// `SQLite` implementation of `KeyValueStore`
pub struct SqliteKeyValueStore {
    db: Mutex<Database>,
}

impl SqliteKeyValueStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    pub const fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| Error::Database("database lock poisoned".into()))
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let db = self.lock()?;
        let value = db
            .connection()
            .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let db = self.lock()?;
        db.connection().execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?, ?, ?)",
            params![key, value, chrono::Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let db = self.lock()?;
        db.connection()
            .execute("DELETE FROM kv WHERE key = ?", params![key])?;
        Ok(())
    }
}

/// In-memory `KeyValueStore` for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| Error::Database("memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.get("input_mode").unwrap(), None);

        store.set("input_mode", "single").unwrap();
        assert_eq!(store.get("input_mode").unwrap().as_deref(), Some("single"));

        store.set("input_mode", "multiline").unwrap();
        assert_eq!(
            store.get("input_mode").unwrap().as_deref(),
            Some("multiline")
        );

        store.remove("input_mode").unwrap();
        store.remove("input_mode").unwrap();
        assert_eq!(store.get("input_mode").unwrap(), None);
    }

    #[test]
    fn test_sqlite_get_set_remove() {
        exercise(&SqliteKeyValueStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_memory_get_set_remove() {
        exercise(&MemoryKeyValueStore::new());
    }

    #[test]
    fn test_sqlite_values_survive_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("thoughts.db");

        {
            let store = SqliteKeyValueStore::open(&path).unwrap();
            set_json(&store, "feature_flags", &vec!["geocoding"]).unwrap();
        }

        let store = SqliteKeyValueStore::open(&path).unwrap();
        let flags: Option<Vec<String>> = get_json(&store, "feature_flags").unwrap();
        assert_eq!(flags, Some(vec!["geocoding".to_string()]));
    }

    #[test]
    fn test_get_json_reports_corrupt_values() {
        let store = MemoryKeyValueStore::new();
        store.set("thoughts", "{not json").unwrap();
        let result: Result<Option<Vec<String>>> = get_json(&store, "thoughts");
        assert!(matches!(result, Err(Error::Serialization(_))));
    }
}
