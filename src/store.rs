//! Persistent key-value storage for progress, custom parts and saved builds.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io failed for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed stored value: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKeys {
    pub progress: String,
    pub custom_parts: String,
    pub saved_builds: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            progress: "drone_builder_progress_v1".to_string(),
            custom_parts: "drone_builder_custom_parts_v1".to_string(),
            saved_builds: "drone_builder_saved_builds_v1".to_string(),
        }
    }
}

pub fn parse<T: DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    Ok(serde_json::from_str(raw)?)
}

/// Reads and parses `key`, or `None` when it is missing, unreadable or corrupt.
pub fn load_optional<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, "storage read failed, using default: {e}");
            return None;
        }
    };
    match parse(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, "discarding corrupt stored value: {e}");
            None
        }
    }
}

pub fn load_or_default<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    load_optional(store, key).unwrap_or_default()
}

pub fn persist<T: Serialize + ?Sized>(store: &mut dyn KeyValueStore, key: &str, value: &T) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(key, "failed to serialize value for storage: {e}");
            return;
        }
    };
    if let Err(e) = store.set(key, &raw) {
        tracing::warn!(key, "storage write failed: {e}");
    }
}

pub fn forget(store: &mut dyn KeyValueStore, key: &str) {
    if let Err(e) = store.remove(key) {
        tracing::warn!(key, "storage remove failed: {e}");
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum Record<T> {
    Parsed(T),
    Raw(serde_json::Value),
}

/// A stored JSON array read element by element.
/// Unparseable elements are written back untouched.
#[derive(Debug, Clone)]
pub struct RecordList<T> {
    records: Vec<Record<T>>,
}

impl<T: DeserializeOwned + Serialize> RecordList<T> {
    pub fn load(store: &dyn KeyValueStore, key: &str) -> Self {
        let values: Vec<serde_json::Value> = load_or_default(store, key);
        let records = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| match serde_json::from_value(value.clone()) {
                Ok(parsed) => Record::Parsed(parsed),
                Err(e) => {
                    tracing::warn!(key, index, "skipping unreadable stored record: {e}");
                    Record::Raw(value)
                }
            })
            .collect();
        Self { records }
    }

    pub fn into_parsed(self) -> Vec<T> {
        self.records
            .into_iter()
            .filter_map(|r| match r {
                Record::Parsed(item) => Some(item),
                Record::Raw(_) => None,
            })
            .collect()
    }

    pub fn prepend(&mut self, item: T) {
        self.records.insert(0, Record::Parsed(item));
    }

    /// Removes every parsed record matching `pred`, returning the first.
    pub fn remove_where(&mut self, pred: impl Fn(&T) -> bool) -> Option<T> {
        let idx = self
            .records
            .iter()
            .position(|r| matches!(r, Record::Parsed(item) if pred(item)))?;
        let removed = match self.records.remove(idx) {
            Record::Parsed(item) => item,
            Record::Raw(_) => return None,
        };
        self.records
            .retain(|r| !matches!(r, Record::Parsed(item) if pred(item)));
        Some(removed)
    }

    pub fn persist(&self, store: &mut dyn KeyValueStore, key: &str) {
        persist(store, key, &self.records);
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_raw(&mut self, key: impl AsRef<str>, raw: impl Into<String>) {
        self.values.insert(key.as_ref().to_string(), raw.into());
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    fn io_error(key: &str, source: std::io::Error) -> StoreError {
        StoreError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root).map_err(|e| Self::io_error(key, e))?;
        let tmp = self.root.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value).map_err(|e| Self::io_error(key, e))?;
        fs::rename(&tmp, &path).map_err(|e| Self::io_error(key, e))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }
}
