//! Persistent local key-value storage.
//!
//! Stands in for the browser's `localStorage`: string keys, string values,
//! one namespace per process. All writes go through a single mutex, and
//! [`KeyValueStore::update`] holds it across the whole read-modify-write.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::core::error::StorageError;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Computes the new value for `key` from the current one and stores it as a
    /// single step. `f` returning `None` deletes the key. Returns what was stored.
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&str>) -> Option<String>,
    ) -> Result<Option<String>, StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&str>) -> Option<String>,
    ) -> Result<Option<String>, StorageError> {
        let mut entries = self.entries.lock();

        let next = f(entries.get(key).map(String::as_str));

        match &next {
            Some(value) => {
                entries.insert(key.to_string(), value.clone());
            }
            None => {
                entries.remove(key);
            }
        }

        Ok(next)
    }
}

/// Map persisted as one JSON object on disk. Every write replaces the file
/// through a temp file and a rename, so a crash never leaves it half-written.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let entries = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => HashMap::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(source) => return Err(StorageError::IO { path, source }),
        };

        tracing::debug!("Opened storage at {:?} with {} keys", path, entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let io_error = |source| StorageError::IO {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_error)?;
            }
        }

        let contents = serde_json::to_string(entries)?;
        let tmp = self.path.with_extension("tmp");

        fs::write(&tmp, contents).map_err(io_error)?;
        fs::rename(&tmp, &self.path).map_err(io_error)?;

        Ok(())
    }

    /// Applies `next` to `key` and persists, restoring the previous value when
    /// the write fails so memory and disk stay in step.
    fn apply(
        &self,
        entries: &mut HashMap<String, String>,
        key: &str,
        next: Option<String>,
    ) -> Result<(), StorageError> {
        let previous = match next {
            Some(value) => entries.insert(key.to_string(), value),
            None => entries.remove(key),
        };

        if let Err(e) = self.persist(entries) {
            match previous {
                Some(value) => entries.insert(key.to_string(), value),
                None => entries.remove(key),
            };
            return Err(e);
        }

        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        self.apply(&mut entries, key, Some(value))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();

        if !entries.contains_key(key) {
            return Ok(());
        }

        self.apply(&mut entries, key, None)
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&str>) -> Option<String>,
    ) -> Result<Option<String>, StorageError> {
        let mut entries = self.entries.lock();

        let next = f(entries.get(key).map(String::as_str));
        self.apply(&mut entries, key, next.clone())?;

        Ok(next)
    }
}
