//! Single-slot key/value backends for context snapshots.

use super::error::PersistenceError;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A durable store holding one JSON document per key.
pub trait Storage: Send + Sync {
    /// Read the document stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Replace the document stored under `key`.
    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    /// Remove the document stored under `key`. Missing keys are not an error.
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// In-process storage. Clones share the same slots.
///
/// # Example
///
/// ```rust
/// use waypoint::persistence::{MemoryStorage, Storage};
///
/// let storage = MemoryStorage::new();
/// let handle = storage.clone();
///
/// storage.write("dsnap-registration", "{}").unwrap();
/// assert_eq!(handle.read("dsnap-registration").unwrap().as_deref(), Some("{}"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let slots = self.slots.lock().map_err(|_| PersistenceError::Poisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut slots = self.slots.lock().map_err(|_| PersistenceError::Poisoned)?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let mut slots = self.slots.lock().map_err(|_| PersistenceError::Poisoned)?;
        slots.remove(key);
        Ok(())
    }
}

/// Storage backed by `<dir>/<key>.json` files.
///
/// Writes go to a temp file first and are renamed into place, so a crash
/// mid-write never leaves a truncated snapshot behind.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

fn io_error(key: &str) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io {
        key: key.to_string(),
        source,
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(io_error(key)(error)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir).map_err(io_error(key))?;

        // Atomic write: write to temp file, then rename
        let path = self.path(key);
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, value).map_err(io_error(key))?;
        fs::rename(&temp_path, &path).map_err(io_error(key))
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match fs::remove_file(self.path(key)) {
            Err(error) if error.kind() != ErrorKind::NotFound => Err(io_error(key)(error)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("waypoint-{name}-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn memory_storage_round_trips_and_removes() {
        let storage = MemoryStorage::new();

        assert_eq!(storage.read("k").unwrap(), None);
        storage.write("k", "{\"step\":1}").unwrap();
        assert_eq!(storage.read("k").unwrap().as_deref(), Some("{\"step\":1}"));
        storage.remove("k").unwrap();
        assert_eq!(storage.read("k").unwrap(), None);
        storage.remove("k").unwrap();
    }

    #[test]
    fn memory_storage_clones_share_slots() {
        let storage = MemoryStorage::new();
        let other = storage.clone();

        other.write("k", "1").unwrap();

        assert_eq!(storage.read("k").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn file_storage_writes_one_file_per_key() {
        let dir = scratch_dir("file");
        let storage = FileStorage::new(&dir);

        assert_eq!(storage.read("dsnap-registration").unwrap(), None);
        storage.write("dsnap-registration", "{}").unwrap();

        assert!(dir.join("dsnap-registration.json").exists());
        assert!(!dir.join("dsnap-registration.json.tmp").exists());
        assert_eq!(
            storage.read("dsnap-registration").unwrap().as_deref(),
            Some("{}")
        );

        storage.remove("dsnap-registration").unwrap();
        storage.remove("dsnap-registration").unwrap();
        assert_eq!(storage.read("dsnap-registration").unwrap(), None);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn file_storage_overwrites_in_place() {
        let dir = scratch_dir("overwrite");
        let storage = FileStorage::new(&dir);

        storage.write("k", "1").unwrap();
        storage.write("k", "2").unwrap();

        assert_eq!(storage.read("k").unwrap().as_deref(), Some("2"));
        fs::remove_dir_all(&dir).ok();
    }
}
