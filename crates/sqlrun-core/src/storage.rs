//! Whole-value key/value storage.
//!
//! Values are opaque strings replaced wholesale on every write; there is no
//! field-level update. `MemoryStorage` lives as long as the process (one
//! console session) and `FileStorage` persists across runs.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    #[error("storage io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value under `key`.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.lock().remove(key);
        Ok(())
    }
}

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStorage { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_err(&path)(err)),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;
        // Write aside and rename so readers only ever see a complete value.
        // Every write gets its own temp file, even between instances.
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .dir
            .join(format!(".{key}.{}.{seq}.tmp", std::process::id()));
        fs::write(&tmp, value.as_bytes()).map_err(io_err(&tmp))?;
        let renamed = match fs::rename(&tmp, &path) {
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::PermissionDenied | io::ErrorKind::AlreadyExists
                ) =>
            {
                // Windows refuses to rename over an existing file.
                let _ = fs::remove_file(&path);
                fs::rename(&tmp, &path)
            }
            other => other,
        };
        if let Err(err) = renamed {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(&path)(err));
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_err(&path)(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_replaces_and_removes() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("k").unwrap(), None);
        storage.set_item("k", "one").unwrap();
        storage.set_item("k", "two").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("two"));
        storage.remove_item("k").unwrap();
        storage.remove_item("k").unwrap();
        assert_eq!(storage.get_item("k").unwrap(), None);
    }

    #[test]
    fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("state");
        FileStorage::new(&nested)
            .set_item("sqlQueryHistory", "[1,2]")
            .unwrap();

        let reopened = FileStorage::new(&nested);
        assert_eq!(
            reopened.get_item("sqlQueryHistory").unwrap().as_deref(),
            Some("[1,2]")
        );
        assert!(nested.join("sqlQueryHistory.json").exists());

        let leftovers: Vec<_> = fs::read_dir(&nested)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn concurrent_instances_never_share_a_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let writers: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|tag| {
                let storage = FileStorage::new(dir.path());
                std::thread::spawn(move || {
                    (0..500)
                        .filter(|i| {
                            storage
                                .set_item("sqlQueryHistory", &format!("{tag}{i}"))
                                .is_err()
                        })
                        .count()
                })
            })
            .collect();
        let failures: usize = writers.into_iter().map(|w| w.join().unwrap()).sum();
        assert_eq!(failures, 0);

        let value = FileStorage::new(dir.path())
            .get_item("sqlQueryHistory")
            .unwrap()
            .unwrap();
        assert!(value == "a499" || value == "b499", "{value}");
        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    #[cfg(unix)]
    fn failed_rename_leaves_target_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let target = dir.path().join("blocked.json");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("inner"), "x").unwrap();

        assert!(matches!(
            storage.set_item("blocked", "new"),
            Err(StorageError::Io { .. })
        ));
        assert!(target.join("inner").exists());
        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn file_storage_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.remove_item("missing").unwrap();
        storage.set_item("present", "x").unwrap();
        storage.remove_item("present").unwrap();
        storage.remove_item("present").unwrap();
        assert_eq!(storage.get_item("present").unwrap(), None);
    }

    #[test]
    fn file_storage_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        for key in ["", "../escape", ".hidden", "a/b"] {
            assert!(matches!(
                storage.set_item(key, "x"),
                Err(StorageError::InvalidKey(_))
            ));
        }
    }
}
