// Key/value persistence used by the record store
// Values are opaque strings; the file backend keeps one file per key under the data dir

use anyhow::{Context, Result};
use fs2::FileExt;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage key `{0}`")]
    InvalidKey(String),
    #[error("failed to write value for `{key}`")]
    Write {
        key: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("storage refused write for `{0}`")]
    Rejected(String),
}

/// Persistence primitive: get with default, set
pub trait KeyValueStore {
    /// Value stored under `key`, or `default` when absent or unreadable
    fn get(&self, key: &str, default: &str) -> String;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Volatile store for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: RefCell<HashMap<String, String>>,
    writes: Cell<usize>,
    fail_writes: Cell<bool>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a raw value without counting it as a write
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    /// Number of successful `set` calls
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    /// Makes every following `set` fail with `StorageError::Rejected`
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str, default: &str) -> String {
        self.values
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.get() {
            return Err(StorageError::Rejected(key.to_string()));
        }
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

/// File-backed store: `<dir>/<key>.json`, written under an exclusive lock
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`
    pub fn value_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{}.lock", key))
    }

    fn write_locked(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create storage directory: {}", self.dir.display()))?;

        let lock_path = self.lock_path(key);
        let lock = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

        lock.lock_exclusive()
            .with_context(|| format!("Failed to acquire exclusive lock for `{}`", key))?;

        let path = self.dir.join(format!("{}.json", key));
        replace_file(&path, value)?;

        // Lock is released when `lock` is dropped
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str, default: &str) -> String {
        let path = match self.value_path(key) {
            Ok(path) => path,
            Err(e) => {
                log::error!(target: crate::LOG_TARGET, "{}", e);
                return default.to_string();
            }
        };

        match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => default.to_string(),
            Err(e) => {
                log::error!(
                    target: crate::LOG_TARGET,
                    "Failed to read {}: {}",
                    path.display(),
                    e
                );
                default.to_string()
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.write_locked(key, value)
            .map_err(|source| StorageError::Write {
                key: key.to_string(),
                source,
            })
    }
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Replaces `path` with `contents` through a synced staging file in the same
/// directory. Readers see the old contents or the new, never a mix. The staging
/// file is removed if anything fails.
pub fn replace_file(path: &Path, contents: &str) -> Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("Invalid path: {}", path.display()))?;
    let name = path
        .file_name()
        .with_context(|| format!("Invalid path: {}", path.display()))?;
    let staging = dir.join(format!(
        ".{}.{}.partial",
        name.to_string_lossy(),
        std::process::id()
    ));

    let replaced = write_synced(&staging, contents).and_then(|()| fs::rename(&staging, path));
    if let Err(e) = replaced {
        let _ = fs::remove_file(&staging);
        return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
    }
    Ok(())
}

fn write_synced(path: &Path, contents: &str) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}
