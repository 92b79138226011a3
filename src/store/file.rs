//! File-backed persistent store.
//!
//! The whole store is a single JSON object of string values. Every operation
//! reloads the file. Mutations hold an exclusive advisory lock on a sidecar
//! `.lock` file for the whole read-modify-write and replace the data file
//! through a uniquely named temp file and a rename, so independent handles
//! on the same path, in this process or another, never lose each other's
//! writes to other keys.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{check_quota, item_size, KeyValueStore, DEFAULT_QUOTA_BYTES};
use crate::error::StoreError;

type Items = BTreeMap<String, String>;

// == File Store ==
/// Persistent store kept in one JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Directory holding the data file, its temp files and its lock file
    dir: PathBuf,
    lock_path: PathBuf,
    quota: usize,
}

impl FileStore {
    // == Constructor ==
    /// Opens the store at `path` with the default quota.
    ///
    /// A missing file is an empty store; its parent directory is created.
    /// An unreadable store file is treated as empty until the next write
    /// replaces it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with_quota(path, DEFAULT_QUOTA_BYTES)
    }

    /// Opens the store at `path`, holding at most `quota` bytes.
    pub fn open_with_quota(path: impl Into<PathBuf>, quota: usize) -> Result<Self, StoreError> {
        let path = path.into();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store".to_string());
        let lock_path = dir.join(format!(".{}.lock", file_name));

        let store = Self {
            path,
            dir,
            lock_path,
            quota,
        };
        let items = load(&store.path)?;
        debug!(path = %store.path.display(), items = items.len(), "Opened file store");
        Ok(store)
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Takes the exclusive cross-handle lock; released when the file is dropped.
    fn lock(&self) -> Result<File, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        file.lock_exclusive()?;
        Ok(file)
    }

    fn persist(&self, items: &Items) -> Result<(), StoreError> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&serde_json::to_vec(items)?)?;
        tmp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }

    /// Runs one locked read-modify-write cycle, persisting when `apply` reports a change.
    fn update<F>(&self, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Items) -> Result<bool, StoreError>,
    {
        let _lock = self.lock()?;
        let mut items = load(&self.path)?;
        if apply(&mut items)? {
            self.persist(&items)?;
        }
        Ok(())
    }
}

/// Reads the backing file; a missing, empty or malformed file is an empty store.
fn load(path: &Path) -> Result<Items, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Items::new()),
        Err(err) => return Err(err.into()),
    };
    if bytes.is_empty() {
        return Ok(Items::new());
    }

    match serde_json::from_slice(&bytes) {
        Ok(items) => Ok(items),
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "Store file is malformed, treating it as empty"
            );
            Ok(Items::new())
        }
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(load(&self.path)?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|items| {
            let current = items.iter().map(|(k, v)| item_size(k, v)).sum();
            check_quota(current, items.get(key).map(String::as_str), key, value, self.quota)?;
            items.insert(key.to_string(), value.to_string());
            Ok(true)
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.update(|items| Ok(items.remove(key).is_some()))
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(load(&self.path)?.into_keys().collect())
    }
}
