//! Durable key-value stores.
//!
//! The workspace repository persists exactly one key. Any backend that can read and overwrite a
//! string value by key satisfies [`KeyValueStore`]; a missing key reads as `None`, never as an
//! error.

use crate::validation::validate_store_key;
use crate::{WorkspaceError, WorkspaceResult};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub trait KeyValueStore {
    /// Returns the stored value, or `None` if the key has never been written.
    fn read(&self, key: &str) -> WorkspaceResult<Option<String>>;

    /// Overwrites the value stored under `key`.
    fn write(&mut self, key: &str, value: &str) -> WorkspaceResult<()>;
}

/// File-backed store: each key lives in `<root>/<key>.json`.
///
/// Writes go to a sibling temporary file which is then renamed over the target, so a reader
/// never observes a half-written value.
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// The directory is created on first write, not here.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> WorkspaceResult<PathBuf> {
        validate_store_key(key)?;
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> WorkspaceResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WorkspaceError::StoreRead(e)),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> WorkspaceResult<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root).map_err(WorkspaceError::StoreWrite)?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(WorkspaceError::StoreWrite)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(WorkspaceError::StoreWrite(e));
        }

        tracing::debug!("wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }
}

/// In-process store for tests and throwaway sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with one entry.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut store = Self::new();
        store.entries.insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> WorkspaceResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> WorkspaceResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
