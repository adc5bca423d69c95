//! File-backed key-value storage (feature-gated).

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::RwLock,
};

use vigil_core::{KeyValueStorage, StorageError};

/// Durable storage in a single JSON document.
///
/// Every write goes straight to disk through a temporary file that is then
/// renamed over the document, so a crash never leaves a half-written file.
/// Values survive process restarts.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    slots: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the document at `path`.
    ///
    /// # Errors
    /// Returns error if an existing document cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let slots: BTreeMap<String, String> = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), entries = slots.len(), "Opened file storage");

        Ok(Self {
            path,
            slots: RwLock::new(slots),
        })
    }

    /// Open the document at the platform default location.
    ///
    /// # Errors
    /// Returns error if there is no data directory or the document is
    /// unreadable.
    pub fn open_default() -> Result<Self, StorageError> {
        let path = Self::default_path()
            .ok_or_else(|| StorageError::Internal("No platform data directory".to_string()))?;
        Self::open(path)
    }

    /// `<data dir>/vigil/storage.json`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("vigil").join("storage.json"))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, slots: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(slots)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn modify(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> Result<(), StorageError> {
        let mut slots = self
            .slots
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        let mut next = slots.clone();
        if f(&mut next) {
            // Disk first, so memory never runs ahead of the document.
            self.persist(&next)?;
            *slots = next;
        }
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .slots
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.modify(|slots| {
            slots.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.modify(|slots| slots.remove(key).is_some())
    }
}
