use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::error::StoreError;

use super::BlobStore;

/// Blob store persisted to a single JSON file mapping key to base64 blob.
///
/// Every write rewrites the whole file through a sibling temp file and a
/// rename. Cloning shares the same file lock.
#[derive(Clone, Debug)]
pub struct FileBlobStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileBlobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text).map_err(|e| StoreError::Format(e.to_string()))
    }

    fn write_all(&self, blobs: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let text =
            serde_json::to_string_pretty(blobs).map_err(|e| StoreError::Format(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), blobs = blobs.len(), "blob file written");
        Ok(())
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StoreError::LockPoisoned("blob file read"))?;
        match self.read_all()?.get(key) {
            Some(encoded) => STANDARD
                .decode(encoded)
                .map(Some)
                .map_err(|e| StoreError::Format(format!("blob `{key}`: {e}"))),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StoreError::LockPoisoned("blob file write"))?;
        let mut blobs = self.read_all()?;
        blobs.insert(key.to_string(), STANDARD.encode(bytes));
        self.write_all(&blobs)
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StoreError::LockPoisoned("blob file write"))?;
        let mut blobs = self.read_all()?;
        if blobs.remove(key).is_none() {
            return Ok(false);
        }
        self.write_all(&blobs)?;
        Ok(true)
    }
}
