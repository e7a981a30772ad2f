//! Blob stores - byte-level key/value persistence for model caches.

mod in_memory;
#[cfg(feature = "file-store")]
mod file;

use std::sync::Arc;

use crate::error::StoreError;

pub use in_memory::InMemoryBlobStore;
#[cfg(feature = "file-store")]
pub use file::FileBlobStore;

/// Trait for blob persistence. One blob per key (latest wins).
pub trait BlobStore: Send + Sync {
    /// Load the blob stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Save (or overwrite) the blob under `key`.
    fn set(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Delete the blob under `key`. Returns true if one existed.
    fn remove(&self, key: &str) -> Result<bool, StoreError>;
}

impl<S: BlobStore + ?Sized> BlobStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        (**self).set(key, bytes)
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        (**self).remove(key)
    }
}
