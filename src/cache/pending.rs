use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::blob::BlobStore;
use crate::error::PersistError;

use super::encoding::CacheSnapshot;

/// Handle to a save running on a background thread.
///
/// The snapshot was taken when the save was started; later cache mutations
/// are not part of it. Dropping the handle lets the save finish unobserved.
pub struct PendingSave {
    cache: String,
    result_rx: Receiver<Result<(), PersistError>>,
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    timeout: Option<Duration>,
}

impl PendingSave {
    pub(crate) fn spawn(
        cache: String,
        snapshot: CacheSnapshot,
        store: Arc<dyn BlobStore>,
        timeout: Option<Duration>,
    ) -> Self {
        let (result_tx, result_rx) = channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let name = cache.clone();

        let handle = thread::spawn(move || {
            let result = write_in_background(&name, &snapshot, store.as_ref(), &flag);
            let _ = result_tx.send(result);
        });

        Self {
            cache,
            result_rx,
            cancelled,
            handle: Some(handle),
            timeout,
        }
    }

    pub fn cache(&self) -> &str {
        &self.cache
    }

    /// True once the worker has finished, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Block until the save completes, bounded by the cache's
    /// `save_timeout` when one is configured.
    pub fn wait(self) -> Result<(), PersistError> {
        match self.timeout {
            Some(timeout) => self.wait_timeout(timeout),
            None => {
                let result = self.result_rx.recv().unwrap_or_else(|_| {
                    Err(PersistError::WorkerLost {
                        cache: self.cache.clone(),
                    })
                });
                self.join();
                result
            }
        }
    }

    /// Block for at most `timeout`. On timeout the save keeps running in the
    /// background.
    pub fn wait_timeout(self, timeout: Duration) -> Result<(), PersistError> {
        match self.result_rx.recv_timeout(timeout) {
            Ok(result) => {
                self.join();
                result
            }
            Err(RecvTimeoutError::Timeout) => Err(PersistError::Timeout {
                cache: self.cache.clone(),
                millis: timeout.as_millis(),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(PersistError::WorkerLost {
                cache: self.cache.clone(),
            }),
        }
    }

    /// Ask the worker to skip the write and wait for its answer. Returns
    /// `Ok(())` if the blob was already written.
    pub fn cancel(self) -> Result<(), PersistError> {
        self.cancelled.store(true, Ordering::SeqCst);
        let result = self.result_rx.recv().unwrap_or_else(|_| {
            Err(PersistError::WorkerLost {
                cache: self.cache.clone(),
            })
        });
        self.join();
        result
    }

    fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for PendingSave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingSave")
            .field("cache", &self.cache)
            .field("finished", &self.is_finished())
            .finish()
    }
}

fn write_in_background(
    cache: &str,
    snapshot: &CacheSnapshot,
    store: &dyn BlobStore,
    cancelled: &AtomicBool,
) -> Result<(), PersistError> {
    let cancelled_err = || PersistError::Cancelled {
        cache: cache.to_string(),
    };
    if cancelled.load(Ordering::SeqCst) {
        return Err(cancelled_err());
    }
    let bytes = snapshot.to_bytes().map_err(|message| PersistError::Encode {
        cache: cache.to_string(),
        message,
    })?;
    if cancelled.load(Ordering::SeqCst) {
        debug!(cache, "background save cancelled before write");
        return Err(cancelled_err());
    }
    store.set(cache, bytes).map_err(|source| PersistError::Store {
        cache: cache.to_string(),
        source,
    })?;
    debug!(cache, models = snapshot.models.len(), "cache saved in background");
    Ok(())
}
