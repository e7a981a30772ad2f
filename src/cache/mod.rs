//! Model cache - a per-type dictionary of models keyed by id.
//!
//! Every mutation emits a [`CacheEvent`] through a [`DataBind`] bus. The
//! dictionary persists as one blob per cache in a [`BlobStore`], under the
//! key `model_name + cache_id`.
//!
//! ## Example
//!
//! ```ignore
//! use jsonapi_rust::{CacheEvent, ModelCache};
//!
//! let cache = ModelCache::<Article>::in_memory();
//! let _sub = cache.subscribe(|event| {
//!     if let CacheEvent::Added(article) = event {
//!         println!("new article {}", article.id());
//!     }
//! });
//! cache.add(article);
//! cache.save()?;
//! ```

mod encoding;
mod event;
mod pending;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::blob::{BlobStore, InMemoryBlobStore};
use crate::data_bind::{DataBind, Subscription};
use crate::error::PersistError;
use crate::model::{Model, Shared};

pub use encoding::{CacheSnapshot, EncodedModel, SNAPSHOT_FORMAT};
pub use event::CacheEvent;
pub use pending::PendingSave;

/// Cache configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Appended to the model name to form the storage key, so one model type
    /// can have several independent caches.
    pub cache_id: String,
    /// Upper bound for [`PendingSave::wait`].
    pub save_timeout: Option<Duration>,
}

impl CacheOptions {
    pub fn with_cache_id(mut self, cache_id: impl Into<String>) -> Self {
        self.cache_id = cache_id.into();
        self
    }

    pub fn with_save_timeout(mut self, timeout: Duration) -> Self {
        self.save_timeout = Some(timeout);
        self
    }
}

/// Result of [`ModelCache::load`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No blob was stored; the dictionary is unchanged.
    Missing,
    /// The dictionary was replaced with this many models.
    Loaded(usize),
}

struct State<M> {
    entries: HashMap<String, Shared<M>>,
    pending: VecDeque<CacheEvent<M>>,
    dispatching: bool,
    // Ids whose `Deleted` is queued but not yet erased.
    removing: HashSet<String>,
}

struct Inner<M> {
    state: Mutex<State<M>>,
    events: DataBind<CacheEvent<M>>,
    store: Arc<dyn BlobStore>,
    options: CacheOptions,
}

/// Per-type model dictionary with change events and blob persistence.
///
/// Cloning shares the same dictionary, listeners and store.
///
/// Events are delivered in mutation order on the thread that drains the
/// queue. A listener may mutate the cache it listens to; the resulting event
/// is delivered after the current callback returns.
pub struct ModelCache<M> {
    inner: Arc<Inner<M>>,
}

impl<M> Clone for ModelCache<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Model> ModelCache<M> {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self::with_options(store, CacheOptions::default())
    }

    pub fn with_options(store: Arc<dyn BlobStore>, options: CacheOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    entries: HashMap::new(),
                    pending: VecDeque::new(),
                    dispatching: false,
                    removing: HashSet::new(),
                }),
                events: DataBind::new(CacheEvent::None),
                store,
                options,
            }),
        }
    }

    /// A cache backed by a private [`InMemoryBlobStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBlobStore::new()))
    }

    /// Storage key: model name followed by the cache id.
    pub fn cache_name(&self) -> String {
        format!("{}{}", M::MODEL_NAME, self.inner.options.cache_id)
    }

    pub fn options(&self) -> &CacheOptions {
        &self.inner.options
    }

    pub fn store(&self) -> Arc<dyn BlobStore> {
        Arc::clone(&self.inner.store)
    }

    fn state(&self) -> MutexGuard<'_, State<M>> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite by id. Returns true when the id was new.
    pub fn add(&self, model: M) -> bool {
        self.add_shared(Shared::new(model))
    }

    /// Like [`add`](Self::add) for an instance that is already shared, such
    /// as one returned by document parsing.
    pub fn add_shared(&self, model: Shared<M>) -> bool {
        let id = model.id();
        let fresh = {
            let mut state = self.state();
            let fresh = state.entries.insert(id.clone(), model.clone()).is_none();
            let event = if fresh {
                CacheEvent::Added(model)
            } else {
                CacheEvent::Updated(model)
            };
            state.pending.push_back(event);
            fresh
        };
        trace!(cache = %self.cache_name(), id = %id, fresh, "model stored");
        self.dispatch();
        fresh
    }

    /// Add each model in turn, one event per model. Returns how many ids
    /// were new.
    pub fn add_many(&self, models: impl IntoIterator<Item = M>) -> usize {
        models
            .into_iter()
            .map(|m| self.add(m))
            .filter(|fresh| *fresh)
            .count()
    }

    pub fn add_many_shared(&self, models: impl IntoIterator<Item = Shared<M>>) -> usize {
        models
            .into_iter()
            .map(|m| self.add_shared(m))
            .filter(|fresh| *fresh)
            .count()
    }

    /// Remove by id. `Deleted` is emitted before the entry is erased, so a
    /// listener outside a callback chain still finds it in the cache. An
    /// unknown id, or one already being removed by another call, is a
    /// no-op.
    pub fn remove(&self, id: &str) -> Option<Shared<M>> {
        let removed = {
            let mut state = self.state();
            if state.removing.contains(id) {
                return None;
            }
            let model = state.entries.get(id).cloned()?;
            state.removing.insert(id.to_string());
            state.pending.push_back(CacheEvent::Deleted(model.clone()));
            model
        };
        self.dispatch();

        let mut state = self.state();
        state.removing.remove(id);
        if state
            .entries
            .get(id)
            .is_some_and(|current| current.ptr_eq(&removed))
        {
            state.entries.remove(id);
        }
        trace!(cache = %self.cache_name(), id, "model removed");
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<Shared<M>> {
        self.state().entries.get(id).cloned()
    }

    /// Every cached model, in no particular order.
    pub fn get_all(&self) -> Vec<Shared<M>> {
        self.state().entries.values().cloned().collect()
    }

    pub fn get_all_as_map(&self) -> HashMap<String, Shared<M>> {
        self.state().entries.clone()
    }

    /// Models for which `predicate` holds.
    pub fn find(&self, predicate: impl Fn(&M) -> bool) -> Vec<Shared<M>> {
        self.get_all()
            .into_iter()
            .filter(|model| predicate(&*model.read()))
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state().entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Listen for every future event. No replay.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&CacheEvent<M>) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(listener)
    }

    /// The most recently delivered event.
    pub fn last_event(&self) -> CacheEvent<M> {
        self.inner.events.get()
    }

    /// Empty the dictionary. In memory only; nothing is emitted or saved.
    pub fn clear(&self) {
        self.state().entries.clear();
    }

    /// Write the whole dictionary to the blob store.
    pub fn save(&self) -> Result<(), PersistError> {
        let cache = self.cache_name();
        let snapshot = self.snapshot();
        let bytes = snapshot.to_bytes().map_err(|message| PersistError::Encode {
            cache: cache.clone(),
            message,
        })?;
        self.inner
            .store
            .set(&cache, bytes)
            .map_err(|source| PersistError::Store {
                cache: cache.clone(),
                source,
            })?;
        debug!(cache = %cache, models = snapshot.models.len(), "cache saved");
        Ok(())
    }

    /// Snapshot now, write on a background thread.
    pub fn save_async(&self) -> PendingSave {
        PendingSave::spawn(
            self.cache_name(),
            self.snapshot(),
            Arc::clone(&self.inner.store),
            self.inner.options.save_timeout,
        )
    }

    /// Replace the dictionary with the stored blob.
    ///
    /// A missing blob leaves the dictionary as it is. A corrupt blob also
    /// leaves it as it is and is reported as a recoverable
    /// [`PersistError::Decode`].
    pub fn load(&self) -> Result<LoadOutcome, PersistError> {
        let cache = self.cache_name();
        let stored = self
            .inner
            .store
            .get(&cache)
            .map_err(|source| PersistError::Store {
                cache: cache.clone(),
                source,
            })?;
        let Some(bytes) = stored else {
            debug!(cache = %cache, "no saved blob");
            return Ok(LoadOutcome::Missing);
        };

        let snapshot = CacheSnapshot::from_bytes(&bytes).map_err(|message| {
            warn!(cache = %cache, error = %message, "saved cache is unreadable, keeping current contents");
            PersistError::Decode {
                cache: cache.clone(),
                message,
            }
        })?;

        let entries: HashMap<String, Shared<M>> = snapshot
            .restore::<M>()
            .into_iter()
            .map(|(id, model)| (id, Shared::new(model)))
            .collect();
        let count = entries.len();
        self.state().entries = entries;
        debug!(cache = %cache, models = count, "cache loaded");
        Ok(LoadOutcome::Loaded(count))
    }

    fn snapshot(&self) -> CacheSnapshot {
        // Models are read after the dictionary lock is released.
        let entries: Vec<(String, Shared<M>)> = self
            .state()
            .entries
            .iter()
            .map(|(id, model)| (id.clone(), model.clone()))
            .collect();
        CacheSnapshot::capture(entries.iter().map(|(id, model)| (id, model)))
    }

    /// Drain queued events. Only one caller drains at a time; reentrant or
    /// concurrent callers leave their events to the active drainer.
    fn dispatch(&self) {
        {
            let mut state = self.state();
            if state.dispatching {
                return;
            }
            state.dispatching = true;
        }
        let mut guard = DispatchGuard {
            cache: self,
            armed: true,
        };

        loop {
            let next = {
                let mut state = self.state();
                match state.pending.pop_front() {
                    Some(event) => event,
                    None => {
                        state.dispatching = false;
                        guard.armed = false;
                        break;
                    }
                }
            };
            self.inner.events.set(next);
        }
    }
}

// Releases the drain flag if a listener panics mid-dispatch.
struct DispatchGuard<'a, M: Model> {
    cache: &'a ModelCache<M>,
    armed: bool,
}

impl<M: Model> Drop for DispatchGuard<'_, M> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.state().dispatching = false;
        }
    }
}

impl<M: Model> std::fmt::Debug for ModelCache<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("cache", &self.cache_name())
            .field("len", &self.len())
            .finish()
    }
}
