//! Multi-type cache registry.
//!
//! Holds one [`ModelCache`] per registered model type, all persisting into a
//! shared [`BlobStore`] under their model name. Constructed explicitly by the
//! application and passed to whatever needs it.
//!
//! Using a type that was never registered is a programmer error and panics.

use std::any::Any;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::debug;

use crate::blob::{BlobStore, InMemoryBlobStore};
use crate::cache::{LoadOutcome, ModelCache};
use crate::error::PersistError;
use crate::model::{Model, Shared};

trait AnyCache: Send + Sync {
    fn model_name(&self) -> &'static str;
    fn save(&self) -> Result<(), PersistError>;
    fn load(&self) -> Result<LoadOutcome, PersistError>;
    fn clear(&self);
    fn as_any(&self) -> &dyn Any;
}

impl<M: Model> AnyCache for ModelCache<M> {
    fn model_name(&self) -> &'static str {
        M::MODEL_NAME
    }

    fn save(&self) -> Result<(), PersistError> {
        ModelCache::save(self)
    }

    fn load(&self) -> Result<LoadOutcome, PersistError> {
        ModelCache::load(self)
    }

    fn clear(&self) {
        ModelCache::clear(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Registry of model caches keyed by model name.
///
/// Clone-friendly (cloning shares the same caches).
#[derive(Clone)]
pub struct CacheRegistry {
    store: Arc<dyn BlobStore>,
    caches: Arc<RwLock<Vec<Arc<dyn AnyCache>>>>,
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryBlobStore::new()))
    }
}

impl CacheRegistry {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            caches: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn caches(&self) -> RwLockReadGuard<'_, Vec<Arc<dyn AnyCache>>> {
        self.caches.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn all(&self) -> Vec<Arc<dyn AnyCache>> {
        self.caches().iter().cloned().collect()
    }

    fn lookup<M: Model>(caches: &[Arc<dyn AnyCache>]) -> Option<ModelCache<M>> {
        let entry = caches.iter().find(|c| c.model_name() == M::MODEL_NAME)?;
        match entry.as_any().downcast_ref::<ModelCache<M>>() {
            Some(cache) => Some(cache.clone()),
            None => panic!(
                "model name `{}` is already registered for a different type",
                M::MODEL_NAME
            ),
        }
    }

    /// Register `M`. Registering twice returns the existing cache.
    pub fn register<M: Model>(&self) -> ModelCache<M> {
        let mut caches = self.caches.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = Self::lookup::<M>(&caches) {
            return existing;
        }
        let cache = ModelCache::<M>::new(Arc::clone(&self.store));
        caches.push(Arc::new(cache.clone()));
        debug!(model = M::MODEL_NAME, "cache registered");
        cache
    }

    pub fn is_registered<M: Model>(&self) -> bool {
        Self::lookup::<M>(&self.caches()).is_some()
    }

    /// Model names in registration order.
    pub fn registered(&self) -> Vec<&'static str> {
        self.caches().iter().map(|c| c.model_name()).collect()
    }

    /// The cache for `M`.
    ///
    /// # Panics
    ///
    /// If `M` was never registered.
    pub fn cache<M: Model>(&self) -> ModelCache<M> {
        match Self::lookup::<M>(&self.caches()) {
            Some(cache) => cache,
            None => panic!(
                "model type `{}` is not registered with the cache registry",
                M::MODEL_NAME
            ),
        }
    }

    pub fn add<M: Model>(&self, model: M) -> bool {
        self.cache::<M>().add(model)
    }

    pub fn add_many<M: Model>(&self, models: impl IntoIterator<Item = M>) -> usize {
        self.cache::<M>().add_many(models)
    }

    pub fn get<M: Model>(&self, id: &str) -> Option<Shared<M>> {
        self.cache::<M>().get(id)
    }

    pub fn get_all<M: Model>(&self) -> Vec<Shared<M>> {
        self.cache::<M>().get_all()
    }

    pub fn remove<M: Model>(&self, id: &str) -> Option<Shared<M>> {
        self.cache::<M>().remove(id)
    }

    /// Save every registered type. All types are attempted; the first error
    /// is returned.
    pub fn save(&self) -> Result<(), PersistError> {
        let mut first_error = None;
        for cache in self.all() {
            if let Err(err) = cache.save() {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Load every registered type. All types are attempted; the first error
    /// is returned.
    pub fn load(&self) -> Result<(), PersistError> {
        let mut first_error = None;
        for cache in self.all() {
            if let Err(err) = cache.load() {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Empty every cache in memory.
    pub fn clear(&self) {
        for cache in self.all() {
            cache.clear();
        }
    }

    pub fn clear_type<M: Model>(&self) {
        self.cache::<M>().clear();
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("registered", &self.registered())
            .finish()
    }
}
