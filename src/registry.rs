//! Per-type binding registry.
//!
//! Each [`Model`] type registers its bindings once; the result is cached
//! process-wide keyed by `TypeId` and shared behind an `Arc`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde::{de::DeserializeOwned, Serialize};

use crate::binding::{Attribute, Binding, ToMany, ToManyBinding, ToOne, ToOneBinding};
use crate::model::Model;

type BoxedBinding<M> = Box<dyn Binding<M>>;

/// Ordered attribute and relationship bindings for one model type.
pub struct Registry<M> {
    attributes: Vec<BoxedBinding<M>>,
    relationships: Vec<BoxedBinding<M>>,
}

impl<M: Model> Registry<M> {
    pub fn new() -> Self {
        Self {
            attributes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Bind a plain attribute.
    ///
    /// # Panics
    ///
    /// If `key` is already bound on this type.
    pub fn attribute<T>(
        &mut self,
        key: &str,
        get: fn(&M) -> &T,
        get_mut: fn(&mut M) -> &mut T,
    ) -> &mut Self
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.assert_unbound(key);
        self.attributes.push(Box::new(Attribute::new(key, get, get_mut)));
        self
    }

    /// Bind a to-one relationship.
    pub fn to_one<T: Model>(
        &mut self,
        key: &str,
        get: fn(&M) -> &ToOne<T>,
        get_mut: fn(&mut M) -> &mut ToOne<T>,
    ) -> &mut Self {
        self.assert_unbound(key);
        self.relationships
            .push(Box::new(ToOneBinding::new(key, get, get_mut)));
        self
    }

    /// Bind a to-many relationship.
    pub fn to_many<T: Model>(
        &mut self,
        key: &str,
        get: fn(&M) -> &ToMany<T>,
        get_mut: fn(&mut M) -> &mut ToMany<T>,
    ) -> &mut Self {
        self.assert_unbound(key);
        self.relationships
            .push(Box::new(ToManyBinding::new(key, get, get_mut)));
        self
    }

    /// Register a custom binding.
    pub fn binding(&mut self, binding: impl Binding<M> + 'static) -> &mut Self {
        self.assert_unbound(binding.json_key());
        if binding.kind().is_relationship() {
            self.relationships.push(Box::new(binding));
        } else {
            self.attributes.push(Box::new(binding));
        }
        self
    }

    pub fn attributes(&self) -> impl Iterator<Item = &(dyn Binding<M> + 'static)> {
        self.attributes.iter().map(Box::as_ref)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &(dyn Binding<M> + 'static)> {
        self.relationships.iter().map(Box::as_ref)
    }

    /// Attributes, then relationships.
    pub fn bindings(&self) -> impl Iterator<Item = &(dyn Binding<M> + 'static)> {
        self.attributes().chain(self.relationships())
    }

    pub fn find(&self, key: &str) -> Option<&(dyn Binding<M> + 'static)> {
        self.bindings().find(|b| b.json_key() == key)
    }

    pub fn len(&self) -> usize {
        self.attributes.len() + self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn assert_unbound(&self, key: &str) {
        assert!(
            self.find(key).is_none(),
            "duplicate JSON key `{key}` registered on `{}`",
            M::MODEL_NAME
        );
    }
}

impl<M: Model> Default for Registry<M> {
    fn default() -> Self {
        Self::new()
    }
}

type RegistryMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

static REGISTRIES: OnceLock<RwLock<RegistryMap>> = OnceLock::new();

/// The shared registry for `M`, building it on first call.
pub fn registry_for<M: Model>() -> Arc<Registry<M>> {
    let registries = REGISTRIES.get_or_init(|| RwLock::new(HashMap::new()));
    let key = TypeId::of::<M>();

    if let Some(existing) = registries
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned()
    {
        if let Ok(registry) = existing.downcast::<Registry<M>>() {
            return registry;
        }
    }

    // Built outside the lock: `register` may look up other types' registries.
    let mut registry = Registry::new();
    M::register(&mut registry);
    let built: Arc<dyn Any + Send + Sync> = Arc::new(registry);

    let stored = registries
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_insert(built)
        .clone();
    match stored.downcast::<Registry<M>>() {
        Ok(registry) => registry,
        Err(_) => unreachable!("registry map keyed by TypeId holds a foreign type"),
    }
}
