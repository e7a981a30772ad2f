//! Model - the base abstraction every JSON:API-backed type implements.
//!
//! A model carries an identity (`id`, empty until the server assigns one),
//! a type-level `MODEL_NAME` (the JSON:API `type` and the cache namespace),
//! a blank flag marking relationship stubs, and a [`Registry`] of bindings
//! that drives every (de)serialization path uniformly.
//!
//! ## Example
//!
//! ```ignore
//! use jsonapi_rust::{JsonApiModel, Model, ToOne};
//!
//! #[derive(Default, Debug, JsonApiModel)]
//! #[jsonapi(type = "articles")]
//! struct Article {
//!     id: String,
//!     is_blank: bool,
//!     #[jsonapi(attribute)]
//!     title: String,
//!     #[jsonapi(to_one)]
//!     author: ToOne<Author>,
//! }
//!
//! let body = article.create_parameters();
//! ```

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::EncodedModel;
use crate::registry::{registry_for, Registry};

/// Trait for types that map to a JSON:API resource.
///
/// Implement it with `#[derive(JsonApiModel)]` or by hand. `register` is
/// called once per type, the first time the type's registry is needed.
pub trait Model: Default + Send + Sync + 'static {
    /// JSON:API `type` discriminator, also the cache namespace key.
    const MODEL_NAME: &'static str;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: &str);

    /// True when this instance only stands in for a relationship target.
    fn is_blank(&self) -> bool;

    fn set_blank(&mut self, blank: bool);

    /// Declare every serializable field, attributes first, in output order.
    fn register(registry: &mut Registry<Self>);

    /// The bindings for this type, built on first use and then shared.
    fn registry() -> Arc<Registry<Self>> {
        registry_for::<Self>()
    }

    /// A reference stub: id and type only, flagged blank.
    fn stub(id: impl Into<String>) -> Self {
        let mut model = Self::default();
        model.set_id(&id.into());
        model.set_blank(true);
        model
    }

    /// True until the server has assigned an id.
    fn is_new(&self) -> bool {
        self.id().is_empty()
    }

    /// Read `id`, `attributes` and relationship linkage from one resource
    /// object. Relationships become stubs; see [`ObjectStore`](crate::ObjectStore)
    /// for the `included` pass.
    fn populate(&mut self, resource: &Value) {
        if let Some(id) = resource.get("id").and_then(Value::as_str) {
            self.set_id(id);
        }

        let registry = Self::registry();
        let attributes = resource.get("attributes").unwrap_or(&Value::Null);
        for binding in registry.attributes() {
            binding.deserialize(self, attributes);
        }
        let relationships = resource.get("relationships").unwrap_or(&Value::Null);
        for binding in registry.relationships() {
            binding.deserialize(self, relationships);
        }
    }

    /// Serialized attributes keyed by JSON key. `null` values are omitted.
    fn attributes_json(&self) -> Map<String, Value> {
        let registry = Self::registry();
        registry
            .attributes()
            .filter_map(|b| b.serialize(self).map(|v| (b.json_key().to_string(), v)))
            .collect()
    }

    /// Serialized relationship linkage keyed by JSON key.
    fn relationships_json(&self) -> Map<String, Value> {
        let registry = Self::registry();
        registry
            .relationships()
            .filter_map(|b| b.serialize(self).map(|v| (b.json_key().to_string(), v)))
            .collect()
    }

    /// Request body for creating this model. `id` is left for the server.
    fn create_parameters(&self) -> Value {
        crate::document::resource_body(self, false)
    }

    /// Request body for updating this model; carries `id`.
    fn update_parameters(&self) -> Value {
        crate::document::resource_body(self, true)
    }

    /// Persisted encoding: every binding under its JSON key.
    fn encode(&self) -> EncodedModel {
        let registry = Self::registry();
        let mut encoded = EncodedModel::new(self.is_blank());
        for binding in registry.bindings() {
            if let Some(value) = binding.encode(self) {
                encoded.insert(binding.json_key(), &value);
            }
        }
        encoded
    }

    /// Rebuild a model from its persisted encoding. Unknown or unreadable
    /// fields keep their default.
    fn decode(id: &str, encoded: &EncodedModel) -> Self {
        let registry = Self::registry();
        let mut model = Self::default();
        model.set_id(id);
        model.set_blank(encoded.blank);
        for binding in registry.bindings() {
            if let Some(value) = encoded.get(binding.json_key()) {
                binding.decode(&mut model, &value);
            }
        }
        model
    }
}

/// A shared, interiorly mutable model instance.
///
/// Graph resolution hands out the same `Shared` for every reference to one
/// `(type, id)`, so identity can be checked with [`Shared::ptr_eq`].
pub struct Shared<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// True when both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Model> Shared<T> {
    pub fn id(&self) -> String {
        self.read().id().to_string()
    }

    pub fn is_blank(&self) -> bool {
        self.read().is_blank()
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> From<T> for Shared<T> {
    fn from(value: T) -> Self {
        Shared::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_read() {
            Ok(guard) => f.debug_tuple("Shared").field(&*guard).finish(),
            Err(_) => f.write_str("Shared(<locked>)"),
        }
    }
}

/// A geographic coordinate, serialized as the fixed-order array
/// `[latitude, longitude]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([latitude, longitude]: [f64; 2]) -> Self {
        Coordinate::new(latitude, longitude)
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(c: Coordinate) -> Self {
        [c.latitude, c.longitude]
    }
}
