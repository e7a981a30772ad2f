//! Object store - identity map for one document resolution pass.
//!
//! Every resource reachable from a document is mapped at most once. The
//! first time `(type, id)` is seen its instance is registered, and every
//! later reference (from any relationship, at any depth) gets the same
//! [`Shared`] handle back.

use std::any::Any;
use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::model::{Model, Shared};

/// The `included` side-table of a document.
#[derive(Clone, Copy, Debug, Default)]
pub struct Included<'a> {
    resources: &'a [Value],
}

impl<'a> Included<'a> {
    pub fn new(resources: &'a [Value]) -> Self {
        Self { resources }
    }

    pub fn empty() -> Self {
        Self { resources: &[] }
    }

    /// The `included` array of `document`, or an empty table.
    pub fn from_document(document: &'a Value) -> Self {
        let resources = document
            .get("included")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        Self { resources }
    }

    /// First entry matching `model_name` and `id`.
    pub fn find(&self, model_name: &str, id: &str) -> Option<&'a Value> {
        self.resources.iter().find(|resource| {
            resource.get("type").and_then(Value::as_str) == Some(model_name)
                && resource.get("id").and_then(Value::as_str) == Some(id)
        })
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

type ObjectKey = (&'static str, String);

/// Instances mapped so far, keyed by `(type, id)`.
#[derive(Default)]
pub struct ObjectStore {
    objects: HashMap<ObjectKey, Box<dyn Any + Send + Sync>>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: Model>(&self, id: &str) -> Option<Shared<T>> {
        self.objects
            .get(&(T::MODEL_NAME, id.to_string()))
            .and_then(|entry| entry.downcast_ref::<Shared<T>>())
            .cloned()
    }

    pub fn contains<T: Model>(&self, id: &str) -> bool {
        self.objects.contains_key(&(T::MODEL_NAME, id.to_string()))
    }

    /// Register `shared` under its current id. Models without an id are
    /// not tracked.
    pub fn insert<T: Model>(&mut self, shared: Shared<T>) {
        let id = shared.id();
        if id.is_empty() {
            return;
        }
        self.objects.insert((T::MODEL_NAME, id), Box::new(shared));
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Resolve a relationship stub.
    ///
    /// Returns the instance already mapped for the stub's id if there is
    /// one. Otherwise the first matching `included` entry is materialized,
    /// registered, and has its own relationships resolved. With no match the
    /// stub itself is registered and returned.
    pub fn resolve<T: Model>(&mut self, stub: Shared<T>, included: &Included<'_>) -> Shared<T> {
        let id = stub.id();
        if id.is_empty() {
            return stub;
        }
        if let Some(existing) = self.get::<T>(&id) {
            trace!(model = T::MODEL_NAME, id = %id, "reusing mapped instance");
            return existing;
        }

        match included.find(T::MODEL_NAME, &id) {
            Some(resource) => {
                let shared = Shared::new(T::default());
                self.fill(&shared, resource, included);
                shared
            }
            None => {
                debug!(model = T::MODEL_NAME, id = %id, "no included entry, keeping stub");
                self.insert(stub.clone());
                stub
            }
        }
    }

    /// Map one top-level `data` resource.
    ///
    /// An instance already reached through `included` for the same id is
    /// updated in place so identity holds across the whole document.
    pub fn map_root<T: Model>(&mut self, resource: &Value, included: &Included<'_>) -> Shared<T> {
        let kind = resource.get("type").and_then(Value::as_str);
        if kind != Some(T::MODEL_NAME) {
            warn!(
                model = T::MODEL_NAME,
                found = kind.unwrap_or("<missing>"),
                "resource type does not match model, mapping anyway"
            );
        }

        let existing = resource
            .get("id")
            .and_then(Value::as_str)
            .and_then(|id| self.get::<T>(id));
        let shared = existing.unwrap_or_else(|| Shared::new(T::default()));
        self.fill(&shared, resource, included);
        shared
    }

    // Register before resolving relationships so cycles terminate.
    fn fill<T: Model>(&mut self, shared: &Shared<T>, resource: &Value, included: &Included<'_>) {
        {
            let mut model = shared.write();
            model.populate(resource);
            model.set_blank(false);
        }
        self.insert(shared.clone());

        let registry = T::registry();
        for binding in registry.relationships() {
            binding.resolve(shared, included, self);
        }
    }
}
