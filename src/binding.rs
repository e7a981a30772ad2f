//! Property bindings - typed links between a model field and a JSON key.
//!
//! A binding never holds a reference into a model. It stores a pair of
//! accessor functions (`fn(&M) -> &F`, `fn(&mut M) -> &mut F`) and is handed
//! the instance on every call, so one binding serves every instance of `M`.
//!
//! Three variants ship with the crate:
//! - [`Attribute`] - a scalar or struct value under `attributes`
//! - [`ToOneBinding`] - a [`ToOne`] field under `relationships`
//! - [`ToManyBinding`] - a [`ToMany`] field under `relationships`

use std::fmt;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::model::{Model, Shared};
use crate::object_store::{Included, ObjectStore};

/// Which section of a resource object a binding lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    Attribute,
    ToOne,
    ToMany,
}

impl BindingKind {
    pub fn is_relationship(self) -> bool {
        !matches!(self, BindingKind::Attribute)
    }
}

/// Read/write access to one field of `M` under one JSON key.
pub trait Binding<M>: Send + Sync {
    fn json_key(&self) -> &str;

    fn kind(&self) -> BindingKind;

    /// JSON:API type of the relationship target, if this is a relationship.
    fn target(&self) -> Option<&'static str> {
        None
    }

    /// The field as JSON, or `None` when there is nothing to emit.
    fn serialize(&self, model: &M) -> Option<Value>;

    /// Read the field from `document[json_key]`. Absent or mistyped values
    /// leave the field untouched.
    fn deserialize(&self, model: &mut M, document: &Value);

    /// Persisted form of the field.
    fn encode(&self, model: &M) -> Option<Value> {
        self.serialize(model)
    }

    /// Restore the field from its persisted form.
    fn decode(&self, model: &mut M, value: &Value) {
        let mut document = Map::new();
        document.insert(self.json_key().to_string(), value.clone());
        self.deserialize(model, &Value::Object(document));
    }

    /// Replace relationship stubs with instances from `included`.
    fn resolve(&self, _target: &Shared<M>, _included: &Included<'_>, _store: &mut ObjectStore) {}
}

/// A plain value under `attributes`.
pub struct Attribute<M, T> {
    key: String,
    get: fn(&M) -> &T,
    get_mut: fn(&mut M) -> &mut T,
}

impl<M, T> Attribute<M, T> {
    pub fn new(key: impl Into<String>, get: fn(&M) -> &T, get_mut: fn(&mut M) -> &mut T) -> Self {
        Self {
            key: key.into(),
            get,
            get_mut,
        }
    }
}

impl<M, T> Binding<M> for Attribute<M, T>
where
    M: Model,
    T: Serialize + DeserializeOwned,
{
    fn json_key(&self) -> &str {
        &self.key
    }

    fn kind(&self) -> BindingKind {
        BindingKind::Attribute
    }

    fn serialize(&self, model: &M) -> Option<Value> {
        match serde_json::to_value((self.get)(model)) {
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(err) => {
                warn!(model = M::MODEL_NAME, key = %self.key, error = %err, "attribute not serializable");
                None
            }
        }
    }

    fn deserialize(&self, model: &mut M, document: &Value) {
        let Some(raw) = document.get(&self.key) else {
            return;
        };
        match serde_json::from_value::<T>(raw.clone()) {
            Ok(value) => *(self.get_mut)(model) = value,
            Err(err) => {
                debug!(model = M::MODEL_NAME, key = %self.key, error = %err, "attribute type mismatch, keeping prior value");
            }
        }
    }
}

/// A to-one relationship field.
pub struct ToOne<T> {
    value: Option<Shared<T>>,
}

impl<T: Model> ToOne<T> {
    pub fn new(model: T) -> Self {
        Self::from_shared(Shared::new(model))
    }

    pub fn from_shared(shared: Shared<T>) -> Self {
        Self {
            value: Some(shared),
        }
    }

    pub fn empty() -> Self {
        Self { value: None }
    }

    pub fn get(&self) -> Option<&Shared<T>> {
        self.value.as_ref()
    }

    pub fn set(&mut self, value: Option<Shared<T>>) {
        self.value = value;
    }

    pub fn take(&mut self) -> Option<Shared<T>> {
        self.value.take()
    }

    pub fn is_some(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_none(&self) -> bool {
        self.value.is_none()
    }

    /// Id of the referenced model, when one is set and has been assigned.
    pub fn id(&self) -> Option<String> {
        self.value
            .as_ref()
            .map(Shared::id)
            .filter(|id| !id.is_empty())
    }
}

impl<T> Default for ToOne<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T> Clone for ToOne<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl<T: Model> PartialEq for ToOne<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

// Prints ids only; relationship graphs may be cyclic.
impl<T: Model> fmt::Debug for ToOne<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ToOne").field(&self.id()).finish()
    }
}

/// A to-many relationship field. Order follows the `data` array.
pub struct ToMany<T> {
    items: Vec<Shared<T>>,
}

impl<T: Model> ToMany<T> {
    pub fn new(models: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: models.into_iter().map(Shared::new).collect(),
        }
    }

    pub fn from_shared(items: Vec<Shared<T>>) -> Self {
        Self { items }
    }

    pub fn push(&mut self, model: T) {
        self.items.push(Shared::new(model));
    }

    pub fn push_shared(&mut self, shared: Shared<T>) {
        self.items.push(shared);
    }

    pub fn get(&self, index: usize) -> Option<&Shared<T>> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Shared<T>> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(Shared::id).collect()
    }

    fn replace(&mut self, items: Vec<Shared<T>>) {
        self.items = items;
    }
}

impl<T> Default for ToMany<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Clone for ToMany<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<T: Model> PartialEq for ToMany<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ids() == other.ids()
    }
}

impl<T: Model> fmt::Debug for ToMany<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ToMany").field(&self.ids()).finish()
    }
}

impl<'a, T> IntoIterator for &'a ToMany<T> {
    type Item = &'a Shared<T>;
    type IntoIter = std::slice::Iter<'a, Shared<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn identifier(model_name: &str, id: &str) -> Value {
    json!({ "type": model_name, "id": id })
}

/// Binding for a [`ToOne`] field.
pub struct ToOneBinding<M, T> {
    key: String,
    get: fn(&M) -> &ToOne<T>,
    get_mut: fn(&mut M) -> &mut ToOne<T>,
}

impl<M, T> ToOneBinding<M, T> {
    pub fn new(
        key: impl Into<String>,
        get: fn(&M) -> &ToOne<T>,
        get_mut: fn(&mut M) -> &mut ToOne<T>,
    ) -> Self {
        Self {
            key: key.into(),
            get,
            get_mut,
        }
    }
}

impl<M: Model, T: Model> Binding<M> for ToOneBinding<M, T> {
    fn json_key(&self) -> &str {
        &self.key
    }

    fn kind(&self) -> BindingKind {
        BindingKind::ToOne
    }

    fn target(&self) -> Option<&'static str> {
        Some(T::MODEL_NAME)
    }

    /// Omitted when unset, so an update never clears a link that was not
    /// loaded.
    fn serialize(&self, model: &M) -> Option<Value> {
        let id = (self.get)(model).id()?;
        Some(json!({ "data": identifier(T::MODEL_NAME, &id) }))
    }

    fn deserialize(&self, model: &mut M, document: &Value) {
        let id = document
            .get(&self.key)
            .and_then(|rel| rel.get("data"))
            .and_then(|data| data.get("id"))
            .and_then(Value::as_str);
        if let Some(id) = id {
            (self.get_mut)(model).set(Some(Shared::new(T::stub(id))));
        }
    }

    fn resolve(&self, target: &Shared<M>, included: &Included<'_>, store: &mut ObjectStore) {
        let stub = (self.get)(&*target.read()).get().cloned();
        let Some(stub) = stub else {
            return;
        };
        let resolved = store.resolve(stub, included);
        (self.get_mut)(&mut *target.write()).set(Some(resolved));
    }
}

/// Binding for a [`ToMany`] field.
pub struct ToManyBinding<M, T> {
    key: String,
    get: fn(&M) -> &ToMany<T>,
    get_mut: fn(&mut M) -> &mut ToMany<T>,
}

impl<M, T> ToManyBinding<M, T> {
    pub fn new(
        key: impl Into<String>,
        get: fn(&M) -> &ToMany<T>,
        get_mut: fn(&mut M) -> &mut ToMany<T>,
    ) -> Self {
        Self {
            key: key.into(),
            get,
            get_mut,
        }
    }
}

impl<M: Model, T: Model> Binding<M> for ToManyBinding<M, T> {
    fn json_key(&self) -> &str {
        &self.key
    }

    fn kind(&self) -> BindingKind {
        BindingKind::ToMany
    }

    fn target(&self) -> Option<&'static str> {
        Some(T::MODEL_NAME)
    }

    fn serialize(&self, model: &M) -> Option<Value> {
        let data: Vec<Value> = (self.get)(model)
            .ids()
            .into_iter()
            .filter(|id| {
                if id.is_empty() {
                    debug!(model = M::MODEL_NAME, key = %self.key, "skipping unsaved to-many member");
                }
                !id.is_empty()
            })
            .map(|id| identifier(T::MODEL_NAME, &id))
            .collect();
        Some(json!({ "data": data }))
    }

    fn deserialize(&self, model: &mut M, document: &Value) {
        let Some(data) = document
            .get(&self.key)
            .and_then(|rel| rel.get("data"))
            .and_then(Value::as_array)
        else {
            return;
        };
        let stubs = data
            .iter()
            .filter_map(|entry| entry.get("id").and_then(Value::as_str))
            .map(|id| Shared::new(T::stub(id)))
            .collect();
        (self.get_mut)(model).replace(stubs);
    }

    fn resolve(&self, target: &Shared<M>, included: &Included<'_>, store: &mut ObjectStore) {
        let stubs: Vec<Shared<T>> = (self.get)(&*target.read()).iter().cloned().collect();
        if stubs.is_empty() {
            return;
        }
        let resolved = stubs
            .into_iter()
            .map(|stub| store.resolve(stub, included))
            .collect();
        (self.get_mut)(&mut *target.write()).replace(resolved);
    }
}
