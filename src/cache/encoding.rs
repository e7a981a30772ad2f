//! Persisted cache format.
//!
//! A cache is written as one bitcode blob holding a [`CacheSnapshot`].
//! Field values are stored as JSON text because bitcode cannot carry
//! self-describing values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::model::{Model, Shared};

/// Bumped whenever [`CacheSnapshot`] changes shape.
pub const SNAPSHOT_FORMAT: u32 = 1;

/// One model in persisted form: its blank flag and every bound field
/// under its JSON key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedModel {
    pub blank: bool,
    fields: BTreeMap<String, String>,
}

impl EncodedModel {
    pub fn new(blank: bool) -> Self {
        Self {
            blank,
            fields: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: &str, value: &Value) {
        self.fields.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let text = self.fields.get(key)?;
        match serde_json::from_str(text) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(key, error = %err, "unreadable encoded field");
                None
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The whole dictionary of one cache.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub format: u32,
    pub models: BTreeMap<String, EncodedModel>,
}

impl CacheSnapshot {
    pub fn capture<'a, M, I>(entries: I) -> Self
    where
        M: Model,
        I: IntoIterator<Item = (&'a String, &'a Shared<M>)>,
    {
        let models = entries
            .into_iter()
            .map(|(id, model)| (id.clone(), model.read().encode()))
            .collect();
        Self {
            format: SNAPSHOT_FORMAT,
            models,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, String> {
        bitcode::serialize(self).map_err(|e| e.to_string())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        let snapshot: CacheSnapshot = bitcode::deserialize(bytes).map_err(|e| e.to_string())?;
        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(format!(
                "unsupported snapshot format {} (expected {SNAPSHOT_FORMAT})",
                snapshot.format
            ));
        }
        Ok(snapshot)
    }

    /// Rebuild every model, keyed by id.
    pub fn restore<M: Model>(&self) -> Vec<(String, M)> {
        self.models
            .iter()
            .map(|(id, encoded)| (id.clone(), M::decode(id, encoded)))
            .collect()
    }
}
