use std::fmt;

use crate::model::{Model, Shared};

/// A mutation observed on a [`ModelCache`](super::ModelCache).
pub enum CacheEvent<M> {
    /// Initial value of a fresh cache.
    None,
    Added(Shared<M>),
    Updated(Shared<M>),
    Deleted(Shared<M>),
}

impl<M> CacheEvent<M> {
    /// The model the event refers to.
    pub fn data(&self) -> Option<&Shared<M>> {
        match self {
            CacheEvent::None => None,
            CacheEvent::Added(model) | CacheEvent::Updated(model) | CacheEvent::Deleted(model) => {
                Some(model)
            }
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, CacheEvent::Added(_))
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, CacheEvent::Updated(_))
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, CacheEvent::Deleted(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CacheEvent::None => "none",
            CacheEvent::Added(_) => "added",
            CacheEvent::Updated(_) => "updated",
            CacheEvent::Deleted(_) => "deleted",
        }
    }
}

impl<M> Default for CacheEvent<M> {
    fn default() -> Self {
        CacheEvent::None
    }
}

impl<M> Clone for CacheEvent<M> {
    fn clone(&self) -> Self {
        match self {
            CacheEvent::None => CacheEvent::None,
            CacheEvent::Added(model) => CacheEvent::Added(model.clone()),
            CacheEvent::Updated(model) => CacheEvent::Updated(model.clone()),
            CacheEvent::Deleted(model) => CacheEvent::Deleted(model.clone()),
        }
    }
}

impl<M: Model> fmt::Debug for CacheEvent<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data() {
            Some(model) => write!(f, "{}({})", self.kind(), model.id()),
            None => f.write_str("none"),
        }
    }
}
