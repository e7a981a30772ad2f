//! JSON:API object mapping for plain Rust structs.
//!
//! Models declare their attributes and relationships once (usually with
//! `#[derive(JsonApiModel)]`); the same bindings then drive response
//! parsing, `included` graph resolution, request bodies, and the persisted
//! encoding used by [`ModelCache`].

extern crate self as jsonapi_rust;

mod binding;
pub mod blob;
pub mod cache;
mod cache_registry;
mod data_bind;
pub mod document;
mod error;
mod model;
mod object_store;
mod registry;
pub mod service;

pub use binding::{Attribute, Binding, BindingKind, ToMany, ToManyBinding, ToOne, ToOneBinding};
#[cfg(feature = "file-store")]
pub use blob::FileBlobStore;
pub use blob::{BlobStore, InMemoryBlobStore};
pub use cache::{CacheEvent, CacheOptions, LoadOutcome, ModelCache, PendingSave};
pub use cache_registry::CacheRegistry;
pub use data_bind::{DataBind, Subscription};
pub use document::{parse_many, parse_one};
pub use error::{MappingError, PersistError, ServiceError, StoreError, TransportError};
pub use model::{Coordinate, Model, Shared};
pub use object_store::{Included, ObjectStore};
pub use registry::{registry_for, Registry};

pub use jsonapi_rust_macros::JsonApiModel;
