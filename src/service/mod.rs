//! Service layer - typed JSON:API calls over a pluggable transport.
//!
//! `JsonApiRequest<M>` describes a call (target, path, parameters,
//! includes), `ServiceSettings` supplies base URL, headers and timeouts,
//! and `JsonApiService` sends the resulting `RequestSpec` through a
//! [`Transport`] and maps the response body into models.
//!
//! ## Quick Start
//!
//! ```ignore
//! use jsonapi_rust::service::{JsonApiRequest, JsonApiService, ServiceSettings};
//!
//! let service = JsonApiService::new(my_transport, ServiceSettings::new("https://api.example.com"));
//! let request = JsonApiRequest::<Article>::get_objects().include_type::<Author>();
//! let articles = service.fetch_all(&request)?;
//! ```

mod client;
mod request;
mod settings;
mod transport;

pub use client::JsonApiService;
pub use request::{JsonApiRequest, ParameterEncoding, RequestMethod, RequestSpec, Target};
pub use settings::{ServiceSettings, JSON_API_MEDIA_TYPE};
pub use transport::{RawResponse, Transport};
