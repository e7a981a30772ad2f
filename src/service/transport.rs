use std::sync::Arc;

use crate::error::TransportError;

use super::request::RequestSpec;

/// A completed HTTP exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP client behind a [`JsonApiService`](super::JsonApiService).
///
/// Implement this over whatever client the application already uses.
pub trait Transport: Send + Sync {
    fn request(&self, spec: &RequestSpec) -> Result<RawResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn request(&self, spec: &RequestSpec) -> Result<RawResponse, TransportError> {
        (**self).request(spec)
    }
}
