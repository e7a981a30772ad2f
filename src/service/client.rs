use tracing::{debug, warn};

use crate::document;
use crate::error::ServiceError;
use crate::model::{Model, Shared};

use super::request::{JsonApiRequest, RequestSpec};
use super::settings::ServiceSettings;
use super::transport::{RawResponse, Transport};

/// Performs [`JsonApiRequest`]s over a [`Transport`] and maps the responses.
pub struct JsonApiService<T> {
    transport: T,
    settings: ServiceSettings,
}

impl<T: Transport> JsonApiService<T> {
    pub fn new(transport: T, settings: ServiceSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn send(&self, spec: &RequestSpec) -> Result<RawResponse, ServiceError> {
        debug!(method = %spec.method, url = %spec.url(), "sending request");
        let response = self.transport.request(spec)?;
        if !response.is_success() {
            warn!(
                method = %spec.method,
                url = %spec.url(),
                status = response.status,
                "request failed"
            );
            return Err(ServiceError::Status {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }

    /// Perform a request that answers with one resource.
    pub fn fetch<M: Model>(&self, request: &JsonApiRequest<M>) -> Result<Shared<M>, ServiceError> {
        let response = self.send(&request.to_spec(&self.settings))?;
        Ok(document::parse_one(&response.body)?)
    }

    /// Perform a request that answers with a collection.
    pub fn fetch_all<M: Model>(
        &self,
        request: &JsonApiRequest<M>,
    ) -> Result<Vec<Shared<M>>, ServiceError> {
        let response = self.send(&request.to_spec(&self.settings))?;
        Ok(document::parse_many(&response.body)?)
    }

    pub fn get<M: Model>(&self, id: &str) -> Result<Shared<M>, ServiceError> {
        self.fetch(&JsonApiRequest::get_object(id))
    }

    pub fn get_all<M: Model>(&self) -> Result<Vec<Shared<M>>, ServiceError> {
        self.fetch_all(&JsonApiRequest::<M>::get_objects())
    }

    /// POST `model`; returns the server's representation.
    pub fn create<M: Model>(&self, model: &M) -> Result<Shared<M>, ServiceError> {
        self.fetch(&JsonApiRequest::create(model))
    }

    /// PATCH `model`; returns the server's representation.
    pub fn update<M: Model>(&self, model: &M) -> Result<Shared<M>, ServiceError> {
        self.fetch(&JsonApiRequest::update(model))
    }

    /// DELETE `model`. The response body is ignored.
    pub fn delete<M: Model>(&self, model: &M) -> Result<(), ServiceError> {
        self.send(&JsonApiRequest::delete(model).to_spec(&self.settings))?;
        Ok(())
    }
}

impl<T> std::fmt::Debug for JsonApiService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonApiService")
            .field("base_url", &self.settings.base_url)
            .finish()
    }
}
