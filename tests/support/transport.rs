//! A transport that answers from canned responses and records requests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use jsonapi_rust::service::{RawResponse, RequestMethod, RequestSpec, Transport};
use jsonapi_rust::TransportError;

#[derive(Default)]
pub struct StubTransport {
    routes: HashMap<(RequestMethod, String), RawResponse>,
    requests: Mutex<Vec<RequestSpec>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, method: RequestMethod, path: &str, status: u16, body: &str) -> Self {
        self.routes
            .insert((method, path.to_string()), RawResponse::new(status, body));
        self
    }

    pub fn requests(&self) -> Vec<RequestSpec> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for StubTransport {
    fn request(&self, spec: &RequestSpec) -> Result<RawResponse, TransportError> {
        self.requests.lock().unwrap().push(spec.clone());
        self.routes
            .get(&(spec.method, spec.path.clone()))
            .cloned()
            .ok_or_else(|| TransportError::Connection {
                url: spec.url(),
                reason: "no stub route".into(),
            })
    }
}
