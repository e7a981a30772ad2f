use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::Model;

use super::settings::ServiceSettings;

/// HTTP method of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl RequestMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
            RequestMethod::Patch => "PATCH",
            RequestMethod::Delete => "DELETE",
        }
    }

    /// Query string for reads and deletes, JSON body for writes.
    pub fn encoding(self) -> ParameterEncoding {
        match self {
            RequestMethod::Get | RequestMethod::Delete => ParameterEncoding::UrlEncoded,
            RequestMethod::Post | RequestMethod::Patch => ParameterEncoding::Json,
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How `parameters` travel on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParameterEncoding {
    UrlEncoded,
    Json,
}

/// The kind of call a request makes. Settings key timeouts by target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    GetObjects,
    GetObject,
    CreateObject,
    UpdateObject,
    DeleteObject,
}

impl Target {
    pub fn method(self) -> RequestMethod {
        match self {
            Target::GetObjects | Target::GetObject => RequestMethod::Get,
            Target::CreateObject => RequestMethod::Post,
            Target::UpdateObject => RequestMethod::Patch,
            Target::DeleteObject => RequestMethod::Delete,
        }
    }
}

/// Everything a [`Transport`](super::Transport) needs to perform one call.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestSpec {
    pub method: RequestMethod,
    pub base_url: String,
    pub path: String,
    pub parameters: Map<String, Value>,
    pub encoding: ParameterEncoding,
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
}

impl RequestSpec {
    pub fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.path)
    }
}

/// A typed JSON:API call for model type `M`.
///
/// ```ignore
/// let request = JsonApiRequest::<Article>::get_object("1").include("author");
/// let article = service.fetch(&request)?;
/// ```
pub struct JsonApiRequest<M> {
    target: Target,
    id: Option<String>,
    body: Option<Value>,
    includes: Vec<String>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> JsonApiRequest<M> {
    fn new(target: Target, id: Option<String>, body: Option<Value>) -> Self {
        Self {
            target,
            id,
            body,
            includes: Vec::new(),
            _model: PhantomData,
        }
    }

    pub fn get_object(id: impl Into<String>) -> Self {
        Self::new(Target::GetObject, Some(id.into()), None)
    }

    pub fn get_objects() -> Self {
        Self::new(Target::GetObjects, None, None)
    }

    pub fn create(model: &M) -> Self {
        Self::new(Target::CreateObject, None, Some(model.create_parameters()))
    }

    pub fn update(model: &M) -> Self {
        Self::new(
            Target::UpdateObject,
            Some(model.id().to_string()),
            Some(model.update_parameters()),
        )
    }

    pub fn delete(model: &M) -> Self {
        Self::new(Target::DeleteObject, Some(model.id().to_string()), None)
    }

    /// Ask the server to side-load the relationship under `key`.
    pub fn include(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !self.includes.contains(&key) {
            self.includes.push(key);
        }
        self
    }

    /// Include every relationship of `M` whose target type is `T`.
    pub fn include_type<T: Model>(mut self) -> Self {
        let registry = M::registry();
        for binding in registry.relationships() {
            if binding.target() == Some(T::MODEL_NAME) {
                self = self.include(binding.json_key());
            }
        }
        self
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn method(&self) -> RequestMethod {
        self.target.method()
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// `/{type}` or `/{type}/{id}`.
    pub fn path(&self) -> String {
        match &self.id {
            Some(id) => format!("/{}/{}", M::MODEL_NAME, id),
            None => format!("/{}", M::MODEL_NAME),
        }
    }

    pub fn parameters(&self) -> Map<String, Value> {
        let mut parameters = match &self.body {
            Some(Value::Object(body)) => body.clone(),
            _ => Map::new(),
        };
        if !self.includes.is_empty() {
            parameters.insert("include".into(), Value::String(self.includes.join(",")));
        }
        parameters
    }

    pub fn to_spec(&self, settings: &ServiceSettings) -> RequestSpec {
        let method = self.method();
        RequestSpec {
            method,
            base_url: settings.base_url.clone(),
            path: self.path(),
            parameters: self.parameters(),
            encoding: method.encoding(),
            headers: settings.headers_for(self.target),
            timeout: settings.timeout_for(self.target),
        }
    }
}

impl<M> fmt::Debug for JsonApiRequest<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonApiRequest")
            .field("target", &self.target)
            .field("id", &self.id)
            .field("includes", &self.includes)
            .finish()
    }
}
