use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::request::Target;

pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Connection settings for a [`JsonApiService`](super::JsonApiService).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub base_url: String,
    pub default_timeout: Duration,
    /// Overrides `default_timeout` for specific targets.
    pub timeouts: HashMap<Target, Duration>,
    /// Sent with every request.
    pub headers: BTreeMap<String, String>,
    /// Sent as `Authorization: Bearer <token>`.
    pub bearer_token: Option<String>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            default_timeout: Duration::from_secs(20),
            timeouts: HashMap::new(),
            headers: BTreeMap::new(),
            bearer_token: None,
        }
    }
}

impl ServiceSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, target: Target, timeout: Duration) -> Self {
        self.timeouts.insert(target, timeout);
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn timeout_for(&self, target: Target) -> Duration {
        self.timeouts
            .get(&target)
            .copied()
            .unwrap_or(self.default_timeout)
    }

    /// JSON:API media type headers, then configured headers, then auth.
    pub fn headers_for(&self, target: Target) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert("Accept".to_string(), JSON_API_MEDIA_TYPE.to_string());
        if target.method().encoding() == super::ParameterEncoding::Json {
            headers.insert("Content-Type".to_string(), JSON_API_MEDIA_TYPE.to_string());
        }
        headers.extend(self.headers.clone());
        if let Some(token) = &self.bearer_token {
            headers.insert("Authorization".to_string(), format!("Bearer {token}"));
        }
        headers
    }
}
