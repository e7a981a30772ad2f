use thiserror::Error;

/// Failure to map a JSON:API response body onto models.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// The body was not valid JSON.
    #[error("response body is not valid JSON: {0}")]
    MalformedJson(String),
    /// The document has no top-level `data` member.
    #[error("document has no top-level `data` member")]
    MissingData,
    /// `data` was present but not of the expected shape.
    #[error("unexpected `data` shape: expected {expected}")]
    UnexpectedShape { expected: &'static str },
}

impl From<serde_json::Error> for MappingError {
    fn from(err: serde_json::Error) -> Self {
        MappingError::MalformedJson(err.to_string())
    }
}

/// Error raised by a [`BlobStore`](crate::BlobStore) backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("blob store lock poisoned during {0}")]
    LockPoisoned(&'static str),
    #[error("blob store i/o error: {0}")]
    Io(String),
    #[error("blob store format error: {0}")]
    Format(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// Error raised while saving or loading a model cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    /// The backing blob store failed.
    #[error("cache `{cache}`: {source}")]
    Store {
        cache: String,
        #[source]
        source: StoreError,
    },
    /// The dictionary could not be encoded.
    #[error("cache `{cache}` could not be encoded: {message}")]
    Encode { cache: String, message: String },
    /// The stored blob is corrupt or from an unknown format.
    ///
    /// The in-memory dictionary is left untouched when this is returned, so
    /// callers that only care about "something usable" can treat it as an
    /// empty cache.
    #[error("cache `{cache}` blob could not be decoded: {message}")]
    Decode { cache: String, message: String },
    /// A background save did not finish within the allotted time.
    #[error("cache `{cache}` save timed out after {millis}ms")]
    Timeout { cache: String, millis: u128 },
    /// A background save was cancelled before it wrote anything.
    #[error("cache `{cache}` save was cancelled")]
    Cancelled { cache: String },
    /// The background save worker went away without reporting.
    #[error("cache `{cache}` save worker exited unexpectedly")]
    WorkerLost { cache: String },
}

impl PersistError {
    /// Name of the cache (`model_name + cache_id`) the error belongs to.
    pub fn cache(&self) -> &str {
        match self {
            PersistError::Store { cache, .. }
            | PersistError::Encode { cache, .. }
            | PersistError::Decode { cache, .. }
            | PersistError::Timeout { cache, .. }
            | PersistError::Cancelled { cache }
            | PersistError::WorkerLost { cache } => cache,
        }
    }

    /// Warning-level errors: the cache is still usable and may be treated
    /// as empty (or as unsaved) without losing in-memory state.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PersistError::Decode { .. } | PersistError::Cancelled { .. }
        )
    }
}

/// Failure reported by a [`Transport`](crate::service::Transport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("could not connect to {url}: {reason}")]
    Connection { url: String, reason: String },
    #[error("request timed out after {millis}ms")]
    Timeout { millis: u128 },
    #[error("transport error: {0}")]
    Other(String),
}

/// Error returned by [`JsonApiService`](crate::service::JsonApiService) calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("server responded with status {status}")]
    Status { status: u16, body: Vec<u8> },
    #[error("response mapping failed: {0}")]
    Mapping(#[from] MappingError),
}
