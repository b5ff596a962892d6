use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Boxed error used where the underlying cause comes from another crate
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Request descriptor could not be built
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RequestError {
    /// No path, or an empty one, was given
    #[error("request path is required")]
    MissingPath,

    /// Body could not be converted to a structured value
    #[error("invalid request body: {0}")]
    InvalidBody(#[source] serde_json::Error),

    /// Header name or value is not valid HTTP
    #[error("invalid header '{name}': {source}")]
    InvalidHeader {
        name: String,
        #[source]
        source: http::Error,
    },
}

/// Body could not be encoded by the selected serializer
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SerializeError {
    /// URL-encoding needs a top-level object
    #[error("url-encoded body must be an object")]
    NotAnObject,

    /// URL-encoding only supports scalar field values
    #[error("url-encoded body field '{field}' is not a scalar")]
    NotFlat { field: String },

    #[error("form encoding failed: {0}")]
    Form(#[from] serde_urlencoded::ser::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Connection configuration is not usable
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("base_url must not be empty")]
    MissingBaseUrl,

    #[error("base_url '{0}' must start with http:// or https://")]
    InvalidBaseUrl(String),

    #[error("invalid header '{0}' in default_headers")]
    InvalidHeader(String),
}

/// Failure reported by an authenticator or interceptor.
///
/// Messages never include credential values.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AuthError {
    /// A session token is required but no session is stored
    #[error("no active session")]
    NoActiveSession,

    /// A credential could not be obtained (token endpoint down, bad response, ...)
    #[error("credential unavailable: {0}")]
    CredentialUnavailable(String),

    /// The server rejected the credential and it cannot be recovered
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The session could not be refreshed and has been cleared
    #[error("session expired: {0}")]
    SessionExpired(String),

    /// Credential storage failed
    #[error("credential storage failed: {0}")]
    Storage(String),

    /// An interceptor broke the pipeline contract (e.g. changed method or path)
    #[error("interceptor contract violated: {0}")]
    Contract(String),

    /// An interceptor produced an invalid request, e.g. a malformed header
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error(transparent)]
    Other(BoxError),
}

/// The transport could not complete the call
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Network-level failure (DNS, connect, reset, TLS, ...)
    #[error("connection failed: {0}")]
    Connect(#[source] BoxError),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("response body exceeded {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// Concurrency limit reached, request rejected without being sent
    #[error("transport overloaded")]
    Overloaded,

    #[error("transport failure: {0}")]
    Other(#[source] BoxError),
}

/// Pipeline phase in which an interceptor failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptorStage {
    Request,
    Response,
}

impl fmt::Display for InterceptorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("request"),
            Self::Response => f.write_str("response"),
        }
    }
}

/// Failure of a single [`Connection::invoke`](crate::Connection::invoke) call.
///
/// Client and server error statuses are not failures; they arrive as a
/// normal [`Response`](crate::Response) with the matching classification.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum InvokeError {
    /// The underlying call could not complete
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An interceptor rejected the request or response
    #[error("{stage} interceptor failed: {source}")]
    Interceptor {
        stage: InterceptorStage,
        #[source]
        source: AuthError,
    },

    /// The body could not be encoded; nothing was dispatched
    #[error("request serialization failed: {0}")]
    Serialization(#[from] SerializeError),
}

impl InvokeError {
    pub(crate) fn request_interceptor(source: AuthError) -> Self {
        Self::Interceptor {
            stage: InterceptorStage::Request,
            source,
        }
    }

    pub(crate) fn response_interceptor(source: AuthError) -> Self {
        Self::Interceptor {
            stage: InterceptorStage::Response,
            source,
        }
    }
}
