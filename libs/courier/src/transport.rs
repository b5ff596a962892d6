use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;
use crate::headers::Headers;
use crate::request::{HttpMethod, Payload};
use crate::serializer::Serializer;

/// Response as returned by a transport, before any interceptor or
/// normalization step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl RawResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Network collaborator performing the actual I/O.
///
/// One operation per HTTP method. For `get`, `head` and `delete` a payload is
/// sent as query parameters; for the others it is the request body.
/// Implementations are shared by every clone of a connection, so the two
/// configuration hooks take `&self`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Serializer of the call about to be dispatched
    fn set_serializer(&self, serializer: Serializer);

    /// Headers applied to every subsequent call (request headers win)
    fn add_headers(&self, headers: &Headers);

    async fn get(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError>;

    async fn post(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError>;

    async fn patch(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError>;

    async fn put(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError>;

    async fn delete(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError>;

    async fn head(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError>;
}

/// Route a call to the single transport operation matching `method`.
///
/// # Errors
///
/// Whatever the selected operation returns.
pub async fn dispatch(
    transport: &dyn Transport,
    method: HttpMethod,
    base_url: &str,
    path: &str,
    headers: &Headers,
    payload: Option<&Payload>,
) -> Result<RawResponse, TransportError> {
    match method {
        HttpMethod::Get => transport.get(base_url, path, headers, payload).await,
        HttpMethod::Post => transport.post(base_url, path, headers, payload).await,
        HttpMethod::Patch => transport.patch(base_url, path, headers, payload).await,
        HttpMethod::Put => transport.put(base_url, path, headers, payload).await,
        HttpMethod::Delete => transport.delete(base_url, path, headers, payload).await,
        HttpMethod::Head => transport.head(base_url, path, headers, payload).await,
    }
}
