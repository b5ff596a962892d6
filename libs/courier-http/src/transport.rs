use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Response};
use http_body_util::{BodyExt, Full};
use parking_lot::RwLock;
use serde_json::Value;
use tower::Service;
use tower::buffer::Buffer;
use url::Url;

use courier::{
    BoxError, CONTENT_TYPE_FORM, CONTENT_TYPE_JSON, Headers, HttpMethod, Payload, RawResponse,
    Serializer, Transport, TransportError, form_encode,
};

use crate::builder::HyperTransportBuilder;
use crate::config::TransportSecurity;
use crate::error::{BuildError, map_buffer_error};
use crate::layers::SharedHeaders;

/// Boxed response body; decompressed bodies and raw bodies share this type
pub type ResponseBody = http_body_util::combinators::BoxBody<Bytes, BoxError>;

/// Future type of the inner service
pub type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<Response<ResponseBody>, TransportError>> + Send>>;

/// Buffer<Req, F> in tower 0.5 where Req is the request type and F is the service future type
pub type BufferedService = Buffer<http::Request<Full<Bytes>>, ServiceFuture>;

/// [`Transport`] over a pooled hyper client behind a tower middleware stack.
///
/// Cloning is cheap and clones share the connection pool, the default
/// header set and the active serializer. The transport is `Send + Sync` and
/// safe to share between concurrent invocations without external locking.
///
/// Every HTTP status comes back as a [`RawResponse`]; only transport-level
/// conditions (invalid URL, connect failure, timeout, overload, oversized
/// body) are errors.
///
/// # Example
///
/// ```ignore
/// let transport = HyperTransport::builder()
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// let connection = Connection::new(Arc::new(transport), &config, authenticators);
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    service: BufferedService,
    defaults: SharedHeaders,
    serializer: Arc<RwLock<Serializer>>,
    max_body_size: usize,
    security: TransportSecurity,
}

impl fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperTransport")
            .field("serializer", &*self.serializer.read())
            .field("max_body_size", &self.max_body_size)
            .field("security", &self.security)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a transport with default configuration
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails
    pub fn new() -> Result<Self, BuildError> {
        HyperTransportBuilder::new().build()
    }

    /// Create a builder for configuring the transport
    #[must_use]
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }

    pub(crate) fn from_parts(
        service: BufferedService,
        defaults: SharedHeaders,
        max_body_size: usize,
        security: TransportSecurity,
    ) -> Self {
        Self {
            service,
            defaults,
            serializer: Arc::new(RwLock::new(Serializer::default())),
            max_body_size,
            security,
        }
    }

    /// Serializer most recently announced via `set_serializer`
    #[must_use]
    pub fn serializer(&self) -> Serializer {
        *self.serializer.read()
    }

    /// Snapshot of the transport-level default headers, User-Agent included
    #[must_use]
    pub fn default_headers(&self) -> Headers {
        self.defaults
            .read()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect()
    }

    async fn send(
        &self,
        method: HttpMethod,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        let request = self.build_request(method, base_url, path, headers, payload)?;
        let uri = request.uri().to_string();

        let mut service = self.service.clone();
        try_acquire_buffer_slot(&mut service).await?;
        let response = service.call(request).await.map_err(map_buffer_error)?;

        let raw = read_response(response, self.max_body_size).await?;
        tracing::debug!(method = %method, uri = %uri, status = raw.status, "http exchange complete");
        Ok(raw)
    }

    fn build_request(
        &self,
        method: HttpMethod,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<http::Request<Full<Bytes>>, TransportError> {
        let (query, body) = match payload {
            Some(payload) if method.carries_query() => (query_string(payload)?, None),
            Some(payload) => (None, Some(payload)),
            None => (None, None),
        };

        let url = build_url(base_url, path, query.as_deref(), self.security)?;
        let uri = http::Uri::try_from(url.as_str()).map_err(|e| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut builder = http::Request::builder().method(to_http_method(method)).uri(uri);
        for (name, value) in headers.iter() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Other(Box::new(e)))?;
            let value =
                HeaderValue::from_str(value).map_err(|e| TransportError::Other(Box::new(e)))?;
            builder = builder.header(name, value);
        }

        let bytes = match body {
            Some(body) => {
                let serializer = body_serializer(headers, self.serializer());
                if !headers.contains(CONTENT_TYPE.as_str()) {
                    builder = builder.header(CONTENT_TYPE, serializer.content_type());
                }
                let encoded = serializer
                    .encode(body)
                    .map_err(|e| TransportError::Other(Box::new(e)))?;
                Bytes::from(encoded)
            }
            None => Bytes::new(),
        };

        builder
            .body(Full::new(bytes))
            .map_err(|e| TransportError::Other(Box::new(e)))
    }
}

#[async_trait]
impl Transport for HyperTransport {
    fn set_serializer(&self, serializer: Serializer) {
        *self.serializer.write() = serializer;
    }

    fn add_headers(&self, headers: &Headers) {
        let mut defaults = self.defaults.write();
        for (name, value) in headers.iter() {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    defaults.insert(name, value);
                }
                _ => tracing::warn!(header = name, "skipping invalid default header"),
            }
        }
    }

    async fn get(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.send(HttpMethod::Get, base_url, path, headers, payload)
            .await
    }

    async fn post(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.send(HttpMethod::Post, base_url, path, headers, payload)
            .await
    }

    async fn patch(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.send(HttpMethod::Patch, base_url, path, headers, payload)
            .await
    }

    async fn put(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.send(HttpMethod::Put, base_url, path, headers, payload)
            .await
    }

    async fn delete(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.send(HttpMethod::Delete, base_url, path, headers, payload)
            .await
    }

    async fn head(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.send(HttpMethod::Head, base_url, path, headers, payload)
            .await
    }
}

fn to_http_method(method: HttpMethod) -> http::Method {
    match method {
        HttpMethod::Get => http::Method::GET,
        HttpMethod::Post => http::Method::POST,
        HttpMethod::Patch => http::Method::PATCH,
        HttpMethod::Put => http::Method::PUT,
        HttpMethod::Delete => http::Method::DELETE,
        HttpMethod::Head => http::Method::HEAD,
    }
}

/// Join `base_url` and `path` with exactly one slash, append `query`, and
/// check the scheme against the security mode.
fn build_url(
    base_url: &str,
    path: &str,
    query: Option<&str>,
    security: TransportSecurity,
) -> Result<Url, TransportError> {
    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let invalid = |reason: String| TransportError::InvalidUrl {
        url: joined.clone(),
        reason,
    };

    let mut url = Url::parse(&joined).map_err(|e| invalid(e.to_string()))?;

    match url.scheme() {
        "https" => {}
        "http" if security == TransportSecurity::AllowInsecureHttp => {}
        "http" => {
            return Err(invalid(
                "HTTPS required (transport security is TlsOnly)".to_owned(),
            ));
        }
        other => {
            return Err(invalid(format!(
                "unsupported scheme '{other}'; only http and https are supported"
            )));
        }
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_owned()));
    }

    if let Some(query) = query.filter(|q| !q.is_empty()) {
        let merged = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{query}"),
            _ => query.to_owned(),
        };
        url.set_query(Some(&merged));
    }
    Ok(url)
}

/// Payload of a GET/HEAD/DELETE as a query string.
///
/// Structured payloads must be flat objects; text payloads are taken as an
/// already-encoded query.
fn query_string(payload: &Payload) -> Result<Option<String>, TransportError> {
    match payload {
        Payload::Text(text) => Ok(Some(text.trim_start_matches('?').to_owned())),
        Payload::Structured(Value::Null) => Ok(None),
        Payload::Structured(Value::Object(map)) => form_encode(map)
            .map(Some)
            .map_err(|e| TransportError::Other(Box::new(e))),
        Payload::Structured(_) => Err(TransportError::Other(
            "query parameters must be a flat object".into(),
        )),
    }
}

/// Encoding for a request body.
///
/// An explicit `Content-Type` on the request wins over the serializer
/// announced via `set_serializer`, which is shared by every caller of the
/// transport.
fn body_serializer(headers: &Headers, active: Serializer) -> Serializer {
    match headers.get(CONTENT_TYPE.as_str()) {
        Some(ct) if ct.starts_with(CONTENT_TYPE_FORM) => Serializer::UrlEncoded,
        Some(ct) if ct.starts_with(CONTENT_TYPE_JSON) => Serializer::Json,
        _ => active,
    }
}

/// Try to acquire a buffer slot with fail-fast semantics.
///
/// If the buffer is full, returns `TransportError::Overloaded` immediately
/// instead of waiting.
async fn try_acquire_buffer_slot(service: &mut BufferedService) -> Result<(), TransportError> {
    use std::task::Poll;

    let poll_result = std::future::poll_fn(|cx| match service.poll_ready(cx) {
        Poll::Ready(result) => Poll::Ready(Some(result)),
        Poll::Pending => Poll::Ready(None),
    })
    .await;

    match poll_result {
        Some(Ok(())) => Ok(()),
        Some(Err(e)) => Err(map_buffer_error(e)),
        None => Err(TransportError::Overloaded),
    }
}

/// Read the (decompressed) body with a byte limit and copy status and headers.
async fn read_response(
    response: Response<ResponseBody>,
    limit: usize,
) -> Result<RawResponse, TransportError> {
    let (parts, body) = response.into_parts();

    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(TransportError::Other)?;
        if let Some(chunk) = frame.data_ref() {
            if collected.len() + chunk.len() > limit {
                return Err(TransportError::BodyTooLarge { limit });
            }
            collected.extend_from_slice(chunk);
        }
    }

    Ok(RawResponse {
        status: parts.status.as_u16(),
        headers: copy_headers(&parts.headers),
        body: Bytes::from(collected),
    })
}

/// Repeated header values are joined with `", "`
fn copy_headers(map: &HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        let value = String::from_utf8_lossy(value.as_bytes());
        let merged = match headers.get(name.as_str()) {
            Some(existing) => format!("{existing}, {value}"),
            None => value.into_owned(),
        };
        headers.insert(name.as_str(), merged);
    }
    headers
}
