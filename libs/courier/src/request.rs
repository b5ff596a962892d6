use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::auth::SharedAuthenticator;
use crate::error::RequestError;
use crate::headers::Headers;
use crate::serializer::Serializer;

/// HTTP method of a request descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Patch,
    Put,
    Delete,
    Head,
}

impl HttpMethod {
    /// Uppercase wire representation
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }

    /// Whether a payload travels as query parameters rather than as a body
    #[must_use]
    pub fn carries_query(self) -> bool {
        matches!(self, Self::Get | Self::Head | Self::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body, before or after serialization.
///
/// Builders produce [`Payload::Structured`]; the URL-encoded serializer turns
/// it into [`Payload::Text`], the JSON serializer keeps it structured and leaves
/// the byte encoding to the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Structured(Value),
    Text(String),
}

impl Payload {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Structured(_) => None,
        }
    }

    #[must_use]
    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Text(_) => None,
        }
    }
}

/// Ordered authenticator lists attached to a request.
///
/// Written by the connection during resolution; read-only for everyone else.
#[derive(Clone, Default)]
pub(crate) struct AuthenticatorChain {
    pub(crate) authenticators: Vec<SharedAuthenticator>,
    pub(crate) request_interceptors: Vec<SharedAuthenticator>,
    pub(crate) response_interceptors: Vec<SharedAuthenticator>,
}

impl AuthenticatorChain {
    /// Register `authenticator` in all three roles
    pub(crate) fn attach(&mut self, authenticator: &SharedAuthenticator) {
        self.authenticators.push(Arc::clone(authenticator));
        self.request_interceptors.push(Arc::clone(authenticator));
        self.response_interceptors.push(Arc::clone(authenticator));
    }
}

/// Immutable description of a single call.
///
/// Built with [`Request::builder`]. Outside the crate a request can only be
/// read or extended with headers (which is what credential-injecting
/// interceptors need); method and path are fixed at build time.
#[derive(Clone)]
pub struct Request {
    method: HttpMethod,
    path: String,
    host: Option<String>,
    headers: Headers,
    body: Option<Payload>,
    serializer: Serializer,
    requires_api_token: bool,
    requires_session_token: bool,
    chain: AuthenticatorChain,
}

impl Request {
    /// Start building a request
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Base URL override; the connection's configured base URL applies when `None`
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&Payload> {
        self.body.as_ref()
    }

    #[must_use]
    pub fn serializer(&self) -> Serializer {
        self.serializer
    }

    #[must_use]
    pub fn requires_api_token(&self) -> bool {
        self.requires_api_token
    }

    #[must_use]
    pub fn requires_session_token(&self) -> bool {
        self.requires_session_token
    }

    #[must_use]
    pub fn authenticators(&self) -> &[SharedAuthenticator] {
        &self.chain.authenticators
    }

    #[must_use]
    pub fn request_interceptors(&self) -> &[SharedAuthenticator] {
        &self.chain.request_interceptors
    }

    #[must_use]
    pub fn response_interceptors(&self) -> &[SharedAuthenticator] {
        &self.chain.response_interceptors
    }

    /// Return this request with one more header (replacing a previous value)
    ///
    /// # Errors
    ///
    /// [`RequestError::InvalidHeader`] when the name or value is not valid HTTP.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl Into<String>,
    ) -> Result<Self, RequestError> {
        let value = value.into();
        validate_header(name.as_ref(), &value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Return this request with `headers` merged in
    ///
    /// # Errors
    ///
    /// [`RequestError::InvalidHeader`] for the first invalid entry; the
    /// request is not modified in that case.
    pub fn with_headers(mut self, headers: &Headers) -> Result<Self, RequestError> {
        for (name, value) in headers.iter() {
            validate_header(name, value)?;
        }
        self.headers.extend(headers);
        Ok(self)
    }

    pub(crate) fn chain(&self) -> &AuthenticatorChain {
        &self.chain
    }

    pub(crate) fn set_chain(&mut self, chain: AuthenticatorChain) {
        self.chain = chain;
    }

    pub(crate) fn take_body(&mut self) -> Option<Payload> {
        self.body.take()
    }

    pub(crate) fn set_body(&mut self, body: Payload) {
        self.body = Some(body);
    }

    pub(crate) fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("host", &self.host)
            .field("header_names", &self.headers.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .field("has_body", &self.body.is_some())
            .field("serializer", &self.serializer)
            .field("requires_api_token", &self.requires_api_token)
            .field("requires_session_token", &self.requires_session_token)
            .field("authenticators", &self.chain.authenticators.len())
            .finish_non_exhaustive()
    }
}

/// Check that a header would survive the trip onto the wire
fn validate_header(name: &str, value: &str) -> Result<(), RequestError> {
    let invalid = |source: http::Error| RequestError::InvalidHeader {
        name: name.to_owned(),
        source,
    };
    http::header::HeaderName::try_from(name.trim()).map_err(|e| invalid(e.into()))?;
    http::header::HeaderValue::try_from(value).map_err(|e| invalid(e.into()))?;
    Ok(())
}

/// Fluent builder for [`Request`].
///
/// Body conversion errors from [`json_body`](Self::json_body) and invalid
/// headers are captured and reported by [`build`](Self::build).
#[derive(Default)]
#[must_use = "RequestBuilder does nothing until .build() is called"]
pub struct RequestBuilder {
    method: HttpMethod,
    path: Option<String>,
    host: Option<String>,
    headers: Headers,
    body: Option<Payload>,
    serializer: Serializer,
    requires_api_token: bool,
    requires_session_token: bool,
    chain: AuthenticatorChain,
    error: Option<RequestError>,
}

impl RequestBuilder {
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Relative resource path (required)
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Override the connection's base URL for this request
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Add a header; an invalid name or value is reported by [`build`](Self::build)
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        let value = value.into();
        match validate_header(name.as_ref(), &value) {
            Ok(()) => {
                self.headers.insert(name, value);
            }
            Err(e) => self.record_error(e),
        }
        self
    }

    pub fn headers(mut self, headers: &Headers) -> Self {
        for (name, value) in headers.iter() {
            match validate_header(name, value) {
                Ok(()) => {
                    self.headers.insert(name, value);
                }
                Err(e) => self.record_error(e),
            }
        }
        self
    }

    /// Structured body, serialized at dispatch time by the selected serializer
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(Payload::Structured(body));
        self
    }

    /// Structured body from any serializable value
    pub fn json_body<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => self.body = Some(Payload::Structured(value)),
            Err(e) => self.record_error(RequestError::InvalidBody(e)),
        }
        self
    }

    /// Pre-encoded body, sent verbatim
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(Payload::Text(body.into()));
        self
    }

    pub fn serializer(mut self, serializer: Serializer) -> Self {
        self.serializer = serializer;
        self
    }

    /// Attach the connection's default API authenticators at dispatch
    pub fn with_api_token(mut self, required: bool) -> Self {
        self.requires_api_token = required;
        self
    }

    /// Attach the connection's default session authenticators at dispatch
    pub fn with_session_token(mut self, required: bool) -> Self {
        self.requires_session_token = required;
        self
    }

    /// Register an authenticator in all three roles
    pub fn authenticator(mut self, authenticator: SharedAuthenticator) -> Self {
        self.chain.attach(&authenticator);
        self
    }

    pub fn request_interceptor(mut self, interceptor: SharedAuthenticator) -> Self {
        self.chain.request_interceptors.push(interceptor);
        self
    }

    pub fn response_interceptor(mut self, interceptor: SharedAuthenticator) -> Self {
        self.chain.response_interceptors.push(interceptor);
        self
    }

    /// First error wins
    fn record_error(&mut self, error: RequestError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Freeze the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::MissingPath`] when no (or an empty) path was set,
    /// [`RequestError::InvalidBody`] when a body could not be converted and
    /// [`RequestError::InvalidHeader`] when a header is not valid HTTP.
    pub fn build(self) -> Result<Request, RequestError> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let path = self
            .path
            .filter(|p| !p.trim().is_empty())
            .ok_or(RequestError::MissingPath)?;

        Ok(Request {
            method: self.method,
            path,
            host: self.host,
            headers: self.headers,
            body: self.body,
            serializer: self.serializer,
            requires_api_token: self.requires_api_token,
            requires_session_token: self.requires_session_token,
            chain: self.chain,
        })
    }
}
