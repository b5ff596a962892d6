use std::fmt;
use std::sync::Arc;

use tracing::{Span, debug, field, warn};

use crate::auth::SharedAuthenticator;
use crate::config::ConnectionConfig;
use crate::error::{AuthError, InvokeError};
use crate::request::{AuthenticatorChain, Request};
use crate::response::Response;
use crate::transport::{self, Transport};

/// Authenticators attached to requests that ask for them with
/// [`with_api_token`](crate::RequestBuilder::with_api_token) or
/// [`with_session_token`](crate::RequestBuilder::with_session_token)
#[derive(Clone, Default)]
pub struct DefaultAuthenticators {
    pub api: Vec<SharedAuthenticator>,
    pub session: Vec<SharedAuthenticator>,
}

impl DefaultAuthenticators {
    #[must_use]
    pub fn new(api: Vec<SharedAuthenticator>, session: Vec<SharedAuthenticator>) -> Self {
        Self { api, session }
    }
}

impl fmt::Debug for DefaultAuthenticators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |list: &[SharedAuthenticator]| list.iter().map(|a| a.name()).collect::<Vec<_>>();
        f.debug_struct("DefaultAuthenticators")
            .field("api", &names(&self.api))
            .field("session", &names(&self.session))
            .finish()
    }
}

struct ConnectionInner {
    transport: Arc<dyn Transport>,
    base_url: String,
    defaults: DefaultAuthenticators,
}

/// Invocation pipeline over a [`Transport`].
///
/// Cheap to clone; clones share the transport and default authenticators.
/// The connection keeps no per-call state, so concurrent `invoke` calls do
/// not interfere with each other.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    /// Build a connection and hand the configured pipeline-level headers to
    /// the transport.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        config: &ConnectionConfig,
        authenticators: DefaultAuthenticators,
    ) -> Self {
        transport.add_headers(&config.default_headers());
        debug!(
            base_url = %config.base_url,
            api_authenticators = authenticators.api.len(),
            session_authenticators = authenticators.session.len(),
            "connection created"
        );
        Self {
            inner: Arc::new(ConnectionInner {
                transport,
                base_url: config.base_url.clone(),
                defaults: authenticators,
            }),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Run one request through the pipeline.
    ///
    /// In order: default authenticators are attached according to the
    /// request flags, request interceptors run one after another, the body is
    /// serialized, exactly one transport operation is called, response
    /// interceptors run one after another and the raw response is normalized.
    ///
    /// Response interceptors see the request as it stood after the last
    /// request interceptor, before body serialization.
    ///
    /// # Errors
    ///
    /// - [`InvokeError::Interceptor`] when an interceptor fails or breaks its
    ///   contract; the remaining interceptors do not run.
    /// - [`InvokeError::Serialization`] when the body cannot be encoded;
    ///   nothing is dispatched.
    /// - [`InvokeError::Transport`] when the call itself fails.
    ///
    /// `4xx`/`5xx` responses are not errors.
    #[tracing::instrument(
        name = "courier.invoke",
        skip_all,
        fields(method = %request.method(), path = %request.path(), status = field::Empty)
    )]
    pub async fn invoke(&self, request: Request) -> Result<Response, InvokeError> {
        match self.run(request).await {
            Ok(response) => {
                Span::current().record("status", response.status());
                debug!(class = ?response.status_class(), "invocation completed");
                Ok(response)
            }
            Err(e) => {
                warn!(error = %e, "invocation failed");
                Err(e)
            }
        }
    }

    async fn run(&self, request: Request) -> Result<Response, InvokeError> {
        let request = self.resolve(request);
        let request = Self::pre_process(request).await?;

        let mut outgoing = request.clone();
        let serializer = outgoing.serializer();
        self.inner.transport.set_serializer(serializer);
        if let Some(body) = outgoing.take_body() {
            outgoing.set_body(serializer.serialize(body)?);
            // query-string payloads carry no entity
            if !outgoing.method().carries_query() {
                outgoing
                    .headers_mut()
                    .insert("content-type", serializer.content_type());
            }
            debug!(?serializer, "body serialized");
        }

        let base_url = outgoing.host().unwrap_or(self.inner.base_url.as_str());
        let mut raw = transport::dispatch(
            self.inner.transport.as_ref(),
            outgoing.method(),
            base_url,
            outgoing.path(),
            outgoing.headers(),
            outgoing.body(),
        )
        .await?;
        debug!(status = raw.status, "transport returned");

        for interceptor in &request.chain().response_interceptors {
            raw = interceptor
                .intercept_response(&request, raw)
                .await
                .map_err(InvokeError::response_interceptor)?;
        }

        Ok(Response::normalize(raw, outgoing))
    }

    /// Attach default authenticators per flag, in all three roles.
    ///
    /// An authenticator selected by both flags is attached twice.
    fn resolve(&self, mut request: Request) -> Request {
        let mut chain: AuthenticatorChain = request.chain().clone();
        if request.requires_api_token() {
            for authenticator in &self.inner.defaults.api {
                chain.attach(authenticator);
            }
        }
        if request.requires_session_token() {
            for authenticator in &self.inner.defaults.session {
                chain.attach(authenticator);
            }
        }
        debug!(
            authenticators = chain.authenticators.len(),
            request_interceptors = chain.request_interceptors.len(),
            response_interceptors = chain.response_interceptors.len(),
            "authenticators resolved"
        );
        request.set_chain(chain);
        request
    }

    async fn pre_process(mut request: Request) -> Result<Request, InvokeError> {
        let chain = request.chain().clone();
        let method = request.method();
        let path = request.path().to_owned();

        for interceptor in &chain.request_interceptors {
            request = interceptor
                .intercept_request(request)
                .await
                .map_err(InvokeError::request_interceptor)?;

            if request.method() != method || request.path() != path {
                return Err(InvokeError::request_interceptor(AuthError::Contract(format!(
                    "{} changed the request method or path",
                    interceptor.name()
                ))));
            }
            // resolved lists are frozen after resolution
            request.set_chain(chain.clone());
        }
        Ok(request)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.inner.base_url)
            .field("defaults", &self.inner.defaults)
            .finish_non_exhaustive()
    }
}
