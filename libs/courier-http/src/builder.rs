use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tower::buffer::Buffer;
use tower::limit::ConcurrencyLimitLayer;
use tower::load_shed::LoadShedLayer;
use tower::timeout::TimeoutLayer;
use tower::util::BoxCloneService;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::decompression::DecompressionLayer;

use courier::TransportError;

use crate::config::{HttpTransportConfig, TransportSecurity};
use crate::error::{BuildError, map_load_shed_error, map_tower_error};
use crate::layers::DefaultHeadersLayer;
use crate::tls;
use crate::transport::{BufferedService, HyperTransport, ResponseBody};

/// Type-erased inner service between layer composition steps in [`HyperTransportBuilder::build`].
type InnerService =
    BoxCloneService<http::Request<Full<Bytes>>, http::Response<ResponseBody>, TransportError>;

/// Builder for a [`HyperTransport`] with a layered tower middleware stack.
#[derive(Debug, Clone, Default)]
pub struct HyperTransportBuilder {
    config: HttpTransportConfig,
}

impl HyperTransportBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with a specific configuration
    #[must_use]
    pub fn with_config(config: HttpTransportConfig) -> Self {
        Self { config }
    }

    /// Set the per-request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the maximum response body size
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Cap in-flight requests; excess requests fail with `Overloaded`
    #[must_use]
    pub fn max_concurrent_requests(mut self, limit: usize) -> Self {
        self.config.max_concurrent_requests = Some(limit);
        self
    }

    /// Set the transport security mode
    #[must_use]
    pub fn transport_security(mut self, security: TransportSecurity) -> Self {
        self.config.transport_security = security;
        self
    }

    /// Allow plain `http://` URLs
    #[must_use]
    pub fn allow_insecure_http(mut self) -> Self {
        self.config.transport_security = TransportSecurity::AllowInsecureHttp;
        self
    }

    /// Build the transport.
    ///
    /// Must be called from within a tokio runtime: the buffer worker is
    /// spawned here.
    ///
    /// # Errors
    /// Returns [`BuildError`] if TLS initialization fails or the User-Agent
    /// is not a valid header value
    pub fn build(self) -> Result<HyperTransport, BuildError> {
        if self.config.transport_security == TransportSecurity::AllowInsecureHttp {
            tracing::warn!(
                "insecure HTTP enabled (TransportSecurity::AllowInsecureHttp); \
                 use only against local or test backends"
            );
        }

        let timeout = self.config.request_timeout;
        let https = tls::build_https_connector(self.config.transport_security)?;

        let mut client_builder = Client::builder(TokioExecutor::new());
        // pool_timer is required for pool_idle_timeout to take effect
        client_builder
            .pool_timer(TokioTimer::new())
            .pool_max_idle_per_host(self.config.pool_max_idle_per_host)
            .http2_only(false);
        if let Some(idle_timeout) = self.config.pool_idle_timeout {
            client_builder.pool_idle_timeout(idle_timeout);
        }
        let hyper_client = client_builder.build::<_, Full<Bytes>>(https);

        let headers_layer = DefaultHeadersLayer::try_new(&self.config.user_agent)?;
        let defaults = headers_layer.shared();

        // Request flow (outer to inner):
        //   Buffer -> LoadShed/Concurrency -> ErrorMapping -> Timeout ->
        //   DefaultHeaders -> Decompression -> hyper_client
        //
        // Every HTTP status is an Ok response here; only transport, timeout
        // and overload conditions are errors.
        let service = ServiceBuilder::new()
            .layer(TimeoutLayer::new(timeout))
            .layer(headers_layer)
            .layer(DecompressionLayer::new())
            .service(hyper_client)
            .map_response(map_decompression_response)
            .map_err(move |e: tower::BoxError| map_tower_error(e, timeout));

        let mut boxed_service: InnerService = service.boxed_clone();

        if let Some(limit) = self.config.max_concurrent_requests {
            let limited_service = ServiceBuilder::new()
                .layer(LoadShedLayer::new())
                .layer(ConcurrencyLimitLayer::new(limit.max(1)))
                .service(boxed_service)
                .map_err(map_load_shed_error);
            boxed_service = limited_service.boxed_clone();
        }

        let buffered_service: BufferedService =
            Buffer::new(boxed_service, self.config.buffer_capacity.max(1));

        tracing::debug!(
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            max_body_size = self.config.max_body_size,
            "hyper transport built"
        );

        Ok(HyperTransport::from_parts(
            buffered_service,
            defaults,
            self.config.max_body_size,
            self.config.transport_security,
        ))
    }
}

/// Box the decompression body so every layer above sees one body type
fn map_decompression_response<B>(response: http::Response<B>) -> http::Response<ResponseBody>
where
    B: http_body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = response.into_parts();
    let boxed_body: ResponseBody = body.map_err(Into::into).boxed();
    http::Response::from_parts(parts, boxed_body)
}
