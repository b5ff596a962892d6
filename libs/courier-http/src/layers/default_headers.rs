use std::sync::Arc;
use std::task::{Context, Poll};

use http::{HeaderMap, HeaderValue, Request, Response};
use parking_lot::RwLock;
use tower::{Layer, Service};

/// Header set shared between the transport and every clone of the stack
pub type SharedHeaders = Arc<RwLock<HeaderMap>>;

/// Tower layer that adds transport-level default headers to all requests.
///
/// The header set is shared, so headers added after the stack is built
/// (via `Transport::add_headers`) apply to subsequent requests. A header
/// the request already carries is never overwritten.
#[derive(Clone)]
pub struct DefaultHeadersLayer {
    defaults: SharedHeaders,
}

impl DefaultHeadersLayer {
    /// Create a layer seeded with a User-Agent.
    ///
    /// # Errors
    /// Returns `InvalidHeaderValue` if the user agent string is not valid
    pub fn try_new(
        user_agent: impl AsRef<str>,
    ) -> Result<Self, http::header::InvalidHeaderValue> {
        let user_agent = HeaderValue::from_str(user_agent.as_ref())?;
        let mut defaults = HeaderMap::new();
        defaults.insert(http::header::USER_AGENT, user_agent);
        Ok(Self {
            defaults: Arc::new(RwLock::new(defaults)),
        })
    }

    /// Handle for updating the defaults after the layer was applied
    #[must_use]
    pub fn shared(&self) -> SharedHeaders {
        Arc::clone(&self.defaults)
    }
}

impl<S> Layer<S> for DefaultHeadersLayer {
    type Service = DefaultHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DefaultHeadersService {
            inner,
            defaults: Arc::clone(&self.defaults),
        }
    }
}

/// Service that adds default headers to requests
#[derive(Clone)]
pub struct DefaultHeadersService<S> {
    inner: S,
    defaults: SharedHeaders,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for DefaultHeadersService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        {
            let defaults = self.defaults.read();
            for (name, value) in &*defaults {
                if !req.headers().contains_key(name) {
                    req.headers_mut().insert(name.clone(), value.clone());
                }
            }
        }
        self.inner.call(req)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use http_body_util::Full;
    use tower::ServiceExt;

    /// Test service that echoes the request headers back as the response headers.
    #[derive(Clone)]
    struct EchoHeaders;

    impl Service<Request<Full<Bytes>>> for EchoHeaders {
        type Response = Response<Full<Bytes>>;
        type Error = Box<dyn std::error::Error + Send + Sync>;
        type Future = std::future::Ready<Result<Self::Response, Self::Error>>;

        fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
            let mut response = Response::builder()
                .status(StatusCode::OK)
                .body(Full::new(Bytes::new()))
                .unwrap();
            *response.headers_mut() = req.headers().clone();
            std::future::ready(Ok(response))
        }
    }

    fn request() -> http::request::Builder {
        Request::builder().method(Method::GET).uri("http://example.com")
    }

    #[tokio::test]
    async fn test_user_agent_added() {
        let layer = DefaultHeadersLayer::try_new("test-agent/1.0").unwrap();
        let service = layer.layer(EchoHeaders);

        let resp = service
            .oneshot(request().body(Full::new(Bytes::new())).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.headers()[http::header::USER_AGENT], "test-agent/1.0");
    }

    #[tokio::test]
    async fn test_request_headers_not_overwritten() {
        let layer = DefaultHeadersLayer::try_new("test-agent/1.0").unwrap();
        layer
            .shared()
            .write()
            .insert("x-channel-id", HeaderValue::from_static("default"));
        let service = layer.layer(EchoHeaders);

        let req = request()
            .header(http::header::USER_AGENT, "custom-agent/2.0")
            .header("x-channel-id", "per-request")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let resp = service.oneshot(req).await.unwrap();

        assert_eq!(resp.headers()[http::header::USER_AGENT], "custom-agent/2.0");
        assert_eq!(resp.headers()["x-channel-id"], "per-request");
    }

    #[tokio::test]
    async fn test_headers_added_after_layering_apply() {
        let layer = DefaultHeadersLayer::try_new("test-agent/1.0").unwrap();
        let service = layer.layer(EchoHeaders);

        layer
            .shared()
            .write()
            .insert("x-app-id", HeaderValue::from_static("producer"));

        let resp = service
            .oneshot(request().body(Full::new(Bytes::new())).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.headers()["x-app-id"], "producer");
    }

    #[test]
    fn test_invalid_user_agent() {
        // Control characters are invalid in header values
        assert!(DefaultHeadersLayer::try_new("invalid\x00agent").is_err());
    }
}
