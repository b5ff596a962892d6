use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AuthError;
use crate::request::Request;
use crate::transport::RawResponse;

/// Credential capability plugged into the invocation pipeline.
///
/// An authenticator plays up to two roles: as a request interceptor it may
/// add headers (credentials) to an outgoing request, as a response interceptor
/// it may inspect or replace the raw response (e.g. react to a `401`).
/// Both operations default to identity, so a pure request- or
/// response-interceptor only implements one of them.
///
/// The connection never inspects concrete types; every authenticator is
/// treated the same way. Instances are shared across concurrent invocations,
/// so any internal cache must be safe for concurrent use.
///
/// # Contract
///
/// `intercept_request` must not change the request method or path. The
/// connection rejects such a request with [`AuthError::Contract`].
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Rewrite an outgoing request, typically by adding credential headers.
    ///
    /// # Errors
    ///
    /// Any error aborts the invocation before dispatch.
    async fn intercept_request(&self, request: Request) -> Result<Request, AuthError> {
        Ok(request)
    }

    /// Inspect or transform a raw response.
    ///
    /// `request` is the request as it stood after all request interceptors ran.
    ///
    /// # Errors
    ///
    /// Any error aborts the remaining response interceptors and the invocation.
    async fn intercept_response(
        &self,
        _request: &Request,
        response: RawResponse,
    ) -> Result<RawResponse, AuthError> {
        Ok(response)
    }

    /// Short name used in logs
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Authenticators are shared between requests and connections
pub type SharedAuthenticator = Arc<dyn Authenticator>;
