use std::time::Duration;

use courier::{BoxError, TransportError};
use thiserror::Error;

/// Failure to assemble a [`HyperTransport`](crate::HyperTransport)
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BuildError {
    /// TLS initialization failed
    #[error("TLS initialization failed: {0}")]
    Tls(#[source] BoxError),

    /// Configured User-Agent is not a valid header value
    #[error("invalid user agent: {0}")]
    InvalidUserAgent(#[from] http::header::InvalidHeaderValue),
}

/// Map errors coming out of the tower stack onto [`TransportError`].
///
/// - `Elapsed` from the timeout layer becomes `Timeout`
/// - errors the stack already produced as `TransportError` pass through
/// - hyper connect failures become `Connect`
/// - anything else is `Other`
pub fn map_tower_error(err: BoxError, timeout: Duration) -> TransportError {
    if err.is::<tower::timeout::error::Elapsed>() {
        return TransportError::Timeout(timeout);
    }

    let err = match err.downcast::<TransportError>() {
        Ok(transport_err) => return *transport_err,
        Err(err) => err,
    };

    match err.downcast::<hyper_util::client::legacy::Error>() {
        Ok(hyper_err) if hyper_err.is_connect() => TransportError::Connect(hyper_err),
        Ok(hyper_err) => TransportError::Other(hyper_err),
        Err(err) => TransportError::Other(err),
    }
}

/// Map load-shed rejections onto [`TransportError::Overloaded`]
pub fn map_load_shed_error(err: BoxError) -> TransportError {
    if err.is::<tower::load_shed::error::Overloaded>() {
        return TransportError::Overloaded;
    }
    match err.downcast::<TransportError>() {
        Ok(transport_err) => *transport_err,
        Err(err) => TransportError::Other(err),
    }
}

/// Map errors from the buffer worker onto [`TransportError`]
pub fn map_buffer_error(err: BoxError) -> TransportError {
    match err.downcast::<TransportError>() {
        Ok(transport_err) => *transport_err,
        Err(err) => {
            tracing::error!(error = %err, "buffer worker closed unexpectedly");
            TransportError::Other(err)
        }
    }
}
