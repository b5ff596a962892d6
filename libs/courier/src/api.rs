//! Typed facade for business handlers.
//!
//! [`Connection::invoke`] leaves status handling to the caller. `ApiService`
//! is the usual caller: it turns a `Success` envelope into a typed value and
//! every other classification into an [`ApiError`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::connection::Connection;
use crate::error::{InvokeError, RequestError};
use crate::request::Request;
use crate::response::{ResponseBody, StatusClass};

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    #[error("client error {status}")]
    Client { status: u16, body: ResponseBody },

    #[error("server error {status}")]
    Server { status: u16, body: ResponseBody },

    #[error("unexpected status {status}")]
    UnexpectedStatus { status: u16, body: ResponseBody },

    /// The request could not be built
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// Status code of a classified failure, `None` for every other error
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Client { status, .. }
            | Self::Server { status, .. }
            | Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Request(_) | Self::Invoke(_) | Self::Decode(_) => None,
        }
    }
}

/// Shape of a business request handler (telemetry sync, page fetch, ...)
#[async_trait]
pub trait ApiRequestHandler<Req, Res>: Send + Sync
where
    Req: Send + 'static,
{
    /// # Errors
    ///
    /// Returns [`ApiError`] when the underlying call fails or is rejected.
    async fn handle(&self, request: Req) -> Result<Res, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ApiService {
    connection: Connection,
}

impl ApiService {
    #[must_use]
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Invoke `request` and decode a successful body into `T`.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Client`] / [`ApiError::Server`] / [`ApiError::UnexpectedStatus`]
    ///   for non-success classifications
    /// - [`ApiError::Invoke`] when the pipeline fails
    /// - [`ApiError::Decode`] when the body does not match `T`
    pub async fn fetch<T: DeserializeOwned>(&self, request: Request) -> Result<T, ApiError> {
        let response = self.connection.invoke(request).await?;
        let status = response.status();
        match response.status_class() {
            StatusClass::Success => response.into_body().deserialize().map_err(ApiError::Decode),
            StatusClass::ClientError => Err(ApiError::Client {
                status,
                body: response.into_body(),
            }),
            StatusClass::ServerError => Err(ApiError::Server {
                status,
                body: response.into_body(),
            }),
            StatusClass::Unknown => {
                debug!(status, "unclassified status");
                Err(ApiError::UnexpectedStatus {
                    status,
                    body: response.into_body(),
                })
            }
        }
    }
}
