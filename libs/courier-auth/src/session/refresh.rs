use async_trait::async_trait;
use courier::{AuthError, Connection, HttpMethod, Request, Serializer, StatusClass};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::Session;

/// Default path of the session refresh endpoint
pub const DEFAULT_REFRESH_PATH: &str = "/auth/v1/refresh/token";

/// Exchanges an expiring session for a new one
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the session cannot be refreshed; the caller
    /// treats it as expired.
    async fn refresh(&self, session: &Session) -> Result<Session, AuthError>;
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Refreshes sessions with a `grant_type=refresh_token` form post.
///
/// The call carries the API token (`with_api_token`) but never the session
/// token, so it can run on the connection whose session it refreshes.
pub struct EndpointSessionRefresher {
    connection: Connection,
    path: String,
}

impl EndpointSessionRefresher {
    #[must_use]
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            path: DEFAULT_REFRESH_PATH.to_owned(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

#[async_trait]
impl SessionRefresher for EndpointSessionRefresher {
    async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        let refresh_token = session.refresh_token().ok_or_else(|| {
            AuthError::SessionExpired("session has no refresh token".to_owned())
        })?;

        let request = Request::builder()
            .method(HttpMethod::Post)
            .path(self.path.as_str())
            .serializer(Serializer::UrlEncoded)
            .body(json!({
                "grant_type": "refresh_token",
                "refresh_token": refresh_token,
            }))
            .with_api_token(true)
            .build()
            .map_err(|e| AuthError::Other(Box::new(e)))?;

        let response = self
            .connection
            .invoke(request)
            .await
            .map_err(|e| AuthError::Unauthorized(format!("session refresh failed: {e}")))?;

        if response.status_class() != StatusClass::Success {
            return Err(AuthError::Unauthorized(format!(
                "session refresh returned HTTP {}",
                response.status()
            )));
        }

        let refreshed: RefreshResponse = response
            .json()
            .map_err(|e| AuthError::Unauthorized(format!("invalid refresh response: {e}")))?;

        debug!(rotated = refreshed.refresh_token.is_some(), "session refreshed");

        let mut next = Session::new(refreshed.access_token)
            .with_refresh_token(refreshed.refresh_token.as_deref().unwrap_or(refresh_token));
        if let Some(user_id) = session.user_id() {
            next = next.with_user_id(user_id);
        }
        Ok(next)
    }
}
