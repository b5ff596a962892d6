use std::sync::Arc;

use async_trait::async_trait;
use courier::{AuthError, Authenticator, RawResponse, Request};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{SessionRefresher, SessionStore};

/// Header carrying the user session token
pub const USER_TOKEN_HEADER: &str = "x-authenticated-user-token";

const UNAUTHORIZED: u16 = 401;

/// User-level credential: `x-authenticated-user-token: <session access token>`.
///
/// On a `401` the session is refreshed and persisted, and the response is
/// passed through so the caller can re-issue the call with the new session.
/// When there is nothing to refresh with, or the refresh fails, the session
/// is cleared and the call fails with [`AuthError::SessionExpired`].
///
/// Refreshes are serialized: concurrent `401`s for the same token trigger a
/// single refresh.
#[derive(Clone)]
pub struct SessionAuthenticator {
    sessions: SessionStore,
    refresher: Option<Arc<dyn SessionRefresher>>,
    refresh_lock: Arc<Mutex<()>>,
}

impl SessionAuthenticator {
    #[must_use]
    pub fn new(sessions: SessionStore) -> Self {
        Self {
            sessions,
            refresher: None,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn with_refresher(mut self, refresher: Arc<dyn SessionRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    async fn expire(&self, reason: String) -> AuthError {
        if let Err(e) = self.sessions.clear().await {
            warn!("failed to clear expired session: {e}");
        }
        AuthError::SessionExpired(reason)
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    async fn intercept_request(&self, request: Request) -> Result<Request, AuthError> {
        let session = self
            .sessions
            .load()
            .await?
            .ok_or(AuthError::NoActiveSession)?;
        Ok(request.with_header(USER_TOKEN_HEADER, session.access_token())?)
    }

    async fn intercept_response(
        &self,
        request: &Request,
        response: RawResponse,
    ) -> Result<RawResponse, AuthError> {
        if response.status != UNAUTHORIZED {
            return Ok(response);
        }

        let _guard = self.refresh_lock.lock().await;
        let Some(current) = self.sessions.load().await? else {
            return Err(AuthError::SessionExpired("no session to refresh".to_owned()));
        };

        let sent = request.headers().get(USER_TOKEN_HEADER);
        if sent.is_some_and(|token| token != current.access_token()) {
            // refreshed by a concurrent call since this request went out
            return Ok(response);
        }

        let Some(refresher) = &self.refresher else {
            return Err(self.expire("session rejected and no refresher configured".to_owned()).await);
        };
        if current.refresh_token().is_none() {
            return Err(self.expire("session rejected and has no refresh token".to_owned()).await);
        }

        match refresher.refresh(&current).await {
            Ok(next) => {
                self.sessions.save(&next).await?;
                info!(path = %request.path(), "session refreshed after 401");
                Ok(response)
            }
            Err(e) => {
                warn!(path = %request.path(), "session refresh failed: {e}");
                Err(self.expire(e.to_string()).await)
            }
        }
    }

    fn name(&self) -> &'static str {
        "session"
    }
}
