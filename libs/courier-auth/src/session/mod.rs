//! User session credentials.

mod authenticator;
mod refresh;

pub use authenticator::{SessionAuthenticator, USER_TOKEN_HEADER};
pub use refresh::{DEFAULT_REFRESH_PATH, EndpointSessionRefresher, SessionRefresher};

use std::fmt;
use std::sync::Arc;

use courier::AuthError;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::store::KeyValueStore;

/// Storage key of the persisted session
pub const SESSION_KEY: &str = "session";

/// Logged-in user session.
///
/// `Debug` never prints the tokens; buffers are zeroed on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Session {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            user_id: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// JSON persistence of the current [`Session`] in a [`KeyValueStore`]
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] when the store fails or holds a
    /// malformed session.
    pub async fn load(&self) -> Result<Option<Session>, AuthError> {
        let Some(raw) = self.store.get(SESSION_KEY).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| AuthError::Storage(format!("stored session is malformed: {e}")))
    }

    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] when the session cannot be written.
    pub async fn save(&self, session: &Session) -> Result<(), AuthError> {
        let raw = zeroize::Zeroizing::new(
            serde_json::to_string(session)
                .map_err(|e| AuthError::Storage(format!("session encoding failed: {e}")))?,
        );
        self.store.put(SESSION_KEY, &raw).await
    }

    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] when the store cannot be written.
    pub async fn clear(&self) -> Result<(), AuthError> {
        self.store.remove(SESSION_KEY).await
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}
