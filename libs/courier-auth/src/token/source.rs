use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier::{AuthError, Connection, HttpMethod, Request, Serializer, StatusClass};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::device::DeviceIdentity;
use crate::secret::SecretToken;

/// Default path of the client-credentials token endpoint
pub const DEFAULT_TOKEN_PATH: &str = "/auth/v1/token";

/// Token handed out by an [`ApiTokenSource`]
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: SecretToken,
    /// Lifetime reported by the issuer; `None` means valid until rejected
    pub expires_in: Option<Duration>,
}

impl IssuedToken {
    #[must_use]
    pub fn new(token: SecretToken, expires_in: Option<Duration>) -> Self {
        Self { token, expires_in }
    }
}

/// Where API bearer tokens come from
#[async_trait]
pub trait ApiTokenSource: Send + Sync {
    /// Obtain a fresh token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::CredentialUnavailable`] when no token can be issued.
    async fn fetch(&self) -> Result<IssuedToken, AuthError>;
}

/// Pre-provisioned token (configuration, tests)
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: SecretToken,
}

impl StaticTokenSource {
    #[must_use]
    pub fn new(token: SecretToken) -> Self {
        Self { token }
    }
}

#[async_trait]
impl ApiTokenSource for StaticTokenSource {
    async fn fetch(&self) -> Result<IssuedToken, AuthError> {
        if self.token.is_empty() {
            return Err(AuthError::CredentialUnavailable(
                "static API token is empty".to_owned(),
            ));
        }
        Ok(IssuedToken::new(self.token.clone(), None))
    }
}

/// Token endpoint response.
///
/// `Deserialize`-only so the token never ends up serialized into logs.
#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Exchanges the channel and device identity for a bearer token.
///
/// Posts `grant_type=client_credentials&client_id=<channel>&device_id=<device>`
/// URL-encoded to the token endpoint through a [`Connection`]. The request
/// asks for no authenticators, so the connection may be the same one the
/// resulting token is used on.
pub struct EndpointTokenSource {
    connection: Connection,
    path: String,
    channel_id: String,
    device: Arc<dyn DeviceIdentity>,
}

impl EndpointTokenSource {
    pub fn new(
        connection: Connection,
        channel_id: impl Into<String>,
        device: Arc<dyn DeviceIdentity>,
    ) -> Self {
        Self {
            connection,
            path: DEFAULT_TOKEN_PATH.to_owned(),
            channel_id: channel_id.into(),
            device,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

#[async_trait]
impl ApiTokenSource for EndpointTokenSource {
    async fn fetch(&self) -> Result<IssuedToken, AuthError> {
        let request = Request::builder()
            .method(HttpMethod::Post)
            .path(self.path.as_str())
            .header("accept", "application/json")
            .serializer(Serializer::UrlEncoded)
            .body(json!({
                "grant_type": "client_credentials",
                "client_id": self.channel_id,
                "device_id": self.device.device_id(),
            }))
            .build()
            .map_err(|e| AuthError::CredentialUnavailable(format!("API token request: {e}")))?;

        let response = self
            .connection
            .invoke(request)
            .await
            .map_err(|e| AuthError::CredentialUnavailable(format!("API token endpoint: {e}")))?;

        if response.status_class() != StatusClass::Success {
            return Err(AuthError::CredentialUnavailable(format!(
                "API token endpoint returned HTTP {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| AuthError::CredentialUnavailable(format!("invalid token response: {e}")))?;

        if let Some(ref tt) = token.token_type
            && !tt.eq_ignore_ascii_case("bearer")
        {
            return Err(AuthError::CredentialUnavailable(format!(
                "unsupported token type: {tt}"
            )));
        }
        if token.access_token.is_empty() {
            return Err(AuthError::CredentialUnavailable(
                "token endpoint returned an empty access_token".to_owned(),
            ));
        }

        debug!(expires_in = ?token.expires_in, "API token issued");
        Ok(IssuedToken::new(
            SecretToken::new(token.access_token),
            token.expires_in.map(Duration::from_secs),
        ))
    }
}
