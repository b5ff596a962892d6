use std::sync::Arc;

use async_trait::async_trait;
use courier::{AuthError, Authenticator, CHANNEL_ID_HEADER, RawResponse, Request};
use tracing::{debug, warn};

use crate::device::DeviceIdentity;
use crate::token::ApiToken;

pub const AUTHORIZATION_HEADER: &str = "authorization";
pub const DEVICE_ID_HEADER: &str = "x-device-id";

const UNAUTHORIZED: u16 = 401;

/// Channel-level credential: `Authorization: Bearer <api token>` plus the
/// channel and device identifiers.
///
/// A `401` response invalidates the cached token so the next call fetches a
/// new one, unless the rejected request carried a token that has already
/// been replaced. The response itself is passed through unchanged.
#[derive(Clone)]
pub struct ApiAuthenticator {
    token: ApiToken,
    channel_id: String,
    device: Arc<dyn DeviceIdentity>,
}

impl ApiAuthenticator {
    pub fn new(
        token: ApiToken,
        channel_id: impl Into<String>,
        device: Arc<dyn DeviceIdentity>,
    ) -> Self {
        Self {
            token,
            channel_id: channel_id.into(),
            device,
        }
    }

    #[must_use]
    pub fn token(&self) -> &ApiToken {
        &self.token
    }
}

#[async_trait]
impl Authenticator for ApiAuthenticator {
    async fn intercept_request(&self, request: Request) -> Result<Request, AuthError> {
        let token = self.token.get().await?;
        Ok(request
            .with_header(AUTHORIZATION_HEADER, format!("Bearer {}", token.expose()))?
            .with_header(CHANNEL_ID_HEADER, self.channel_id.as_str())?
            .with_header(DEVICE_ID_HEADER, self.device.device_id())?)
    }

    async fn intercept_response(
        &self,
        request: &Request,
        response: RawResponse,
    ) -> Result<RawResponse, AuthError> {
        if response.status != UNAUTHORIZED {
            return Ok(response);
        }

        let Some(sent) = request
            .headers()
            .get(AUTHORIZATION_HEADER)
            .and_then(|value| value.strip_prefix("Bearer "))
        else {
            debug!(path = %request.path(), "401 on a request without an API token");
            return Ok(response);
        };

        if self.token.invalidate_if_current(sent).await {
            warn!(path = %request.path(), "API token rejected, invalidating");
        } else {
            debug!(path = %request.path(), "API token already replaced, keeping it");
        }
        Ok(response)
    }

    fn name(&self) -> &'static str {
        "api"
    }
}
