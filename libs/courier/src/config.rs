use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::headers::Headers;

pub const CHANNEL_ID_HEADER: &str = "x-channel-id";
pub const APP_ID_HEADER: &str = "x-app-id";

/// Configuration read once when a [`Connection`](crate::Connection) is built
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ConnectionConfig {
    /// Base URL every request path is resolved against (unless the request
    /// carries its own host)
    pub base_url: String,

    pub api_authentication: ApiAuthenticationConfig,

    /// Extra headers sent with every call
    pub default_headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ApiAuthenticationConfig {
    /// Channel the application is registered under
    pub channel_id: String,

    /// Producer (application) id, sent as `x-app-id` when set
    pub producer_id: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_owned(),
            api_authentication: ApiAuthenticationConfig::default(),
            default_headers: BTreeMap::new(),
        }
    }
}

impl ConnectionConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_authentication: ApiAuthenticationConfig {
                channel_id: channel_id.into(),
                producer_id: None,
            },
            default_headers: BTreeMap::new(),
        }
    }

    /// Pipeline-level headers handed to the transport once per connection.
    ///
    /// `x-channel-id` and `x-app-id` come first; configured extras are applied
    /// after them and win on conflict.
    #[must_use]
    pub fn default_headers(&self) -> Headers {
        let mut headers = Headers::new();
        let auth = &self.api_authentication;
        if !auth.channel_id.trim().is_empty() {
            headers.insert(CHANNEL_ID_HEADER, auth.channel_id.trim());
        }
        if let Some(producer) = auth.producer_id.as_deref().filter(|p| !p.trim().is_empty()) {
            headers.insert(APP_ID_HEADER, producer.trim());
        }
        for (name, value) in &self.default_headers {
            headers.insert(name, value.as_str());
        }
        headers
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] when the base URL is empty or not HTTP(S), or
    /// a default header has a blank name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(base.to_owned()));
        }
        if let Some(name) = self.default_headers.keys().find(|k| k.trim().is_empty()) {
            return Err(ConfigError::InvalidHeader(name.clone()));
        }
        Ok(())
    }
}
