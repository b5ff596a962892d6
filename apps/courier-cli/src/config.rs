use std::path::Path;

use anyhow::{Context, Result, bail};
use courier::ConnectionConfig;
use courier_http::HttpTransportConfig;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

/// Prefix of environment overrides, e.g. `COURIER__CONNECTION__BASE_URL`
pub const ENV_PREFIX: &str = "COURIER__";

const REDACTED: &str = "[REDACTED]";

/// Effective configuration of the binary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AppConfig {
    pub connection: ConnectionConfig,
    pub transport: HttpTransportConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: LogFormat::Text,
        }
    }
}

/// Where credentials come from.
///
/// `api_token` takes precedence over `token_path`; with neither, requests
/// flagged for an API token fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AuthConfig {
    pub api_token: Option<String>,
    pub token_path: Option<String>,
    pub device_id: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            token_path: None,
            device_id: "courier-cli".to_owned(),
        }
    }
}

impl AppConfig {
    /// Layered load: defaults, then the YAML file (if given), then
    /// `COURIER__SECTION__KEY` environment variables.
    ///
    /// # Errors
    /// Fails when the file is missing, a layer does not parse, or the
    /// connection section is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.is_file() {
                bail!("config file does not exist: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Self = figment.extract().context("invalid configuration")?;
        config
            .connection
            .validate()
            .context("invalid connection configuration")?;
        Ok(config)
    }

    /// Command-line overrides, applied last
    ///
    /// # Errors
    /// Fails when the overridden base URL does not pass connection validation.
    pub fn apply_cli_overrides(&mut self, base_url: Option<&str>, verbose: u8) -> Result<()> {
        if let Some(base_url) = base_url {
            base_url.clone_into(&mut self.connection.base_url);
            self.connection
                .validate()
                .context("invalid --base-url")?;
        }
        let level = match verbose {
            0 => None,
            1 => Some("info"),
            2 => Some("debug"),
            _ => Some("trace"),
        };
        if let Some(level) = level {
            level.clone_into(&mut self.logging.level);
        }
        Ok(())
    }

    /// Copy safe to print: secrets replaced
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.auth.api_token.is_some() {
            copy.auth.api_token = Some(REDACTED.to_owned());
        }
        copy
    }
}
