use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use courier::{
    Connection, DefaultAuthenticators, HttpMethod, Request, Response, ResponseBody, Serializer,
    SharedAuthenticator, StatusClass,
};
use courier_auth::{
    ApiAuthenticator, ApiToken, ApiTokenSource, DeviceIdentity, EndpointTokenSource,
    FixedDeviceIdentity, InMemoryKeyValueStore, SecretToken, Session, SessionAuthenticator,
    SessionStore, StaticTokenSource,
};
use courier_http::{HyperTransport, HyperTransportBuilder};
use serde::Serialize;

use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MethodArg {
    Get,
    Post,
    Patch,
    Put,
    Delete,
    Head,
}

impl From<MethodArg> for HttpMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::Get => Self::Get,
            MethodArg::Post => Self::Post,
            MethodArg::Patch => Self::Patch,
            MethodArg::Put => Self::Put,
            MethodArg::Delete => Self::Delete,
            MethodArg::Head => Self::Head,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SerializerArg {
    Json,
    #[value(name = "url_encoded")]
    UrlEncoded,
}

impl From<SerializerArg> for Serializer {
    fn from(value: SerializerArg) -> Self {
        match value {
            SerializerArg::Json => Self::Json,
            SerializerArg::UrlEncoded => Self::UrlEncoded,
        }
    }
}

/// Arguments of the `invoke` subcommand
#[derive(Debug, Clone, Args)]
pub struct InvokeArgs {
    /// Request path, relative to the base URL
    #[arg(long)]
    pub path: String,

    #[arg(long, value_enum, default_value = "get")]
    pub method: MethodArg,

    /// JSON body (query parameters for get/head/delete)
    #[arg(long)]
    pub body: Option<String>,

    #[arg(long, value_enum, default_value = "json")]
    pub serializer: SerializerArg,

    /// Extra header as `name:value`; repeatable
    #[arg(long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Send a different base URL for this request only
    #[arg(long)]
    pub host: Option<String>,

    /// Attach the channel API token
    #[arg(long)]
    pub api_token: bool,

    /// Attach this user session token
    #[arg(long)]
    pub session_token: Option<String>,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected name:value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{raw}'"));
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

impl InvokeArgs {
    /// Turn the arguments into a request descriptor
    ///
    /// # Errors
    /// Fails when the body is not valid JSON or the descriptor is incomplete.
    pub fn to_request(&self) -> Result<Request> {
        let mut builder = Request::builder()
            .path(self.path.as_str())
            .method(self.method.into())
            .serializer(self.serializer.into())
            .with_api_token(self.api_token)
            .with_session_token(self.session_token.is_some());
        if let Some(body) = &self.body {
            let value: serde_json::Value =
                serde_json::from_str(body).context("--body is not valid JSON")?;
            builder = builder.body(value);
        }
        if let Some(host) = &self.host {
            builder = builder.host(host.as_str());
        }
        for (name, value) in &self.headers {
            builder = builder.header(name, value.as_str());
        }
        Ok(builder.build()?)
    }
}

/// What `invoke` prints
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub status_class: StatusClass,
    pub status: u16,
    pub headers: BTreeMap<&'a str, &'a str>,
    pub body: &'a ResponseBody,
}

impl<'a> From<&'a Response> for Envelope<'a> {
    fn from(response: &'a Response) -> Self {
        Self {
            status_class: response.status_class(),
            status: response.status(),
            headers: response.headers().iter().collect(),
            body: response.body(),
        }
    }
}

/// Build the pipeline, invoke once and print the envelope as JSON.
///
/// # Errors
/// Fails on configuration problems and on any invocation failure.
pub async fn run(config: &AppConfig, args: &InvokeArgs) -> Result<()> {
    if args.api_token && config.auth.api_token.is_none() && config.auth.token_path.is_none() {
        bail!("--api-token needs auth.api_token or auth.token_path in the configuration");
    }

    let transport = Arc::new(
        HyperTransportBuilder::with_config(config.transport.clone())
            .build()
            .context("failed to build HTTP transport")?,
    );
    let authenticators = authenticators(config, &transport, args.session_token.as_deref()).await?;
    let connection = Connection::new(transport, &config.connection, authenticators);

    let request = args.to_request()?;
    tracing::info!(method = %request.method(), path = %request.path(), "invoking");
    let response = connection.invoke(request).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&Envelope::from(&response))?
    );
    Ok(())
}

async fn authenticators(
    config: &AppConfig,
    transport: &Arc<HyperTransport>,
    session_token: Option<&str>,
) -> Result<DefaultAuthenticators> {
    let channel_id = config.connection.api_authentication.channel_id.as_str();
    let device: Arc<dyn DeviceIdentity> =
        Arc::new(FixedDeviceIdentity::new(config.auth.device_id.as_str()));

    let source: Option<Arc<dyn ApiTokenSource>> =
        match (&config.auth.api_token, &config.auth.token_path) {
            (Some(token), _) => Some(Arc::new(StaticTokenSource::new(SecretToken::new(
                token.as_str(),
            )))),
            (None, Some(path)) => {
                // token requests go out without authenticators
                let bare = Connection::new(
                    transport.clone(),
                    &config.connection,
                    DefaultAuthenticators::default(),
                );
                Some(Arc::new(
                    EndpointTokenSource::new(bare, channel_id, Arc::clone(&device))
                        .with_path(path.as_str()),
                ))
            }
            (None, None) => None,
        };

    let api: Vec<SharedAuthenticator> = source
        .map(|source| {
            Arc::new(ApiAuthenticator::new(
                ApiToken::new(source),
                channel_id,
                Arc::clone(&device),
            )) as SharedAuthenticator
        })
        .into_iter()
        .collect();

    let mut session: Vec<SharedAuthenticator> = Vec::new();
    if let Some(token) = session_token {
        let sessions = SessionStore::new(Arc::new(InMemoryKeyValueStore::new()));
        sessions.save(&Session::new(token)).await?;
        session.push(Arc::new(SessionAuthenticator::new(sessions)));
    }

    Ok(DefaultAuthenticators::new(api, session))
}
