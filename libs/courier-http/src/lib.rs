#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! hyper-based [`Transport`](courier::Transport) for the courier pipeline
//!
//! This crate provides [`HyperTransport`] with:
//! - TLS via rustls with Mozilla roots (HTTPS only by default)
//! - Connection pooling
//! - Per-request timeouts
//! - Optional concurrency limiting with fail-fast load shedding
//! - Transport-level default headers and User-Agent injection
//! - Transparent response decompression (gzip, brotli, deflate), with the
//!   body size limit applied to decompressed bytes
//!
//! Payloads of `get`, `head` and `delete` travel as the query string; the
//! other methods send them as the body, encoded per the request's
//! `Content-Type` or, failing that, the serializer announced through
//! `set_serializer`.
//!
//! # Example
//!
//! ```ignore
//! use courier::{Connection, ConnectionConfig, DefaultAuthenticators};
//! use courier_http::HyperTransport;
//! use std::sync::Arc;
//!
//! let transport = HyperTransport::builder()
//!     .timeout(Duration::from_secs(10))
//!     .build()?;
//! let connection = Connection::new(
//!     Arc::new(transport),
//!     &ConnectionConfig::new("https://api.example.com", "channel-1"),
//!     DefaultAuthenticators::default(),
//! );
//! ```

mod builder;
mod config;
mod error;
mod layers;
mod tls;
mod transport;

pub use builder::HyperTransportBuilder;
pub use config::{DEFAULT_USER_AGENT, HttpTransportConfig, TransportSecurity};
pub use error::BuildError;
pub use layers::{DefaultHeadersLayer, DefaultHeadersService, SharedHeaders};
pub use transport::HyperTransport;
