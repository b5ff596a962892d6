#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Authenticators for the courier invocation pipeline
//!
//! - [`ApiAuthenticator`]: channel-level bearer token from an [`ApiToken`]
//!   cache, fed by a static value or a client-credentials token endpoint
//! - [`SessionAuthenticator`]: user session token with refresh-on-401
//!
//! Both are registered as
//! [`DefaultAuthenticators`](courier::DefaultAuthenticators) on a
//! [`Connection`](courier::Connection) and attached to requests that set
//! `with_api_token` / `with_session_token`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use courier_auth::{ApiAuthenticator, ApiToken, FixedDeviceIdentity, StaticTokenSource};
//!
//! let device = Arc::new(FixedDeviceIdentity::new("device-1"));
//! let token = ApiToken::new(Arc::new(StaticTokenSource::new(secret)));
//! let api = ApiAuthenticator::new(token, "channel-1", device);
//! ```

mod api_auth;
mod device;
mod secret;
mod session;
mod store;
mod token;

pub use api_auth::{ApiAuthenticator, AUTHORIZATION_HEADER, DEVICE_ID_HEADER};
pub use device::{DeviceIdentity, FixedDeviceIdentity};
pub use secret::SecretToken;
pub use session::{
    DEFAULT_REFRESH_PATH, EndpointSessionRefresher, SESSION_KEY, Session, SessionAuthenticator,
    SessionRefresher, SessionStore, USER_TOKEN_HEADER,
};
pub use store::{InMemoryKeyValueStore, KeyValueStore};
pub use token::{
    API_TOKEN_EXPIRY_KEY, API_TOKEN_KEY, ApiToken, ApiTokenSource, DEFAULT_TOKEN_PATH, EXPIRY_SKEW,
    EndpointTokenSource, IssuedToken, StaticTokenSource,
};
