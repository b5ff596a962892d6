#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Request invocation pipeline
//!
//! A caller describes a call with a [`Request`] and hands it to
//! [`Connection::invoke`], which:
//! - attaches the default API and/or session [`Authenticator`]s the request
//!   asks for
//! - runs the request interceptors in registration order
//! - serializes the body with the request's [`Serializer`] and sets the
//!   matching content type
//! - calls exactly one [`Transport`] operation for the request method
//! - runs the response interceptors in registration order
//! - normalizes the result into a [`Response`] classified by [`StatusClass`]
//!
//! Client and server error statuses are delivered as responses, not errors.
//! Only transport failures, interceptor failures and serialization failures
//! make `invoke` fail.
//!
//! # Example
//!
//! ```ignore
//! use courier::{Connection, ConnectionConfig, DefaultAuthenticators, HttpMethod, Request};
//!
//! let connection = Connection::new(transport, &config, DefaultAuthenticators::new(api, session));
//!
//! let response = connection
//!     .invoke(
//!         Request::builder()
//!             .method(HttpMethod::Post)
//!             .path("/content/v1/search")
//!             .json_body(&query)
//!             .with_api_token(true)
//!             .build()?,
//!     )
//!     .await?;
//! ```

mod api;
mod auth;
mod config;
mod connection;
mod error;
mod headers;
mod request;
mod response;
mod serializer;
mod transport;

pub use api::{ApiError, ApiRequestHandler, ApiService};
pub use auth::{Authenticator, SharedAuthenticator};
pub use config::{APP_ID_HEADER, ApiAuthenticationConfig, CHANNEL_ID_HEADER, ConnectionConfig};
pub use connection::{Connection, DefaultAuthenticators};
pub use error::{
    AuthError, BoxError, ConfigError, InterceptorStage, InvokeError, RequestError, SerializeError,
    TransportError,
};
pub use headers::Headers;
pub use request::{HttpMethod, Payload, Request, RequestBuilder};
pub use response::{Response, ResponseBody, StatusClass};
pub use serializer::{CONTENT_TYPE_FORM, CONTENT_TYPE_JSON, Serializer, form_encode};
pub use transport::{RawResponse, Transport, dispatch};
