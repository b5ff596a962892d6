//! Tower layers used by the transport stack
//!
//! - [`DefaultHeadersLayer`] - adds the User-Agent and transport-level default headers

mod default_headers;

pub use default_headers::{DefaultHeadersLayer, DefaultHeadersService, SharedHeaders};
