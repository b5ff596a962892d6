//! Normalized response envelope.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::headers::Headers;
use crate::request::Request;
use crate::transport::RawResponse;

/// Coarse outcome derived from the raw status code.
///
/// [`StatusClass::from_status`] is the single place where numeric codes are
/// interpreted; everything above the connection branches on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Success,
    ClientError,
    ServerError,
    Unknown,
}

impl StatusClass {
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => Self::Success,
            400..=499 => Self::ClientError,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// Decoded response body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// JSON when the bytes parse, otherwise (lossy) UTF-8 text
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::Text(String::new());
        }
        match serde_json::from_slice(bytes) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    /// Decode into a typed value; a text body is read as a JSON string.
    ///
    /// # Errors
    ///
    /// Returns the decode error when the body does not match `T`.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        match self {
            Self::Json(value) => serde_json::from_value(value),
            Self::Text(text) => serde_json::from_value(Value::String(text)),
        }
    }
}

/// Result of one successful [`Connection::invoke`](crate::Connection::invoke).
///
/// A `4xx`/`5xx` status is still a `Response`; callers branch on
/// [`status_class`](Self::status_class).
#[derive(Debug, Clone)]
pub struct Response {
    status_class: StatusClass,
    status: u16,
    headers: Headers,
    body: ResponseBody,
    request: Request,
}

impl Response {
    pub(crate) fn normalize(raw: RawResponse, request: Request) -> Self {
        Self {
            status_class: StatusClass::from_status(raw.status),
            status: raw.status,
            body: ResponseBody::decode(&raw.body),
            headers: raw.headers,
            request,
        }
    }

    #[must_use]
    pub fn status_class(&self) -> StatusClass {
        self.status_class
    }

    /// Raw status code, kept for diagnostics
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    #[must_use]
    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    /// The request exactly as dispatched: resolved authenticator lists,
    /// interceptor-added headers and the serialized body
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Decode the body into `T`.
    ///
    /// # Errors
    ///
    /// Returns the decode error when the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        self.body.clone().deserialize()
    }
}
