//! Body serialization strategies.
//!
//! A request names its serializer explicitly; nothing is inferred from the
//! body's shape. The connection runs the serializer before dispatch, sets the
//! matching `Content-Type`, and tells the transport which serializer is active
//! so transport-level encoding stays consistent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SerializeError;
use crate::request::Payload;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// Wire encoding for request bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Serializer {
    #[default]
    Json,
    UrlEncoded,
}

impl Serializer {
    /// Convert a body into its wire form.
    ///
    /// JSON keeps structured bodies structured. URL-encoding flattens an
    /// object into `key=value&...` text. Text payloads are treated as already
    /// encoded and pass through both strategies unchanged.
    ///
    /// # Errors
    ///
    /// URL-encoding fails with [`SerializeError::NotAnObject`] for non-object
    /// bodies and [`SerializeError::NotFlat`] for nested values.
    pub fn serialize(self, body: Payload) -> Result<Payload, SerializeError> {
        match (self, body) {
            (_, Payload::Text(text)) => Ok(Payload::Text(text)),
            (Self::Json, structured @ Payload::Structured(_)) => Ok(structured),
            (Self::UrlEncoded, Payload::Structured(value)) => {
                let Value::Object(map) = value else {
                    return Err(SerializeError::NotAnObject);
                };
                form_encode(&map).map(Payload::Text)
            }
        }
    }

    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => CONTENT_TYPE_JSON,
            Self::UrlEncoded => CONTENT_TYPE_FORM,
        }
    }

    /// Final byte encoding of a payload under this serializer.
    ///
    /// # Errors
    ///
    /// Same conditions as [`serialize`](Self::serialize), plus JSON encoding
    /// failures.
    pub fn encode(self, body: &Payload) -> Result<Vec<u8>, SerializeError> {
        match (self, body) {
            (_, Payload::Text(text)) => Ok(text.as_bytes().to_vec()),
            (Self::Json, Payload::Structured(value)) => Ok(serde_json::to_vec(value)?),
            (Self::UrlEncoded, Payload::Structured(value)) => {
                let Value::Object(map) = value else {
                    return Err(SerializeError::NotAnObject);
                };
                form_encode(map).map(String::into_bytes)
            }
        }
    }
}

/// Encode a flat object as `application/x-www-form-urlencoded`.
///
/// Strings are used verbatim, numbers and booleans use their JSON text and
/// `null` fields are dropped.
///
/// # Errors
///
/// Returns [`SerializeError::NotFlat`] when a field holds an array or object.
pub fn form_encode(map: &Map<String, Value>) -> Result<String, SerializeError> {
    let mut pairs: Vec<(&str, String)> = Vec::with_capacity(map.len());
    for (key, value) in map {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(SerializeError::NotFlat { field: key.clone() });
            }
        };
        pairs.push((key.as_str(), text));
    }
    Ok(serde_urlencoded::to_string(&pairs)?)
}
