//! Decoder types
//!
//! A decoded response body and the content kinds the decode table knows.

use serde_json::Value;
use std::fmt;

/// Content kinds recognised by the decode table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    /// `application/json`
    Json,
    /// `text/plain`
    Text,
    /// Anything else, carrying the raw header value
    Unsupported(String),
    /// No `Content-Type` header at all
    Missing,
}

impl ContentKind {
    /// Classify a `Content-Type` header value.
    ///
    /// Parameters such as `charset` are ignored and the media type is
    /// compared case-insensitively.
    pub fn from_header(content_type: Option<&str>) -> Self {
        let Some(raw) = content_type else {
            return Self::Missing;
        };

        let media_type = raw.split(';').next().unwrap_or_default().trim();
        if media_type.eq_ignore_ascii_case("application/json") {
            Self::Json
        } else if media_type.eq_ignore_ascii_case("text/plain") {
            Self::Text
        } else {
            Self::Unsupported(raw.to_string())
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("application/json"),
            Self::Text => f.write_str("text/plain"),
            Self::Unsupported(raw) => f.write_str(raw),
            Self::Missing => f.write_str("<missing content type>"),
        }
    }
}

/// A successfully decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Parsed JSON document
    Json(Value),
    /// Raw text passthrough
    Text(String),
    /// The response had no body
    Empty,
}

impl Payload {
    /// JSON document, if this payload is one
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Raw text, if this payload is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Convert to a JSON value; text becomes a JSON string, empty becomes null
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
            Self::Empty => Value::Null,
        }
    }
}
