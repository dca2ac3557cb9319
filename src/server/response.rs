use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::JSON_CONTENT_TYPE;

use super::HeaderVec;

/// Content type used for plain string replies.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Outbound response: status, ordered headers and an optional body.
///
/// `body: None` means the response has no body at all (HEAD); `Some(vec![])` is an empty
/// body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// HTTP response headers (stack-allocated for ≤16 headers)
    pub headers: HeaderVec,
    pub body: Option<Vec<u8>>,
}

impl HandlerResponse {
    /// Create a new response with the given status, headers, and body
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Option<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Plain text response with `content-type` and `content-length` set.
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::with_content(status, TEXT_CONTENT_TYPE, body.into().into_bytes())
    }

    /// JSON response with `content-type` and `content-length` set.
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        // Serializing a `Value` cannot fail: its map keys are always strings.
        let bytes = serde_json::to_vec(body).unwrap_or_default();
        Self::with_content(status, JSON_CONTENT_TYPE, bytes)
    }

    /// Response whose `content-length` is computed from `body`.
    #[must_use]
    pub fn with_content(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-length"), body.len().to_string()));
        headers.push((Arc::from("content-type"), content_type.to_string()));
        Self {
            status,
            headers,
            body: Some(body),
        }
    }

    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value.into()));
    }

    /// Builder form of [`HandlerResponse::set_header`].
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    #[must_use]
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Drop the body, keeping status and every header (including `content-length`).
    #[must_use]
    pub fn without_body(mut self) -> Self {
        self.body = None;
        self
    }

    /// Body interpreted as UTF-8, lossily.
    #[must_use]
    pub fn body_text(&self) -> Option<String> {
        self.body
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Convert into an `http::Response` for a transport.
    ///
    /// Headers with invalid names or values are skipped and logged.
    #[must_use]
    pub fn into_http(self) -> http::Response<Vec<u8>> {
        let mut res = http::Response::new(self.body.unwrap_or_default());
        *res.status_mut() =
            http::StatusCode::from_u16(self.status).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
        let headers = res.headers_mut();
        for (name, value) in self.headers {
            match (
                http::HeaderName::from_bytes(name.as_bytes()),
                http::HeaderValue::from_str(&value),
            ) {
                (Ok(n), Ok(v)) => {
                    headers.append(n, v);
                }
                _ => warn!(header = %name, "Dropping invalid response header"),
            }
        }
        res
    }
}

/// What a handler may return on success.
///
/// Text and JSON are normalized into full responses with a computed `content-length`;
/// a full [`HandlerResponse`] is passed through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Json(Value),
    Response(HandlerResponse),
}

impl Reply {
    /// Serialize any value into a JSON reply.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Reply::Json)
    }

    /// Normalize into a response, using `status` for text and JSON replies.
    #[must_use]
    pub fn into_response_with_status(self, status: u16) -> HandlerResponse {
        match self {
            Reply::Text(s) => HandlerResponse::text(status, s),
            Reply::Json(v) => HandlerResponse::json(status, &v),
            Reply::Response(r) => r,
        }
    }

    #[must_use]
    pub fn into_response(self) -> HandlerResponse {
        self.into_response_with_status(200)
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Reply::Text(s)
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Reply::Text(s.to_string())
    }
}

impl From<Value> for Reply {
    fn from(v: Value) -> Self {
        Reply::Json(v)
    }
}

impl From<HandlerResponse> for Reply {
    fn from(r: HandlerResponse) -> Self {
        Reply::Response(r)
    }
}
