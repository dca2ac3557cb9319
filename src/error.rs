//! # Error Module
//!
//! Canonical error responses and the error types that flow through the dispatcher.
//!
//! ## Overview
//!
//! - [`ErrorCondition`] is the closed set of conditions a handler may signal. Each one is
//!   tied to exactly one HTTP status code.
//! - [`translate`] turns a condition (or its numeric code) into an [`ErrorResponse`]
//!   whose body is `{"message": ..., "code": ...}`.
//! - [`Exception`] carries a precomputed response out of a handler.
//! - [`HandlerError`] is what handlers return on failure: either an [`Exception`] or an
//!   opaque error that collapses into a generic 500.
//! - [`ConfigError`] is reported while building the route table and is fatal to startup.
//!
//! ## Example
//!
//! ```rust
//! use headway::error::{translate, ErrorCondition};
//!
//! let by_name = translate(ErrorCondition::PayloadTooLarge);
//! let by_code = translate(413u16);
//! assert_eq!(by_name, by_code);
//! assert_eq!(by_name.body(), br#"{"message":"Payload Too Large","code":413}"#);
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::server::{HandlerResponse, HeaderVec};

/// Content type used by every canonical error body.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Closed set of error conditions understood by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCondition {
    NotFound,
    AccessDenied,
    SomethingWentWrong,
    BadRequest,
    PayloadTooLarge,
    TooManyRequests,
}

impl ErrorCondition {
    /// All conditions, in declaration order.
    pub const ALL: [ErrorCondition; 6] = [
        ErrorCondition::NotFound,
        ErrorCondition::AccessDenied,
        ErrorCondition::SomethingWentWrong,
        ErrorCondition::BadRequest,
        ErrorCondition::PayloadTooLarge,
        ErrorCondition::TooManyRequests,
    ];

    /// HTTP status code for this condition.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            ErrorCondition::NotFound => 404,
            ErrorCondition::AccessDenied => 403,
            ErrorCondition::SomethingWentWrong => 500,
            ErrorCondition::BadRequest => 400,
            ErrorCondition::PayloadTooLarge => 413,
            ErrorCondition::TooManyRequests => 429,
        }
    }

    /// Human readable message placed in the JSON body.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            ErrorCondition::NotFound => "Not Found",
            ErrorCondition::AccessDenied => "Access Denied",
            ErrorCondition::SomethingWentWrong => "Something Went Wrong",
            ErrorCondition::BadRequest => "Bad Request",
            ErrorCondition::PayloadTooLarge => "Payload Too Large",
            ErrorCondition::TooManyRequests => "Too Many Requests",
        }
    }

    /// Resolve a numeric status code. Codes outside the known set fall back to
    /// [`ErrorCondition::SomethingWentWrong`].
    #[must_use]
    pub const fn from_code(code: u16) -> Self {
        match code {
            404 => ErrorCondition::NotFound,
            403 => ErrorCondition::AccessDenied,
            400 => ErrorCondition::BadRequest,
            413 => ErrorCondition::PayloadTooLarge,
            429 => ErrorCondition::TooManyRequests,
            _ => ErrorCondition::SomethingWentWrong,
        }
    }
}

impl Default for ErrorCondition {
    fn default() -> Self {
        ErrorCondition::SomethingWentWrong
    }
}

impl From<u16> for ErrorCondition {
    fn from(code: u16) -> Self {
        ErrorCondition::from_code(code)
    }
}

impl fmt::Display for ErrorCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Returned when a string names none of the known conditions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error condition '{0}'")]
pub struct UnknownCondition(pub String);

impl FromStr for ErrorCondition {
    type Err = UnknownCondition;

    /// Accepts both the variant spelling (`NotFound`) and the message (`Not Found`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCondition::ALL
            .into_iter()
            .find(|c| c.message() == s || c.message().replace(' ', "") == s)
            .ok_or_else(|| UnknownCondition(s.to_string()))
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    code: u16,
}

/// Canonical JSON error response for an [`ErrorCondition`].
///
/// Immutable once built. Two responses for the same condition are byte-identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    condition: ErrorCondition,
    body: Vec<u8>,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(condition: ErrorCondition) -> Self {
        let body = ErrorBody {
            message: condition.message(),
            code: condition.code(),
        };
        // Serializing a struct of a &str and a u16 cannot fail.
        let body = serde_json::to_vec(&body).unwrap_or_default();
        Self { condition, body }
    }

    #[must_use]
    pub fn condition(&self) -> ErrorCondition {
        self.condition
    }

    #[must_use]
    pub fn message(&self) -> &'static str {
        self.condition.message()
    }

    #[must_use]
    pub fn code(&self) -> u16 {
        self.condition.code()
    }

    /// Serialized `{"message":..,"code":..}` bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// `content-length` and `content-type` headers for the body.
    #[must_use]
    pub fn headers(&self) -> HeaderVec {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-length"), self.body.len().to_string()));
        headers.push((Arc::from("content-type"), JSON_CONTENT_TYPE.to_string()));
        headers
    }

    #[must_use]
    pub fn to_response(&self) -> HandlerResponse {
        self.clone().into()
    }
}

impl From<ErrorResponse> for HandlerResponse {
    fn from(err: ErrorResponse) -> Self {
        let headers = err.headers();
        HandlerResponse::new(err.code(), headers, Some(err.body))
    }
}

/// Translate a condition or numeric code into its canonical [`ErrorResponse`].
///
/// Pure: the same input always yields a byte-identical result.
#[must_use]
pub fn translate(condition: impl Into<ErrorCondition>) -> ErrorResponse {
    ErrorResponse::new(condition.into())
}

/// An error that carries its own precomputed response.
///
/// Handlers return this (usually through `?` or `Err(Exception::new(..).into())`) to
/// request a specific client or server error. The dispatcher sends the response unchanged
/// unless a custom error hook is configured.
#[derive(Debug, Clone)]
pub struct Exception {
    condition: Option<ErrorCondition>,
    response: HandlerResponse,
}

impl Exception {
    #[must_use]
    pub fn new(condition: impl Into<ErrorCondition>) -> Self {
        let condition = condition.into();
        Self {
            condition: Some(condition),
            response: translate(condition).into(),
        }
    }

    /// Wrap an arbitrary response.
    #[must_use]
    pub fn with_response(response: HandlerResponse) -> Self {
        Self {
            condition: None,
            response,
        }
    }

    /// The condition this exception was built from, if any.
    #[must_use]
    pub fn condition(&self) -> Option<ErrorCondition> {
        self.condition
    }

    #[must_use]
    pub fn response(&self) -> &HandlerResponse {
        &self.response
    }

    #[must_use]
    pub fn into_response(self) -> HandlerResponse {
        self.response
    }
}

impl From<ErrorCondition> for Exception {
    fn from(condition: ErrorCondition) -> Self {
        Exception::new(condition)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.condition {
            Some(c) => write!(f, "{} ({})", c.message(), c.code()),
            None => write!(f, "exception with status {}", self.response.status),
        }
    }
}

/// Failure produced by a handler.
///
/// `Exception` values are explicit and keep their response. Everything else is `Opaque`
/// and is answered with the generic 500 response.
#[derive(Debug)]
pub enum HandlerError {
    Exception(Exception),
    Opaque(anyhow::Error),
}

impl HandlerError {
    /// Wrap any error as an opaque failure.
    pub fn opaque<E: Into<anyhow::Error>>(err: E) -> Self {
        HandlerError::Opaque(err.into())
    }

    #[must_use]
    pub fn is_exception(&self) -> bool {
        matches!(self, HandlerError::Exception(_))
    }

    /// Response the dispatcher sends when no error hook is configured.
    #[must_use]
    pub fn default_response(&self) -> HandlerResponse {
        match self {
            HandlerError::Exception(e) => e.response().clone(),
            HandlerError::Opaque(_) => translate(ErrorCondition::SomethingWentWrong).into(),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Exception(e) => write!(f, "{e}"),
            HandlerError::Opaque(e) => write!(f, "{e:#}"),
        }
    }
}

impl From<Exception> for HandlerError {
    fn from(e: Exception) -> Self {
        HandlerError::Exception(e)
    }
}

impl From<ErrorCondition> for HandlerError {
    fn from(c: ErrorCondition) -> Self {
        HandlerError::Exception(Exception::new(c))
    }
}

impl<E> From<E> for HandlerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        HandlerError::Opaque(anyhow::Error::new(err))
    }
}

/// Errors raised while configuring routes. These abort application startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("route {method} {pattern} is already registered")]
    DuplicateRoute { method: String, pattern: String },
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("invalid HTTP method '{method}'")]
    InvalidMethod { method: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_and_codes_agree() {
        for condition in ErrorCondition::ALL {
            let by_name = translate(condition);
            let by_code = translate(condition.code());
            assert_eq!(by_name, by_code);
            assert_eq!(by_name.body(), by_code.body());
        }
    }

    #[test]
    fn test_unknown_code_falls_back_to_500() {
        for code in [0u16, 200, 401, 418, 503, 999] {
            let resp = translate(code);
            assert_eq!(resp.code(), 500);
            assert_eq!(resp.message(), "Something Went Wrong");
        }
    }

    #[test]
    fn test_body_key_order_and_length() {
        let resp = translate(ErrorCondition::NotFound);
        assert_eq!(resp.body(), br#"{"message":"Not Found","code":404}"#);
        let headers = resp.headers();
        assert_eq!(headers[0].0.as_ref(), "content-length");
        assert_eq!(headers[0].1, "34");
        assert_eq!(headers[1].1, JSON_CONTENT_TYPE);
    }

    #[test]
    fn test_to_response_matches_conversion() {
        let resp = translate(ErrorCondition::TooManyRequests);
        let converted: HandlerResponse = resp.clone().into();
        assert_eq!(resp.to_response(), converted);
        assert_eq!(converted.status, 429);
        assert_eq!(converted.body.as_deref(), Some(resp.body()));
    }

    #[test]
    fn test_condition_from_str() {
        assert_eq!("Not Found".parse(), Ok(ErrorCondition::NotFound));
        assert_eq!("TooManyRequests".parse(), Ok(ErrorCondition::TooManyRequests));
        assert!("Teapot".parse::<ErrorCondition>().is_err());
    }

    #[test]
    fn test_std_errors_become_opaque() {
        let err: HandlerError = "x".parse::<u32>().unwrap_err().into();
        assert!(!err.is_exception());
        assert_eq!(err.default_response().status, 500);

        let err: HandlerError = ErrorCondition::AccessDenied.into();
        assert!(err.is_exception());
        assert_eq!(err.default_response().status, 403);
    }
}
