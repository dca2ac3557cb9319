use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ErrorCondition, Exception};
use crate::ids::RequestId;
use crate::router::ParamVec;

use super::HeaderVec;

/// Incoming request as seen by handlers.
///
/// Built once from the transport and never mutated by the router, except that the
/// dispatcher fills in `path_params` after matching and the preflight adapter rewrites the
/// effective method of a HEAD request.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    pub method: Method,
    /// Path without the query string
    pub path: String,
    /// Raw query string (without the leading `?`), if any
    pub query: Option<String>,
    /// HTTP headers in arrival order (stack-allocated for ≤16 headers)
    pub headers: HeaderVec,
    pub body: Vec<u8>,
    /// Path parameters extracted by the router
    pub path_params: ParamVec,
}

impl HandlerRequest {
    /// Create a request from a method and a target.
    ///
    /// The target may be an origin form (`/users/1?x=y`) or an absolute URL
    /// (`https://example.com/users/1`). The method token is case-insensitive.
    #[must_use]
    pub fn new(method: &str, target: &str) -> Self {
        let method = normalize_method(method);
        let (path, query) = split_target(target);
        Self {
            request_id: RequestId::new(),
            method,
            path,
            query,
            headers: HeaderVec::new(),
            body: Vec::new(),
            path_params: ParamVec::new(),
        }
    }

    /// Shorthand for `HandlerRequest::new("GET", target)`.
    #[must_use]
    pub fn get(target: &str) -> Self {
        Self::new("GET", target)
    }

    /// Shorthand for `HandlerRequest::new("HEAD", target)`.
    #[must_use]
    pub fn head(target: &str) -> Self {
        Self::new("HEAD", target)
    }

    /// Shorthand for `HandlerRequest::new("POST", target)`.
    #[must_use]
    pub fn post(target: &str) -> Self {
        Self::new("POST", target)
    }

    /// Append a header. A valid `x-request-id` header also sets the request id.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if name.eq_ignore_ascii_case("x-request-id") {
            self.request_id = RequestId::from_header_or_new(Some(&value));
        }
        self.headers.push((Arc::from(name), value));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Convert an `http::Request` into a handler request.
    #[must_use]
    pub fn from_http(req: http::Request<Vec<u8>>) -> Self {
        let (parts, body) = req.into_parts();
        let mut headers = HeaderVec::new();
        for (name, value) in &parts.headers {
            match value.to_str() {
                Ok(v) => headers.push((Arc::from(name.as_str()), v.to_string())),
                Err(_) => debug!(header = %name, "Skipping non-ASCII header value"),
            }
        }
        let request_id = RequestId::from_header_or_new(
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("x-request-id"))
                .map(|(_, v)| v.as_str()),
        );
        Self {
            request_id,
            method: normalize_method(parts.method.as_str()),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers,
            body,
            path_params: ParamVec::new(),
        }
    }

    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics if a pattern repeats a parameter name.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Decoded query parameters. Repeated keys keep the last value.
    #[must_use]
    pub fn query_params(&self) -> HashMap<String, String> {
        match &self.query {
            Some(q) => url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
            None => HashMap::new(),
        }
    }

    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<String> {
        let q = self.query.as_deref()?;
        url::form_urlencoded::parse(q.as_bytes())
            .filter(|(k, _)| k == name)
            .last()
            .map(|(_, v)| v.into_owned())
    }

    /// Cookies parsed from the `Cookie` header.
    #[must_use]
    pub fn cookies(&self) -> HashMap<String, String> {
        self.get_header("cookie")
            .map(|c| {
                c.split(';')
                    .filter_map(|pair| {
                        let mut parts = pair.trim().splitn(2, '=');
                        let name = parts.next()?.trim();
                        if name.is_empty() {
                            return None;
                        }
                        let value = parts.next().unwrap_or("").trim();
                        Some((name.to_string(), value.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Deserialize the body as JSON, answering `400 Bad Request` on failure.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Exception> {
        serde_json::from_slice(&self.body).map_err(|e| {
            debug!(request_id = %self.request_id, error = %e, "Request body is not valid JSON");
            Exception::new(ErrorCondition::BadRequest)
        })
    }
}

/// Uppercase the method token so `get` and `GET` are the same method. `None` when the
/// token is not a valid HTTP method.
pub(crate) fn parse_method(method: &str) -> Option<Method> {
    let upper = method.trim().to_ascii_uppercase();
    Method::from_bytes(upper.as_bytes()).ok()
}

/// Method of an incoming request. Invalid tokens map to [`unroutable_method`], so the
/// request falls through to not-found.
pub(crate) fn normalize_method(method: &str) -> Method {
    parse_method(method).unwrap_or_else(unroutable_method)
}

/// A lowercase extension method. `parse_method` never yields lowercase tokens and route
/// registration refuses them, so no route can match it.
pub(crate) fn unroutable_method() -> Method {
    Method::from_bytes(b"unroutable").unwrap_or(Method::CONNECT)
}

/// Whether `method` is in the upper-case form requests are normalized to.
pub(crate) fn is_normalized_method(method: &Method) -> bool {
    !method.as_str().bytes().any(|b| b.is_ascii_lowercase())
}

fn split_target(target: &str) -> (String, Option<String>) {
    // Absolute URLs: drop scheme and authority.
    let origin_form = match target.find("://") {
        Some(idx) => {
            let rest = &target[idx + 3..];
            match rest.find(['/', '?']) {
                Some(slash) => &rest[slash..],
                None => "",
            }
        }
        None => target,
    };
    let without_fragment = origin_form.split('#').next().unwrap_or("");
    let (path, query) = match without_fragment.split_once('?') {
        Some((p, q)) => (p, Some(q.to_string())),
        None => (without_fragment, None),
    };
    let path = if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    };
    (path, query)
}
