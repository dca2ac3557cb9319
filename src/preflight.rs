//! # Preflight Module
//!
//! Automatic `HEAD` handling.
//!
//! With preflight enabled, a `HEAD` request is answered by running the route that would
//! serve the same path (an explicit `HEAD` route, else `GET`, else the first other method
//! registered for a matching pattern) and then dropping the body. Status and every header,
//! `content-length` included, are kept exactly as the underlying response produced them.
//! This applies to successful responses, not-found responses and error responses alike,
//! including the ones produced by custom overrides.
//!
//! With preflight disabled the adapter is a pass-through: `HEAD` only reaches routes that
//! were registered for `HEAD` explicitly.

use http::Method;
use tracing::debug;

use crate::dispatcher::Dispatcher;
use crate::server::{HandlerRequest, HandlerResponse};

/// Wraps a [`Dispatcher`] and synthesizes `HEAD` responses when enabled.
#[derive(Clone)]
pub struct PreflightAdapter {
    dispatcher: Dispatcher,
    enabled: bool,
}

impl PreflightAdapter {
    #[must_use]
    pub fn new(dispatcher: Dispatcher, enabled: bool) -> Self {
        Self {
            dispatcher,
            enabled,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub async fn handle(&self, req: HandlerRequest) -> HandlerResponse {
        if !self.enabled || req.method != Method::HEAD {
            return self.dispatcher.dispatch(req).await;
        }

        let matched = self.dispatcher.table().resolve_head(&req.path);
        let effective = matched
            .as_ref()
            .map(|m| m.route.method.clone())
            .unwrap_or(Method::GET);

        debug!(
            request_id = %req.request_id,
            path = %req.path,
            resolved_method = %effective,
            matched = matched.is_some(),
            "Resolving HEAD request"
        );

        let mut underlying = req;
        underlying.method = effective;

        self.dispatcher
            .dispatch_matched(underlying, matched)
            .await
            .without_body()
    }
}
