//! Dispatcher core: the per-request state machine.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::app::AppConfig;
use crate::error::{translate, ErrorCondition, HandlerError};
use crate::router::{RouteMatch, RouteTable};
use crate::server::{HandlerRequest, HandlerResponse, Reply};

/// A request handler.
///
/// Implemented for every `Fn(HandlerRequest) -> impl Future<Output = Result<R,
/// HandlerError>>` where `R: Into<Reply>`, so plain async closures work:
///
/// ```rust
/// use headway::dispatcher::Handler;
/// use headway::error::HandlerError;
/// use headway::server::HandlerRequest;
///
/// fn assert_handler<H: Handler>(_: H) {}
/// assert_handler(|_req: HandlerRequest| async { Ok::<_, HandlerError>("hello") });
/// ```
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: HandlerRequest) -> BoxFuture<'static, Result<Reply, HandlerError>>;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(HandlerRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    R: Into<Reply> + 'static,
{
    fn call(&self, req: HandlerRequest) -> BoxFuture<'static, Result<Reply, HandlerError>> {
        let fut = (self)(req);
        async move { fut.await.map(Into::into) }.boxed()
    }
}

/// Stage of a request inside the dispatcher, used as a log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Matching,
    Invoking,
    Success,
    Failed,
    Responding,
}

impl DispatchState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DispatchState::Matching => "matching",
            DispatchState::Invoking => "invoking",
            DispatchState::Success => "success",
            DispatchState::Failed => "failed",
            DispatchState::Responding => "responding",
        }
    }
}

/// Routes requests to handlers and turns every outcome into a response.
///
/// Cloning is cheap: the route table and configuration are shared.
#[derive(Clone)]
pub struct Dispatcher {
    table: Arc<RouteTable>,
    config: Arc<AppConfig>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(table: RouteTable, config: AppConfig) -> Self {
        Self {
            table: Arc::new(table),
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Match, invoke and respond.
    ///
    /// Never fails: unmatched requests, handler errors and handler panics all produce a
    /// well-formed response.
    pub async fn dispatch(&self, req: HandlerRequest) -> HandlerResponse {
        debug!(
            request_id = %req.request_id,
            state = DispatchState::Matching.as_str(),
            method = %req.method,
            path = %req.path,
            "Dispatch state"
        );
        let matched = self.table.match_route(&req.method, &req.path);
        self.dispatch_matched(req, matched).await
    }

    /// Continue dispatch with an already resolved match (or `None` for not found).
    pub async fn dispatch_matched(
        &self,
        mut req: HandlerRequest,
        matched: Option<RouteMatch>,
    ) -> HandlerResponse {
        let span = info_span!(
            "request",
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
        );

        async move {
            let start = Instant::now();

            let handler = match matched {
                Some(m) => {
                    req.path_params = m.path_params;
                    Some(Arc::clone(&m.route.handler))
                }
                None => {
                    info!("No route matched");
                    self.config.not_found.clone()
                }
            };

            let response = match handler {
                Some(handler) => self.invoke(handler, req).await,
                None => translate(ErrorCondition::NotFound).into(),
            };

            info!(
                state = DispatchState::Responding.as_str(),
                status = response.status,
                latency_ms = start.elapsed().as_millis() as u64,
                "Request complete"
            );
            response
        }
        .instrument(span)
        .await
    }

    async fn invoke(&self, handler: Arc<dyn Handler>, req: HandlerRequest) -> HandlerResponse {
        debug!(
            state = DispatchState::Invoking.as_str(),
            path_params = ?req.path_params,
            "Dispatch state"
        );

        let outcome = match AssertUnwindSafe(async move { handler.call(req).await })
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic payload".to_string());
                error!(panic_message = %message, "Handler panicked");
                Err(HandlerError::Opaque(anyhow::anyhow!(
                    "handler panicked: {message}"
                )))
            }
        };

        match outcome {
            Ok(reply) => {
                debug!(state = DispatchState::Success.as_str(), "Dispatch state");
                reply.into_response()
            }
            Err(err) => {
                match &err {
                    HandlerError::Exception(e) => info!(
                        state = DispatchState::Failed.as_str(),
                        status = e.response().status,
                        "Handler raised exception"
                    ),
                    HandlerError::Opaque(e) => warn!(
                        state = DispatchState::Failed.as_str(),
                        error = ?e,
                        "Handler failed"
                    ),
                }
                self.error_response(&err)
            }
        }
    }

    /// Response for a failed handler: custom hook, then the exception's own response,
    /// then the generic 500.
    #[must_use]
    pub fn error_response(&self, err: &HandlerError) -> HandlerResponse {
        match &self.config.error {
            Some(hook) => hook(err).into_response_with_status(500),
            None => err.default_response(),
        }
    }
}
