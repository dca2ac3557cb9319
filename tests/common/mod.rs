//! Shared helpers for integration tests.

#![allow(dead_code)]

use headway::{App, AppConfig, HandlerRequest, HandlerResponse};

/// Route `tracing` output for the current test through the test writer so it only shows
/// up for failing tests. Keep the guard alive for the duration of the test.
pub fn test_tracing() -> tracing::subscriber::DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    tracing::subscriber::set_default(subscriber)
}

/// Application with preflight enabled and no routes.
pub fn preflight_config() -> AppConfig {
    AppConfig::new().preflight(true)
}

/// Issue `method target` against `app`.
pub async fn send(app: &App, method: &str, target: &str) -> HandlerResponse {
    app.fetch(HandlerRequest::new(method, target)).await
}

/// `content-length` header as a number.
pub fn content_length(res: &HandlerResponse) -> Option<usize> {
    res.get_header("content-length").and_then(|v| v.parse().ok())
}
