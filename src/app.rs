//! # App Module
//!
//! Application configuration and the fluent route builder.
//!
//! ```rust
//! use headway::{App, AppConfig, HandlerRequest};
//!
//! # async fn run() -> Result<(), headway::error::ConfigError> {
//! let app = App::builder(AppConfig::new().preflight(true))
//!     .get("/foo", |_req: HandlerRequest| async { Ok("bar") })
//!     .build()?;
//!
//! let res = app.fetch(HandlerRequest::head("/foo")).await;
//! assert_eq!(res.status, 200);
//! assert!(res.body.is_none());
//! assert_eq!(res.get_header("content-length"), Some("3"));
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use http::Method;
use tracing::{error, info};

use crate::dispatcher::{Dispatcher, Handler};
use crate::error::{ConfigError, HandlerError};
use crate::preflight::PreflightAdapter;
use crate::router::{RouteTable, RouteTableBuilder};
use crate::runtime_config::RuntimeConfig;
use crate::server::request::parse_method;
use crate::server::{HandlerRequest, HandlerResponse, Reply};

/// Replacement for the default error response. Receives the handler failure.
pub type ErrorHook = Arc<dyn Fn(&HandlerError) -> Reply + Send + Sync>;

/// Immutable application configuration.
#[derive(Clone, Default)]
pub struct AppConfig {
    /// Answer `HEAD` requests from the matching non-HEAD route
    pub preflight: bool,
    /// Runs when no route matches; its response is used verbatim
    pub not_found: Option<Arc<dyn Handler>>,
    /// Runs when a handler fails; its response is used verbatim
    pub error: Option<ErrorHook>,
}

impl AppConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from runtime settings (environment or YAML file).
    #[must_use]
    pub fn from_runtime(runtime: &RuntimeConfig) -> Self {
        Self {
            preflight: runtime.preflight,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn preflight(mut self, enabled: bool) -> Self {
        self.preflight = enabled;
        self
    }

    /// Replace the default 404 response.
    #[must_use]
    pub fn not_found<F, Fut, R>(mut self, handler: F) -> Self
    where
        F: Fn(HandlerRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
        R: Into<Reply> + 'static,
    {
        self.not_found = Some(Arc::new(handler));
        self
    }

    /// Replace the default error response. Text or JSON replies get status 500; a full
    /// [`HandlerResponse`] is sent as is.
    #[must_use]
    pub fn error<F, R>(mut self, hook: F) -> Self
    where
        F: Fn(&HandlerError) -> R + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.error = Some(Arc::new(move |err: &HandlerError| hook(err).into()));
        self
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("preflight", &self.preflight)
            .field("not_found", &self.not_found.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

/// Configuration-phase builder.
///
/// Registration methods chain; the first configuration error is kept and returned by
/// [`AppBuilder::build`], which also ends the configuration phase.
pub struct AppBuilder {
    config: AppConfig,
    routes: RouteTableBuilder,
    error: Option<ConfigError>,
}

macro_rules! method_routes {
    ($($fn_name:ident => $method:expr),* $(,)?) => {
        $(
            #[doc = concat!("Register a `", stringify!($method), "` route.")]
            #[must_use]
            pub fn $fn_name<F, Fut, R>(self, pattern: &str, handler: F) -> Self
            where
                F: Fn(HandlerRequest) -> Fut + Send + Sync + 'static,
                Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
                R: Into<Reply> + 'static,
            {
                self.add($method, pattern, Arc::new(handler))
            }
        )*
    };
}

impl AppBuilder {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            routes: RouteTableBuilder::new(),
            error: None,
        }
    }

    method_routes! {
        get => Method::GET,
        head => Method::HEAD,
        post => Method::POST,
        put => Method::PUT,
        patch => Method::PATCH,
        delete => Method::DELETE,
        options => Method::OPTIONS,
    }

    /// Register a route for an arbitrary method token (case-insensitive).
    ///
    /// A token that is not a valid HTTP method is reported as
    /// [`ConfigError::InvalidMethod`] by [`AppBuilder::build`].
    #[must_use]
    pub fn route<F, Fut, R>(self, method: &str, pattern: &str, handler: F) -> Self
    where
        F: Fn(HandlerRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
        R: Into<Reply> + 'static,
    {
        match parse_method(method) {
            Some(m) => self.add(m, pattern, Arc::new(handler)),
            None => self.fail(ConfigError::InvalidMethod {
                method: method.to_string(),
            }),
        }
    }

    fn add(mut self, method: Method, pattern: &str, handler: Arc<dyn Handler>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let registered = self
            .routes
            .register_arc(method, pattern, handler)
            .map(|_| ());
        match registered {
            Ok(()) => self,
            Err(e) => self.fail(e),
        }
    }

    fn fail(mut self, err: ConfigError) -> Self {
        if self.error.is_none() {
            error!(error = %err, "Route registration failed");
            self.error = Some(err);
        }
        self
    }

    /// Finish configuration.
    pub fn build(self) -> Result<App, ConfigError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let table: RouteTable = self.routes.build();
        info!(
            routes_count = table.len(),
            config = ?self.config,
            "Application ready"
        );
        let preflight = self.config.preflight;
        let dispatcher = Dispatcher::new(table, self.config);
        Ok(App {
            adapter: PreflightAdapter::new(dispatcher, preflight),
        })
    }
}

/// A configured application in its serving phase.
///
/// Cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct App {
    adapter: PreflightAdapter,
}

impl App {
    #[must_use]
    pub fn builder(config: AppConfig) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// Handle one request. Always yields a response.
    pub async fn fetch(&self, req: HandlerRequest) -> HandlerResponse {
        self.adapter.handle(req).await
    }

    /// Handle an `http::Request`, returning an `http::Response`.
    pub async fn fetch_http(&self, req: http::Request<Vec<u8>>) -> http::Response<Vec<u8>> {
        self.fetch(HandlerRequest::from_http(req)).await.into_http()
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        self.adapter.dispatcher().table()
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        self.adapter.dispatcher().config()
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("config", self.config())
            .field("routes", self.routes())
            .finish()
    }
}
