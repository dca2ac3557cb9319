//! # Headway
//!
//! **Headway** is a small async HTTP request router. It maps `(method, path)` pairs to
//! handlers, turns handler failures into canonical JSON error responses, and can answer
//! `HEAD` requests automatically from the route that would serve the same path.
//!
//! ## Architecture
//!
//! - **[`router`]** - Path pattern compilation and the immutable route table
//! - **[`dispatcher`]** - Runs the matched handler and maps every outcome to a response
//! - **[`preflight`]** - Automatic `HEAD` handling on top of the dispatcher
//! - **[`app`]** - Application configuration, the route builder and the serving entry point
//! - **[`error`]** - Error conditions, canonical error bodies and handler error types
//! - **[`server`]** - Transport-independent request and response types
//! - **[`validator`]** - Pluggable request body validation (JSON Schema by default)
//! - **[`security`]** - JWT and one-time-password helpers
//! - **[`runtime_config`]** / **[`logging`]** - Environment/YAML settings and `tracing` setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant App
//!     participant Preflight as PreflightAdapter
//!     participant Dispatcher
//!     participant Table as RouteTable
//!     participant Handler
//!
//!     Client->>App: fetch(request)
//!     App->>Preflight: handle(request)
//!     alt HEAD and preflight enabled
//!         Preflight->>Table: resolve_head(path)
//!         Preflight->>Dispatcher: dispatch_matched(request as GET/...)
//!     else
//!         Preflight->>Dispatcher: dispatch(request)
//!         Dispatcher->>Table: match_route(method, path)
//!     end
//!     alt no route
//!         Dispatcher-->>Preflight: not_found override or 404 body
//!     else route found
//!         Dispatcher->>Handler: call(request)
//!         alt Ok(reply)
//!             Handler-->>Dispatcher: 200 response
//!         else Exception
//!             Handler-->>Dispatcher: carried response
//!         else other error or panic
//!             Dispatcher-->>Dispatcher: error override or 500 body
//!         end
//!     end
//!     Preflight-->>App: response (body dropped for HEAD)
//!     App-->>Client: response
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use headway::{App, AppConfig, ErrorCondition, Exception, HandlerError, HandlerRequest};
//!
//! # async fn run() -> Result<(), headway::ConfigError> {
//! let app = App::builder(AppConfig::new().preflight(true))
//!     .get("/users/:id", |req: HandlerRequest| async move {
//!         match req.get_path_param("id") {
//!             Some("1") => Ok("alice".to_string()),
//!             _ => Err(HandlerError::from(Exception::new(ErrorCondition::NotFound))),
//!         }
//!     })
//!     .build()?;
//!
//! let res = app.fetch(HandlerRequest::get("/users/1")).await;
//! assert_eq!(res.status, 200);
//!
//! let res = app.fetch(HandlerRequest::get("/users/2")).await;
//! assert_eq!(res.status, 404);
//! assert_eq!(res.body_text().as_deref(), Some(r#"{"message":"Not Found","code":404}"#));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Responses
//!
//! | Condition | Status | Message |
//! |-----------|--------|---------|
//! | `NotFound` | 404 | `Not Found` |
//! | `AccessDenied` | 403 | `Access Denied` |
//! | `SomethingWentWrong` | 500 | `Something Went Wrong` |
//! | `BadRequest` | 400 | `Bad Request` |
//! | `PayloadTooLarge` | 413 | `Payload Too Large` |
//! | `TooManyRequests` | 429 | `Too Many Requests` |
//!
//! Bodies are `{"message":...,"code":...}` with
//! `content-type: application/json; charset=utf-8` and an exact `content-length`.

pub mod app;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod preflight;
pub mod router;
pub mod runtime_config;
pub mod security;
pub mod server;
pub mod validator;

pub use app::{App, AppBuilder, AppConfig, ErrorHook};
pub use dispatcher::{Dispatcher, Handler};
pub use error::{translate, ConfigError, ErrorCondition, ErrorResponse, Exception, HandlerError};
pub use ids::RequestId;
pub use preflight::PreflightAdapter;
pub use router::{RouteTable, RouteTableBuilder};
pub use runtime_config::RuntimeConfig;
pub use server::{HandlerRequest, HandlerResponse, Reply};
pub use validator::{JsonSchemaValidator, Validator};
