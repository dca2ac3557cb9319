//! # Router Module
//!
//! Path matching and route resolution.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling path patterns (`/users/:id`, `/users/{id}`) into anchored regexes
//! - Rejecting duplicate (method, pattern) registrations at configuration time
//! - Matching incoming requests to the first registered route that fits
//! - Extracting path parameters from matched routes
//!
//! ## Phases
//!
//! Routes are collected by a [`RouteTableBuilder`] and frozen into a [`RouteTable`] by
//! [`RouteTableBuilder::build`]. The table has no mutation API, so the configuration
//! phase is over once serving starts.
//!
//! ## Example
//!
//! ```rust
//! use headway::router::RouteTableBuilder;
//! use headway::server::HandlerRequest;
//! use http::Method;
//!
//! let mut builder = RouteTableBuilder::new();
//! builder
//!     .register(Method::GET, "/users/:id", |req: HandlerRequest| async move {
//!         Ok(format!("user {}", req.get_path_param("id").unwrap_or_default()))
//!     })
//!     .unwrap();
//! let table = builder.build();
//!
//! let m = table.match_route(&Method::GET, "/users/42").unwrap();
//! assert_eq!(m.get_path_param("id"), Some("42"));
//! assert!(table.match_route(&Method::POST, "/users/42").is_none());
//! ```
//!
//! ## Matching rules
//!
//! - Path comparison is case-sensitive; method tokens are normalized to upper case when
//!   the request is built.
//! - The query string never takes part in matching.
//! - Parameters match exactly one non-empty segment and are percent-decoded.
//! - Complexity is O(n) in the number of routes registered for the method.

mod core;

pub use core::{
    ParamVec, PathPattern, Route, RouteMatch, RouteTable, RouteTableBuilder, MAX_INLINE_PARAMS,
};
