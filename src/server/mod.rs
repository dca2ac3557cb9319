//! # Server Module
//!
//! Transport-independent request and response types.
//!
//! [`HandlerRequest`] is what handlers receive; [`HandlerResponse`] is what the router
//! returns. Both convert from and to the `http` crate types so any HTTP server can sit in
//! front of the router.

pub mod request;
pub mod response;

use smallvec::SmallVec;
use std::sync::Arc;

pub use request::HandlerRequest;
pub use response::{HandlerResponse, Reply, TEXT_CONTENT_TYPE};

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Ordered header storage. Names are `Arc<str>` so repeated names clone cheaply; lookups
/// are case-insensitive.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;
