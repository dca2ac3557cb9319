//! # Dispatcher Module
//!
//! Turns a request into a response.
//!
//! ## Request Flow
//!
//! Each request moves through `Matching → Invoking → (Success | Failed) → Responding`:
//!
//! 1. **Matching**: the route table is consulted. Without a match the custom `not_found`
//!    handler runs if configured (its response is used as is), otherwise the canonical
//!    404 body is sent.
//! 2. **Invoking**: the handler future is awaited with the request and its path
//!    parameters. Panics are caught.
//! 3. **Success**: text and JSON replies get `content-type` and `content-length`; a full
//!    response passes through untouched.
//! 4. **Failed**: custom error hook > the exception's own response > canonical 500.
//! 5. **Responding**: the response is returned and logged with its latency.
//!
//! ## Concurrency
//!
//! The dispatcher holds the route table and configuration behind `Arc` and never mutates
//! them, so one instance serves any number of concurrent requests. Dropping the future
//! returned by [`Dispatcher::dispatch`] drops the handler future with it.

mod core;

pub use core::{DispatchState, Dispatcher, Handler};
