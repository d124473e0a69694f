//! Request/response side of the crate.
//!
//! ## Contents
//! - [`Request`], [`Command`], [`Ignore`] request kinds
//! - [`RequestHandler`], [`HandlerFn`] handlers and the closure adapter
//! - [`RequestOptions`] per-call timeout, null acceptance and cancellation
//! - [`RequestBus`] one handler per request type

mod bus;
mod handler;
mod options;
mod request;

pub use bus::RequestBus;
pub use handler::{HandlerFn, HandlerFuture, RequestHandler};
pub use options::RequestOptions;
pub use request::{Command, Ignore, Request};
