//! # Request handlers and the closure adapter.
//!
//! A [`RequestHandler`] accepts a request and returns a `'static` future that
//! produces the answer. Accepting is synchronous: anything the handler does
//! before returning its future happens on the caller's side, and a panic there
//! is reported as [`RequestError::Rejected`](crate::RequestError::Rejected).
//!
//! [`HandlerFn`] wraps a closure `Fn(R, CancellationToken) -> Fut`, creating a
//! fresh future per request.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use switchboard::{BoxError, HandlerFn, Request, RequestBus};
//!
//! struct Greet(String);
//!
//! impl Request for Greet {
//!     type Response = String;
//! }
//!
//! let bus = RequestBus::new();
//! let registered = bus.subscribe::<Greet, _>(HandlerFn::new(|req: Greet, _ctx: CancellationToken| async move {
//!     Ok::<_, BoxError>(format!("{} back", req.0))
//! }));
//! assert!(registered);
//! ```

use std::future::Future;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::BoxError;
use crate::requests::request::Request;

/// Future returned by a request handler.
pub type HandlerFuture<O> = BoxFuture<'static, Result<O, BoxError>>;

/// Asynchronous handler of requests of type `R`, producing `O`
/// (`R::Response`, or `Option<R::Response>` for nullable handlers).
///
/// The `cancel` token is a child of the caller's token: it fires when the caller
/// cancels. Timeouts do not cancel it; an abandoned handler keeps running.
pub trait RequestHandler<R: Request, O: Send + 'static = <R as Request>::Response>:
    Send + Sync + 'static
{
    /// Accepts `request` and returns the future producing the answer.
    fn handle(&self, request: R, cancel: CancellationToken) -> HandlerFuture<O>;
}

/// Closure-backed request handler.
#[derive(Debug, Clone)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F> {
    /// Wraps a closure `Fn(R, CancellationToken) -> impl Future<Output = Result<O, BoxError>>`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<R, O, F, Fut> RequestHandler<R, O> for HandlerFn<F>
where
    R: Request,
    O: Send + 'static,
    F: Fn(R, CancellationToken) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<O, BoxError>> + Send + 'static,
{
    fn handle(&self, request: R, cancel: CancellationToken) -> HandlerFuture<O> {
        let fut = (self.f)(request, cancel);
        Box::pin(fut)
    }
}
