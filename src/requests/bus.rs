//! # Request/response bus.
//!
//! [`RequestBus`] routes each request to the single handler registered for its
//! type and waits for the answer.
//!
//! ## Flow
//! ```text
//! request_with(req, opts)
//!     ├─► opts.timeout == 0          ─► InvalidTimeout
//!     ├─► lookup TypeId::of::<R>()   ─► NoHandler
//!     ├─► entry.call(req, child)     ─► panic: Rejected
//!     ├─► tokio::spawn(handler future)
//!     └─► select! (biased):
//!           ├─ handler done   ─► Ok(Some) / Ok(None) if accept_null / TypeMismatch
//!           │                    Handler (error) / Panicked
//!           ├─ caller cancel  ─► Canceled  (handler left running, observed)
//!           └─ timer elapsed  ─► Timeout   (handler left running, observed)
//! ```
//!
//! ## Rules
//! - One handler per request type; registering an occupied type returns `false`.
//! - Exactly one outcome per call; cancellation wins over the timeout.
//! - An abandoned handler is never aborted. Its eventual outcome is logged and discarded.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::convert;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::task::{JoinError, JoinHandle};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{panic_message, BoxError, RequestError};
use crate::requests::handler::{HandlerFuture, RequestHandler};
use crate::requests::options::RequestOptions;
use crate::requests::request::{Command, Ignore, Request};

type Handlers = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;
type Reply<R> = Result<Option<<R as Request>::Response>, BoxError>;

/// Handler of one request type, normalized to a nullable answer.
struct Entry<R: Request> {
    call: Box<dyn Fn(R, CancellationToken) -> HandlerFuture<Option<R::Response>> + Send + Sync>,
}

impl<R: Request> Entry<R> {
    fn new<O, H>(handler: H, answer: fn(O) -> Option<R::Response>) -> Self
    where
        O: Send + 'static,
        H: RequestHandler<R, O>,
    {
        Self {
            call: Box::new(move |request: R, cancel: CancellationToken| -> HandlerFuture<Option<R::Response>> {
                let fut = handler.handle(request, cancel);
                Box::pin(async move { fut.await.map(answer) })
            }),
        }
    }
}

enum Outcome<T> {
    Done(Result<T, JoinError>),
    Canceled,
    TimedOut(Duration),
}

/// Request/response bus with one handler per request type.
///
/// ### Properties
/// - **Lock-free**: the handler table is swapped atomically; lookups never block.
/// - **Cloneable**: clones share the handler table.
#[derive(Clone)]
pub struct RequestBus {
    handlers: Arc<ArcSwap<Handlers>>,
    cfg: Config,
}

impl Default for RequestBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBus {
    /// Creates a bus with [`Config::default`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a bus whose calls default to `cfg`.
    pub fn with_config(cfg: Config) -> Self {
        Self {
            handlers: Arc::new(ArcSwap::from_pointee(HashMap::new())),
            cfg,
        }
    }

    /// Per-call options seeded from the bus config.
    pub fn options(&self) -> RequestOptions {
        RequestOptions::from_config(&self.cfg)
    }

    // ---------------------------
    // Registration
    // ---------------------------

    /// Registers the handler for `R`. Returns `false` if `R` already has one.
    pub fn subscribe<R, H>(&self, handler: H) -> bool
    where
        R: Request,
        H: RequestHandler<R>,
    {
        self.register(Entry::<R>::new(handler, Some))
    }

    /// Registers a handler that may answer `None`.
    ///
    /// `None` resolves only calls made with `accept_null`; others fail with
    /// [`RequestError::TypeMismatch`].
    pub fn subscribe_nullable<R, H>(&self, handler: H) -> bool
    where
        R: Request,
        H: RequestHandler<R, Option<R::Response>>,
    {
        self.register(Entry::<R>::new(handler, convert::identity))
    }

    /// Registers the handler of command `C`.
    pub fn subscribe_command<C, H>(&self, handler: H) -> bool
    where
        C: Command,
        H: RequestHandler<C, ()>,
    {
        self.register(Entry::<C>::new(handler, |()| Some(Ignore)))
    }

    /// Removes the handler of `R`. Returns `false` if none was registered.
    pub fn unsubscribe<R: Request>(&self) -> bool {
        let key = TypeId::of::<R>();
        let removed = self.update(|current| {
            let mut next = Handlers::clone(current);
            next.remove(&key).map(|_| next)
        });
        if removed {
            tracing::debug!(request = type_name::<R>(), "request handler removed");
        }
        removed
    }

    /// Whether `R` has a handler.
    pub fn is_registered<R: Request>(&self) -> bool {
        self.handlers.load().contains_key(&TypeId::of::<R>())
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.load().len()
    }

    fn register<R: Request>(&self, entry: Entry<R>) -> bool {
        let key = TypeId::of::<R>();
        let entry: Arc<dyn Any + Send + Sync> = Arc::new(entry);
        let added = self.update(|current| {
            if current.contains_key(&key) {
                return None;
            }
            let mut next = Handlers::clone(current);
            next.insert(key, Arc::clone(&entry));
            Some(next)
        });
        if added {
            tracing::debug!(request = type_name::<R>(), "request handler registered");
        } else {
            tracing::debug!(request = type_name::<R>(), "request handler already registered");
        }
        added
    }

    /// Compare-and-swap loop over the handler table; `f` returns `None` to stop
    /// without writing.
    fn update<F>(&self, f: F) -> bool
    where
        F: Fn(&Handlers) -> Option<Handlers>,
    {
        loop {
            let current = self.handlers.load_full();
            let Some(next) = f(&current) else {
                return false;
            };
            let prev = self.handlers.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&*prev, &current) {
                return true;
            }
        }
    }

    fn entry<R: Request>(&self) -> Option<Arc<Entry<R>>> {
        let entry = self.handlers.load().get(&TypeId::of::<R>()).cloned()?;
        entry.downcast::<Entry<R>>().ok()
    }

    // ---------------------------
    // Requests
    // ---------------------------

    /// Sends `request` with the bus defaults and returns the handler's answer.
    ///
    /// A null answer is always a [`RequestError::TypeMismatch`] here; use
    /// [`RequestBus::request_with`] with `accept_null` to receive it.
    pub async fn request<R: Request>(&self, request: R) -> Result<R::Response, RequestError> {
        let opts = self.options().accept_null(false);
        self.request_with(request, opts)
            .await?
            .ok_or_else(null_mismatch::<R>)
    }

    /// Sends `request` with explicit options.
    ///
    /// Returns `Ok(None)` only for a null answer with `accept_null` set.
    ///
    /// ### Errors
    /// Every [`RequestError`] variant except the ones specific to publishing.
    pub async fn request_with<R: Request>(
        &self,
        request: R,
        opts: RequestOptions,
    ) -> Result<Option<R::Response>, RequestError> {
        let name = type_name::<R>();
        if opts.timeout == Some(Duration::ZERO) {
            return Err(RequestError::InvalidTimeout);
        }
        let entry = self
            .entry::<R>()
            .ok_or(RequestError::NoHandler { request: name })?;

        let caller = opts.cancel.unwrap_or_default();
        let child = caller.child_token();
        let fut = panic::catch_unwind(AssertUnwindSafe(|| (entry.call)(request, child)))
            .map_err(|p| RequestError::Rejected {
                request: name,
                reason: panic_message(&*p),
            })?;

        let mut job = tokio::spawn(fut);
        let outcome = match opts.timeout {
            Some(dur) => tokio::select! {
                biased;
                res = &mut job => Outcome::Done(res),
                _ = caller.cancelled() => Outcome::Canceled,
                _ = time::sleep(dur) => Outcome::TimedOut(dur),
            },
            None => tokio::select! {
                biased;
                res = &mut job => Outcome::Done(res),
                _ = caller.cancelled() => Outcome::Canceled,
            },
        };

        match outcome {
            Outcome::Done(res) => settle::<R>(res, opts.accept_null),
            Outcome::Canceled => {
                observe_abandoned::<R>(job);
                Err(RequestError::Canceled { request: name })
            }
            Outcome::TimedOut(timeout) => {
                observe_abandoned::<R>(job);
                Err(RequestError::Timeout {
                    request: name,
                    timeout,
                })
            }
        }
    }

    /// Sends command `cmd` with the bus defaults and waits for its handler.
    pub async fn send<C: Command>(&self, cmd: C) -> Result<(), RequestError> {
        self.send_with(cmd, self.options()).await
    }

    /// Sends command `cmd` with explicit options. The handler's answer is discarded.
    pub async fn send_with<C: Command>(&self, cmd: C, opts: RequestOptions) -> Result<(), RequestError> {
        self.request_with(cmd, opts.accept_null(true)).await.map(|_| ())
    }
}

fn null_mismatch<R: Request>() -> RequestError {
    RequestError::TypeMismatch {
        request: type_name::<R>(),
        expected: type_name::<R::Response>(),
        actual: "null",
    }
}

/// Maps a finished handler to the caller's result.
fn settle<R: Request>(
    res: Result<Reply<R>, JoinError>,
    accept_null: bool,
) -> Result<Option<R::Response>, RequestError> {
    let request = type_name::<R>();
    match res {
        Ok(Ok(Some(answer))) => Ok(Some(answer)),
        Ok(Ok(None)) if accept_null => Ok(None),
        Ok(Ok(None)) => Err(null_mismatch::<R>()),
        Ok(Err(source)) => Err(RequestError::Handler { request, source }),
        Err(err) => {
            let reason = if err.is_panic() {
                panic_message(&*err.into_panic())
            } else {
                err.to_string()
            };
            Err(RequestError::Panicked { request, reason })
        }
    }
}

/// Waits for an abandoned handler in the background and logs how it ended.
fn observe_abandoned<R: Request>(job: JoinHandle<Reply<R>>) {
    let request = type_name::<R>();
    tokio::spawn(async move {
        match job.await {
            Ok(Ok(_)) => tracing::debug!(request, "abandoned request handler completed"),
            Ok(Err(err)) => tracing::warn!(request, error = %err, "abandoned request handler failed"),
            Err(err) => tracing::warn!(request, error = %err, "abandoned request handler panicked"),
        }
    });
}
