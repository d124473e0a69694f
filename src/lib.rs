//! # switchboard
//!
//! **Switchboard** is an in-process messaging layer for Rust with two primitives:
//!
//! - [`EventBus`]: many-to-many publish/subscribe with routes, scoped delivery and
//!   weak subscriber ownership.
//! - [`RequestBus`]: one-to-one request/response with exactly one handler per
//!   request type, timeouts and cancellation.
//!
//! ## Architecture
//! ### Event bus
//! ```text
//!   owner: Arc<Hud>            Hud::handlers()           publish(route, scope, args)
//!        │                          │                              │
//!        ▼                          ▼                              ▼
//!   ┌─────────────────────────────────────┐         ┌─────────────────────────────┐
//!   │ subscribe                           │         │ key = (route or "", scope)  │
//!   │ - compile handler → thunk (once)    │         │ snapshot = registry[key]    │
//!   │ - Weak<owner>, OwnerId, params      │         │ for sub in snapshot:        │
//!   │ - one Subscription per route        │         │   dead?  → prune later      │
//!   └──────────────────┬──────────────────┘         │   match? → thunk(owner,args)│
//!                      ▼                            └──────────────┬──────────────┘
//!   ┌──────────────────────────────────────────────────────────────┴──────────────┐
//!   │ Registry: ArcSwap<HashMap<RouteKey, Arc<[Arc<Subscription>]>>>              │
//!   │ (compare-and-swap updates, immutable snapshots)                             │
//!   └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Request bus
//! ```text
//! request_with(req, opts) ──► handler table[TypeId::of::<R>()]
//!                                │
//!                                ▼
//!                      handler.handle(req, child token) ──► tokio::spawn
//!                                │
//!                 select! { done | caller cancel | timer }
//!                                │
//!             Ok(answer) / Handler / Panicked / TypeMismatch / Canceled / Timeout
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                         |
//! |-------------------|---------------------------------------------------------------|--------------------------------------------|
//! | **Publishing**    | Sync and async publish, routes, scopes, aggregated failures.  | [`EventBus`], [`Payload`], [`RouteKey`]    |
//! | **Subscribing**   | Typed handler methods, registration tables, free functions.   | [`Handler`], [`Subscriber`]                |
//! | **Requests**      | Typed requests and commands, timeouts, cancellation.          | [`RequestBus`], [`Request`], [`Command`]   |
//! | **Handlers**      | Trait-based or closure-backed request handlers.               | [`RequestHandler`], [`HandlerFn`]          |
//! | **Errors**        | Typed errors with stable labels.                              | [`BusError`], [`PublishError`], [`RequestError`] |
//! | **Configuration** | Request defaults.                                             | [`Config`], [`RequestOptions`]             |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use tokio_util::sync::CancellationToken;
//! use switchboard::{BoxError, EventBus, Handler, HandlerFn, Payload, Request, RequestBus, Subscriber};
//!
//! struct Hud {
//!     life: AtomicI32,
//! }
//!
//! impl Hud {
//!     fn on_life(&self, value: &i32) {
//!         self.life.store(*value, Ordering::Relaxed);
//!     }
//! }
//!
//! impl Subscriber for Hud {
//!     fn handlers() -> Vec<Handler<Self>> {
//!         vec![Handler::new(Self::on_life).route("life")]
//!     }
//! }
//!
//! struct Greet(String);
//!
//! impl Request for Greet {
//!     type Response = String;
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let events = EventBus::new();
//!     let hud = Arc::new(Hud { life: AtomicI32::new(0) });
//!     events.subscribe_owner(&hud)?;
//!     events.publish(Some("life"), None, &[Payload::new(42i32)])?;
//!     assert_eq!(hud.life.load(Ordering::Relaxed), 42);
//!
//!     let requests = RequestBus::new();
//!     requests.subscribe::<Greet, _>(HandlerFn::new(|req: Greet, _ctx: CancellationToken| async move {
//!         Ok::<_, BoxError>(if req.0 == "Hello" { "World".to_string() } else { String::new() })
//!     }));
//!     assert_eq!(requests.request(Greet("Hello".into())).await?, "World");
//!     Ok(())
//! }
//! ```
mod config;
mod error;
mod events;
mod requests;

// ---- Public re-exports ----

pub use config::Config;
pub use error::{BoxError, BusError, HandlerFailure, InvokeError, PublishError, RequestError};
pub use events::{
    EventBus, FreeMethod, Handler, Method, MethodId, Nullable, OwnerId, ParamShape, Payload, Required,
    RouteKey, Subscriber,
};
pub use requests::{
    Command, HandlerFn, HandlerFuture, Ignore, Request, RequestBus, RequestHandler, RequestOptions,
};
