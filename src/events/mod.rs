//! Publish/subscribe side of the crate.
//!
//! ## Contents
//! - [`EventBus`] many-to-many delivery of positional [`Payload`] arguments
//! - [`Handler`], [`Subscriber`] handler declarations and registration tables
//! - [`RouteKey`], [`OwnerId`] route plus optional scope identity
//! - [`Method`], [`FreeMethod`] handler shapes accepted by [`Handler`]
//!
//! Internals: `thunk` compiles handlers once, `subscription` holds the weak owner
//! and matching metadata, `registry` stores route sequences behind a CAS root.

mod bus;
mod handler;
mod payload;
mod registry;
mod route;
mod subscription;
mod thunk;

pub use bus::EventBus;
pub use handler::{Handler, Subscriber};
pub use payload::Payload;
pub use route::{OwnerId, RouteKey};
pub use thunk::{FreeMethod, Method, MethodId, Nullable, ParamShape, Required};
