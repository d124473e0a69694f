//! # Handler declarations and registration tables.
//!
//! A [`Handler`] is a compiled method plus its subscribe marker: the scope flag
//! and the routes it binds to (default route `""`). Types registered
//! through `EventBus::subscribe_owner` implement [`Subscriber`] and return their
//! registration table from [`Subscriber::handlers`].
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use switchboard::{EventBus, Handler, Payload, Subscriber};
//!
//! struct Hud;
//!
//! impl Hud {
//!     fn on_life(&self, _value: &i32) {}
//!     fn on_own_life(&self, _value: &i32) {}
//! }
//!
//! impl Subscriber for Hud {
//!     fn handlers() -> Vec<Handler<Self>> {
//!         vec![
//!             Handler::new(Self::on_life).route("life"),
//!             Handler::new(Self::on_own_life).route("life").scoped(),
//!         ]
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let hud = Arc::new(Hud);
//! assert_eq!(bus.subscribe_owner(&hud), Ok(2));
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::thunk::{Compiled, FreeMethod, Method, MethodId, ParamShape};

/// A handler method with its subscribe marker.
pub struct Handler<T> {
    compiled: Compiled,
    scoped: bool,
    routes: Vec<Arc<str>>,
    _owner: PhantomData<fn(&T)>,
}

impl<T> Handler<T> {
    /// Declares a method of `T` (`fn(&T, ...)`) as a handler on the default route.
    pub fn new<M, Marker>(method: M) -> Self
    where
        M: Method<T, Marker>,
    {
        Self::from_compiled(method.compile())
    }

    /// Declares a free function (no owner) as a handler on the default route.
    pub fn free<M, Marker>(function: M) -> Self
    where
        M: FreeMethod<Marker>,
    {
        Self::from_compiled(function.compile())
    }

    fn from_compiled(compiled: Compiled) -> Self {
        Self {
            compiled,
            scoped: false,
            routes: Vec::new(),
            _owner: PhantomData,
        }
    }

    /// Restricts delivery to publishes scoped to this handler's owner.
    pub fn scoped(mut self) -> Self {
        self.scoped = true;
        self
    }

    /// Adds a route. The first call replaces the default route `""`.
    pub fn route(mut self, route: impl Into<Arc<str>>) -> Self {
        self.routes.push(route.into());
        self
    }

    /// Identity of the underlying method.
    #[inline]
    pub fn method(&self) -> MethodId {
        self.compiled.method
    }

    /// Whether the handler was declared scoped.
    #[inline]
    pub fn is_scoped(&self) -> bool {
        self.scoped
    }

    /// Whether the handler needs an owner to be invoked.
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.compiled.bound
    }

    /// Declared parameters in order.
    pub fn params(&self) -> &[ParamShape] {
        &self.compiled.params
    }

    /// Routes this handler binds to (`[""]` unless routes were added).
    pub fn routes(&self) -> impl Iterator<Item = Arc<str>> + '_ {
        let default = self.routes.is_empty().then(|| Arc::from(""));
        self.routes.iter().cloned().chain(default)
    }

    pub(crate) fn compiled(&self) -> &Compiled {
        &self.compiled
    }

    fn same_declaration(&self, other: &Self) -> bool {
        self.method() == other.method() && self.scoped == other.scoped && self.routes == other.routes
    }
}

impl<T> Clone for Handler<T> {
    fn clone(&self) -> Self {
        Self {
            compiled: self.compiled.clone(),
            scoped: self.scoped,
            routes: self.routes.clone(),
            _owner: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("method", &self.method().name())
            .field("scoped", &self.scoped)
            .field("routes", &self.routes)
            .finish()
    }
}

/// Explicit registration table of a subscriber type.
///
/// Methods declared on capability traits are listed the same way, e.g.
/// `Handler::new(<Self as Damageable>::on_hit)`.
pub trait Subscriber: Send + Sync + Sized + 'static {
    /// Handlers registered by `EventBus::subscribe_owner`.
    fn handlers() -> Vec<Handler<Self>> {
        Vec::new()
    }
}

impl Subscriber for () {}

/// Removes repeated declarations, keeping first occurrences.
pub(crate) fn dedup<T>(handlers: Vec<Handler<T>>) -> Vec<Handler<T>> {
    let mut out: Vec<Handler<T>> = Vec::with_capacity(handlers.len());
    for h in handlers {
        if !out.iter().any(|seen| seen.same_declaration(&h)) {
            out.push(h);
        }
    }
    out
}
