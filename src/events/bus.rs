//! # Publish/subscribe event bus.
//!
//! [`EventBus`] delivers positional [`Payload`] arguments to every live, matching
//! subscription registered on a route. Publishing never blocks subscribe or
//! unsubscribe: each publish iterates an immutable registry snapshot.
//!
//! ## Architecture
//! ```text
//! subscribe(owner, handlers) ──► Subscription (weak owner, thunk) ──► Registry::upsert
//!
//! publish(route, scope, args)
//!     │
//!     ├─► key = (route or "", scope)
//!     ├─► Registry::snapshot(key)
//!     ├─► for sub in snapshot (insertion order):
//!     │       ├─ dead?    ─► queue for pruning
//!     │       ├─ matches? ─► invoke (sync) / spawn (async)
//!     │       └─ panic    ─► HandlerFailure (other subscribers still run)
//!     └─► Registry::remove_dead(key, dead)
//! ```
//!
//! ## Rules
//! - Subscribers present at the moment of the snapshot are delivered to.
//! - A failing subscriber never prevents delivery to the others; all failures of
//!   one publish are returned together as [`PublishError`].
//! - Dead subscriptions (owner dropped) are never invoked and are pruned lazily.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use switchboard::{EventBus, Handler, Payload};
//!
//! struct Counter(AtomicUsize);
//!
//! impl Counter {
//!     fn on_tick(&self, step: &usize) {
//!         self.0.fetch_add(*step, Ordering::Relaxed);
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let counter = Arc::new(Counter(AtomicUsize::new(0)));
//! bus.subscribe(Some(&counter), &[Handler::new(Counter::on_tick).route("tick")]).unwrap();
//!
//! bus.publish(Some("tick"), None, &[Payload::new(2usize)]).unwrap();
//! assert_eq!(counter.0.load(Ordering::Relaxed), 2);
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::future::join_all;

use crate::error::{panic_message, BusError, HandlerFailure, InvokeError, PublishError};
use crate::events::handler::{dedup, Handler, Subscriber};
use crate::events::registry::Registry;
use crate::events::route::{OwnerId, RouteKey};
use crate::events::subscription::Subscription;
use crate::events::Payload;

/// Publish/subscribe bus.
///
/// ### Properties
/// - **Lock-free**: registry updates use compare-and-swap; reads never block.
/// - **Weak**: the bus never keeps subscriber owners alive.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed registry).
#[derive(Clone)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry::new()),
        }
    }

    // ---------------------------
    // Subscribing
    // ---------------------------

    /// Registers `handlers` for `owner`.
    ///
    /// - Free handlers (see [`Handler::free`]) are registered without an owner.
    /// - Subscribing the same owner and handler again is a no-op.
    /// - To register an owner's own table, use [`EventBus::subscribe_owner`].
    ///
    /// Returns the number of subscriptions added.
    ///
    /// ### Errors
    /// - [`BusError::NoTarget`] if `handlers` is empty.
    /// - [`BusError::MissingOwner`] if a bound handler is given without an owner
    ///   (nothing is registered in that case).
    pub fn subscribe<T>(&self, owner: Option<&Arc<T>>, handlers: &[Handler<T>]) -> Result<usize, BusError>
    where
        T: Any + Send + Sync,
    {
        if handlers.is_empty() {
            return Err(BusError::NoTarget);
        }
        self.register(owner, handlers)
    }

    /// Registers the owner's handler table from [`Subscriber::handlers`],
    /// without repeated declarations.
    pub fn subscribe_owner<T: Subscriber>(&self, owner: &Arc<T>) -> Result<usize, BusError> {
        self.register(Some(owner), &dedup(T::handlers()))
    }

    /// Registers free handlers that have no owner.
    pub fn subscribe_free(&self, handlers: &[Handler<()>]) -> Result<usize, BusError> {
        self.subscribe::<()>(None, handlers)
    }

    fn register<T>(&self, owner: Option<&Arc<T>>, handlers: &[Handler<T>]) -> Result<usize, BusError>
    where
        T: Any + Send + Sync,
    {
        if owner.is_none() {
            if let Some(h) = handlers.iter().find(|h| h.is_bound()) {
                return Err(BusError::MissingOwner {
                    method: h.method().name(),
                });
            }
        }

        let mut added = 0;
        for h in handlers {
            let target = if h.is_bound() { owner } else { None };
            for route in h.routes() {
                let sub = Subscription::new(target, h.compiled(), route, h.is_scoped());
                if self.registry.upsert(Arc::new(sub)) {
                    added += 1;
                }
            }
        }
        tracing::debug!(added, total = self.registry.len(), "subscribed");
        Ok(added)
    }

    /// Removes subscriptions.
    ///
    /// - With handlers: removes, on each handler's routes, subscriptions whose owner
    ///   and handler match.
    /// - Without handlers: removes every subscription of `owner` on every route.
    ///
    /// Dead subscriptions met on the way are pruned as well. They are not part of
    /// the returned count, which covers only the subscriptions that matched.
    ///
    /// ### Errors
    /// - [`BusError::NoTarget`] if `owner` is `None` and `handlers` is empty.
    /// - [`BusError::MissingOwner`] if a bound handler is given without an owner.
    pub fn unsubscribe<T>(&self, owner: Option<&Arc<T>>, handlers: &[Handler<T>]) -> Result<usize, BusError>
    where
        T: Any + Send + Sync,
    {
        let owner_id = owner.map(OwnerId::of);

        if handlers.is_empty() {
            let id = owner_id.ok_or(BusError::NoTarget)?;
            let removed = self.registry.remove_everywhere(|s| s.owner_id() == Some(id));
            let pruned = self.registry.remove_everywhere(|s| !s.is_alive());
            tracing::debug!(owner = %id, removed, pruned, "unsubscribed owner");
            return Ok(removed);
        }

        let mut removed = 0;
        let mut pruned = 0;
        for h in handlers {
            let sub_owner = match (h.is_bound(), owner_id) {
                (true, Some(id)) => Some(id),
                (true, None) => {
                    return Err(BusError::MissingOwner {
                        method: h.method().name(),
                    })
                }
                (false, _) => None,
            };
            let scope = if h.is_scoped() { sub_owner } else { None };
            for route in h.routes() {
                let key = RouteKey::new(route, scope);
                removed += self
                    .registry
                    .remove_where(&key, |s| s.owner_id() == sub_owner && s.method() == h.method());
                pruned += self.registry.remove_where(&key, |s| !s.is_alive());
            }
        }
        tracing::debug!(removed, pruned, "unsubscribed handlers");
        Ok(removed)
    }

    /// Removes free handlers registered with [`EventBus::subscribe_free`].
    pub fn unsubscribe_free(&self, handlers: &[Handler<()>]) -> Result<usize, BusError> {
        self.unsubscribe::<()>(None, handlers)
    }

    /// Number of registered subscriptions (dead ones included until pruned).
    pub fn subscription_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns `true` if no subscription is registered.
    pub fn is_empty(&self) -> bool {
        self.subscription_count() == 0
    }

    /// Route keys that currently hold at least one subscription.
    pub fn routes(&self) -> Vec<RouteKey> {
        self.registry.keys()
    }

    /// Removes every subscription.
    pub fn clear(&self) {
        self.registry.clear();
    }

    // ---------------------------
    // Publishing
    // ---------------------------

    /// Synchronously invokes every live subscription matching `(route, scope, args)`
    /// in insertion order.
    ///
    /// `route = None` is the default route `""`. Publishing to a route without
    /// subscribers is a no-op.
    ///
    /// ### Errors
    /// [`PublishError`] listing every subscriber that panicked or could not be bound;
    /// all other subscribers were still invoked.
    pub fn publish(
        &self,
        route: Option<&str>,
        scope: Option<OwnerId>,
        args: &[Payload],
    ) -> Result<(), PublishError> {
        let key = RouteKey::new(route.unwrap_or(""), scope);
        let mut failures = Vec::new();

        self.dispatch(&key, scope, args, |sub| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| sub.invoke(args)));
            if let Some(failure) = failure_of(sub, outcome) {
                failures.push(failure);
            }
        });

        finish(&key, failures)
    }

    /// [`EventBus::publish`] on the default route, restricted to subscribers scoped to `scope`.
    pub fn publish_scoped<S: ?Sized>(&self, scope: &Arc<S>, args: &[Payload]) -> Result<(), PublishError> {
        self.publish(None, Some(OwnerId::of(scope)), args)
    }

    /// Same matching as [`EventBus::publish`], but every matching subscription runs
    /// as its own tokio task. Waits until all of them completed.
    ///
    /// ### Errors
    /// [`PublishError`] with every failed invocation, in subscription order.
    ///
    /// ### Panics
    /// When polled outside a tokio runtime while at least one subscription matches,
    /// since every invocation is started with `tokio::spawn`.
    pub async fn publish_async(
        &self,
        route: Option<&str>,
        scope: Option<OwnerId>,
        args: &[Payload],
    ) -> Result<(), PublishError> {
        let key = RouteKey::new(route.unwrap_or(""), scope);
        let shared: Arc<[Payload]> = Arc::from(args);
        let mut pending = Vec::new();

        self.dispatch(&key, scope, args, |sub| {
            let method = sub.method().name();
            let sub = Arc::clone(sub);
            let args = Arc::clone(&shared);
            let job = tokio::spawn(async move { sub.invoke(&args) });
            pending.push((method, job));
        });

        let (methods, jobs): (Vec<&'static str>, Vec<_>) = pending.into_iter().unzip();
        let mut failures = Vec::new();
        for (method, joined) in methods.into_iter().zip(join_all(jobs).await) {
            let reason = match joined {
                Ok(Ok(())) | Ok(Err(InvokeError::TargetGone)) => continue,
                Ok(Err(err)) => err.to_string(),
                Err(err) if err.is_panic() => panic_message(&*err.into_panic()),
                Err(err) => err.to_string(),
            };
            failures.push(HandlerFailure { method, reason });
        }

        finish(&key, failures)
    }

    /// [`EventBus::publish_async`] on the default route, restricted to subscribers
    /// scoped to `scope`.
    ///
    /// ### Panics
    /// Same as [`EventBus::publish_async`].
    pub async fn publish_async_scoped<S: ?Sized>(
        &self,
        scope: &Arc<S>,
        args: &[Payload],
    ) -> Result<(), PublishError> {
        self.publish_async(None, Some(OwnerId::of(scope)), args).await
    }

    /// Walks the snapshot of `key`, hands every live match to `deliver`, then
    /// prunes the dead subscriptions it met.
    fn dispatch<D>(&self, key: &RouteKey, scope: Option<OwnerId>, args: &[Payload], mut deliver: D)
    where
        D: FnMut(&Arc<Subscription>),
    {
        let Some(snapshot) = self.registry.snapshot(key) else {
            return;
        };

        let mut dead = Vec::new();
        for sub in snapshot.iter() {
            if !sub.is_alive() {
                dead.push(Arc::clone(sub));
                continue;
            }
            if sub.matches(key, scope, args) {
                deliver(sub);
            }
        }

        let pruned = self.registry.remove_dead(key, &dead);
        if pruned > 0 {
            tracing::debug!(route = %key, pruned, "pruned dead subscriptions");
        }
    }
}

/// Converts the outcome of one synchronous invocation into a failure, if any.
fn failure_of(
    sub: &Subscription,
    outcome: std::thread::Result<Result<(), InvokeError>>,
) -> Option<HandlerFailure> {
    let reason = match outcome {
        Ok(Ok(())) | Ok(Err(InvokeError::TargetGone)) => return None,
        Ok(Err(err)) => err.to_string(),
        Err(panic) => panic_message(&*panic),
    };
    Some(HandlerFailure {
        method: sub.method().name(),
        reason,
    })
}

fn finish(key: &RouteKey, failures: Vec<HandlerFailure>) -> Result<(), PublishError> {
    if failures.is_empty() {
        return Ok(());
    }
    for f in &failures {
        tracing::warn!(route = %key, method = f.method, reason = %f.reason, "subscriber failed");
    }
    Err(PublishError { failures })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        hits: AtomicUsize,
        own: AtomicUsize,
    }

    impl Counter {
        fn on_hit(&self, n: &usize) {
            self.hits.fetch_add(*n, Ordering::Relaxed);
        }

        fn on_own(&self, n: &usize) {
            self.own.fetch_add(*n, Ordering::Relaxed);
        }

        fn on_unit(&self) {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }

        fn on_maybe(&self, n: Option<&usize>) {
            self.hits.fetch_add(n.copied().unwrap_or(100), Ordering::Relaxed);
        }

        fn not_listed(&self, _: &usize) {}

        fn boom(&self, _: &usize) {
            panic!("boom");
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::Relaxed)
        }

        fn own(&self) -> usize {
            self.own.load(Ordering::Relaxed)
        }
    }

    impl Subscriber for Counter {
        fn handlers() -> Vec<Handler<Self>> {
            vec![
                Handler::new(Self::on_hit).route("life"),
                Handler::new(Self::on_own).route("life").scoped(),
                Handler::new(Self::on_hit).route("life"),
            ]
        }
    }

    fn counter() -> Arc<Counter> {
        Arc::new(Counter::default())
    }

    #[test]
    fn test_subscribe_counts_and_duplicates() {
        let bus = EventBus::new();
        let c = counter();
        let handlers = [Handler::new(Counter::on_hit), Handler::new(Counter::on_unit)];

        assert_eq!(bus.subscribe(Some(&c), &handlers), Ok(2));
        assert_eq!(bus.subscribe(Some(&c), &handlers), Ok(0));
        assert_eq!(bus.subscription_count(), 2);

        bus.publish(None, None, &[Payload::new(3usize)]).unwrap();
        assert_eq!(c.hits(), 3);
    }

    #[test]
    fn test_subscribe_owner_uses_table_only() {
        let bus = EventBus::new();
        let c = counter();
        assert_eq!(bus.subscribe_owner(&c), Ok(2));

        let routes = bus.routes();
        assert_eq!(routes.len(), 2);
        assert!(routes.contains(&RouteKey::new("life", None)));
        assert!(routes.contains(&RouteKey::new("life", Some(OwnerId::of(&c)))));

        bus.publish(None, None, &[Payload::new(1usize)]).unwrap();
        assert_eq!(c.hits(), 0);
    }

    #[test]
    fn test_subscribe_errors() {
        let bus = EventBus::new();
        assert_eq!(bus.subscribe::<Counter>(None, &[]), Err(BusError::NoTarget));

        let err = bus
            .subscribe::<Counter>(None, &[Handler::new(Counter::on_hit)])
            .unwrap_err();
        assert!(matches!(err, BusError::MissingOwner { .. }));
        assert!(bus.is_empty());
    }

    #[test]
    fn test_unsubscribe_single_handler() {
        let bus = EventBus::new();
        let c = counter();
        bus.subscribe(Some(&c), &[Handler::new(Counter::on_hit), Handler::new(Counter::on_unit)])
            .unwrap();

        assert_eq!(bus.unsubscribe(Some(&c), &[Handler::new(Counter::on_hit)]), Ok(1));
        assert_eq!(bus.unsubscribe(Some(&c), &[Handler::new(Counter::not_listed)]), Ok(0));
        assert_eq!(bus.subscription_count(), 1);
    }

    #[test]
    fn test_unsubscribe_owner_keeps_others() {
        let bus = EventBus::new();
        let a = counter();
        let b = counter();
        bus.subscribe_owner(&a).unwrap();
        bus.subscribe_owner(&b).unwrap();
        assert_eq!(bus.subscription_count(), 4);

        assert_eq!(bus.unsubscribe::<Counter>(Some(&a), &[]), Ok(2));
        assert_eq!(bus.subscription_count(), 2);

        bus.publish(Some("life"), None, &[Payload::new(1usize)]).unwrap();
        assert_eq!(a.hits(), 0);
        assert_eq!(b.hits(), 1);
    }

    #[test]
    fn test_free_handlers() {
        static SEEN: AtomicUsize = AtomicUsize::new(0);
        fn on_free(n: &usize) {
            SEEN.fetch_add(*n, Ordering::Relaxed);
        }

        let bus = EventBus::new();
        assert_eq!(bus.subscribe_free(&[Handler::free(on_free).route("free")]), Ok(1));
        bus.publish(Some("free"), None, &[Payload::new(5usize)]).unwrap();
        assert_eq!(SEEN.load(Ordering::Relaxed), 5);

        assert_eq!(bus.unsubscribe_free(&[Handler::free(on_free).route("free")]), Ok(1));
        assert!(bus.is_empty());
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        assert!(bus.publish(Some("nothing"), None, &[Payload::new(1usize)]).is_ok());
        assert!(bus.is_empty());
    }

    #[test]
    fn test_publish_matches_types_and_arity() {
        let bus = EventBus::new();
        let c = counter();
        bus.subscribe(Some(&c), &[Handler::new(Counter::on_hit)]).unwrap();

        bus.publish(None, None, &[Payload::new(1u32)]).unwrap();
        bus.publish(None, None, &[]).unwrap();
        bus.publish(None, None, &[Payload::new(1usize), Payload::new(1usize)]).unwrap();
        assert_eq!(c.hits(), 0);
    }

    #[test]
    fn test_null_reaches_only_nullable_params() {
        let bus = EventBus::new();
        let c = counter();
        bus.subscribe(Some(&c), &[Handler::new(Counter::on_hit), Handler::new(Counter::on_maybe)])
            .unwrap();

        bus.publish(None, None, &[Payload::null()]).unwrap();
        assert_eq!(c.hits(), 100);
        bus.publish(None, None, &[Payload::new(1usize)]).unwrap();
        assert_eq!(c.hits(), 102);
    }

    #[test]
    fn test_scoped_and_unscoped_delivery() {
        let bus = EventBus::new();
        let a = counter();
        let b = counter();
        bus.subscribe_owner(&a).unwrap();
        bus.subscribe_owner(&b).unwrap();

        bus.publish(Some("life"), None, &[Payload::new(1usize)]).unwrap();
        assert_eq!((a.hits(), a.own()), (1, 0));
        assert_eq!((b.hits(), b.own()), (1, 0));

        bus.publish(Some("life"), Some(OwnerId::of(&a)), &[Payload::new(10usize)])
            .unwrap();
        assert_eq!((a.hits(), a.own()), (1, 10));
        assert_eq!((b.hits(), b.own()), (1, 0));
    }

    #[test]
    fn test_publish_scoped_uses_default_route() {
        let bus = EventBus::new();
        let c = counter();
        bus.subscribe(Some(&c), &[Handler::new(Counter::on_own).scoped()]).unwrap();
        let other = counter();

        bus.publish_scoped(&other, &[Payload::new(1usize)]).unwrap();
        assert_eq!(c.own(), 0);
        bus.publish_scoped(&c, &[Payload::new(1usize)]).unwrap();
        assert_eq!(c.own(), 1);
    }

    #[test]
    fn test_dead_owners_are_skipped_and_pruned() {
        let bus = EventBus::new();
        let alive = counter();
        let dead = counter();
        bus.subscribe(Some(&alive), &[Handler::new(Counter::on_hit)]).unwrap();
        bus.subscribe(Some(&dead), &[Handler::new(Counter::on_hit)]).unwrap();
        drop(dead);
        assert_eq!(bus.subscription_count(), 2);

        bus.publish(None, None, &[Payload::new(1usize)]).unwrap();
        assert_eq!(alive.hits(), 1);
        assert_eq!(bus.subscription_count(), 1);
    }

    #[test]
    fn test_failures_are_aggregated() {
        let bus = EventBus::new();
        let a = counter();
        let b = counter();
        let c = counter();
        bus.subscribe(Some(&a), &[Handler::new(Counter::boom)]).unwrap();
        bus.subscribe(Some(&b), &[Handler::new(Counter::on_hit)]).unwrap();
        bus.subscribe(Some(&c), &[Handler::new(Counter::boom)]).unwrap();

        let err = bus.publish(None, None, &[Payload::new(1usize)]).unwrap_err();
        assert_eq!(err.failures.len(), 2);
        assert!(err.failures.iter().all(|f| f.reason == "boom"));
        assert_eq!(b.hits(), 1);
        assert_eq!(bus.subscription_count(), 3);
    }

    #[test]
    fn test_clear() {
        let bus = EventBus::new();
        let c = counter();
        bus.subscribe_owner(&c).unwrap();
        bus.clear();
        assert!(bus.is_empty());
        assert!(bus.routes().is_empty());
    }

    #[test]
    fn test_million_sequential_publishes() {
        let bus = EventBus::new();
        let c = counter();
        bus.subscribe(Some(&c), &[Handler::new(Counter::on_unit)]).unwrap();

        for _ in 0..1_000_000 {
            bus.publish(None, None, &[]).unwrap();
        }
        assert_eq!(c.hits(), 1_000_000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_publish_async_reaches_all() {
        let bus = EventBus::new();
        let counters: Vec<_> = (0..16).map(|_| counter()).collect();
        for c in &counters {
            bus.subscribe(Some(c), &[Handler::new(Counter::on_hit)]).unwrap();
        }

        for _ in 0..1_000 {
            bus.publish_async(None, None, &[Payload::new(1usize)]).await.unwrap();
        }
        assert!(counters.iter().all(|c| c.hits() == 1_000));
    }

    #[tokio::test]
    async fn test_publish_async_aggregates_failures() {
        let bus = EventBus::new();
        let ok = counter();
        let bad = [counter(), counter(), counter()];
        bus.subscribe(Some(&ok), &[Handler::new(Counter::on_hit)]).unwrap();
        for c in &bad {
            bus.subscribe(Some(c), &[Handler::new(Counter::boom)]).unwrap();
        }

        let err = bus
            .publish_async(None, None, &[Payload::new(1usize)])
            .await
            .unwrap_err();
        assert_eq!(err.failures.len(), 3);
        assert!(err.failures.iter().all(|f| f.method.contains("boom")));
        assert_eq!(ok.hits(), 1);
    }

    #[tokio::test]
    async fn test_publish_async_scoped() {
        let bus = EventBus::new();
        let a = counter();
        let b = counter();
        bus.subscribe(Some(&a), &[Handler::new(Counter::on_own).scoped()]).unwrap();
        bus.subscribe(Some(&b), &[Handler::new(Counter::on_own).scoped()]).unwrap();

        bus.publish_async_scoped(&b, &[Payload::new(2usize)]).await.unwrap();
        assert_eq!((a.own(), b.own()), (0, 2));
    }

    #[test]
    fn test_concurrent_subscribe_and_publish() {
        let bus = EventBus::new();
        let owners: Vec<_> = (0..32).map(|_| counter()).collect();

        std::thread::scope(|scope| {
            for chunk in owners.chunks(4) {
                let bus = bus.clone();
                scope.spawn(move || {
                    for c in chunk {
                        bus.subscribe(Some(c), &[Handler::new(Counter::on_hit)]).unwrap();
                        bus.publish(Some("other"), None, &[Payload::new(1usize)]).unwrap();
                    }
                });
            }
        });

        assert_eq!(bus.subscription_count(), 32);
        bus.publish(None, None, &[Payload::new(1usize)]).unwrap();
        assert!(owners.iter().all(|c| c.hits() == 1));
    }

    #[test]
    fn test_capturing_free_closures_are_separate_handlers() {
        let bus = EventBus::new();
        let hits: Vec<Arc<AtomicUsize>> = (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();
        let handlers: Vec<Handler<()>> = hits
            .iter()
            .map(|c| {
                let c = Arc::clone(c);
                Handler::free(move |n: &usize| {
                    c.fetch_add(*n, Ordering::Relaxed);
                })
            })
            .collect();

        for h in &handlers {
            assert_eq!(bus.subscribe_free(std::slice::from_ref(h)), Ok(1));
        }
        assert_eq!(bus.subscribe_free(&handlers[..1]), Ok(0));
        assert_eq!(bus.subscription_count(), 3);

        bus.publish(None, None, &[Payload::new(1usize)]).unwrap();
        let seen: Vec<usize> = hits.iter().map(|c| c.load(Ordering::Relaxed)).collect();
        assert_eq!(seen, vec![1, 1, 1]);

        assert_eq!(bus.unsubscribe_free(&handlers[1..2]), Ok(1));
        assert_eq!(bus.subscription_count(), 2);
    }

    #[test]
    fn test_fn_pointers_with_same_signature_are_separate_handlers() {
        let bus = EventBus::new();
        let c = counter();
        let hit: fn(&Counter, &usize) = Counter::on_hit;
        let own: fn(&Counter, &usize) = Counter::on_own;

        assert_eq!(bus.subscribe(Some(&c), &[Handler::new(hit), Handler::new(own)]), Ok(2));
        bus.publish(None, None, &[Payload::new(1usize)]).unwrap();
        assert_eq!((c.hits(), c.own()), (1, 1));
    }

    #[test]
    fn test_explicit_handlers_need_no_registration_table() {
        struct Plain(AtomicUsize);

        impl Plain {
            fn on_tick(&self, n: &usize) {
                self.0.fetch_add(*n, Ordering::Relaxed);
            }
        }

        let bus = EventBus::new();
        let plain = Arc::new(Plain(AtomicUsize::new(0)));
        assert_eq!(bus.subscribe(Some(&plain), &[Handler::new(Plain::on_tick)]), Ok(1));
        assert_eq!(bus.subscribe(Some(&plain), &[]), Err(BusError::NoTarget));

        bus.publish(None, None, &[Payload::new(4usize)]).unwrap();
        assert_eq!(plain.0.load(Ordering::Relaxed), 4);

        assert_eq!(bus.unsubscribe(Some(&plain), &[]), Ok(1));
        assert!(bus.is_empty());
    }

    #[test]
    fn test_unsubscribe_count_excludes_pruned_dead() {
        let bus = EventBus::new();
        let alive = counter();
        let dead = counter();
        bus.subscribe(Some(&alive), &[Handler::new(Counter::on_hit)]).unwrap();
        bus.subscribe(Some(&dead), &[Handler::new(Counter::on_hit)]).unwrap();
        drop(dead);

        assert_eq!(bus.unsubscribe(Some(&alive), &[Handler::new(Counter::on_hit)]), Ok(1));
        assert!(bus.is_empty());

        let dead = counter();
        bus.subscribe_owner(&alive).unwrap();
        bus.subscribe_owner(&dead).unwrap();
        drop(dead);
        assert_eq!(bus.unsubscribe::<Counter>(Some(&alive), &[]), Ok(2));
        assert!(bus.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_publish_async_outside_runtime_panics() {
        let bus = EventBus::new();
        let c = counter();
        bus.subscribe(Some(&c), &[Handler::new(Counter::on_hit)]).unwrap();
        let _ = futures::executor::block_on(bus.publish_async(None, None, &[Payload::new(1usize)]));
    }

    #[test]
    fn test_publish_async_without_matches_needs_no_runtime() {
        let bus = EventBus::new();
        let result = futures::executor::block_on(bus.publish_async(Some("none"), None, &[]));
        assert!(result.is_ok());
    }
}
