//! # Lock-free handler registry.
//!
//! Maps each [`RouteKey`] to an immutable, ordered sequence of subscriptions.
//! The whole map sits behind one [`ArcSwap`]; sequences and maps are replaced,
//! never mutated in place.
//!
//! ## Update protocol
//! ```text
//! loop {
//!   current = root.load()
//!   next    = f(current[key])          ── None: nothing changed, stop (no write)
//!   root.compare_and_swap(current, current with key → next)
//!   ├─ swapped        ─► done
//!   └─ lost the race  ─► retry with a fresh read
//! }
//! ```
//!
//! ## Rules
//! - Insertion order is delivery order within a route.
//! - Empty sequences are removed from the map.
//! - Readers ([`Registry::snapshot`]) never block and never observe a partial update;
//!   a publish delivers to the subscribers present at the moment of its snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::route::RouteKey;
use super::subscription::Subscription;

pub(crate) type Sequence = Arc<[Arc<Subscription>]>;
type Routes = HashMap<RouteKey, Sequence>;

pub(crate) struct Registry {
    root: ArcSwap<Routes>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            root: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Sequence registered under `key` at this instant.
    pub(crate) fn snapshot(&self, key: &RouteKey) -> Option<Sequence> {
        self.root.load().get(key).cloned()
    }

    /// Appends `sub` unless it is dead or an equivalent live handler exists.
    ///
    /// Returns `true` if the registry changed.
    pub(crate) fn upsert(&self, sub: Arc<Subscription>) -> bool {
        if !sub.is_alive() {
            return false;
        }
        let key = sub.key().clone();
        self.update(&key, |seq| {
            if seq.iter().any(|old| old.is_alive() && old.same_handler(&sub)) {
                return None;
            }
            let mut next = seq.to_vec();
            next.push(Arc::clone(&sub));
            Some(next)
        })
        .is_some()
    }

    /// Removes the given subscriptions (by identity) from `key`.
    pub(crate) fn remove_dead(&self, key: &RouteKey, dead: &[Arc<Subscription>]) -> usize {
        if dead.is_empty() {
            return 0;
        }
        self.remove_where(key, |s| dead.iter().any(|d| Arc::ptr_eq(d, s)))
    }

    /// Removes every subscription under `key` matching `pred`.
    pub(crate) fn remove_where<P>(&self, key: &RouteKey, pred: P) -> usize
    where
        P: Fn(&Arc<Subscription>) -> bool,
    {
        self.update(key, |seq| {
            let next: Vec<_> = seq.iter().filter(|s| !pred(s)).cloned().collect();
            (next.len() != seq.len()).then_some(next)
        })
        .map_or(0, |(before, after)| before - after)
    }

    /// Removes every subscription on every route matching `pred`.
    pub(crate) fn remove_everywhere<P>(&self, pred: P) -> usize
    where
        P: Fn(&Arc<Subscription>) -> bool,
    {
        loop {
            let current = self.root.load_full();
            let mut removed = 0;
            let mut next = Routes::with_capacity(current.len());
            for (key, seq) in current.iter() {
                let kept: Vec<_> = seq.iter().filter(|s| !pred(s)).cloned().collect();
                removed += seq.len() - kept.len();
                if kept.len() == seq.len() {
                    next.insert(key.clone(), Arc::clone(seq));
                } else if !kept.is_empty() {
                    next.insert(key.clone(), kept.into());
                }
            }
            if removed == 0 {
                return 0;
            }
            let prev = self.root.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&*prev, &current) {
                return removed;
            }
        }
    }

    /// Total number of registered subscriptions (dead ones included until pruned).
    pub(crate) fn len(&self) -> usize {
        self.root.load().values().map(|seq| seq.len()).sum()
    }

    pub(crate) fn keys(&self) -> Vec<RouteKey> {
        self.root.load().keys().cloned().collect()
    }

    pub(crate) fn clear(&self) {
        self.root.store(Arc::new(HashMap::new()));
    }

    /// Compare-and-swap loop over one route. `f` returns `None` when the sequence
    /// would not change; the loop then stops without writing.
    ///
    /// Returns `(len_before, len_after)` of the sequence that was written.
    fn update<F>(&self, key: &RouteKey, f: F) -> Option<(usize, usize)>
    where
        F: Fn(&[Arc<Subscription>]) -> Option<Vec<Arc<Subscription>>>,
    {
        loop {
            let current = self.root.load_full();
            let seq: &[Arc<Subscription>] = current.get(key).map(|s| &s[..]).unwrap_or(&[]);
            let next = f(seq)?;
            let lens = (seq.len(), next.len());

            let mut routes = Routes::clone(&current);
            if next.is_empty() {
                routes.remove(key);
            } else {
                routes.insert(key.clone(), next.into());
            }

            let prev = self.root.compare_and_swap(&current, Arc::new(routes));
            if Arc::ptr_eq(&*prev, &current) {
                return Some(lens);
            }
        }
    }
}
