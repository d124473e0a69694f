//! # Registered handlers with their matching metadata.
//!
//! A [`Subscription`] never keeps its owner alive: bound handlers hold a `Weak`
//! and become *dead* once the owner is dropped. Dead subscriptions are skipped
//! and pruned lazily by the next publish or unsubscribe touching their route.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::InvokeError;
use crate::events::route::{OwnerId, RouteKey};
use crate::events::thunk::{Compiled, MethodId, ParamShape, Thunk};
use crate::events::Payload;

pub(crate) struct Subscription {
    owner: Option<Weak<dyn Any + Send + Sync>>,
    owner_id: Option<OwnerId>,
    method: MethodId,
    thunk: Thunk,
    params: Arc<[ParamShape]>,
    key: RouteKey,
    scoped: bool,
}

impl Subscription {
    /// Builds a subscription on `route`. Scoped handlers with an owner are keyed
    /// under the owner's identity.
    pub(crate) fn new<T>(owner: Option<&Arc<T>>, compiled: &Compiled, route: Arc<str>, scoped: bool) -> Self
    where
        T: Any + Send + Sync,
    {
        let weak: Option<Weak<T>> = owner.map(Arc::downgrade);
        let owner_id = weak.as_ref().map(OwnerId::of_weak);
        let scope = if scoped { owner_id } else { None };
        Self {
            owner: weak.map(|w| w as Weak<dyn Any + Send + Sync>),
            owner_id,
            method: compiled.method,
            thunk: Arc::clone(&compiled.thunk),
            params: Arc::clone(&compiled.params),
            key: RouteKey::new(route, scope),
            scoped,
        }
    }

    #[inline]
    pub(crate) fn key(&self) -> &RouteKey {
        &self.key
    }

    #[inline]
    pub(crate) fn method(&self) -> MethodId {
        self.method
    }

    #[inline]
    pub(crate) fn owner_id(&self) -> Option<OwnerId> {
        self.owner_id
    }

    /// Free handlers are always alive.
    pub(crate) fn is_alive(&self) -> bool {
        self.owner.as_ref().map_or(true, |w| w.strong_count() > 0)
    }

    /// Same owner identity and same method.
    pub(crate) fn same_handler(&self, other: &Subscription) -> bool {
        self.owner_id == other.owner_id && self.method == other.method
    }

    /// Decides whether a publish on `key` with `scope` and `args` reaches this handler.
    pub(crate) fn matches(&self, key: &RouteKey, scope: Option<OwnerId>, args: &[Payload]) -> bool {
        if *key != self.key {
            return false;
        }
        if (self.scoped || scope.is_some()) && (!self.is_alive() || self.owner_id != scope) {
            return false;
        }
        if args.len() != self.params.len() {
            return false;
        }
        self.params.iter().zip(args).all(|(param, arg)| param.accepts(arg))
    }

    /// Calls the handler. An owner that died since matching yields `TargetGone`.
    pub(crate) fn invoke(&self, args: &[Payload]) -> Result<(), InvokeError> {
        match &self.owner {
            None => (self.thunk)(None, args),
            Some(weak) => {
                let target = weak.upgrade().ok_or(InvokeError::TargetGone)?;
                (self.thunk)(Some(&*target), args)
            }
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("method", &self.method.name())
            .field("owner", &self.owner_id)
            .field("scoped", &self.scoped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::thunk::Method;

    struct Owner;

    impl Owner {
        fn on_u8(&self, _: &u8) {}
        fn on_maybe(&self, _: Option<&u8>) {}
    }

    fn sub<M: Method<Owner, Mk>, Mk>(owner: &Arc<Owner>, m: M, scoped: bool) -> Subscription {
        Subscription::new(Some(owner), &m.compile(), Arc::from(""), scoped)
    }

    #[test]
    fn test_unscoped_match_rules() {
        let owner = Arc::new(Owner);
        let s = sub(&owner, Owner::on_u8, false);
        let key = RouteKey::new("", None);
        assert!(s.matches(&key, None, &[Payload::new(1u8)]));
        assert!(!s.matches(&key, None, &[Payload::new(1u16)]));
        assert!(!s.matches(&key, None, &[]));
        assert!(!s.matches(&key, None, &[Payload::null()]));
        assert!(!s.matches(&RouteKey::new("other", None), None, &[Payload::new(1u8)]));
    }

    #[test]
    fn test_null_matches_nullable_param() {
        let owner = Arc::new(Owner);
        let s = sub(&owner, Owner::on_maybe, false);
        assert!(s.matches(&RouteKey::new("", None), None, &[Payload::null()]));
    }

    #[test]
    fn test_scoped_requires_owner_identity() {
        let owner = Arc::new(Owner);
        let other = Arc::new(Owner);
        let s = sub(&owner, Owner::on_u8, true);
        let id = OwnerId::of(&owner);
        let key = RouteKey::new("", Some(id));
        assert_eq!(s.key(), &key);
        assert!(s.matches(&key, Some(id), &[Payload::new(1u8)]));
        assert!(!s.matches(&key, Some(OwnerId::of(&other)), &[Payload::new(1u8)]));
        assert!(!s.matches(&key, None, &[Payload::new(1u8)]));
    }

    #[test]
    fn test_dead_owner() {
        let owner = Arc::new(Owner);
        let s = sub(&owner, Owner::on_u8, false);
        assert!(s.is_alive());
        drop(owner);
        assert!(!s.is_alive());
        assert_eq!(s.invoke(&[Payload::new(1u8)]), Err(InvokeError::TargetGone));
    }
}
