//! # Route keys and owner identities.
//!
//! A [`RouteKey`] is the composite `(route, scope)` key of the handler registry.
//! The scope part is an [`OwnerId`], the address of the owner's `Arc` allocation.
//!
//! ## Rules
//! - Every subscription bound to an owner holds a `Weak` to the owner's allocation,
//!   so the address stays reserved while any subscription refers to it.
//! - Two keys are equal only if both the route string and the scope are equal.

use std::fmt;
use std::sync::{Arc, Weak};

/// Identity of a subscriber owner or a publish scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(usize);

impl OwnerId {
    /// Identity of the object behind `owner`.
    pub fn of<T: ?Sized>(owner: &Arc<T>) -> Self {
        Self(Arc::as_ptr(owner) as *const () as usize)
    }

    pub(crate) fn of_weak<T>(owner: &Weak<T>) -> Self {
        Self(owner.as_ptr() as *const () as usize)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Registry key: route name plus optional scope identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RouteKey {
    route: Arc<str>,
    scope: Option<OwnerId>,
}

impl RouteKey {
    /// Builds a key from a route name and an optional scope.
    pub fn new(route: impl Into<Arc<str>>, scope: Option<OwnerId>) -> Self {
        Self {
            route: route.into(),
            scope,
        }
    }

    /// Route name (`""` is the default route).
    #[inline]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Scope identity, if the key is scoped.
    #[inline]
    pub fn scope(&self) -> Option<OwnerId> {
        self.scope
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Some(scope) => write!(f, "{:?}@{scope}", self.route),
            None => write!(f, "{:?}", self.route),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_id_matches_weak_id() {
        let owner = Arc::new(5u64);
        let weak = Arc::downgrade(&owner);
        assert_eq!(OwnerId::of(&owner), OwnerId::of_weak(&weak));
        assert_ne!(OwnerId::of(&owner), OwnerId::of(&Arc::new(5u64)));
    }

    #[test]
    fn test_scope_is_part_of_the_key() {
        let owner = Arc::new(());
        let plain = RouteKey::new("life", None);
        let scoped = RouteKey::new("life", Some(OwnerId::of(&owner)));
        assert_ne!(plain, scoped);
        assert_eq!(plain, RouteKey::new(String::from("life"), None));
        assert_eq!(scoped.route(), "life");
    }
}
