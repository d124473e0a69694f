//! # Untyped event arguments.
//!
//! A [`Payload`] is one positional argument of a publish call: either a shared,
//! type-erased value or an untyped *null*. Payloads are cheap to clone (an
//! `Arc` bump) so the async publish path can hand them to spawned tasks.
//!
//! ## Example
//! ```rust
//! use switchboard::Payload;
//!
//! let p = Payload::new(7u32);
//! assert_eq!(p.downcast_ref::<u32>(), Some(&7));
//! assert!(Payload::null().is_null());
//! ```

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

/// A positional event argument (shared value or null).
#[derive(Clone, Default)]
pub struct Payload(Option<Value>);

impl Payload {
    /// Wraps an owned value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::shared(Arc::new(value))
    }

    /// Wraps an already shared value without copying it.
    pub fn shared<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self(Some(Value {
            inner: value,
            type_name: type_name::<T>(),
        }))
    }

    /// The untyped null argument.
    pub fn null() -> Self {
        Self(None)
    }

    /// Returns `true` for the null argument.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// Concrete type of the wrapped value, `None` for null.
    pub fn type_id(&self) -> Option<TypeId> {
        self.0.as_ref().map(|v| (*v.inner).type_id())
    }

    /// Type name of the wrapped value, `"null"` for null.
    pub fn type_name(&self) -> &'static str {
        self.0.as_ref().map_or("null", |v| v.type_name)
    }

    /// Borrows the value as `T` if it is one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref()?.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Payload").field(&self.type_name()).finish()
    }
}
