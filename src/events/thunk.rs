//! # Invocation thunks.
//!
//! Compiles a typed handler method into an erased [`Thunk`] once, at subscribe
//! time. Publishing then only calls a closure: the thunk downcasts the target and
//! every [`Payload`] and calls the method directly.
//!
//! ## Handler shapes
//! ```text
//! bound:  fn(&Owner)                 free:  fn()
//!         fn(&Owner, &A)                    fn(&A)
//!         fn(&Owner, Option<&A>)            fn(Option<&A>)
//!         ... up to three parameters, each `&A` or `Option<&A>`
//! ```
//!
//! `&A` parameters require a value of exactly type `A`; `Option<&A>` parameters
//! also accept [`Payload::null`].
//!
//! ## Identity
//! The [`MethodId`] of a handler is the `TypeId` of the function item or closure
//! type, plus an instance part when that type carries state:
//! - zero-sized types (fn items, non-capturing closures): the type alone, so
//!   passing the same function item again yields the same id;
//! - capturing closures and fn pointers: the type and the compiled thunk, so every
//!   `Handler::new` call is a distinct handler and clones of one `Handler` share it.
//!
//! Duplicate detection and unsubscribe compare this id.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::sync::Arc;

use crate::error::InvokeError;
use crate::events::Payload;

/// Erased handler: `(target, args) -> result`. Free handlers ignore the target.
pub(crate) type Thunk = Arc<
    dyn Fn(Option<&(dyn Any + Send + Sync)>, &[Payload]) -> Result<(), InvokeError> + Send + Sync,
>;

/// Identity of a handler method.
#[derive(Clone, Copy, Debug)]
pub struct MethodId {
    type_id: TypeId,
    instance: Option<usize>,
    name: &'static str,
}

impl MethodId {
    /// `thunk` keeps the instance address reserved while any copy of it is alive.
    fn of<F: 'static>(thunk: &Thunk) -> Self {
        let instance = (mem::size_of::<F>() != 0).then(|| Arc::as_ptr(thunk) as *const () as usize);
        Self {
            type_id: TypeId::of::<F>(),
            instance,
            name: type_name::<F>(),
        }
    }

    /// Type name of the function item or closure.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for MethodId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.instance == other.instance
    }
}

impl Eq for MethodId {}

/// Declared type of one handler parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamShape {
    type_id: TypeId,
    type_name: &'static str,
    nullable: bool,
}

impl ParamShape {
    fn of<A: Any>(nullable: bool) -> Self {
        Self {
            type_id: TypeId::of::<A>(),
            type_name: type_name::<A>(),
            nullable,
        }
    }

    /// Returns `true` if `arg` can be bound to this parameter.
    pub fn accepts(&self, arg: &Payload) -> bool {
        match arg.type_id() {
            Some(id) => id == self.type_id,
            None => self.nullable,
        }
    }

    /// Whether the parameter was declared `Option<&A>`.
    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

impl fmt::Display for ParamShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "Option<&{}>", self.type_name)
        } else {
            write!(f, "&{}", self.type_name)
        }
    }
}

/// Output of compiling one handler.
#[doc(hidden)]
#[derive(Clone)]
pub struct Compiled {
    pub(crate) thunk: Thunk,
    pub(crate) params: Arc<[ParamShape]>,
    pub(crate) method: MethodId,
    pub(crate) bound: bool,
}

/// Marker for a required `&A` parameter.
pub struct Required<A>(PhantomData<fn() -> A>);

/// Marker for a nullable `Option<&A>` parameter.
pub struct Nullable<A>(PhantomData<fn() -> A>);

/// A method taking the owner `&T` first. Implemented for functions and closures
/// of the shapes listed in the module docs; `Marker` is inferred.
pub trait Method<T, Marker>: Send + Sync + 'static {
    #[doc(hidden)]
    fn compile(self) -> Compiled;
}

/// A free function handler without an owner. `Marker` is inferred.
pub trait FreeMethod<Marker>: Send + Sync + 'static {
    #[doc(hidden)]
    fn compile(self) -> Compiled;
}

fn check_arity(args: &[Payload], expected: usize) -> Result<(), InvokeError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(InvokeError::Arity {
            expected,
            actual: args.len(),
        })
    }
}

fn bind_required<'a, A: Any>(args: &'a [Payload], index: usize) -> Result<&'a A, InvokeError> {
    args[index]
        .downcast_ref::<A>()
        .ok_or_else(|| InvokeError::Argument {
            index,
            expected: type_name::<A>(),
            actual: args[index].type_name(),
        })
}

fn bind_nullable<'a, A: Any>(
    args: &'a [Payload],
    index: usize,
) -> Result<Option<&'a A>, InvokeError> {
    if args[index].is_null() {
        Ok(None)
    } else {
        bind_required::<A>(args, index).map(Some)
    }
}

macro_rules! bind {
    (Required, $A:ident, $args:ident, $i:expr) => {
        bind_required::<$A>($args, $i)?
    };
    (Nullable, $A:ident, $args:ident, $i:expr) => {
        bind_nullable::<$A>($args, $i)?
    };
}

macro_rules! nullable {
    (Required) => {
        false
    };
    (Nullable) => {
        true
    };
}

macro_rules! impl_method {
    ($n:expr; $($i:tt $arg:ident : $A:ident $kind:ident => $ty:ty),*) => {
        impl<T, F, $($A,)*> Method<T, ($($kind<$A>,)*)> for F
        where
            T: Any + Send + Sync,
            F: Fn(&T $(, $ty)*) + Send + Sync + 'static,
            $($A: Any + Send + Sync,)*
        {
            fn compile(self) -> Compiled {
                let params: Vec<ParamShape> = vec![$(ParamShape::of::<$A>(nullable!($kind))),*];
                let thunk: Thunk = Arc::new(
                    move |target: Option<&(dyn Any + Send + Sync)>,
                          args: &[Payload]|
                          -> Result<(), InvokeError> {
                        let target = target.ok_or(InvokeError::TargetGone)?;
                        let target = target
                            .downcast_ref::<T>()
                            .ok_or(InvokeError::Target { expected: type_name::<T>() })?;
                        check_arity(args, $n)?;
                        $(let $arg = bind!($kind, $A, args, $i);)*
                        (self)(target $(, $arg)*);
                        Ok(())
                    },
                );
                let method = MethodId::of::<F>(&thunk);
                Compiled {
                    thunk,
                    params: params.into(),
                    method,
                    bound: true,
                }
            }
        }

        impl<F, $($A,)*> FreeMethod<($($kind<$A>,)*)> for F
        where
            F: Fn($($ty),*) + Send + Sync + 'static,
            $($A: Any + Send + Sync,)*
        {
            fn compile(self) -> Compiled {
                let params: Vec<ParamShape> = vec![$(ParamShape::of::<$A>(nullable!($kind))),*];
                let thunk: Thunk = Arc::new(
                    move |_target: Option<&(dyn Any + Send + Sync)>,
                          args: &[Payload]|
                          -> Result<(), InvokeError> {
                        check_arity(args, $n)?;
                        $(let $arg = bind!($kind, $A, args, $i);)*
                        (self)($($arg),*);
                        Ok(())
                    },
                );
                let method = MethodId::of::<F>(&thunk);
                Compiled {
                    thunk,
                    params: params.into(),
                    method,
                    bound: false,
                }
            }
        }
    };
}

impl_method!(0;);
impl_method!(1; 0 a: A Required => &A);
impl_method!(1; 0 a: A Nullable => Option<&A>);
impl_method!(2; 0 a: A Required => &A, 1 b: B Required => &B);
impl_method!(2; 0 a: A Required => &A, 1 b: B Nullable => Option<&B>);
impl_method!(2; 0 a: A Nullable => Option<&A>, 1 b: B Required => &B);
impl_method!(2; 0 a: A Nullable => Option<&A>, 1 b: B Nullable => Option<&B>);
impl_method!(3; 0 a: A Required => &A, 1 b: B Required => &B, 2 c: C Required => &C);
impl_method!(3; 0 a: A Required => &A, 1 b: B Required => &B, 2 c: C Nullable => Option<&C>);
impl_method!(3; 0 a: A Required => &A, 1 b: B Nullable => Option<&B>, 2 c: C Required => &C);
impl_method!(3; 0 a: A Required => &A, 1 b: B Nullable => Option<&B>, 2 c: C Nullable => Option<&C>);
impl_method!(3; 0 a: A Nullable => Option<&A>, 1 b: B Required => &B, 2 c: C Required => &C);
impl_method!(3; 0 a: A Nullable => Option<&A>, 1 b: B Required => &B, 2 c: C Nullable => Option<&C>);
impl_method!(3; 0 a: A Nullable => Option<&A>, 1 b: B Nullable => Option<&B>, 2 c: C Required => &C);
impl_method!(3; 0 a: A Nullable => Option<&A>, 1 b: B Nullable => Option<&B>, 2 c: C Nullable => Option<&C>);
