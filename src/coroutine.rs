//! Coroutine handles and bound contexts.
//!
//! A [`Coroutine`] is the unit every spy and stub wraps: a cloneable,
//! type-erased async function taking an argument list `A` and a bound
//! context [`This`], and producing `Result<R, E>`.
//!
//! # Example
//!
//! ```rust
//! use testkit_doubles::{Coroutine, This};
//!
//! let double: Coroutine<(i32,), i32, String> = Coroutine::new(|(x,), _this| async move { Ok(x * 2) });
//!
//! let result = futures::executor::block_on(double.call((21,), This::unbound()));
//! assert_eq!(result, Ok(42));
//! ```

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, FutureExt};

type Body<A, R, E> = dyn Fn(A, This) -> BoxFuture<'static, Result<R, E>> + Send + Sync;

/// A cloneable handle to an async function.
///
/// Clones share the same body, so [`Coroutine::ptr_eq`] can be used to check
/// that a slot holds exactly the function that was put there.
pub struct Coroutine<A, R, E> {
    name: Option<Arc<str>>,
    body: Arc<Body<A, R, E>>,
}

impl<A, R, E> Coroutine<A, R, E>
where
    A: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    /// Create an anonymous coroutine from an async closure.
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: Fn(A, This) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        Self {
            name: None,
            body: Arc::new(move |args, this| body(args, this).boxed()),
        }
    }

    /// Create a named coroutine from an async closure.
    pub fn named<F, Fut>(name: impl Into<Arc<str>>, body: F) -> Self
    where
        F: Fn(A, This) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        Self::new(body).with_name(name)
    }

    /// A coroutine that ignores its arguments and completes with `R::default()`.
    pub fn noop() -> Self
    where
        R: Default,
    {
        Self::named("noop", |_args: A, _this: This| async { Ok(R::default()) })
    }
}

impl<A, R, E> Coroutine<A, R, E> {
    /// Attach a name, used in logs and debug output.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The coroutine's name, if it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Start the coroutine with the given arguments under `this`.
    ///
    /// Nothing runs until the returned future is polled.
    pub fn call(&self, args: A, this: This) -> BoxFuture<'static, Result<R, E>> {
        (self.body)(args, this)
    }

    /// Returns true if both handles share the same body.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.body).cast::<()>() == Arc::as_ptr(&other.body).cast::<()>()
    }
}

impl<A, R, E> Clone for Coroutine<A, R, E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            body: Arc::clone(&self.body),
        }
    }
}

impl<A, R, E> fmt::Debug for Coroutine<A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coroutine")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

/// The context a coroutine runs under.
///
/// For members of an owner this is the owner itself; free-standing calls run
/// unbound. Equality is identity: two contexts are equal when both are
/// unbound or both point at the same owner.
#[derive(Clone, Default)]
pub struct This(Option<Arc<dyn Any + Send + Sync>>);

impl This {
    /// The empty context.
    #[must_use]
    pub fn unbound() -> Self {
        Self(None)
    }

    /// A context bound to `owner`.
    pub fn of<T: Any + Send + Sync>(owner: &Arc<T>) -> Self {
        let owner: Arc<T> = Arc::clone(owner);
        let owner: Arc<dyn Any + Send + Sync> = owner;
        Self(Some(owner))
    }

    /// Returns true if the context refers to an owner.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.0.is_some()
    }

    /// Recover the owner as a concrete type.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.0.clone()?.downcast::<T>().ok()
    }

    /// Returns true if this context is bound to exactly `owner`.
    pub fn is<T: Any + Send + Sync>(&self, owner: &Arc<T>) -> bool {
        self.0
            .as_ref()
            .is_some_and(|this| Arc::as_ptr(this).cast::<()>() == Arc::as_ptr(owner).cast::<()>())
    }

    pub(crate) fn downgrade(&self) -> WeakThis {
        WeakThis(self.0.as_ref().map(Arc::downgrade))
    }
}

impl PartialEq for This {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>(),
            _ => false,
        }
    }
}

impl Eq for This {}

impl fmt::Debug for This {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(owner) => write!(f, "This({:p})", Arc::as_ptr(owner).cast::<()>()),
            None => write!(f, "This(unbound)"),
        }
    }
}

/// Non-owning form of [`This`], held by installed proxies.
#[derive(Clone, Default)]
pub(crate) struct WeakThis(Option<Weak<dyn Any + Send + Sync>>);

impl WeakThis {
    /// Returns true if the original context referred to an owner.
    pub(crate) fn is_bound(&self) -> bool {
        self.0.is_some()
    }

    /// Upgrade back to a strong context; unbound once the owner is gone.
    pub(crate) fn upgrade(&self) -> This {
        This(self.0.as_ref().and_then(Weak::upgrade))
    }

    /// The bound owner if there is one, otherwise the caller's context.
    pub(crate) fn bind_or(&self, caller: This) -> This {
        if self.is_bound() {
            self.upgrade()
        } else {
            caller
        }
    }
}
