//! Owners with named, reassignable member slots.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::RwLock;

use crate::coroutine::{Coroutine, This};
use crate::error::{Error, Result};

/// An object whose named members can be read and overwritten.
///
/// Spies and stubs built with an owner resolve their target through
/// [`member`](SlotOwner::member) and patch the slot through
/// [`assign`](SlotOwner::assign). Writes are not coordinated between
/// wrappers: installing two wrappers on the same slot keeps the last one.
pub trait SlotOwner<A, R, E>: Send + Sync {
    /// Read the member stored under `name`.
    fn member(&self, name: &str) -> Option<Member<A, R, E>>;

    /// Overwrite the member stored under `name` with a coroutine.
    fn assign(&self, name: &str, coroutine: Coroutine<A, R, E>);
}

/// A member stored on an owner.
pub enum Member<A, R, E> {
    /// A callable member.
    Coroutine(Coroutine<A, R, E>),
    /// Any other value.
    Value(Arc<dyn Any + Send + Sync>),
}

impl<A, R, E> Member<A, R, E> {
    /// Returns the coroutine if this member is callable.
    #[must_use]
    pub fn as_coroutine(&self) -> Option<&Coroutine<A, R, E>> {
        match self {
            Self::Coroutine(coroutine) => Some(coroutine),
            Self::Value(_) => None,
        }
    }
}

impl<A, R, E> Clone for Member<A, R, E> {
    fn clone(&self) -> Self {
        match self {
            Self::Coroutine(coroutine) => Self::Coroutine(coroutine.clone()),
            Self::Value(value) => Self::Value(Arc::clone(value)),
        }
    }
}

impl<A, R, E> fmt::Debug for Member<A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coroutine(coroutine) => f.debug_tuple("Coroutine").field(coroutine).finish(),
            Self::Value(_) => f.write_str("Value(..)"),
        }
    }
}

/// A plain member table implementing [`SlotOwner`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use testkit_doubles::{Coroutine, Object};
///
/// let owner: Arc<Object<(i32,), i32, String>> = Arc::new(
///     Object::new().with_method("double", Coroutine::new(|(x,): (i32,), _| async move { Ok(x * 2) })),
/// );
///
/// let result = futures::executor::block_on(owner.invoke("double", (4,)).unwrap());
/// assert_eq!(result, Ok(8));
/// ```
pub struct Object<A, R, E> {
    members: RwLock<HashMap<String, Member<A, R, E>>>,
}

impl<A, R, E> Object<A, R, E> {
    /// Create an object with no members.
    #[must_use]
    pub fn new() -> Self {
        Self {
            members: RwLock::new(HashMap::new()),
        }
    }

    /// Add a callable member.
    #[must_use]
    pub fn with_method(self, name: impl Into<String>, coroutine: Coroutine<A, R, E>) -> Self {
        self.define(name, coroutine);
        self
    }

    /// Add a non-callable member.
    #[must_use]
    pub fn with_value<T: Any + Send + Sync>(self, name: impl Into<String>, value: T) -> Self {
        self.define_value(name, value);
        self
    }

    /// Set a callable member.
    pub fn define(&self, name: impl Into<String>, coroutine: Coroutine<A, R, E>) {
        self.members
            .write()
            .insert(name.into(), Member::Coroutine(coroutine));
    }

    /// Set a non-callable member.
    pub fn define_value<T: Any + Send + Sync>(&self, name: impl Into<String>, value: T) {
        self.members
            .write()
            .insert(name.into(), Member::Value(Arc::new(value)));
    }

    /// The coroutine currently stored under `name`.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<Coroutine<A, R, E>> {
        self.members
            .read()
            .get(name)
            .and_then(Member::as_coroutine)
            .cloned()
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    /// Returns true if the object has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }
}

impl<A, R, E> Object<A, R, E>
where
    A: 'static,
    R: 'static,
    E: 'static,
{
    /// Call the member `name` with this object as its context.
    ///
    /// Reads the slot at call time, so an installed spy or stub is what runs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingMember`] if there is no callable member named `name`.
    pub fn invoke(
        self: &Arc<Self>,
        name: &str,
        args: A,
    ) -> Result<BoxFuture<'static, std::result::Result<R, E>>> {
        let method = self.method(name).ok_or_else(|| Error::missing_member(name))?;
        Ok(method.call(args, This::of(self)))
    }
}

impl<A, R, E> SlotOwner<A, R, E> for Object<A, R, E> {
    fn member(&self, name: &str) -> Option<Member<A, R, E>> {
        self.members.read().get(name).cloned()
    }

    fn assign(&self, name: &str, coroutine: Coroutine<A, R, E>) {
        self.define(name, coroutine);
    }
}

impl<A, R, E> Default for Object<A, R, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R, E> fmt::Debug for Object<A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("members", &*self.members.read())
            .finish()
    }
}
