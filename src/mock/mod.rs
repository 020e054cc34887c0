//! Spies and stubs for coroutines.
//!
//! This module provides the two test doubles:
//!
//! - [`Spy`] - Runs the original coroutine and records completed calls
//! - [`Stub`] - Replaces the original with configured responses
//! - [`Condition`] - Per-call or per-argument stub overrides
//! - [`matcher`] - Argument matchers for verification and conditions
//!
//! # Spies
//!
//! ```rust
//! use std::sync::Arc;
//! use futures::executor::block_on;
//! use testkit_doubles::{mock, Coroutine, Object};
//!
//! let owner: Arc<Object<(i32, i32), i32, String>> = Arc::new(Object::new().with_method(
//!     "add",
//!     Coroutine::new(|(a, b): (i32, i32), _| async move { Ok(a + b) }),
//! ));
//!
//! let spy = mock::spy::<(i32, i32), i32, String>((&owner, "add")).unwrap();
//! assert_eq!(block_on(owner.invoke("add", (1, 2)).unwrap()), Ok(3));
//!
//! assert!(spy.called_once());
//! assert!(spy.was_called_with(&(1, 2)));
//! ```
//!
//! # Stubs
//!
//! ```rust
//! use futures::executor::block_on;
//! use testkit_doubles::{mock, Target};
//!
//! let stub = mock::stub::<(), i32, String>(Target::Anonymous).unwrap().returns(1);
//! stub.on_first_call().returns(42);
//!
//! assert_eq!(block_on(stub.invoke(())), Ok(42));
//! assert_eq!(block_on(stub.invoke(())), Ok(1));
//! ```

mod call;
mod condition;
pub mod matcher;
mod spy;
mod stub;

pub use call::CallRecord;
pub use condition::{Condition, ConditionKind};
pub use spy::Spy;
pub use stub::Stub;

use crate::error::Result;
use crate::target::Target;

/// Create a spy for `target`.
///
/// Accepts a [`Coroutine`](crate::Coroutine), an `(&owner, name)` pair, or a
/// [`Target`].
///
/// # Errors
///
/// Returns [`Error::InvalidTarget`](crate::Error::InvalidTarget) for anonymous
/// targets and for members that are missing or not coroutines.
pub fn spy<A, R, E>(target: impl Into<Target<A, R, E>>) -> Result<Spy<A, R, E>>
where
    A: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: Send + 'static,
{
    Spy::from_target(target.into())
}

/// Create a stub for `target`.
///
/// [`Target::Anonymous`] stubs a no-op coroutine. Until configured, calls
/// complete with `R::default()`.
///
/// # Errors
///
/// Returns [`Error::InvalidTarget`](crate::Error::InvalidTarget) for members
/// that are missing or not coroutines.
pub fn stub<A, R, E>(target: impl Into<Target<A, R, E>>) -> Result<Stub<A, R, E>>
where
    A: Send + 'static,
    R: Clone + Default + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    Stub::from_target(target.into())
}
