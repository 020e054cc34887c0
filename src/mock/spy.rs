// Allow must_use_candidate since spy methods often have useful side effects
#![allow(clippy::must_use_candidate)]

//! Test spies for observing coroutine calls.
//!
//! A [`Spy`] wraps a coroutine, runs it unchanged, and records every call
//! that completes successfully.
//!
//! # Example
//!
//! ```rust
//! use testkit_doubles::{Coroutine, Spy};
//!
//! let double: Coroutine<(i32,), i32, String> = Coroutine::new(|(x,), _| async move { Ok(x * 2) });
//! let spy = Spy::new(double);
//!
//! let result = futures::executor::block_on(spy.invoke((5,)));
//! assert_eq!(result, Ok(10));
//!
//! assert!(spy.called_once());
//! assert!(spy.first_call().unwrap().called_with(&(5,)));
//! ```

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::coroutine::{Coroutine, This};
use crate::error::Result;
use crate::mock::call::CallRecord;
use crate::mock::matcher::Matcher;
use crate::target::{Installer, Resolved, SlotOwner, Target};

/// A spy that wraps a coroutine and records its completed calls.
///
/// Records are kept in completion order: when two calls are in flight, the
/// one whose coroutine finishes first is recorded first. Failed calls are
/// not recorded; their error is passed to the caller unchanged.
///
/// Spies built with an owner install themselves into the owner's slot and
/// put the original back on [`reset`](Spy::reset).
pub struct Spy<A, R, E> {
    installer: Installer<A, R, E>,
    calls: Arc<Mutex<Vec<CallRecord<A, R>>>>,
}

impl<A, R, E> Spy<A, R, E>
where
    A: Clone + Send + 'static,
    R: Clone + Send + 'static,
    E: Send + 'static,
{
    /// Create a spy around a free-standing coroutine.
    pub fn new(coroutine: Coroutine<A, R, E>) -> Self {
        Self::build(Resolved::free(coroutine))
    }

    /// Spy on the member `name` of `owner`, installing the spy in its place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTarget`](crate::Error::InvalidTarget) if the
    /// member is missing or is not a coroutine.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use testkit_doubles::{Coroutine, Object, Spy};
    ///
    /// let owner: Arc<Object<(i32,), i32, String>> = Arc::new(
    ///     Object::new().with_method("gen", Coroutine::new(|(x,): (i32,), _| async move { Ok(x) })),
    /// );
    /// let spy = Spy::on(&owner, "gen").unwrap();
    ///
    /// futures::executor::block_on(owner.invoke("gen", (3,)).unwrap()).unwrap();
    /// assert!(spy.first_call().unwrap().called_on(&owner));
    /// ```
    pub fn on<O>(owner: &Arc<O>, name: &str) -> Result<Self>
    where
        O: SlotOwner<A, R, E> + Any,
    {
        Self::from_target(Target::member(owner, name))
    }

    /// Create a spy from any target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTarget`](crate::Error::InvalidTarget) for
    /// [`Target::Anonymous`] and for members that are missing or not coroutines.
    pub fn from_target(target: Target<A, R, E>) -> Result<Self> {
        let resolved = target.resolve(None)?;
        Ok(Self::build(resolved))
    }

    fn build(resolved: Resolved<A, R, E>) -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let proxy = Self::proxy_for(&resolved, Arc::clone(&calls));
        let installer = Installer::new(resolved, proxy);
        installer.install();
        Self { installer, calls }
    }

    fn proxy_for(
        resolved: &Resolved<A, R, E>,
        calls: Arc<Mutex<Vec<CallRecord<A, R>>>>,
    ) -> Coroutine<A, R, E> {
        let original = resolved.original.clone();
        let bound = resolved.this.downgrade();
        let created_at = Instant::now();
        let label = resolved.label();

        Coroutine::named(format!("spy({label})"), move |args: A, caller: This| {
            let original = original.clone();
            let calls = Arc::clone(&calls);
            let this = bound.bind_or(caller);

            async move {
                let start = Instant::now();
                let return_value = original.call(args.clone(), this.clone()).await?;

                let mut calls = calls.lock();
                calls.push(CallRecord {
                    args,
                    return_value: return_value.clone(),
                    this_value: this,
                    duration: start.elapsed(),
                    timestamp: created_at.elapsed(),
                });
                tracing::trace!(calls = calls.len(), "spy recorded call");

                Ok(return_value)
            }
        })
    }
}

impl<A, R, E> Spy<A, R, E> {
    /// The wrapper coroutine. Calling it is the same as calling the spy.
    pub fn proxy(&self) -> Coroutine<A, R, E> {
        self.installer.proxy().clone()
    }

    /// The coroutine being spied on.
    pub fn original(&self) -> Coroutine<A, R, E> {
        self.installer.resolved().original.clone()
    }

    /// Call through the spy with the unbound context.
    ///
    /// Owner-bound spies always run under their owner.
    pub fn invoke(&self, args: A) -> BoxFuture<'static, std::result::Result<R, E>> {
        self.installer.proxy().call(args, This::unbound())
    }

    /// Get the number of completed calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Check if the spy completed at least one call.
    #[must_use]
    pub fn was_called(&self) -> bool {
        self.call_count() > 0
    }

    /// Check if the spy completed exactly N calls.
    #[must_use]
    pub fn was_called_times(&self, n: usize) -> bool {
        self.call_count() == n
    }

    /// Check if exactly one call completed.
    #[must_use]
    pub fn called_once(&self) -> bool {
        self.was_called_times(1)
    }

    /// Check if exactly two calls completed.
    #[must_use]
    pub fn called_twice(&self) -> bool {
        self.was_called_times(2)
    }

    /// Check if exactly three calls completed.
    #[must_use]
    pub fn called_thrice(&self) -> bool {
        self.was_called_times(3)
    }

    /// Put the spy back into the owner's slot.
    ///
    /// Returns `false` for spies without an owner.
    pub fn install(&self) -> bool {
        self.installer.install()
    }

    /// Returns true if the owner's slot currently holds this spy.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installer.is_installed()
    }

    /// Clear the call history and restore the original into the owner's slot.
    ///
    /// Returns `true` if a slot was restored.
    pub fn reset(&self) -> bool {
        self.calls.lock().clear();
        self.installer.restore()
    }
}

impl<A: Clone, R: Clone, E> Spy<A, R, E> {
    /// Get all recorded calls, in completion order.
    pub fn calls(&self) -> Vec<CallRecord<A, R>> {
        self.calls.lock().clone()
    }

    /// Get the Nth completed call (0-indexed).
    pub fn nth_call(&self, n: usize) -> Option<CallRecord<A, R>> {
        self.calls.lock().get(n).cloned()
    }

    /// Get the first completed call.
    pub fn first_call(&self) -> Option<CallRecord<A, R>> {
        self.nth_call(0)
    }

    /// Get the second completed call.
    pub fn second_call(&self) -> Option<CallRecord<A, R>> {
        self.nth_call(1)
    }

    /// Get the third completed call.
    pub fn third_call(&self) -> Option<CallRecord<A, R>> {
        self.nth_call(2)
    }

    /// Get the most recent completed call.
    pub fn last_call(&self) -> Option<CallRecord<A, R>> {
        self.calls.lock().last().cloned()
    }

    /// Check if any completed call received exactly `expected`.
    pub fn was_called_with(&self, expected: &A) -> bool
    where
        A: PartialEq,
    {
        self.calls.lock().iter().any(|c| c.called_with(expected))
    }

    /// Check if any completed call's arguments satisfy `matcher`.
    pub fn was_called_matching<M>(&self, matcher: &M) -> bool
    where
        M: Matcher<A> + ?Sized,
    {
        self.calls
            .lock()
            .iter()
            .any(|c| c.called_with_matching(matcher))
    }
}

impl<A: Debug, R: Debug, E> Debug for Spy<A, R, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let calls = self.calls.lock();
        f.debug_struct("Spy")
            .field("target", &self.installer.resolved().label())
            .field("call_count", &calls.len())
            .field("calls", &*calls)
            .finish()
    }
}
