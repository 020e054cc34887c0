// Allow must_use_candidate since stub methods often have useful side effects
#![allow(clippy::must_use_candidate)]

//! Test stubs that replace a coroutine's behavior.
//!
//! A [`Stub`] has a default behavior plus an ordered list of [`Condition`]s.
//! Each call bumps the stub's call counter, then the last registered
//! condition that selects the call decides what happens; without one, the
//! default applies.
//!
//! # Example
//!
//! ```rust
//! use futures::executor::block_on;
//! use testkit_doubles::Stub;
//!
//! let stub = Stub::<(i32, i32), i32, String>::new().returns(0);
//! stub.with_args((1, 2)).returns(2);
//!
//! assert_eq!(block_on(stub.invoke((5, 5))), Ok(0));
//! assert_eq!(block_on(stub.invoke((1, 2))), Ok(2));
//! assert_eq!(stub.call_count(), 2);
//! ```

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::coroutine::{Coroutine, This};
use crate::error::{Error, Result};
use crate::mock::condition::{Behavior, Condition, ConditionKind};
use crate::mock::matcher::Matcher;
use crate::target::{Installer, Resolved, SlotOwner, Target};

/// Per-stub call counter and condition registry.
struct StubState<A, R, E> {
    default: Behavior<A, R, E>,
    conditions: Mutex<Vec<Condition<A, R, E>>>,
    call_count: AtomicUsize,
}

impl<A, R, E> StubState<A, R, E>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn new(default: Behavior<A, R, E>) -> Self {
        Self {
            default,
            conditions: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    fn dispatch(&self, args: A, this: This) -> BoxFuture<'static, std::result::Result<R, E>> {
        // Counted before anything can fail, so forced failures still count.
        let index = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;

        match self.matching_behavior(index, &args) {
            Some(behavior) => behavior.execute(args, this),
            None => self.default.execute(args, this),
        }
    }

    /// The behavior of the last registered condition selecting this call.
    fn matching_behavior(&self, index: usize, args: &A) -> Option<Behavior<A, R, E>> {
        let conditions = self.conditions.lock();
        let condition = conditions.iter().rev().find(|c| c.matches(index, args))?;
        tracing::trace!(call = index, condition = %condition.kind(), "stub condition matched");
        condition.behavior()
    }
}

/// A stub replacing a coroutine with configured responses.
///
/// Top-level configuration ([`returns`](Stub::returns),
/// [`throws`](Stub::throws), [`calls`](Stub::calls), ...) consumes the stub
/// and returns a fresh one with a new counter and no conditions, installed
/// over the same slot. Conditions obtained from [`on_call`](Stub::on_call)
/// and [`with_args`](Stub::with_args) are configured in place.
///
/// The call index used by ordinal conditions is taken when the call is made,
/// so it follows invocation order even if calls complete out of order.
///
/// Only the last registered condition that selects a call is consulted. If
/// that condition was never configured, the call falls back to the default
/// behavior, even when an earlier matching condition was configured.
pub struct Stub<A, R, E> {
    installer: Installer<A, R, E>,
    state: Arc<StubState<A, R, E>>,
}

impl<A, R, E> Stub<A, R, E>
where
    A: Send + 'static,
    R: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create an anonymous stub completing with `R::default()`.
    pub fn new() -> Self
    where
        R: Default,
    {
        Self::build(Resolved::free(Coroutine::noop()), Behavior::Returns(R::default()))
    }

    /// Stub the member `name` of `owner`, installing the stub in its place.
    ///
    /// Until configured, calls complete with `R::default()`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTarget`] if the member is missing or is not a
    /// coroutine.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use futures::executor::block_on;
    /// use testkit_doubles::{Coroutine, Object, Stub};
    ///
    /// let owner: Arc<Object<(), i32, String>> = Arc::new(
    ///     Object::new().with_method("gen", Coroutine::new(|(), _| async { Ok(1) })),
    /// );
    ///
    /// let stub = Stub::on(&owner, "gen").unwrap().throws("boom".to_string());
    /// assert_eq!(block_on(owner.invoke("gen", ()).unwrap()), Err("boom".to_string()));
    ///
    /// stub.reset();
    /// assert_eq!(block_on(owner.invoke("gen", ()).unwrap()), Ok(1));
    /// ```
    pub fn on<O>(owner: &Arc<O>, name: &str) -> Result<Self>
    where
        O: SlotOwner<A, R, E> + Any,
        R: Default,
    {
        Self::from_target(Target::member(owner, name))
    }

    /// Create a stub from any target.
    ///
    /// [`Target::Anonymous`] stubs a no-op coroutine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTarget`] for members that are missing or not
    /// coroutines.
    pub fn from_target(target: Target<A, R, E>) -> Result<Self>
    where
        R: Default,
    {
        let resolved = target.resolve(Some(Coroutine::noop()))?;
        Ok(Self::build(resolved, Behavior::Returns(R::default())))
    }

    fn build(resolved: Resolved<A, R, E>, default: Behavior<A, R, E>) -> Self {
        let state = Arc::new(StubState::new(default));
        let proxy = Self::proxy_for(&resolved, Arc::clone(&state));
        let installer = Installer::new(resolved, proxy);
        installer.install();
        Self { installer, state }
    }

    fn proxy_for(resolved: &Resolved<A, R, E>, state: Arc<StubState<A, R, E>>) -> Coroutine<A, R, E> {
        let bound = resolved.this.downgrade();
        let label = resolved.label();

        Coroutine::named(format!("stub({label})"), move |args: A, caller: This| {
            state.dispatch(args, bound.bind_or(caller))
        })
    }

    fn replace(self, default: Behavior<A, R, E>) -> Self {
        tracing::debug!(stub = %self.installer.resolved().label(), behavior = ?default, "replaced stub");
        Self::build(self.installer.resolved().clone(), default)
    }

    /// A new stub whose calls complete with `value`.
    #[must_use]
    pub fn returns(self, value: R) -> Self {
        self.replace(Behavior::Returns(value))
    }

    /// A new stub whose calls complete with their context.
    ///
    /// For owner-bound stubs the context is the owner; anonymous stubs see
    /// whatever context the caller passes.
    #[must_use]
    pub fn returns_this(self) -> Self
    where
        R: From<This>,
    {
        self.replace(Behavior::returns_this())
    }

    /// A new stub whose calls complete with a value computed from their
    /// arguments and context.
    ///
    /// Unlike [`calls`](Stub::calls), `f` is a plain function evaluated when
    /// the call is made.
    #[must_use]
    pub fn returns_with<F>(self, f: F) -> Self
    where
        F: Fn(&A, &This) -> R + Send + Sync + 'static,
    {
        self.replace(Behavior::ReturnsWith(Arc::new(f)))
    }

    /// A new stub whose calls fail with `error`.
    #[must_use]
    pub fn throws(self, error: E) -> Self {
        self.replace(Behavior::Throws(error))
    }

    /// A new stub whose calls fail with [`Error::ForcedFailure`].
    #[must_use]
    pub fn throws_default(self) -> Self
    where
        E: From<Error>,
    {
        self.replace(Behavior::throws_default())
    }

    /// A new stub whose calls run `delegate` with the same arguments and
    /// context, completing with its result.
    #[must_use]
    pub fn calls(self, delegate: Coroutine<A, R, E>) -> Self {
        self.replace(Behavior::Calls(delegate))
    }

    /// The condition for the `n`th call (1-based), registering it if needed.
    ///
    /// `on_call(0)` never matches.
    pub fn on_call(&self, n: usize) -> Condition<A, R, E> {
        let mut conditions = self.state.conditions.lock();
        if let Some(existing) = conditions
            .iter()
            .find(|c| c.kind() == ConditionKind::Ordinal(n))
        {
            return existing.clone();
        }

        let condition = Condition::ordinal(n);
        conditions.push(condition.clone());
        tracing::debug!(call = n, "registered stub condition");
        condition
    }

    /// The condition for the first call.
    pub fn on_first_call(&self) -> Condition<A, R, E> {
        self.on_call(1)
    }

    /// The condition for the second call.
    pub fn on_second_call(&self) -> Condition<A, R, E> {
        self.on_call(2)
    }

    /// The condition for the third call.
    pub fn on_third_call(&self) -> Condition<A, R, E> {
        self.on_call(3)
    }

    /// Register a condition for calls whose arguments equal `args`.
    ///
    /// Every call registers a new condition; among overlapping conditions the
    /// most recently registered wins.
    pub fn with_args(&self, args: A) -> Condition<A, R, E>
    where
        A: PartialEq + Sync,
    {
        self.register(Condition::args(args))
    }

    /// Register a condition for calls whose arguments satisfy `matcher`.
    pub fn with_args_matching<M>(&self, matcher: M) -> Condition<A, R, E>
    where
        M: Matcher<A> + Send + Sync + 'static,
    {
        self.register(Condition::matching(matcher))
    }

    fn register(&self, condition: Condition<A, R, E>) -> Condition<A, R, E> {
        let mut conditions = self.state.conditions.lock();
        conditions.push(condition.clone());
        tracing::debug!(conditions = conditions.len(), "registered stub condition");
        condition
    }

    /// The registered conditions, oldest first.
    pub fn conditions(&self) -> Vec<Condition<A, R, E>> {
        self.state.conditions.lock().clone()
    }
}

impl<A, R, E> Stub<A, R, E> {
    /// The wrapper coroutine. Calling it is the same as calling the stub.
    pub fn proxy(&self) -> Coroutine<A, R, E> {
        self.installer.proxy().clone()
    }

    /// The coroutine this stub replaces.
    pub fn original(&self) -> Coroutine<A, R, E> {
        self.installer.resolved().original.clone()
    }

    /// Call the stub with the unbound context.
    pub fn invoke(&self, args: A) -> BoxFuture<'static, std::result::Result<R, E>> {
        self.installer.proxy().call(args, This::unbound())
    }

    /// Get the number of calls made, including ones that failed.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.state.call_count.load(Ordering::SeqCst)
    }

    /// Check if the stub was called at least once.
    #[must_use]
    pub fn was_called(&self) -> bool {
        self.call_count() > 0
    }

    /// Check if the stub was called exactly N times.
    #[must_use]
    pub fn was_called_times(&self, n: usize) -> bool {
        self.call_count() == n
    }

    /// Check if the stub was called exactly once.
    #[must_use]
    pub fn called_once(&self) -> bool {
        self.was_called_times(1)
    }

    /// Check if the stub was called exactly twice.
    #[must_use]
    pub fn called_twice(&self) -> bool {
        self.was_called_times(2)
    }

    /// Check if the stub was called exactly three times.
    #[must_use]
    pub fn called_thrice(&self) -> bool {
        self.was_called_times(3)
    }

    /// Put the stub back into the owner's slot.
    ///
    /// Returns `false` for stubs without an owner.
    pub fn install(&self) -> bool {
        self.installer.install()
    }

    /// Returns true if the owner's slot currently holds this stub.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installer.is_installed()
    }

    /// Zero the call counter and restore the original into the owner's slot.
    ///
    /// Conditions stay registered. Returns `true` if a slot was restored.
    pub fn reset(&self) -> bool {
        self.state.call_count.store(0, Ordering::SeqCst);
        self.installer.restore()
    }
}

impl<A, R, E> Default for Stub<A, R, E>
where
    A: Send + 'static,
    R: Clone + Default + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R, E> fmt::Debug for Stub<A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub")
            .field("target", &self.installer.resolved().label())
            .field("call_count", &self.call_count())
            .field("default", &self.state.default)
            .field("conditions", &self.state.conditions.lock().len())
            .finish()
    }
}
