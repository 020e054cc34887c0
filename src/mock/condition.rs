//! Stub behaviors and the conditions that select them.

use std::fmt;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;

use crate::coroutine::{Coroutine, This};
use crate::error::Error;
use crate::mock::matcher::Matcher;

type ValueFn<A, R> = dyn Fn(&A, &This) -> R + Send + Sync;
type Predicate<A> = dyn Fn(usize, &A) -> bool + Send + Sync;

/// What a stub does when called.
pub(crate) enum Behavior<A, R, E> {
    /// Complete with a clone of the value.
    Returns(R),
    /// Complete with a value computed from the call's arguments and context.
    ReturnsWith(Arc<ValueFn<A, R>>),
    /// Fail with a clone of the error.
    Throws(E),
    /// Run another coroutine with the same arguments and context.
    Calls(Coroutine<A, R, E>),
}

impl<A, R, E> Behavior<A, R, E>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Complete with the call's context, converted into `R`.
    pub(crate) fn returns_this() -> Self
    where
        R: From<This>,
    {
        Self::ReturnsWith(Arc::new(|_args: &A, this: &This| R::from(this.clone())))
    }

    /// Fail with the generic forced failure, converted into `E`.
    pub(crate) fn throws_default() -> Self
    where
        E: From<Error>,
    {
        Self::Throws(E::from(Error::ForcedFailure))
    }

    pub(crate) fn execute(&self, args: A, this: This) -> BoxFuture<'static, Result<R, E>> {
        match self {
            Self::Returns(value) => future::ready(Ok(value.clone())).boxed(),
            Self::ReturnsWith(f) => future::ready(Ok(f(&args, &this))).boxed(),
            Self::Throws(error) => future::ready(Err(error.clone())).boxed(),
            Self::Calls(delegate) => delegate.call(args, this),
        }
    }
}

impl<A, R: Clone, E: Clone> Clone for Behavior<A, R, E> {
    fn clone(&self) -> Self {
        match self {
            Self::Returns(value) => Self::Returns(value.clone()),
            Self::ReturnsWith(f) => Self::ReturnsWith(Arc::clone(f)),
            Self::Throws(error) => Self::Throws(error.clone()),
            Self::Calls(delegate) => Self::Calls(delegate.clone()),
        }
    }
}

impl<A, R, E> fmt::Debug for Behavior<A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Returns(_) => f.write_str("Returns"),
            Self::ReturnsWith(_) => f.write_str("ReturnsWith"),
            Self::Throws(_) => f.write_str("Throws"),
            Self::Calls(delegate) => f.debug_tuple("Calls").field(delegate).finish(),
        }
    }
}

/// How a condition selects calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    /// The Nth call (1-based) made to the stub.
    Ordinal(usize),
    /// Calls whose arguments match.
    Args,
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionKind::Ordinal(n) => write!(f, "call #{n}"),
            ConditionKind::Args => write!(f, "args"),
        }
    }
}

struct ConditionInner<A, R, E> {
    kind: ConditionKind,
    predicate: Box<Predicate<A>>,
    behavior: Mutex<Option<Behavior<A, R, E>>>,
}

/// A behavior override on a stub, limited to the calls its predicate selects.
///
/// Handles are cheap to clone and share state with the stub that created
/// them: configuring a handle changes what the stub does from the next call on.
/// A condition that was never configured defers to the stub's default.
///
/// # Example
///
/// ```rust
/// use testkit_doubles::Stub;
///
/// let stub = Stub::<(), i32, String>::new().returns(1);
/// stub.on_second_call().returns(99);
///
/// let results: Vec<_> = (0..3)
///     .map(|_| futures::executor::block_on(stub.invoke(())))
///     .collect();
/// assert_eq!(results, vec![Ok(1), Ok(99), Ok(1)]);
/// ```
pub struct Condition<A, R, E> {
    inner: Arc<ConditionInner<A, R, E>>,
}

impl<A, R, E> Condition<A, R, E> {
    pub(crate) fn ordinal(n: usize) -> Self {
        Self::with_predicate(ConditionKind::Ordinal(n), move |index, _args| index == n)
    }

    pub(crate) fn args(expected: A) -> Self
    where
        A: PartialEq + Send + Sync + 'static,
    {
        Self::with_predicate(ConditionKind::Args, move |_index, args| args == &expected)
    }

    pub(crate) fn matching<M>(matcher: M) -> Self
    where
        M: Matcher<A> + Send + Sync + 'static,
    {
        Self::with_predicate(ConditionKind::Args, move |_index, args| matcher.matches(args))
    }

    fn with_predicate<P>(kind: ConditionKind, predicate: P) -> Self
    where
        P: Fn(usize, &A) -> bool + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ConditionInner {
                kind,
                predicate: Box::new(predicate),
                behavior: Mutex::new(None),
            }),
        }
    }

    /// How this condition selects calls.
    #[must_use]
    pub fn kind(&self) -> ConditionKind {
        self.inner.kind
    }

    /// Check if the call with 1-based `index` and `args` is selected.
    #[must_use]
    pub fn matches(&self, index: usize, args: &A) -> bool {
        (self.inner.predicate)(index, args)
    }

    /// Returns true once a behavior has been configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner.behavior.lock().is_some()
    }

    fn set(&self, behavior: Behavior<A, R, E>) {
        tracing::debug!(condition = %self.inner.kind, behavior = ?behavior, "configured stub condition");
        *self.inner.behavior.lock() = Some(behavior);
    }

    /// Selected calls complete with `value`.
    pub fn returns(&self, value: R) {
        self.set(Behavior::Returns(value));
    }

    /// Selected calls fail with `error`.
    pub fn throws(&self, error: E) {
        self.set(Behavior::Throws(error));
    }

    /// Selected calls run `delegate` with the same arguments and context.
    pub fn calls(&self, delegate: Coroutine<A, R, E>) {
        self.set(Behavior::Calls(delegate));
    }

    /// Selected calls complete with a value computed from their arguments
    /// and context.
    pub fn returns_with<F>(&self, f: F)
    where
        F: Fn(&A, &This) -> R + Send + Sync + 'static,
    {
        self.set(Behavior::ReturnsWith(Arc::new(f)));
    }
}

impl<A, R, E> Condition<A, R, E>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Selected calls complete with their context.
    pub fn returns_this(&self)
    where
        R: From<This>,
    {
        self.set(Behavior::returns_this());
    }

    /// Selected calls fail with [`Error::ForcedFailure`].
    pub fn throws_default(&self)
    where
        E: From<Error>,
    {
        self.set(Behavior::throws_default());
    }
}

impl<A, R: Clone, E: Clone> Condition<A, R, E> {
    pub(crate) fn behavior(&self) -> Option<Behavior<A, R, E>> {
        self.inner.behavior.lock().clone()
    }
}

impl<A, R, E> Clone for Condition<A, R, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, R, E> fmt::Debug for Condition<A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("kind", &self.inner.kind)
            .field("behavior", &*self.inner.behavior.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::matcher::predicate;
    use futures::executor::block_on;

    type Cond = Condition<(i32, i32), i32, String>;

    #[test]
    fn test_ordinal_condition_matches_index_only() {
        let cond = Cond::ordinal(2);

        assert_eq!(cond.kind(), ConditionKind::Ordinal(2));
        assert!(!cond.matches(1, &(0, 0)));
        assert!(cond.matches(2, &(0, 0)));
        assert!(cond.matches(2, &(5, 6)));
        assert!(!cond.matches(3, &(0, 0)));
    }

    #[test]
    fn test_args_condition_matches_args_only() {
        let cond = Cond::args((1, 2));

        assert_eq!(cond.kind(), ConditionKind::Args);
        assert!(cond.matches(1, &(1, 2)));
        assert!(cond.matches(7, &(1, 2)));
        assert!(!cond.matches(1, &(2, 1)));
    }

    #[test]
    fn test_matching_condition() {
        let cond = Cond::matching(predicate("sum is 3", |a: &(i32, i32)| a.0 + a.1 == 3));

        assert!(cond.matches(1, &(1, 2)));
        assert!(cond.matches(1, &(3, 0)));
        assert!(!cond.matches(1, &(3, 3)));
    }

    #[test]
    fn test_condition_configuration_is_shared() {
        let cond = Cond::ordinal(1);
        let handle = cond.clone();
        assert!(!cond.is_configured());

        handle.returns(5);

        assert!(cond.is_configured());
        assert!(matches!(cond.behavior(), Some(Behavior::Returns(5))));

        handle.throws("no".to_string());
        assert!(matches!(cond.behavior(), Some(Behavior::Throws(ref e)) if e == "no"));
    }

    #[test]
    fn test_behavior_execute() {
        let this = This::unbound();

        let returns: Behavior<(i32, i32), i32, String> = Behavior::Returns(3);
        assert_eq!(block_on(returns.execute((0, 0), this.clone())), Ok(3));

        let throws: Behavior<(i32, i32), i32, String> = Behavior::Throws("boom".into());
        assert_eq!(block_on(throws.execute((0, 0), this.clone())), Err("boom".to_string()));

        let computed: Behavior<(i32, i32), i32, String> =
            Behavior::ReturnsWith(Arc::new(|args: &(i32, i32), _this: &This| args.0 * args.1));
        assert_eq!(block_on(computed.execute((3, 4), this.clone())), Ok(12));

        let delegate = Coroutine::new(|(a, b): (i32, i32), _| async move { Ok(a - b) });
        let calls: Behavior<(i32, i32), i32, String> = Behavior::Calls(delegate);
        assert_eq!(block_on(calls.execute((9, 4), this)), Ok(5));
    }

    #[test]
    fn test_behavior_throws_default() {
        let throws: Behavior<(), (), Error> = Behavior::throws_default();
        assert_eq!(
            block_on(throws.execute((), This::unbound())),
            Err(Error::ForcedFailure)
        );
    }

    #[test]
    fn test_condition_kind_display() {
        assert_eq!(ConditionKind::Ordinal(3).to_string(), "call #3");
        assert_eq!(ConditionKind::Args.to_string(), "args");
    }
}
