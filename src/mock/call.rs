//! Records of completed calls.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use crate::coroutine::This;
use crate::mock::matcher::Matcher;

/// A record of a single completed call.
#[derive(Debug, Clone)]
pub struct CallRecord<A, R> {
    /// The arguments passed to the call.
    pub args: A,
    /// The value the call completed with.
    pub return_value: R,
    /// The context the call ran under.
    pub this_value: This,
    /// Time from invocation to completion.
    pub duration: Duration,
    /// When the call completed (relative to spy creation).
    pub timestamp: Duration,
}

impl<A, R> CallRecord<A, R> {
    /// Check if the call received exactly `expected`.
    ///
    /// Comparison is deep and order-sensitive: `(1, 2)` does not match `(2, 1)`.
    pub fn called_with(&self, expected: &A) -> bool
    where
        A: PartialEq,
    {
        &self.args == expected
    }

    /// Check if the call's arguments satisfy `matcher`.
    pub fn called_with_matching<M>(&self, matcher: &M) -> bool
    where
        M: Matcher<A> + ?Sized,
    {
        matcher.matches(&self.args)
    }

    /// Check if the call ran with `owner` as its context.
    pub fn called_on<T: Any + Send + Sync>(&self, owner: &Arc<T>) -> bool {
        self.this_value.is(owner)
    }

    /// Check if the call completed with `expected`.
    pub fn returned(&self, expected: &R) -> bool
    where
        R: PartialEq,
    {
        &self.return_value == expected
    }
}
