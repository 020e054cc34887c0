// Allow must_use_candidate for matcher factory functions since returning the matcher
// without using it is the common pattern for test setup
#![allow(clippy::must_use_candidate)]

//! Argument matchers for call verification and stub conditions.
//!
//! - [`Matcher`] trait for custom matchers
//! - Built-in matchers: [`eq`], [`anything`], [`predicate`]
//! - Combinators: [`all_of`], [`not`]
//!
//! # Example
//!
//! ```rust
//! use testkit_doubles::mock::matcher::{eq, not, predicate, Matcher};
//!
//! let m = eq((1, 2));
//! assert!(m.matches(&(1, 2)));
//!
//! let m = not(predicate("first is even", |args: &(i32, i32)| args.0 % 2 == 0));
//! assert!(m.matches(&(3, 0)));
//! ```

use std::fmt::Debug;
use std::marker::PhantomData;

/// A matcher for argument lists.
///
/// # Implementing Custom Matchers
///
/// ```rust
/// use testkit_doubles::mock::matcher::Matcher;
///
/// struct Positive;
///
/// impl Matcher<(i32,)> for Positive {
///     fn matches(&self, value: &(i32,)) -> bool {
///         value.0 > 0
///     }
///
///     fn describe(&self) -> String {
///         "a positive argument".to_string()
///     }
/// }
///
/// assert!(Positive.matches(&(4,)));
/// assert!(!Positive.matches(&(-4,)));
/// ```
pub trait Matcher<T: ?Sized> {
    /// Check if the value matches.
    fn matches(&self, value: &T) -> bool;

    /// Describe what this matcher expects.
    fn describe(&self) -> String;

    /// Describe why a value didn't match.
    fn describe_mismatch(&self, value: &T) -> String
    where
        T: Debug,
    {
        format!("{value:?} is not {}", self.describe())
    }
}

impl<T: ?Sized, M: Matcher<T> + ?Sized> Matcher<T> for Box<M> {
    fn matches(&self, value: &T) -> bool {
        (**self).matches(value)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn describe_mismatch(&self, value: &T) -> String
    where
        T: Debug,
    {
        (**self).describe_mismatch(value)
    }
}

/// Create an equality matcher.
pub fn eq<T: PartialEq + Debug>(expected: T) -> EqMatcher<T> {
    EqMatcher { expected }
}

/// Matcher for deep equality.
#[derive(Debug, Clone)]
pub struct EqMatcher<T> {
    expected: T,
}

impl<T: PartialEq + Debug> Matcher<T> for EqMatcher<T> {
    fn matches(&self, value: &T) -> bool {
        value == &self.expected
    }

    fn describe(&self) -> String {
        format!("equal to {:?}", self.expected)
    }
}

/// Create a matcher that accepts any value.
pub fn anything() -> Anything {
    Anything
}

/// Matcher that accepts every value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anything;

impl<T: ?Sized> Matcher<T> for Anything {
    fn matches(&self, _value: &T) -> bool {
        true
    }

    fn describe(&self) -> String {
        "anything".to_string()
    }
}

/// Create a matcher from a described predicate.
///
/// # Example
///
/// ```rust
/// use testkit_doubles::mock::matcher::{predicate, Matcher};
///
/// let m = predicate("a short name", |args: &(String,)| args.0.len() < 5);
/// assert!(m.matches(&("bob".to_string(),)));
/// assert_eq!(m.describe(), "a short name");
/// ```
pub fn predicate<T: ?Sized, F>(description: impl Into<String>, f: F) -> PredicateMatcher<T, F>
where
    F: Fn(&T) -> bool,
{
    PredicateMatcher {
        description: description.into(),
        f,
        _marker: PhantomData,
    }
}

/// Matcher backed by a closure.
pub struct PredicateMatcher<T: ?Sized, F> {
    description: String,
    f: F,
    _marker: PhantomData<fn(&T)>,
}

impl<T: ?Sized, F: Fn(&T) -> bool> Matcher<T> for PredicateMatcher<T, F> {
    fn matches(&self, value: &T) -> bool {
        (self.f)(value)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

impl<T: ?Sized, F> Debug for PredicateMatcher<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateMatcher")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Negate a matcher.
pub fn not<M>(inner: M) -> NotMatcher<M> {
    NotMatcher { inner }
}

/// Matcher that inverts another matcher.
#[derive(Debug, Clone)]
pub struct NotMatcher<M> {
    inner: M,
}

impl<T: ?Sized, M: Matcher<T>> Matcher<T> for NotMatcher<M> {
    fn matches(&self, value: &T) -> bool {
        !self.inner.matches(value)
    }

    fn describe(&self) -> String {
        format!("not {}", self.inner.describe())
    }
}

/// Require every matcher to match.
pub fn all_of<M>(matchers: Vec<M>) -> AllOf<M> {
    AllOf { matchers }
}

/// Matcher that requires all inner matchers to match.
#[derive(Debug, Clone)]
pub struct AllOf<M> {
    matchers: Vec<M>,
}

impl<T: ?Sized, M: Matcher<T>> Matcher<T> for AllOf<M> {
    fn matches(&self, value: &T) -> bool {
        self.matchers.iter().all(|m| m.matches(value))
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.matchers.iter().map(|m| m.describe()).collect();
        format!("all of [{}]", parts.join(", "))
    }
}
