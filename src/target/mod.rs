//! What a spy or stub wraps.
//!
//! A [`Target`] names the coroutine to wrap, either directly or as a member of
//! an owner. Construction resolves it once into the original coroutine plus,
//! for members, the slot the wrapper is installed into.
//!
//! - [`Target`] - The unresolved target
//! - [`SlotOwner`] - Owners with named, reassignable members
//! - [`Object`] - A ready-made member table

mod install;
mod object;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub(crate) use install::Installer;
pub use object::{Member, Object, SlotOwner};

use crate::coroutine::{Coroutine, This};
use crate::error::{Error, Result};

/// The thing a spy or stub wraps.
pub enum Target<A, R, E> {
    /// Nothing: stubs fall back to a no-op coroutine, spies reject it.
    Anonymous,
    /// A free-standing coroutine. Call recording works, slot installation does not.
    Function(Coroutine<A, R, E>),
    /// The member `name` of `owner`.
    Member {
        /// The object holding the slot.
        owner: Arc<dyn SlotOwner<A, R, E>>,
        /// The owner as a call context.
        this: This,
        /// Name of the slot.
        name: String,
    },
}

impl<A, R, E> Target<A, R, E> {
    /// Target the member `name` of `owner`.
    pub fn member<O>(owner: &Arc<O>, name: impl Into<String>) -> Self
    where
        O: SlotOwner<A, R, E> + Any,
    {
        let slots: Arc<O> = Arc::clone(owner);
        let slots: Arc<dyn SlotOwner<A, R, E>> = slots;
        Self::Member {
            owner: slots,
            this: This::of(owner),
            name: name.into(),
        }
    }

    /// Resolve into the original coroutine and its slot.
    ///
    /// `fallback` is used for [`Target::Anonymous`]; without one the target is
    /// rejected.
    pub(crate) fn resolve(self, fallback: Option<Coroutine<A, R, E>>) -> Result<Resolved<A, R, E>> {
        match self {
            Self::Anonymous => fallback
                .map(Resolved::free)
                .ok_or_else(|| Error::invalid_target("no coroutine or owner member given")),
            Self::Function(original) => Ok(Resolved::free(original)),
            Self::Member { owner, this, name } => match owner.member(&name) {
                Some(Member::Coroutine(original)) => Ok(Resolved {
                    original,
                    slot: Some(Slot { owner, name }),
                    this,
                }),
                Some(Member::Value(_)) => Err(Error::invalid_target(format!(
                    "member `{name}` is not a coroutine"
                ))),
                None => Err(Error::invalid_target(format!(
                    "owner has no member `{name}`"
                ))),
            },
        }
    }
}

impl<A, R, E> From<Coroutine<A, R, E>> for Target<A, R, E> {
    fn from(coroutine: Coroutine<A, R, E>) -> Self {
        Self::Function(coroutine)
    }
}

impl<A, R, E, O> From<(&Arc<O>, &str)> for Target<A, R, E>
where
    O: SlotOwner<A, R, E> + Any,
{
    fn from((owner, name): (&Arc<O>, &str)) -> Self {
        Self::member(owner, name)
    }
}

impl<A, R, E> fmt::Debug for Target<A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Function(coroutine) => f.debug_tuple("Function").field(coroutine).finish(),
            Self::Member { this, name, .. } => f
                .debug_struct("Member")
                .field("owner", this)
                .field("name", name)
                .finish(),
        }
    }
}

/// A named slot on an owner.
pub(crate) struct Slot<A, R, E> {
    pub(crate) owner: Arc<dyn SlotOwner<A, R, E>>,
    pub(crate) name: String,
}

impl<A, R, E> Clone for Slot<A, R, E> {
    fn clone(&self) -> Self {
        Self {
            owner: Arc::clone(&self.owner),
            name: self.name.clone(),
        }
    }
}

/// A resolved target.
pub(crate) struct Resolved<A, R, E> {
    /// The coroutine being wrapped, restored into the slot on reset.
    pub(crate) original: Coroutine<A, R, E>,
    /// Where the wrapper lives, if the target had an owner.
    pub(crate) slot: Option<Slot<A, R, E>>,
    /// The owner as a context, unbound for free-standing targets.
    pub(crate) this: This,
}

impl<A, R, E> Resolved<A, R, E> {
    pub(crate) fn free(original: Coroutine<A, R, E>) -> Self {
        Self {
            original,
            slot: None,
            this: This::unbound(),
        }
    }

    /// A label for logs and proxy names.
    pub(crate) fn label(&self) -> String {
        match (&self.slot, self.original.name()) {
            (Some(slot), _) => slot.name.clone(),
            (None, Some(name)) => name.to_string(),
            (None, None) => "anonymous".to_string(),
        }
    }
}

impl<A, R, E> Clone for Resolved<A, R, E> {
    fn clone(&self) -> Self {
        Self {
            original: self.original.clone(),
            slot: self.slot.clone(),
            this: self.this.clone(),
        }
    }
}
