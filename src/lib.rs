//! # testkit-doubles 🧰
//!
//! > Spies and stubs for async Rust
//!
//! **testkit-doubles** wraps async functions ("coroutines") in test doubles:
//! spies that record every completed call, and stubs that answer with
//! configured values, errors or delegates. Doubles can be installed into a
//! named slot on an owner object and restored afterwards.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use futures::executor::block_on;
//! use testkit_doubles::prelude::*;
//!
//! let service: Arc<Object<(u32,), String, String>> = Arc::new(Object::new().with_method(
//!     "fetch",
//!     Coroutine::new(|(id,): (u32,), _| async move { Ok(format!("user-{id}")) }),
//! ));
//!
//! // Spy on the real implementation
//! let spy = Spy::on(&service, "fetch").unwrap();
//! assert_eq!(block_on(service.invoke("fetch", (1,)).unwrap()), Ok("user-1".to_string()));
//! assert!(spy.was_called_with(&(1,)));
//! spy.reset();
//!
//! // Or replace it
//! let stub = Stub::on(&service, "fetch").unwrap().throws("offline".to_string());
//! assert_eq!(block_on(service.invoke("fetch", (1,)).unwrap()), Err("offline".to_string()));
//! stub.reset();
//! ```
//!
//! ## Features
//!
//! - 🔍 **Spies** - Record arguments, results and context of completed calls
//! - 🎭 **Stubs** - Fixed values, errors, delegates, per-call and per-argument overrides
//! - 🧩 **Slots** - Install doubles into an owner's member table and restore them
//! - 🎯 **Matchers** - Describe expected arguments
//! - 🎮 **Scheduler** - Decide which concurrent call finishes first

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod coroutine;

pub mod error;
pub mod mock;
pub mod scheduler;
pub mod target;

/// Prelude for convenient imports
///
/// ```rust
/// use testkit_doubles::prelude::*;
/// ```
pub mod prelude {
    pub use crate::coroutine::{Coroutine, This};
    pub use crate::error::{Error, Result};
    pub use crate::mock::matcher::{self, Matcher};
    pub use crate::mock::{CallRecord, Condition, Spy, Stub};
    pub use crate::scheduler::{Scheduler, SchedulingPolicy, TaskHandle};
    pub use crate::target::{Object, SlotOwner, Target};
}

// Re-exports
pub use coroutine::{Coroutine, This};
pub use error::{Error, Result};
pub use mock::{spy, stub, CallRecord, Condition, ConditionKind, Spy, Stub};
pub use target::{Member, Object, SlotOwner, Target};
