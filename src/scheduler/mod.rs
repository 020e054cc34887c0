//! Deterministic execution for concurrent coroutine calls.
//!
//! This module provides a [`Scheduler`] for driving several in-flight calls
//! by hand. Tasks only run when stepped, and [gates](Scheduler::gate) let a
//! test decide which suspended call finishes first.
//!
//! # Example
//!
//! ```rust
//! use testkit_doubles::scheduler::Scheduler;
//! use testkit_doubles::{Coroutine, Spy, This};
//!
//! let scheduler = Scheduler::new();
//! let gates = scheduler.clone();
//! let wait: Coroutine<(&'static str,), &'static str, ()> =
//!     Coroutine::new(move |(name,), _| {
//!         let gate = gates.gate(name);
//!         async move {
//!             gate.await;
//!             Ok(name)
//!         }
//!     });
//! let spy = Spy::new(wait);
//!
//! scheduler.run(&spy.proxy(), ("slow",), This::unbound());
//! scheduler.run(&spy.proxy(), ("fast",), This::unbound());
//! scheduler.run_until_stalled();
//!
//! scheduler.open("fast");
//! scheduler.open("slow");
//! scheduler.run_until_complete();
//!
//! // Recorded in completion order.
//! assert_eq!(spy.first_call().unwrap().args, ("fast",));
//! ```

mod cooperative;
mod gate;
mod task;

pub use cooperative::Scheduler;
pub use gate::GateFuture;
pub use task::{SchedulingPolicy, TaskHandle, TaskId, TaskInfo, TaskState};
