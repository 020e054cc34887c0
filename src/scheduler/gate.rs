//! Named gates for suspending tasks at chosen points.
//!
//! A task awaiting a [`GateFuture`] stays suspended until the gate is opened,
//! either for every waiter or for the earliest one.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

struct Waiter {
    released: bool,
    waker: Waker,
}

type WaiterRef = Arc<Mutex<Waiter>>;

/// Waiters per gate name, in arrival order.
#[derive(Default)]
pub(crate) struct GateState {
    gates: Mutex<HashMap<String, VecDeque<WaiterRef>>>,
}

impl GateState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn register(&self, name: &str, waiter: WaiterRef) {
        self.gates
            .lock()
            .entry(name.to_string())
            .or_default()
            .push_back(waiter);
    }

    fn unregister(&self, name: &str, waiter: &WaiterRef) {
        let mut gates = self.gates.lock();
        if let Some(waiters) = gates.get_mut(name) {
            waiters.retain(|w| !Arc::ptr_eq(w, waiter));
            if waiters.is_empty() {
                gates.remove(name);
            }
        }
    }

    /// Release every waiter at `name`. Returns how many were released.
    pub(crate) fn open(&self, name: &str) -> usize {
        let waiters = self.gates.lock().remove(name).unwrap_or_default();
        let count = waiters.len();
        for waiter in waiters {
            release(&waiter);
        }
        count
    }

    /// Release the earliest waiter at `name`.
    pub(crate) fn open_one(&self, name: &str) -> bool {
        let waiter = {
            let mut gates = self.gates.lock();
            let Some(waiters) = gates.get_mut(name) else {
                return false;
            };
            let waiter = waiters.pop_front();
            if waiters.is_empty() {
                gates.remove(name);
            }
            waiter
        };

        match waiter {
            Some(waiter) => {
                release(&waiter);
                true
            }
            None => false,
        }
    }

    pub(crate) fn waiting_at(&self, name: &str) -> usize {
        self.gates.lock().get(name).map_or(0, VecDeque::len)
    }
}

fn release(waiter: &WaiterRef) {
    let waker = {
        let mut waiter = waiter.lock();
        waiter.released = true;
        waiter.waker.clone()
    };
    waker.wake();
}

/// A future that completes once its gate is opened.
///
/// Dropping it before then removes it from the gate.
pub struct GateFuture {
    name: String,
    state: Arc<GateState>,
    waiter: Option<WaiterRef>,
}

impl GateFuture {
    pub(crate) fn new(name: String, state: Arc<GateState>) -> Self {
        Self {
            name,
            state,
            waiter: None,
        }
    }

    /// The gate this future waits at.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Future for GateFuture {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(waiter) = &self.waiter {
            let mut waiter = waiter.lock();
            if waiter.released {
                return Poll::Ready(());
            }
            // Polled by a sibling wake; keep the latest waker.
            waiter.waker.clone_from(cx.waker());
            return Poll::Pending;
        }

        let waiter = Arc::new(Mutex::new(Waiter {
            released: false,
            waker: cx.waker().clone(),
        }));
        self.state.register(&self.name, Arc::clone(&waiter));
        self.waiter = Some(waiter);
        Poll::Pending
    }
}

impl Drop for GateFuture {
    fn drop(&mut self) {
        if let Some(waiter) = &self.waiter {
            if !waiter.lock().released {
                self.state.unregister(&self.name, waiter);
            }
        }
    }
}

impl std::fmt::Debug for GateFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateFuture")
            .field("name", &self.name)
            .field("registered", &self.waiter.is_some())
            .finish()
    }
}
