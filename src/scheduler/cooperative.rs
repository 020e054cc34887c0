//! The `Scheduler` implementation.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use parking_lot::Mutex;

use crate::coroutine::{Coroutine, This};
use crate::scheduler::gate::{GateFuture, GateState};
use crate::scheduler::task::{SchedulingPolicy, Task, TaskHandle, TaskId, TaskInfo, TaskState};

const MAX_POLLS: usize = 100_000;

/// A single-threaded cooperative scheduler with deterministic ordering.
///
/// Nothing runs until you drive it with [`step`], [`run_until_stalled`] or
/// [`run_until_complete`]. Suspended tasks are parked until woken, so the
/// order in which concurrent coroutines finish is decided by the test.
/// Tasks are polled on the driving thread; wakers may fire from any thread.
///
/// # Example
///
/// ```rust
/// use testkit_doubles::scheduler::Scheduler;
///
/// let scheduler = Scheduler::new();
/// let handle = scheduler.spawn(async { 42 });
///
/// assert!(!handle.is_complete());
/// assert!(scheduler.step());
/// assert_eq!(handle.take(), Some(42));
/// ```
///
/// [`step`]: Scheduler::step
/// [`run_until_stalled`]: Scheduler::run_until_stalled
/// [`run_until_complete`]: Scheduler::run_until_complete
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    ready: Mutex<VecDeque<Task>>,
    waiting: Mutex<Vec<Task>>,
    infos: Mutex<Vec<TaskInfo>>,
    completed: AtomicUsize,
    gates: Arc<GateState>,
    policy: SchedulingPolicy,
}

impl SchedulerInner {
    fn wake(&self, id: TaskId) -> bool {
        let mut waiting = self.waiting.lock();
        let Some(pos) = waiting.iter().position(|t| t.id == id) else {
            return false;
        };
        let task = waiting.remove(pos);
        drop(waiting);

        self.set_state(id, TaskState::Pending);
        self.ready.lock().push_back(task);
        true
    }

    fn set_state(&self, id: TaskId, state: TaskState) {
        if let Some(info) = self.infos.lock().iter_mut().find(|i| i.id == id) {
            info.state = state;
            if state == TaskState::Running {
                info.poll_count += 1;
            }
        }
    }
}

impl Scheduler {
    /// Creates a scheduler polling ready tasks oldest first.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(SchedulingPolicy::Fifo)
    }

    /// Creates a scheduler with the given policy.
    ///
    /// # Example
    ///
    /// ```rust
    /// use testkit_doubles::scheduler::{Scheduler, SchedulingPolicy};
    ///
    /// let scheduler = Scheduler::with_policy(SchedulingPolicy::Lifo);
    /// let first = scheduler.spawn(async { 1 });
    /// let second = scheduler.spawn(async { 2 });
    ///
    /// scheduler.step();
    /// assert!(second.is_complete());
    /// assert!(!first.is_complete());
    /// ```
    #[must_use]
    pub fn with_policy(policy: SchedulingPolicy) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                ready: Mutex::new(VecDeque::new()),
                waiting: Mutex::new(Vec::new()),
                infos: Mutex::new(Vec::new()),
                completed: AtomicUsize::new(0),
                gates: Arc::new(GateState::new()),
                policy,
            }),
        }
    }

    /// Returns the scheduling policy being used.
    #[must_use]
    pub fn policy(&self) -> SchedulingPolicy {
        self.inner.policy
    }

    /// Spawns a future. It does not run until the scheduler is driven.
    pub fn spawn<F, T>(&self, future: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.spawn_task(None, future)
    }

    /// Spawns a named future. Names show up in [`TaskInfo`].
    pub fn spawn_named<F, T>(&self, name: &str, future: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.spawn_task(Some(name.to_string()), future)
    }

    /// Calls `coroutine` now and spawns the resulting future.
    ///
    /// The call itself happens immediately, so a stub's call counter moves
    /// at spawn time while the body only runs when the scheduler is driven.
    ///
    /// # Example
    ///
    /// ```rust
    /// use testkit_doubles::scheduler::Scheduler;
    /// use testkit_doubles::{Stub, This};
    ///
    /// let stub = Stub::<(), i32, String>::new().returns(7);
    /// let scheduler = Scheduler::new();
    ///
    /// let handle = scheduler.run(&stub.proxy(), (), This::unbound());
    /// assert_eq!(stub.call_count(), 1);
    ///
    /// scheduler.run_until_complete();
    /// assert_eq!(handle.take(), Some(Ok(7)));
    /// ```
    pub fn run<A, R, E>(
        &self,
        coroutine: &Coroutine<A, R, E>,
        args: A,
        this: This,
    ) -> TaskHandle<Result<R, E>>
    where
        R: Send + 'static,
        E: Send + 'static,
    {
        let name = coroutine.name().map(str::to_string);
        self.spawn_task(name, coroutine.call(args, this))
    }

    fn spawn_task<F, T>(&self, name: Option<String>, future: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (task, handle) = Task::new(future);
        tracing::trace!(task = %task.id, name = ?name, "spawned task");

        self.inner.infos.lock().push(TaskInfo::new(task.id, name));
        self.inner.ready.lock().push_back(task);
        handle
    }

    /// Returns the number of tasks that are ready to run.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.ready.lock().len()
    }

    /// Returns the number of suspended tasks.
    #[must_use]
    pub fn waiting_count(&self) -> usize {
        self.inner.waiting.lock().len()
    }

    /// Returns the number of unfinished tasks (pending + waiting).
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.pending_count() + self.waiting_count()
    }

    /// Returns the number of completed tasks, including pruned ones.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.inner.completed.load(Ordering::SeqCst)
    }

    /// Drops the [`TaskInfo`] of completed tasks.
    ///
    /// Handles keep their results. Returns the number of records dropped.
    pub fn prune_completed(&self) -> usize {
        let mut infos = self.inner.infos.lock();
        let before = infos.len();
        infos.retain(|info| info.state != TaskState::Completed);
        before - infos.len()
    }

    /// Returns true if there are no unfinished tasks.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.active_count() == 0
    }

    /// Gets information about a task by its ID.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<TaskInfo> {
        self.inner
            .infos
            .lock()
            .iter()
            .find(|info| info.id == id)
            .cloned()
    }

    /// Returns information about all tasks, in spawn order.
    #[must_use]
    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.inner.infos.lock().clone()
    }

    /// Polls one ready task, chosen by the scheduling policy.
    ///
    /// Returns `true` if a task was polled, `false` if none was ready.
    pub fn step(&self) -> bool {
        let Some(mut task) = self.next_task() else {
            return false;
        };

        let woken = Arc::new(AtomicBool::new(false));
        let waker = Waker::from(Arc::new(TaskWaker {
            scheduler: Arc::clone(&self.inner),
            id: task.id,
            woken_during_poll: Arc::clone(&woken),
        }));
        let mut cx = Context::from_waker(&waker);

        self.inner.set_state(task.id, TaskState::Running);
        match task.poll(&mut cx) {
            Poll::Ready(()) => {
                tracing::trace!(task = %task.id, "task completed");
                self.inner.set_state(task.id, TaskState::Completed);
                self.inner.completed.fetch_add(1, Ordering::SeqCst);
            }
            Poll::Pending => {
                let id = task.id;
                self.inner.set_state(id, TaskState::Waiting);
                self.inner.waiting.lock().push(task);

                // Parked before the flag is read, so a wake from another
                // thread either finds the task or sets the flag.
                if woken.load(Ordering::SeqCst) {
                    self.inner.wake(id);
                }
            }
        }
        true
    }

    /// Polls ready tasks until none are ready.
    ///
    /// Suspended tasks stay parked. Returns the number of polls.
    pub fn run_until_stalled(&self) -> usize {
        let mut count = 0;
        while self.step() {
            count += 1;
        }
        count
    }

    /// Polls until every task has completed.
    ///
    /// Returns the number of polls.
    ///
    /// # Panics
    ///
    /// Panics if tasks are suspended with nothing left to wake them
    /// (deadlock), or if the tasks keep running without finishing.
    pub fn run_until_complete(&self) -> usize {
        let mut count = 0;

        while self.active_count() > 0 {
            if self.step() {
                count += 1;
            } else {
                panic!(
                    "Deadlock detected: {} tasks waiting, none ready",
                    self.waiting_count()
                );
            }

            assert!(
                count <= MAX_POLLS,
                "Scheduler ran for {MAX_POLLS} polls without completing"
            );
        }
        count
    }

    /// Creates a future that waits at the named gate until it is opened.
    ///
    /// # Example
    ///
    /// ```rust
    /// use testkit_doubles::scheduler::Scheduler;
    ///
    /// let scheduler = Scheduler::new();
    /// let gate = scheduler.gate("checkpoint");
    /// let handle = scheduler.spawn(async move {
    ///     gate.await;
    ///     42
    /// });
    ///
    /// scheduler.run_until_stalled();
    /// assert_eq!(scheduler.waiting_at("checkpoint"), 1);
    ///
    /// scheduler.open("checkpoint");
    /// scheduler.run_until_stalled();
    /// assert_eq!(handle.take(), Some(42));
    /// ```
    #[must_use]
    pub fn gate(&self, name: &str) -> GateFuture {
        GateFuture::new(name.to_string(), Arc::clone(&self.inner.gates))
    }

    /// Opens the named gate for every task waiting at it.
    ///
    /// Returns the number of tasks released. Tasks reaching the gate later
    /// wait again.
    pub fn open(&self, name: &str) -> usize {
        let released = self.inner.gates.open(name);
        tracing::debug!(gate = name, released, "opened gate");
        released
    }

    /// Opens the named gate for the task that reached it first.
    ///
    /// Returns `true` if a task was released.
    pub fn open_one(&self, name: &str) -> bool {
        let released = self.inner.gates.open_one(name);
        tracing::debug!(gate = name, released, "opened gate for one task");
        released
    }

    /// Returns the number of tasks waiting at the named gate.
    #[must_use]
    pub fn waiting_at(&self, name: &str) -> usize {
        self.inner.gates.waiting_at(name)
    }

    fn next_task(&self) -> Option<Task> {
        let mut ready = self.inner.ready.lock();
        match self.inner.policy {
            SchedulingPolicy::Fifo => ready.pop_front(),
            SchedulingPolicy::Lifo => ready.pop_back(),
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("policy", &self.inner.policy)
            .field("pending", &self.pending_count())
            .field("waiting", &self.waiting_count())
            .finish()
    }
}

/// Waker that moves its task back to the ready queue.
struct TaskWaker {
    scheduler: Arc<SchedulerInner>,
    id: TaskId,
    woken_during_poll: Arc<AtomicBool>,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        // Not parked yet: the task is being polled, re-queue it afterwards.
        if !self.scheduler.wake(self.id) {
            self.woken_during_poll.store(true, Ordering::SeqCst);
        }
    }
}
