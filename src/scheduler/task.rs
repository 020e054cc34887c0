//! Task types for the scheduler.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;

/// Unique identifier for a spawned task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({})", self.0)
    }
}

/// The current state of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Ready to be polled.
    Pending,
    /// Being polled right now.
    Running,
    /// Suspended until something wakes it.
    Waiting,
    /// Finished; the result is in its handle.
    Completed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Pending => write!(f, "Pending"),
            TaskState::Running => write!(f, "Running"),
            TaskState::Waiting => write!(f, "Waiting"),
            TaskState::Completed => write!(f, "Completed"),
        }
    }
}

/// The order in which ready tasks are polled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchedulingPolicy {
    /// Oldest ready task first.
    #[default]
    Fifo,
    /// Most recently readied task first.
    Lifo,
}

/// Information about a task.
#[derive(Clone, Debug)]
pub struct TaskInfo {
    /// The task's unique identifier.
    pub id: TaskId,
    /// Current state of the task.
    pub state: TaskState,
    /// Optional name for debugging.
    pub name: Option<String>,
    /// Number of times this task has been polled.
    pub poll_count: usize,
}

impl TaskInfo {
    pub(crate) fn new(id: TaskId, name: Option<String>) -> Self {
        Self {
            id,
            state: TaskState::Pending,
            name,
            poll_count: 0,
        }
    }
}

/// Handle to a spawned task.
///
/// Clones share the same result slot.
pub struct TaskHandle<T> {
    /// The task's unique identifier.
    pub id: TaskId,
    result: Arc<Mutex<Option<T>>>,
    finished: Arc<AtomicBool>,
}

impl<T> TaskHandle<T> {
    /// Tries to get a copy of the result if the task has completed.
    ///
    /// Returns `None` if the task hasn't completed yet or the result was taken.
    #[must_use]
    pub fn try_get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.result.lock().clone()
    }

    /// Takes the result if the task has completed.
    ///
    /// Returns `None` if the task hasn't completed yet or the result was already taken.
    #[must_use]
    pub fn take(&self) -> Option<T> {
        self.result.lock().take()
    }

    /// Returns true if the task has completed, even if its result was taken.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            result: Arc::clone(&self.result),
            finished: Arc::clone(&self.finished),
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("is_complete", &self.is_complete())
            .finish_non_exhaustive()
    }
}

/// A spawned future with its output routed into a [`TaskHandle`].
pub(crate) struct Task {
    pub(crate) id: TaskId,
    future: BoxFuture<'static, ()>,
}

impl Task {
    pub(crate) fn new<F, T>(future: F) -> (Self, TaskHandle<T>)
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let id = TaskId::new();
        let result = Arc::new(Mutex::new(None));
        let finished = Arc::new(AtomicBool::new(false));

        let handle = TaskHandle {
            id,
            result: Arc::clone(&result),
            finished: Arc::clone(&finished),
        };

        let future = async move {
            let output = future.await;
            *result.lock() = Some(output);
            finished.store(true, Ordering::Release);
        }
        .boxed();

        (Self { id, future }, handle)
    }

    pub(crate) fn poll(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        self.future.as_mut().poll(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_unique_and_ordered() {
        let id1 = TaskId::new();
        let id2 = TaskId::new();

        assert_ne!(id1, id2);
        assert!(id1 < id2);
        assert_eq!(id1.to_string(), format!("Task({})", id1.as_u64()));
    }

    #[test]
    fn test_task_state_display() {
        assert_eq!(TaskState::Pending.to_string(), "Pending");
        assert_eq!(TaskState::Running.to_string(), "Running");
        assert_eq!(TaskState::Waiting.to_string(), "Waiting");
        assert_eq!(TaskState::Completed.to_string(), "Completed");
    }

    #[test]
    fn test_default_policy_is_fifo() {
        assert_eq!(SchedulingPolicy::default(), SchedulingPolicy::Fifo);
    }

    #[test]
    fn test_task_handle_receives_output() {
        let (mut task, handle) = Task::new(async { 42 });
        assert!(!handle.is_complete());
        assert!(handle.try_get().is_none());

        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert!(task.poll(&mut cx).is_ready());

        assert!(handle.is_complete());
        assert_eq!(handle.try_get(), Some(42));
        assert_eq!(handle.take(), Some(42));
        assert!(handle.take().is_none());
        assert!(handle.is_complete());
    }

    #[test]
    fn test_task_handle_clone_shares_result() {
        let (mut task, handle) = Task::new(async { "done" });
        let other = handle.clone();

        let waker = futures::task::noop_waker();
        let _ = task.poll(&mut Context::from_waker(&waker));

        assert_eq!(other.take(), Some("done"));
        assert!(handle.take().is_none());
    }
}
