//! Per-actor background task bookkeeping.
//!
//! Commands that take a while (image searches, long computations, reminders)
//! run as detached tasks. [`TaskRegistry`] records each one under the actor
//! that started it so a "my running tasks" command can list them, and removes
//! the record as soon as the task ends.
//!
//! ## Lifecycle
//!
//! ```text
//! register() ──► entry pushed to actor bucket ──► tokio::spawn(wrapper)
//!                                                  │
//!       completed / cancelled / panicked / aborted │
//!                                                  ▼
//!                          Deregister guard dropped ──► entry removed
//!                                                  │
//!                                                  ▼
//!                                  TaskHandle::join() resolves
//! ```
//!
//! ## Rules
//! - The entry exists before the task can make progress.
//! - Removal is owned by a drop guard living inside the spawned unit, so it
//!   runs exactly once whatever way the unit ends.
//! - Removal happens before the outcome is observable through the handle.
//! - The operation's own result (including its errors) is passed through
//!   untouched.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

use aoi_core::{Actor, ActorId};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Produces a human-readable progress line for a running task.
pub type StatusFn = Arc<dyn Fn() -> String + Send + Sync>;

/// Identifier of a registered task, unique within one registry.
pub type TaskId = u64;

/// A snapshot of one running background task.
#[derive(Clone)]
pub struct BackgroundTask {
    id: TaskId,
    actor: Actor,
    status: StatusFn,
    created_at: Instant,
    created_wall: SystemTime,
}

impl BackgroundTask {
    /// Returns the task id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the actor that started the task.
    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Calls the task's status function.
    pub fn status(&self) -> String {
        (self.status)()
    }

    /// Returns when the task was registered.
    pub fn created_at(&self) -> SystemTime {
        self.created_wall
    }

    /// Returns how long the task has been running.
    pub fn elapsed(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl fmt::Debug for BackgroundTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundTask")
            .field("id", &self.id)
            .field("actor", &self.actor.id)
            .field("elapsed", &self.elapsed())
            .finish()
    }
}

/// How a background task ended.
#[derive(Debug)]
pub enum TaskOutcome<T> {
    /// The operation ran to completion and produced a value.
    Completed(T),
    /// The task was cancelled or aborted before completing.
    Cancelled,
    /// The operation panicked.
    Panicked(String),
}

impl<T> TaskOutcome<T> {
    /// Returns the value if the operation completed.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }

    /// Returns `true` if the task was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Caller-side handle to a registered task.
///
/// Dropping the handle does not stop the task.
pub struct TaskHandle<T> {
    id: TaskId,
    actor: ActorId,
    cancel: CancellationToken,
    join: JoinHandle<Option<T>>,
}

impl<T> TaskHandle<T> {
    /// Returns the task id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the id of the actor that owns the task.
    pub fn actor(&self) -> ActorId {
        self.actor
    }

    /// Requests cooperative cancellation.
    ///
    /// The operation is dropped at its next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Aborts the underlying tokio task.
    pub fn abort(&self) {
        self.join.abort();
    }

    /// Returns `true` once the task has finished and its entry is gone.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the task to end.
    pub async fn join(self) -> TaskOutcome<T> {
        match self.join.await {
            Ok(Some(value)) => TaskOutcome::Completed(value),
            Ok(None) => TaskOutcome::Cancelled,
            Err(e) if e.is_cancelled() => TaskOutcome::Cancelled,
            Err(e) => TaskOutcome::Panicked(e.to_string()),
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("actor", &self.actor)
            .field("finished", &self.is_finished())
            .finish()
    }
}

struct Entry {
    task: BackgroundTask,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Inner {
    buckets: Mutex<HashMap<ActorId, Vec<Entry>>>,
    next_id: AtomicU64,
}

impl Inner {
    /// Removes one entry. Missing entries are ignored.
    fn remove(&self, actor: ActorId, id: TaskId) {
        let mut buckets = self.buckets.lock();
        if let Some(bucket) = buckets.get_mut(&actor) {
            bucket.retain(|e| e.task.id != id);
            if bucket.is_empty() {
                buckets.remove(&actor);
            }
        }
    }
}

/// Removes its task's entry when dropped.
struct Deregister {
    inner: Arc<Inner>,
    actor: ActorId,
    id: TaskId,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        self.inner.remove(self.actor, self.id);
        trace!(task_id = self.id, actor = self.actor, "Background task deregistered");
    }
}

/// Registry of running background tasks, bucketed by actor.
///
/// Cloning is cheap; clones share the same buckets.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<Inner>,
}

impl TaskRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `operation` as a detached task owned by `actor`.
    ///
    /// The entry is visible through [`list_for`](Self::list_for) immediately
    /// and disappears when the operation finishes. `status` defaults to an
    /// empty line.
    ///
    /// Must be called from within a tokio runtime.
    pub fn register<F>(
        &self,
        actor: &Actor,
        operation: F,
        status: Option<StatusFn>,
    ) -> TaskHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();

        let task = BackgroundTask {
            id,
            actor: actor.clone(),
            status: status.unwrap_or_else(|| Arc::new(String::new)),
            created_at: Instant::now(),
            created_wall: SystemTime::now(),
        };

        self.inner
            .buckets
            .lock()
            .entry(actor.id)
            .or_default()
            .push(Entry {
                task,
                cancel: cancel.clone(),
            });

        let guard = Deregister {
            inner: Arc::clone(&self.inner),
            actor: actor.id,
            id,
        };
        let token = cancel.clone();

        let join = tokio::spawn(async move {
            let _guard = guard;
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                output = operation => Some(output),
            }
        });

        debug!(task_id = id, actor = actor.id, "Background task registered");

        TaskHandle {
            id,
            actor: actor.id,
            cancel,
            join,
        }
    }

    /// Returns the running tasks of `actor`, oldest first.
    pub fn list_for(&self, actor: ActorId) -> Vec<BackgroundTask> {
        self.inner
            .buckets
            .lock()
            .get(&actor)
            .map(|bucket| bucket.iter().map(|e| e.task.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns the total number of running tasks.
    pub fn len(&self) -> usize {
        self.inner.buckets.lock().values().map(Vec::len).sum()
    }

    /// Returns `true` if no task is running.
    pub fn is_empty(&self) -> bool {
        self.inner.buckets.lock().is_empty()
    }

    /// Requests cancellation of every running task.
    ///
    /// Entries are removed as each task observes the cancellation.
    pub fn cancel_all(&self) {
        let buckets = self.inner.buckets.lock();
        let mut count = 0usize;
        for entry in buckets.values().flatten() {
            entry.cancel.cancel();
            count += 1;
        }
        debug!(count, "Cancelling all background tasks");
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    fn actor(id: ActorId) -> Actor {
        Actor::new(id, format!("user{id}"), "0000")
    }

    #[tokio::test]
    async fn test_entry_visible_until_completion() {
        let registry = TaskRegistry::new();
        let alice = actor(1);
        let (tx, rx) = oneshot::channel::<u32>();

        let handle = registry.register(&alice, async move { rx.await.unwrap_or(0) }, None);

        let listed = registry.list_for(alice.id);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id(), handle.id());
        assert_eq!(listed[0].actor().id, alice.id);
        assert_eq!(listed[0].status(), "");

        tx.send(7).unwrap();
        assert_eq!(handle.join().await.completed(), Some(7));
        assert!(registry.list_for(alice.id).is_empty());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_operation_error_is_passed_through() {
        let registry = TaskRegistry::new();
        let alice = actor(1);

        let handle = registry.register(&alice, async { Err::<(), &str>("boom") }, None);

        match handle.join().await {
            TaskOutcome::Completed(result) => assert_eq!(result, Err("boom")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(registry.list_for(alice.id).is_empty());
    }

    #[tokio::test]
    async fn test_cancel_removes_entry() {
        let registry = TaskRegistry::new();
        let alice = actor(1);

        let handle = registry.register(&alice, std::future::pending::<()>(), None);
        assert_eq!(registry.len(), 1);

        handle.cancel();
        assert!(handle.join().await.is_cancelled());
        assert!(registry.list_for(alice.id).is_empty());
    }

    #[tokio::test]
    async fn test_abort_removes_entry() {
        let registry = TaskRegistry::new();
        let alice = actor(1);

        let handle = registry.register(&alice, std::future::pending::<()>(), None);
        handle.abort();

        assert!(handle.join().await.is_cancelled());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_panic_removes_entry() {
        let registry = TaskRegistry::new();
        let alice = actor(1);

        let handle = registry.register(
            &alice,
            async {
                panic!("operation failed");
            },
            None,
        );

        assert!(matches!(handle.join().await, TaskOutcome::Panicked(_)));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_completion_does_not_disturb_other_tasks() {
        let registry = TaskRegistry::new();
        let alice = actor(1);
        let bob = actor(2);

        let (tx_a1, rx_a1) = oneshot::channel::<()>();
        let (_tx_a2, rx_a2) = oneshot::channel::<()>();
        let (_tx_b, rx_b) = oneshot::channel::<()>();

        let a1 = registry.register(&alice, async move { rx_a1.await.ok() }, None);
        let a2 = registry.register(&alice, async move { rx_a2.await.ok() }, None);
        let b = registry.register(&bob, async move { rx_b.await.ok() }, None);

        tx_a1.send(()).unwrap();
        a1.join().await;

        let remaining: Vec<TaskId> = registry.list_for(alice.id).iter().map(|t| t.id()).collect();
        assert_eq!(remaining, vec![a2.id()]);
        assert_eq!(registry.list_for(bob.id).len(), 1);
        assert_eq!(registry.list_for(bob.id)[0].id(), b.id());

        registry.cancel_all();
        a2.join().await;
        b.join().await;
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_listing_keeps_insertion_order() {
        let registry = TaskRegistry::new();
        let alice = actor(1);

        let handles: Vec<_> = (0..5)
            .map(|_| registry.register(&alice, std::future::pending::<()>(), None))
            .collect();

        let listed: Vec<TaskId> = registry.list_for(alice.id).iter().map(|t| t.id()).collect();
        let expected: Vec<TaskId> = handles.iter().map(|h| h.id()).collect();
        assert_eq!(listed, expected);

        registry.cancel_all();
        for handle in handles {
            assert!(handle.join().await.is_cancelled());
        }
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_status_function_is_live() {
        let registry = TaskRegistry::new();
        let alice = actor(1);
        let progress = Arc::new(AtomicUsize::new(0));
        let status_progress = Arc::clone(&progress);

        let handle = registry.register(
            &alice,
            std::future::pending::<()>(),
            Some(Arc::new(move || {
                format!("{}/10 pages", status_progress.load(Ordering::SeqCst))
            })),
        );

        assert_eq!(registry.list_for(alice.id)[0].status(), "0/10 pages");
        progress.store(4, Ordering::SeqCst);
        assert_eq!(registry.list_for(alice.id)[0].status(), "4/10 pages");

        handle.cancel();
        handle.join().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_register_and_complete() {
        let registry = TaskRegistry::new();
        let alice = actor(1);

        let handles: Vec<_> = (0..200u64)
            .map(|i| {
                registry.register(
                    &alice,
                    async move {
                        tokio::task::yield_now().await;
                        i
                    },
                    None,
                )
            })
            .collect();

        let mut sum = 0;
        for handle in handles {
            sum += handle.join().await.completed().unwrap();
        }

        assert_eq!(sum, (0..200u64).sum::<u64>());
        assert!(registry.is_empty());
    }
}
