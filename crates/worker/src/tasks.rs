//! Detached background work.
//!
//! Strategies hand back background work (cache refreshes) as explicit
//! [`BackgroundTask`] values; the worker schedules them here. The host keeps
//! the process alive until [`TaskQueue::wait_idle`] returns.

use std::collections::HashMap;
use std::future::Future;
use std::pin::{Pin, pin};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::{Id, JoinError, JoinSet};

/// Result of one background task. Never an error for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum TaskOutcome {
    /// The partition entry was replaced with a fresh copy.
    Refreshed { task: String },
    /// A response arrived but was not cacheable.
    Skipped { task: String, reason: String },
    /// The network or the store failed; swallowed.
    Failed { task: String, reason: String },
}

impl TaskOutcome {
    pub fn task(&self) -> &str {
        match self {
            TaskOutcome::Refreshed { task } | TaskOutcome::Skipped { task, .. } | TaskOutcome::Failed { task, .. } => task,
        }
    }
}

/// A unit of work detached from the response it was created for.
pub struct BackgroundTask {
    label: String,
    future: Pin<Box<dyn Future<Output = TaskOutcome> + Send + 'static>>,
}

impl std::fmt::Debug for BackgroundTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTask").field("label", &self.label).finish_non_exhaustive()
    }
}

impl BackgroundTask {
    pub fn new(label: impl Into<String>, future: impl Future<Output = TaskOutcome> + Send + 'static) -> Self {
        Self { label: label.into(), future: Box::pin(future) }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[derive(Default)]
struct Inner {
    set: JoinSet<TaskOutcome>,
    labels: HashMap<Id, String>,
    /// Outcomes joined by `schedule`, handed out by the next `wait_idle`.
    finished: Vec<TaskOutcome>,
}

#[derive(Default)]
struct Shared {
    running: AtomicUsize,
    idle: Notify,
}

/// Held by a task until its future completes, panics included.
struct Running(Arc<Shared>);

impl Running {
    fn enter(shared: &Arc<Shared>) -> Self {
        shared.running.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(shared))
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        if self.0.running.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Runs background tasks concurrently and collects their outcomes.
///
/// Finished tasks are joined on the next `schedule`, so a long-lived queue
/// only holds tasks that are still running plus their small outcomes.
/// Any number of callers may wait in [`TaskQueue::wait_idle`] at once; each
/// outcome goes to exactly one of them and all of them return once the
/// queue is idle.
#[derive(Default)]
pub struct TaskQueue {
    inner: Mutex<Inner>,
    shared: Arc<Shared>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start `task` now. Must be called from within a tokio runtime.
    pub fn schedule(&self, task: BackgroundTask) {
        let mut guard = self.lock();
        let inner = &mut *guard;

        while let Some(joined) = inner.set.try_join_next_with_id() {
            let outcome = settle(&mut inner.labels, joined);
            inner.finished.push(outcome);
        }

        let running = Running::enter(&self.shared);
        let future = task.future;
        let handle = inner.set.spawn(async move {
            let _running = running;
            future.await
        });
        tracing::debug!(task = %task.label, "background task scheduled");
        inner.labels.insert(handle.id(), task.label);
    }

    /// Tasks whose future has not completed yet.
    pub fn pending(&self) -> usize {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Join every scheduled task, including ones scheduled while waiting.
    pub async fn wait_idle(&self) -> Vec<TaskOutcome> {
        let mut outcomes = Vec::new();

        loop {
            let mut idle = pin!(self.shared.idle.notified());
            idle.as_mut().enable();

            let (mut set, mut labels) = {
                let mut inner = self.lock();
                outcomes.append(&mut inner.finished);
                if inner.set.is_empty() && self.pending() == 0 {
                    break;
                }
                (std::mem::take(&mut inner.set), std::mem::take(&mut inner.labels))
            };

            // Another waiter is joining the rest.
            if set.is_empty() {
                idle.await;
                continue;
            }

            while let Some(joined) = set.join_next_with_id().await {
                outcomes.push(settle(&mut labels, joined));
            }
        }

        outcomes
    }
}

fn settle(labels: &mut HashMap<Id, String>, joined: Result<(Id, TaskOutcome), JoinError>) -> TaskOutcome {
    match joined {
        Ok((id, outcome)) => {
            labels.remove(&id);
            tracing::debug!(task = %outcome.task(), ?outcome, "background task finished");
            outcome
        }
        Err(e) => {
            let task = labels.remove(&e.id()).unwrap_or_default();
            tracing::warn!(task = %task, error = %e, "background task aborted");
            TaskOutcome::Failed { task, reason: e.to_string() }
        }
    }
}
