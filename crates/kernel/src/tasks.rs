//! Channel for async work started by systems.
//!
//! A system cannot await, so it queues a future instead. The future resolves
//! to a [`WorldCommand`] that is applied to the world when the host drives the
//! queue with [`World::run_tasks`]. Nothing in `step` or `render` ever waits
//! on the queue.

use crate::error::{BoxError, WorldError};
use crate::world::World;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Deferred mutation produced by a finished task.
pub type WorldCommand = Box<dyn FnOnce(&mut World) -> Result<(), WorldError>>;

type TaskFuture = Pin<Box<dyn Future<Output = Result<WorldCommand, BoxError>>>>;

/// Box a closure as a [`WorldCommand`].
pub fn command<F>(apply: F) -> WorldCommand
where
    F: FnOnce(&mut World) -> Result<(), WorldError> + 'static,
{
    Box::new(apply)
}

struct PendingTask {
    label: String,
    future: TaskFuture,
}

#[derive(Default)]
pub(crate) struct TaskQueue {
    pending: VecDeque<PendingTask>,
}

impl TaskQueue {
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.pending.iter().map(|t| &t.label))
            .finish()
    }
}

impl World {
    /// Queue `task`. It is not polled until [`World::run_tasks`].
    pub fn spawn_task<F>(&mut self, label: impl Into<String>, task: F)
    where
        F: Future<Output = Result<WorldCommand, BoxError>> + 'static,
    {
        let label = label.into();
        tracing::debug!(task = %label, "task queued");
        self.tasks.pending.push_back(PendingTask {
            label,
            future: Box::pin(task),
        });
    }

    /// Number of queued tasks.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Await every queued task in spawn order and apply the resulting
    /// commands. Returns how many tasks completed.
    ///
    /// Tasks queued while this runs (by commands) stay queued for the next
    /// call. On the first failure the unfinished tasks are put back and the
    /// error is returned.
    pub async fn run_tasks(&mut self) -> Result<usize, WorldError> {
        let mut batch = std::mem::take(&mut self.tasks.pending);
        let mut completed = 0;
        while let Some(PendingTask { label, future }) = batch.pop_front() {
            let outcome = match future.await {
                Ok(apply) => apply(&mut *self),
                Err(source) => Err(WorldError::Task {
                    label: label.clone(),
                    source,
                }),
            };
            if let Err(err) = outcome {
                tracing::warn!(task = %label, error = %err, "task failed");
                batch.append(&mut self.tasks.pending);
                self.tasks.pending = batch;
                return Err(err);
            }
            tracing::trace!(task = %label, "task applied");
            completed += 1;
        }
        Ok(completed)
    }
}
