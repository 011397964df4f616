//! Error types for the queue and the worker pool.

use std::fmt;

use crate::types::{Task, WorkerId};

/// Failure of a blocking dequeue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The queue is closed and holds no more tasks.
    #[error("queue is closed")]
    Closed,

    /// The deadline passed while the queue stayed open and empty.
    #[error("timed out waiting for a task")]
    Timeout,
}

/// A `put` on a closed queue. Hands the rejected task back to the producer.
#[derive(thiserror::Error)]
#[error("queue is closed")]
pub struct PutError {
    task: Task,
}

impl PutError {
    pub(crate) fn new(task: Task) -> Self {
        Self { task }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn into_task(self) -> Task {
        self.task
    }
}

impl fmt::Debug for PutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PutError")
            .field("kind", &self.task.kind)
            .field("id", &self.task.id)
            .finish()
    }
}

impl From<PutError> for QueueError {
    fn from(_: PutError) -> Self {
        QueueError::Closed
    }
}

pub type Result<T> = std::result::Result<T, PoolError>;

/// Failures surfaced by the pool and the command-line driver.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to spawn worker {id}: {source}")]
    Spawn {
        id: WorkerId,
        #[source]
        source: std::io::Error,
    },

    #[error("worker {0} panicked")]
    WorkerPanic(WorkerId),

    #[error("dispatch to worker {worker} failed: {source}")]
    Dispatch {
        worker: WorkerId,
        #[source]
        source: QueueError,
    },
}

impl PoolError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        PoolError::Config(msg.into())
    }
}
