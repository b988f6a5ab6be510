use crate::Task;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Invalid priority value: {0}")]
    InvalidPriority(u8),

    #[error("Unknown priority name: {0}")]
    UnknownPriority(String),

    #[error("Task id must not be empty")]
    EmptyTaskId,

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TaskError>;

/// Outcome of a queue operation that did not move a task.
///
/// All variants are recoverable; the caller decides whether to retry,
/// drop or stop.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueError {
    /// Queue at capacity and the caller asked not to wait
    #[error("Queue is full")]
    RejectedFull,

    /// The full wait elapsed without success
    #[error("Timed out waiting on queue")]
    TimedOut,

    /// Queue no longer accepts work, or is drained after shutdown
    #[error("Queue is shut down")]
    ShutDown,

    /// Non-blocking dequeue found no task
    #[error("Queue is empty")]
    Empty,
}

impl QueueError {
    /// True for outcomes a producer should report upstream as backpressure
    pub fn is_backpressure(&self) -> bool {
        matches!(self, QueueError::RejectedFull | QueueError::TimedOut)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueError::RejectedFull => "rejected_full",
            QueueError::TimedOut => "timed_out",
            QueueError::ShutDown => "shut_down",
            QueueError::Empty => "empty",
        }
    }
}

/// A failed enqueue. The task was not inserted and is handed back.
#[derive(Error, Debug)]
#[error("Failed to enqueue task {}: {reason}", .task.id)]
pub struct EnqueueError {
    pub reason: QueueError,
    task: Box<Task>,
}

impl EnqueueError {
    pub fn new(reason: QueueError, task: Task) -> Self {
        EnqueueError {
            reason,
            task: Box::new(task),
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Take the rejected task back, e.g. to retry it
    pub fn into_task(self) -> Task {
        *self.task
    }
}
