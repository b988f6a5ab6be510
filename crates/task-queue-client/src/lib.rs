mod client;

pub use client::{BatchOutcome, TaskQueueClient};

use task_queue_core::{EnqueueError, QueueError, Task, TaskError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Task rejected: {0}")]
    Rejected(#[from] EnqueueError),

    #[error("Invalid task: {0}")]
    InvalidTask(#[from] TaskError),
}

impl ClientError {
    /// True when the queue pushed back (full or timed out). An HTTP front end
    /// maps this to 503; anything else is a 4xx or a stop signal.
    pub fn is_backpressure(&self) -> bool {
        match self {
            ClientError::Rejected(e) => e.reason.is_backpressure(),
            ClientError::InvalidTask(_) => false,
        }
    }

    /// Queue outcome behind a rejection
    pub fn queue_error(&self) -> Option<QueueError> {
        match self {
            ClientError::Rejected(e) => Some(e.reason),
            ClientError::InvalidTask(_) => None,
        }
    }

    /// Recover the task that was not inserted
    pub fn into_task(self) -> Option<Task> {
        match self {
            ClientError::Rejected(e) => Some(e.into_task()),
            ClientError::InvalidTask(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
