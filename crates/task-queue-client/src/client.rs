use crate::{ClientError, Result};
use std::sync::Arc;
use std::time::Duration;
use task_queue_broker::{QueueConfig, QueueMetrics, QueueStats, TaskQueue};
use task_queue_core::{Priority, Task, TaskFactory, TaskId, TaskPayload};
use tracing::{debug, warn};

/// Producer-side handle: builds tasks and hands them to a shared queue.
///
/// Rejections come back as `ClientError::Rejected` carrying the task, so the
/// caller can retry it or report backpressure upstream.
#[derive(Clone)]
pub struct TaskQueueClient {
    queue: Arc<TaskQueue>,
    factory: TaskFactory,
    enqueue_timeout: Duration,
    metrics: Option<Arc<QueueMetrics>>,
}

/// Result of `submit_batch`
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub accepted: Vec<TaskId>,
    pub rejected: Vec<ClientError>,
}

impl TaskQueueClient {
    /// Client that never waits for space and stamps tasks with UUIDs and wall-clock time
    pub fn new(queue: Arc<TaskQueue>) -> Self {
        TaskQueueClient {
            queue,
            factory: TaskFactory::default(),
            enqueue_timeout: Duration::ZERO,
            metrics: None,
        }
    }

    /// Client using the enqueue timeout from `config`
    pub fn with_config(queue: Arc<TaskQueue>, config: &QueueConfig) -> Self {
        Self::new(queue).enqueue_timeout(config.enqueue_timeout())
    }

    pub fn factory(mut self, factory: TaskFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn enqueue_timeout(mut self, timeout: Duration) -> Self {
        self.enqueue_timeout = timeout;
        self
    }

    pub fn metrics(mut self, metrics: Arc<QueueMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build a task from `payload` and submit it
    pub fn submit(&self, priority: Priority, payload: TaskPayload) -> Result<TaskId> {
        let task = self.factory.create(priority, payload);
        self.submit_task(task)
    }

    /// Build a task tagged with `task_type` and submit it
    pub fn submit_typed(
        &self,
        task_type: &str,
        priority: Priority,
        payload: TaskPayload,
    ) -> Result<TaskId> {
        let task = self.factory.create_typed(task_type, priority, payload);
        self.submit_task(task)
    }

    /// Submit a prepared task with the client's default timeout
    pub fn submit_task(&self, task: Task) -> Result<TaskId> {
        self.submit_task_with_timeout(task, self.enqueue_timeout)
    }

    pub fn submit_task_with_timeout(&self, task: Task, timeout: Duration) -> Result<TaskId> {
        let task_id = task.id.clone();
        let priority = task.priority;

        match self.queue.enqueue(task, timeout) {
            Ok(()) => {
                self.record("accepted");
                debug!("Submitted task {} ({})", task_id, priority);
                Ok(task_id)
            }
            Err(e) => {
                self.record(e.reason.as_str());
                warn!("Task {} ({}) rejected: {}", task_id, priority, e.reason);
                Err(ClientError::from(e))
            }
        }
    }

    /// Decode a JSON-encoded task (as received by an ingestion endpoint) and submit it
    pub fn submit_encoded(&self, bytes: &[u8]) -> Result<TaskId> {
        let task = Task::from_bytes(bytes)?;
        self.submit_task(task)
    }

    /// Submit tasks in order. Every task is attempted; failures are collected.
    pub fn submit_batch(&self, tasks: Vec<Task>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for task in tasks {
            match self.submit_task(task) {
                Ok(task_id) => outcome.accepted.push(task_id),
                Err(e) => outcome.rejected.push(e),
            }
        }

        outcome
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    fn record(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_submitted(outcome);
        }
    }
}
