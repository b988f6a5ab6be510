use crate::{Priority, Result, TaskError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Caller-supplied task identifier. Never deduplicated by the queue.
pub type TaskId = String;

/// Task payload (schema-less JSON tree, never inspected by the queue)
pub type TaskPayload = Value;

/// A unit of work moved from producers to consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier used for tracking and logs
    pub id: TaskId,

    /// Scheduling class
    pub priority: Priority,

    /// Handler key used by workers to pick a processor; empty when untyped
    #[serde(default, rename = "type")]
    pub task_type: String,

    /// When the task was built
    pub created_at: DateTime<Utc>,

    /// Opaque task data
    #[serde(default)]
    pub payload: TaskPayload,
}

impl Task {
    /// Create a task with an empty payload, stamped with the current time
    pub fn new(id: impl Into<TaskId>, priority: Priority) -> Self {
        Self::with_payload(id, priority, Value::Null)
    }

    /// Create a task carrying `payload`, stamped with the current time
    pub fn with_payload(id: impl Into<TaskId>, priority: Priority, payload: TaskPayload) -> Self {
        Task {
            id: id.into(),
            priority,
            task_type: String::new(),
            created_at: Utc::now(),
            payload,
        }
    }

    pub fn builder(id: impl Into<TaskId>) -> TaskBuilder {
        TaskBuilder::new(id)
    }

    /// Scheduling order: lower priority class first, then earlier `created_at`.
    ///
    /// `Ordering::Less` means `self` is served before `other`.
    pub fn rank_cmp(&self, other: &Task) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.created_at.cmp(&other.created_at))
    }

    /// Strict form of `rank_cmp`
    pub fn ranks_before(&self, other: &Task) -> bool {
        self.rank_cmp(other) == Ordering::Less
    }

    /// Encode as a JSON document
    pub fn to_json(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(TaskError::from)
    }

    /// Decode from a JSON document. An empty id is rejected.
    pub fn from_json(value: Value) -> Result<Self> {
        let task: Task = serde_json::from_value(value)?;
        task.validated()
    }

    /// Serialize task to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(TaskError::from)
    }

    /// Deserialize task from bytes. An empty id is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let task: Task = serde_json::from_slice(bytes)?;
        task.validated()
    }

    fn validated(self) -> Result<Self> {
        if self.id.is_empty() {
            return Err(TaskError::EmptyTaskId);
        }
        Ok(self)
    }
}

/// Builder for tasks that need an explicit timestamp or payload
pub struct TaskBuilder {
    id: TaskId,
    priority: Priority,
    task_type: String,
    created_at: Option<DateTime<Utc>>,
    payload: TaskPayload,
}

impl TaskBuilder {
    pub fn new(id: impl Into<TaskId>) -> Self {
        TaskBuilder {
            id: id.into(),
            priority: Priority::default(),
            task_type: String::new(),
            created_at: None,
            payload: Value::Null,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = task_type.into();
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn payload(mut self, payload: TaskPayload) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Result<Task> {
        Task {
            id: self.id,
            priority: self.priority,
            task_type: self.task_type,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            payload: self.payload,
        }
        .validated()
    }
}
