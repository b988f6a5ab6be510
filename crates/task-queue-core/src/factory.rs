//! Id and clock sources used to stamp new tasks.
//!
//! Producers build tasks through a [`TaskFactory`] instead of calling
//! `Uuid::new_v4()` / `Utc::now()` directly, so tests can swap in
//! deterministic sources.

use crate::{Priority, Task, TaskId, TaskPayload};
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Source of task identifiers
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> TaskId;
}

/// Source of creation timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Random UUID v4 strings
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> TaskId {
        Uuid::new_v4().to_string()
    }
}

/// `<prefix>-<n>` ids with n counting up from 1
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        SequentialIdGenerator {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> TaskId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that starts at a fixed instant and moves forward by `step` on every read
#[derive(Debug)]
pub struct SteppingClock {
    start: DateTime<Utc>,
    step: Duration,
    ticks: AtomicU64,
}

impl SteppingClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        SteppingClock {
            start,
            step,
            ticks: AtomicU64::new(0),
        }
    }

    /// A clock that always returns `instant`
    pub fn frozen(instant: DateTime<Utc>) -> Self {
        Self::new(instant, Duration::zero())
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        // Saturate; the clock never runs backwards
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed);
        self.start + self.step * i32::try_from(tick).unwrap_or(i32::MAX)
    }
}

/// Builds tasks with ids and timestamps from injected sources
#[derive(Clone)]
pub struct TaskFactory {
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl TaskFactory {
    pub fn new(ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        TaskFactory { ids, clock }
    }

    pub fn create(&self, priority: Priority, payload: TaskPayload) -> Task {
        self.create_typed(String::new(), priority, payload)
    }

    /// Like `create`, tagging the task for a specific handler
    pub fn create_typed(
        &self,
        task_type: impl Into<String>,
        priority: Priority,
        payload: TaskPayload,
    ) -> Task {
        Task {
            id: self.ids.next_id(),
            priority,
            task_type: task_type.into(),
            created_at: self.clock.now(),
            payload,
        }
    }
}

impl Default for TaskFactory {
    fn default() -> Self {
        TaskFactory::new(Arc::new(UuidGenerator), Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for TaskFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskFactory").finish_non_exhaustive()
    }
}
