use serde::{Deserialize, Serialize};
use serde_json::Value;
use task_queue_core::Priority;

/// Number of queued tasks in each priority class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityBreakdown {
    pub fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// Snapshot of a `TaskQueue`, consistent at the instant it was taken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub current_size: usize,

    /// 0 = unbounded
    pub capacity: usize,

    /// `current_size / capacity * 100`; `None` for an unbounded queue
    pub utilization: Option<f64>,

    pub priority_breakdown: PriorityBreakdown,

    /// Lifetime count of accepted tasks
    pub total_enqueued: u64,

    /// Lifetime count of tasks handed to consumers
    pub total_dequeued: u64,

    /// Lifetime count of tasks discarded by `clear`
    pub total_cleared: u64,

    pub is_shutdown: bool,
}

impl QueueStats {
    pub(crate) fn utilization_of(size: usize, capacity: usize) -> Option<f64> {
        if capacity == 0 {
            None
        } else {
            Some(size as f64 * 100.0 / capacity as f64)
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.capacity == 0
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
