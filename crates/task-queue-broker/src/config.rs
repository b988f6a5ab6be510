use crate::queue::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Queue sizing and the default waits used by producers and consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of queued tasks (0 = unbounded)
    pub max_capacity: usize,

    /// How long a producer waits for space before giving up (0 = reject immediately)
    pub enqueue_timeout_ms: u64,

    /// How long a consumer waits for a task before re-polling
    pub dequeue_timeout_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            max_capacity: DEFAULT_CAPACITY,
            enqueue_timeout_ms: 0,
            dequeue_timeout_ms: 100,
        }
    }
}

impl QueueConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: QueueConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }

    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout_ms)
    }
}
