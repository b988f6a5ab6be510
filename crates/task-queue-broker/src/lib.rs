pub mod queue;
pub mod stats;
pub mod config;
pub mod metrics;

pub use queue::{TaskQueue, DEFAULT_CAPACITY};
pub use stats::{PriorityBreakdown, QueueStats};
pub use config::QueueConfig;
pub use metrics::QueueMetrics;
