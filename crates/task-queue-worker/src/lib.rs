pub mod worker;
pub mod handler;
pub mod executor;
pub mod config;

pub use worker::{WorkerPool, WorkerStats};
pub use handler::{TaskHandler, TaskHandlerRegistry, TaskResult};
pub use executor::{Execution, TaskExecutor};
pub use config::{MonitoringConfig, PipelineConfig, WorkerConfig, WorkloadConfig};
