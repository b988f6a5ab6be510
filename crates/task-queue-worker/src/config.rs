use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use task_queue_broker::QueueConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub worker_id: Option<String>,
    pub concurrency: usize,
    /// How long each worker thread blocks in `dequeue` before re-checking for stop
    pub poll_interval_ms: u64,
    pub graceful_shutdown_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            worker_id: None,
            concurrency: 4,
            poll_interval_ms: 100,
            graceful_shutdown_timeout_secs: 60,
        }
    }
}

impl WorkerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: WorkerConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Never zero, so an idle worker blocks instead of spinning
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn graceful_shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.graceful_shutdown_timeout_secs)
    }

    pub fn generate_worker_id(&self) -> String {
        use std::process;
        use uuid::Uuid;

        if let Some(id) = &self.worker_id {
            return id.clone();
        }

        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());

        let pid = process::id();
        let uuid = Uuid::new_v4().simple().to_string();

        format!("{}-{}-{}", hostname, pid, &uuid[..8])
    }
}

/// Synthetic load driven by the `tq-worker` binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub producers: usize,
    pub tasks_per_producer: usize,
    /// Pause between submissions of one producer
    pub submit_interval_ms: u64,
    /// Simulated processing time per task
    pub work_ms: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        WorkloadConfig {
            producers: 2,
            tasks_per_producer: 1_000,
            submit_interval_ms: 0,
            work_ms: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
    pub json_logs: bool,
    pub print_metrics: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        MonitoringConfig {
            log_level: "info".to_string(),
            json_logs: false,
            print_metrics: false,
        }
    }
}

/// Full configuration document for the `tq-worker` pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub queue: QueueConfig,
    pub worker: WorkerConfig,
    pub workload: WorkloadConfig,
    pub monitoring: MonitoringConfig,
}

impl PipelineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_worker_id() {
        let named = WorkerConfig {
            worker_id: Some("ingest-1".to_string()),
            ..WorkerConfig::default()
        };
        assert_eq!(named.generate_worker_id(), "ingest-1");

        let generated = WorkerConfig::default().generate_worker_id();
        assert!(generated.contains(&std::process::id().to_string()));
        assert_ne!(generated, WorkerConfig::default().generate_worker_id());
    }

    #[test]
    fn test_poll_interval_never_zero() {
        let config = WorkerConfig {
            poll_interval_ms: 0,
            ..WorkerConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_pipeline_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "queue:\n  max_capacity: 64\nworker:\n  concurrency: 8\nworkload:\n  producers: 3\nmonitoring:\n  log_level: debug\n"
        )
        .unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.queue.max_capacity, 64);
        assert_eq!(config.queue.dequeue_timeout_ms, 100);
        assert_eq!(config.worker.concurrency, 8);
        assert_eq!(config.worker.poll_interval_ms, 100);
        assert_eq!(config.workload.producers, 3);
        assert_eq!(config.workload.tasks_per_producer, 1_000);
        assert_eq!(config.monitoring.log_level, "debug");
    }

    #[test]
    fn test_worker_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "concurrency: 2").unwrap();
        writeln!(file, "poll_interval_ms: 25").unwrap();

        let config = WorkerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.poll_interval(), Duration::from_millis(25));
        assert!(config.worker_id.is_none());
    }
}
