use crate::stats::QueueStats;
use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use task_queue_core::Priority;

/// Prometheus metrics for a task queue and the threads around it.
///
/// The queue never touches these itself; producers and consumers record
/// outcomes, and whoever owns the queue copies `stats()` in periodically.
pub struct QueueMetrics {
    pub registry: Registry,

    // Queue depth
    pub queue_depth: IntGaugeVec,
    pub queue_capacity: IntGauge,
    pub queue_utilization: Gauge,

    // Task counters
    pub tasks_submitted: IntCounterVec,
    pub tasks_processed: IntCounterVec,

    // Processing duration
    pub task_processing_duration: HistogramVec,
}

impl QueueMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let queue_depth = IntGaugeVec::new(
            Opts::new("tq_queue_depth", "Queued tasks by priority class"),
            &["priority"],
        )?;
        registry.register(Box::new(queue_depth.clone()))?;

        let queue_capacity = IntGauge::new("tq_queue_capacity", "Queue capacity (0 = unbounded)")?;
        registry.register(Box::new(queue_capacity.clone()))?;

        let queue_utilization = Gauge::new(
            "tq_queue_utilization_percent",
            "Queue fill level in percent of capacity",
        )?;
        registry.register(Box::new(queue_utilization.clone()))?;

        let tasks_submitted = IntCounterVec::new(
            Opts::new("tq_tasks_submitted_total", "Enqueue attempts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(tasks_submitted.clone()))?;

        let tasks_processed = IntCounterVec::new(
            Opts::new("tq_tasks_processed_total", "Handled tasks by outcome and priority"),
            &["outcome", "priority"],
        )?;
        registry.register(Box::new(tasks_processed.clone()))?;

        let task_processing_duration = HistogramVec::new(
            HistogramOpts::new(
                "tq_task_processing_duration_seconds",
                "Task processing duration in seconds",
            ),
            &["priority"],
        )?;
        registry.register(Box::new(task_processing_duration.clone()))?;

        Ok(QueueMetrics {
            registry,
            queue_depth,
            queue_capacity,
            queue_utilization,
            tasks_submitted,
            tasks_processed,
            task_processing_duration,
        })
    }

    /// Copy a queue snapshot into the gauges
    pub fn record_stats(&self, stats: &QueueStats) {
        for priority in Priority::ALL {
            self.queue_depth
                .with_label_values(&[priority.label()])
                .set(stats.priority_breakdown.get(priority) as i64);
        }
        self.queue_capacity.set(stats.capacity as i64);
        self.queue_utilization.set(stats.utilization.unwrap_or(0.0));
    }

    /// Count an enqueue attempt ("accepted" or a `QueueError::as_str()` value)
    pub fn inc_submitted(&self, outcome: &str) {
        self.tasks_submitted.with_label_values(&[outcome]).inc();
    }

    /// Count a handled task and record how long the handler took
    pub fn observe_processed(&self, outcome: &str, priority: Priority, duration_secs: f64) {
        self.tasks_processed
            .with_label_values(&[outcome, priority.label()])
            .inc();
        self.task_processing_duration
            .with_label_values(&[priority.label()])
            .observe(duration_secs);
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
