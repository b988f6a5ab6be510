use clap::Parser;
use comfy_table::{presets::UTF8_FULL, Table};
use rand::Rng;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use task_queue_broker::{QueueMetrics, QueueStats, TaskQueue};
use task_queue_client::TaskQueueClient;
use task_queue_core::Priority;
use task_queue_worker::handler::{JsonProcessorHandler, SleepHandler};
use task_queue_worker::{PipelineConfig, TaskHandlerRegistry, WorkerPool, WorkerStats};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tq-worker")]
#[command(about = "Run producers and a worker pool against an in-process priority queue", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Queue capacity (0 = unbounded)
    #[arg(long)]
    capacity: Option<usize>,

    /// Number of worker threads
    #[arg(short = 'w', long)]
    concurrency: Option<usize>,

    /// Number of producer threads
    #[arg(short, long)]
    producers: Option<usize>,

    /// Tasks submitted by each producer
    #[arg(short, long)]
    tasks: Option<usize>,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    print_metrics: bool,

    /// Output format for the final report (json, yaml, table)
    #[arg(short, long, default_value = "table")]
    format: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    // Override with CLI args
    if let Some(capacity) = args.capacity {
        config.queue.max_capacity = capacity;
    }
    if let Some(concurrency) = args.concurrency {
        config.worker.concurrency = concurrency;
    }
    if let Some(producers) = args.producers {
        config.workload.producers = producers;
    }
    if let Some(tasks) = args.tasks {
        config.workload.tasks_per_producer = tasks;
    }
    if args.print_metrics {
        config.monitoring.print_metrics = true;
    }

    init_tracing(&config);

    tracing::info!("Starting pipeline with config: {:?}", config);

    let queue = Arc::new(TaskQueue::with_config(&config.queue));
    let metrics = Arc::new(QueueMetrics::new()?);

    let handlers = TaskHandlerRegistry::new().with_fallback(SleepHandler::new(config.workload.work_ms));
    handlers.register("telemetry", SleepHandler::new(config.workload.work_ms));
    handlers.register("summary", JsonProcessorHandler);

    let pool = WorkerPool::start(
        queue.clone(),
        Arc::new(handlers),
        &config.worker,
        Some(metrics.clone()),
    )?;

    let client = TaskQueueClient::with_config(queue.clone(), &config.queue).metrics(metrics.clone());
    let rejected = Arc::new(AtomicU64::new(0));
    let started = Instant::now();

    let producers = (0..config.workload.producers)
        .map(|index| {
            let client = client.clone();
            let rejected = rejected.clone();
            let workload = config.workload.clone();

            thread::Builder::new()
                .name(format!("producer-{}", index))
                .spawn(move || {
                    let mut rng = rand::thread_rng();
                    let interval = Duration::from_millis(workload.submit_interval_ms);

                    for seq in 0..workload.tasks_per_producer {
                        let payload = json!({
                            "device_id": format!("sensor-{:03}", rng.gen_range(0..100)),
                            "temperature": rng.gen_range(15.0..35.0),
                            "producer": index,
                            "seq": seq,
                        });

                        let task_type = if rng.gen_bool(0.2) { "summary" } else { "telemetry" };

                        if let Err(e) = client.submit_typed(task_type, random_priority(&mut rng), payload) {
                            if !e.is_backpressure() {
                                tracing::warn!("Producer {} stopping: {}", index, e);
                                break;
                            }
                            rejected.fetch_add(1, Ordering::Relaxed);
                        }

                        if !interval.is_zero() {
                            thread::sleep(interval);
                        }
                    }
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    for producer in producers {
        if producer.join().is_err() {
            tracing::error!("Producer thread panicked");
        }
    }
    tracing::info!("Producers finished after {:?}", started.elapsed());

    let worker_stats = pool.shutdown();
    let queue_stats = queue.stats();
    metrics.record_stats(&queue_stats);

    tracing::info!(
        "Pipeline finished in {:?}: {} processed, {} failed, {} rejected",
        started.elapsed(),
        worker_stats.processed,
        worker_stats.failed,
        rejected.load(Ordering::Relaxed)
    );

    print_report(
        &args.format,
        &queue_stats,
        &worker_stats,
        rejected.load(Ordering::Relaxed),
        &metrics,
    )?;

    if config.monitoring.print_metrics {
        println!("{}", metrics.render()?);
    }

    Ok(())
}

fn init_tracing(config: &PipelineConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.monitoring.log_level.as_str().into());
    let registry = tracing_subscriber::registry().with(filter);

    if config.monitoring.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}

/// Roughly 10% high, 60% medium, 30% low
fn random_priority(rng: &mut impl Rng) -> Priority {
    match rng.gen_range(0..10) {
        0 => Priority::High,
        1..=6 => Priority::Medium,
        _ => Priority::Low,
    }
}

fn print_report(
    format: &str,
    queue_stats: &QueueStats,
    worker_stats: &WorkerStats,
    rejected: u64,
    metrics: &QueueMetrics,
) -> anyhow::Result<()> {
    let report = json!({
        "queue": queue_stats,
        "workers": {
            "processed": worker_stats.processed,
            "failed": worker_stats.failed,
        },
        "rejected": rejected,
    });

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "yaml" => println!("{}", serde_yaml::to_string(&report)?),
        _ => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Priority", "Processed", "Failed", "Left in queue"]);
            for priority in Priority::ALL {
                let processed = metrics
                    .tasks_processed
                    .with_label_values(&["ok", priority.label()])
                    .get();
                let failed = metrics
                    .tasks_processed
                    .with_label_values(&["failed", priority.label()])
                    .get();
                table.add_row(vec![
                    priority.as_str().to_string(),
                    processed.to_string(),
                    failed.to_string(),
                    queue_stats.priority_breakdown.get(priority).to_string(),
                ]);
            }
            println!("{table}");
            println!(
                "Accepted: {}  Rejected: {}  Capacity: {}",
                queue_stats.total_enqueued, rejected, queue_stats.capacity
            );
        }
    }

    Ok(())
}
