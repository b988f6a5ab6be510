use crate::config::WorkerConfig;
use crate::executor::TaskExecutor;
use crate::handler::TaskHandler;
use task_queue_broker::{QueueMetrics, TaskQueue};
use task_queue_core::{QueueError, Task};

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Counters shared by every worker thread of a pool
#[derive(Default)]
struct WorkerCounters {
    processed: AtomicU64,
    failed: AtomicU64,
    active: AtomicUsize,
}

/// Snapshot of a pool's progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerStats {
    /// Tasks whose handler returned Ok
    pub processed: u64,
    /// Tasks whose handler returned Err or panicked
    pub failed: u64,
    /// Tasks being handled right now
    pub active: usize,
}

/// Everything one worker thread needs
struct WorkerContext {
    name: String,
    queue: Arc<TaskQueue>,
    executor: TaskExecutor,
    poll_interval: Duration,
    stop: Arc<AtomicBool>,
    counters: Arc<WorkerCounters>,
    metrics: Option<Arc<QueueMetrics>>,
}

impl WorkerContext {
    fn run(self) {
        debug!("Worker {} started", self.name);

        loop {
            if self.stop.load(Ordering::SeqCst) {
                debug!("Worker {} stopping", self.name);
                break;
            }

            match self.queue.dequeue(self.poll_interval) {
                Ok(task) => self.execute_task(task),
                Err(QueueError::ShutDown) => {
                    debug!("Worker {} saw queue shutdown", self.name);
                    break;
                }
                // Idle: poll again
                Err(_) => continue,
            }
        }
    }

    fn execute_task(&self, task: Task) {
        self.counters.active.fetch_add(1, Ordering::SeqCst);

        let execution = self.executor.execute(&task);
        let outcome = if execution.is_success() {
            self.counters.processed.fetch_add(1, Ordering::SeqCst);
            "ok"
        } else {
            self.counters.failed.fetch_add(1, Ordering::SeqCst);
            "failed"
        };

        if let Some(metrics) = &self.metrics {
            metrics.observe_processed(outcome, task.priority, execution.duration.as_secs_f64());
        }

        self.counters.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fixed set of OS threads draining a shared `TaskQueue`
pub struct WorkerPool {
    worker_id: String,
    queue: Arc<TaskQueue>,
    stop: Arc<AtomicBool>,
    counters: Arc<WorkerCounters>,
    handles: Vec<JoinHandle<()>>,
    graceful_shutdown_timeout: Duration,
}

impl WorkerPool {
    /// Spawn `config.concurrency` worker threads (at least one)
    pub fn start(
        queue: Arc<TaskQueue>,
        handler: Arc<dyn TaskHandler>,
        config: &WorkerConfig,
        metrics: Option<Arc<QueueMetrics>>,
    ) -> std::io::Result<Self> {
        let worker_id = config.generate_worker_id();
        let concurrency = config.concurrency.max(1);
        let executor = TaskExecutor::new(handler);
        let stop = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(WorkerCounters::default());

        info!("Starting worker pool {} (concurrency: {})", worker_id, concurrency);

        let mut pool = WorkerPool {
            worker_id,
            queue,
            stop,
            counters,
            handles: Vec::with_capacity(concurrency),
            graceful_shutdown_timeout: config.graceful_shutdown_timeout(),
        };

        for index in 0..concurrency {
            let context = WorkerContext {
                name: format!("{}-{}", pool.worker_id, index),
                queue: pool.queue.clone(),
                executor: executor.clone(),
                poll_interval: config.poll_interval(),
                stop: pool.stop.clone(),
                counters: pool.counters.clone(),
                metrics: metrics.clone(),
            };

            let spawned = thread::Builder::new()
                .name(context.name.clone())
                .spawn(move || context.run());

            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(e) => {
                    // Release the threads already running before reporting
                    pool.stop.store(true, Ordering::SeqCst);
                    pool.join_all();
                    return Err(e);
                }
            }
        }

        Ok(pool)
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn concurrency(&self) -> usize {
        self.handles.len()
    }

    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            processed: self.counters.processed.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
            active: self.counters.active.load(Ordering::SeqCst),
        }
    }

    /// Shut the queue down, let the workers drain what is left, then join them.
    ///
    /// Threads still busy after the graceful shutdown timeout are detached.
    pub fn shutdown(mut self) -> WorkerStats {
        info!("Worker pool {} shutting down, draining queue", self.worker_id);
        self.queue.shutdown();
        self.join_all();
        self.stats()
    }

    /// Stop the workers without shutting the queue down.
    ///
    /// Each thread finishes its current task and exits within one poll
    /// interval; queued tasks stay in the queue.
    pub fn stop(mut self) -> WorkerStats {
        info!("Worker pool {} stopping", self.worker_id);
        self.stop.store(true, Ordering::SeqCst);
        self.join_all();
        self.stats()
    }

    fn join_all(&mut self) {
        // None: the timeout is too large to represent, wait indefinitely
        let deadline = Instant::now().checked_add(self.graceful_shutdown_timeout);

        while self.handles.iter().any(|h| !h.is_finished()) {
            if matches!(deadline, Some(deadline) if Instant::now() >= deadline) {
                let active = self.counters.active.load(Ordering::SeqCst);
                warn!(
                    "Shutdown deadline exceeded, detaching workers with {} tasks still active",
                    active
                );
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        for handle in self.handles.drain(..) {
            if !handle.is_finished() {
                continue;
            }
            if handle.join().is_err() {
                warn!("Worker thread of pool {} panicked", self.worker_id);
            }
        }

        info!("Worker pool {} stopped", self.worker_id);
    }
}

impl Drop for WorkerPool {
    /// A pool dropped without `shutdown` or `stop` stops its threads and
    /// leaves the queue open.
    fn drop(&mut self) {
        if self.handles.is_empty() {
            return;
        }

        warn!("Worker pool {} dropped while running, stopping workers", self.worker_id);
        self.stop.store(true, Ordering::SeqCst);
        self.join_all();
    }
}
