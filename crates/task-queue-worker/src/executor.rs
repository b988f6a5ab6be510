use crate::handler::{TaskHandler, TaskResult};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use task_queue_core::Task;
use tracing::{debug, error};

/// Outcome of running one task
#[derive(Debug)]
pub struct Execution {
    pub result: TaskResult,
    pub duration: Duration,
}

impl Execution {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs a handler against tasks with panic recovery and timing
#[derive(Clone)]
pub struct TaskExecutor {
    handler: Arc<dyn TaskHandler>,
}

impl TaskExecutor {
    pub fn new(handler: Arc<dyn TaskHandler>) -> Self {
        TaskExecutor { handler }
    }

    /// Execute a task. A panicking handler is reported as a failure.
    pub fn execute(&self, task: &Task) -> Execution {
        let start = Instant::now();
        debug!("Executing task {} ({})", task.id, task.priority);

        let result = match panic::catch_unwind(AssertUnwindSafe(|| self.handler.execute(task))) {
            Ok(Ok(output)) => {
                debug!("Task {} completed successfully", task.id);
                Ok(output)
            }
            Ok(Err(e)) => {
                error!("Task {} failed: {}", task.id, e);
                Err(e)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Task {} panicked: {}", task.id, message);
                Err(format!("Task panicked during execution: {}", message))
            }
        };

        Execution {
            result,
            duration: start.elapsed(),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
