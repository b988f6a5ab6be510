use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use task_queue_core::Task;

/// Result type for task handlers
pub type TaskResult = Result<Value, String>;

/// Trait for task handlers. Called from worker threads, so it must be shareable.
pub trait TaskHandler: Send + Sync {
    /// Process the task and return its output
    fn execute(&self, task: &Task) -> TaskResult;
}

impl<F> TaskHandler for F
where
    F: Fn(&Task) -> TaskResult + Send + Sync,
{
    fn execute(&self, task: &Task) -> TaskResult {
        self(task)
    }
}

/// Registry of task handlers by task type.
///
/// Itself a `TaskHandler`: each task goes to the handler registered for its
/// `task_type`, or to the fallback when none matches.
#[derive(Default)]
pub struct TaskHandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn TaskHandler>>>,
    fallback: Option<Arc<dyn TaskHandler>>,
}

impl TaskHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler for tasks whose type has no registration (including untyped tasks)
    pub fn with_fallback<H: TaskHandler + 'static>(mut self, handler: H) -> Self {
        self.fallback = Some(Arc::new(handler));
        self
    }

    /// Register a task handler for a specific task type, replacing any previous one
    pub fn register<H: TaskHandler + 'static>(&self, task_type: impl Into<String>, handler: H) {
        self.handlers.write().insert(task_type.into(), Arc::new(handler));
    }

    pub fn get(&self, task_type: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.read().get(task_type).cloned()
    }

    pub fn has_handler(&self, task_type: &str) -> bool {
        self.handlers.read().contains_key(task_type)
    }

    /// Registered task types, sorted
    pub fn task_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.read().keys().cloned().collect();
        types.sort();
        types
    }
}

impl TaskHandler for TaskHandlerRegistry {
    fn execute(&self, task: &Task) -> TaskResult {
        // Clone the Arc so the lock is not held while the handler runs
        let handler = self.get(&task.task_type).or_else(|| self.fallback.clone());

        match handler {
            Some(handler) => handler.execute(task),
            None => Err(format!(
                "No handler registered for task type '{}' (task {})",
                task.task_type, task.id
            )),
        }
    }
}

/// Example task handler that just echoes the payload
pub struct EchoHandler;

impl TaskHandler for EchoHandler {
    fn execute(&self, task: &Task) -> TaskResult {
        Ok(task.payload.clone())
    }
}

/// Example task handler that simulates work
pub struct SleepHandler {
    duration_ms: u64,
}

impl SleepHandler {
    pub fn new(duration_ms: u64) -> Self {
        SleepHandler { duration_ms }
    }
}

impl TaskHandler for SleepHandler {
    fn execute(&self, task: &Task) -> TaskResult {
        std::thread::sleep(Duration::from_millis(self.duration_ms));
        Ok(task.payload.clone())
    }
}

/// Summarises a JSON object payload; anything else is an error
pub struct JsonProcessorHandler;

impl TaskHandler for JsonProcessorHandler {
    fn execute(&self, task: &Task) -> TaskResult {
        let obj = task
            .payload
            .as_object()
            .ok_or_else(|| format!("Expected JSON object payload in task {}", task.id))?;

        Ok(json!({
            "task_id": task.id,
            "priority": task.priority.as_str(),
            "key_count": obj.len(),
            "original": task.payload,
        }))
    }
}
