use crate::config::QueueConfig;
use crate::stats::{PriorityBreakdown, QueueStats};
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};
use task_queue_core::{EnqueueError, Priority, QueueError, Task};

/// Capacity used by `TaskQueue::default()`
pub const DEFAULT_CAPACITY: usize = 10_000;

/// A task wrapper for heap ordering.
///
/// `seq` is assigned under the queue lock at insertion time and replaces the
/// wall-clock `created_at` as the FIFO tie-break.
struct QueuedTask {
    seq: u64,
    task: Task,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: the greatest element is served first.
        // Lower priority class wins, then lower sequence number (FIFO).
        other
            .task
            .priority
            .cmp(&self.task.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Everything the mutex protects
struct QueueState {
    heap: BinaryHeap<QueuedTask>,
    next_seq: u64,
    depth: [usize; Priority::COUNT],
    total_enqueued: u64,
    total_dequeued: u64,
    total_cleared: u64,
    shutdown: bool,
}

impl QueueState {
    fn new() -> Self {
        QueueState {
            heap: BinaryHeap::new(),
            next_seq: 0,
            depth: [0; Priority::COUNT],
            total_enqueued: 0,
            total_dequeued: 0,
            total_cleared: 0,
            shutdown: false,
        }
    }

    fn has_room(&self, max_capacity: usize) -> bool {
        max_capacity == 0 || self.heap.len() < max_capacity
    }

    fn push(&mut self, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.depth[task.priority.index()] += 1;
        self.total_enqueued += 1;
        self.heap.push(QueuedTask { seq, task });
    }

    fn pop(&mut self) -> Option<Task> {
        let QueuedTask { task, .. } = self.heap.pop()?;
        self.depth[task.priority.index()] -= 1;
        self.total_dequeued += 1;
        Some(task)
    }
}

/// How long a blocking call may wait
#[derive(Clone, Copy)]
enum Deadline {
    Immediate,
    At(Instant),
    Never,
}

impl Deadline {
    fn after(timeout: Duration) -> Self {
        if timeout.is_zero() {
            return Deadline::Immediate;
        }
        match Instant::now().checked_add(timeout) {
            Some(at) => Deadline::At(at),
            None => Deadline::Never,
        }
    }
}

/// Bounded, thread-safe priority queue handing tasks from producers to consumers.
///
/// One mutex guards the heap and its counters. `not_empty` is signalled once per
/// insertion, `not_full` once per removal and broadcast on `clear`. Both are
/// broadcast on shutdown.
///
/// A capacity of 0 means unbounded.
pub struct TaskQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    max_capacity: usize,
}

impl TaskQueue {
    pub fn new(max_capacity: usize) -> Self {
        TaskQueue {
            state: Mutex::new(QueueState::new()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            max_capacity,
        }
    }

    pub fn with_config(config: &QueueConfig) -> Self {
        Self::new(config.max_capacity)
    }

    /// Insert a task, waiting up to `timeout` for space if the queue is full.
    ///
    /// A zero timeout never waits. On failure the task is returned inside the
    /// error and was not inserted:
    /// - `ShutDown` if the queue is (or becomes) shut down
    /// - `RejectedFull` if full and `timeout` is zero
    /// - `TimedOut` if still full when the timeout elapses
    pub fn enqueue(&self, task: Task, timeout: Duration) -> Result<(), EnqueueError> {
        let deadline = Deadline::after(timeout);
        let mut state = self.state.lock();
        let mut expired = false;

        loop {
            if state.shutdown {
                return Err(EnqueueError::new(QueueError::ShutDown, task));
            }

            if state.has_room(self.max_capacity) {
                state.push(task);
                self.not_empty.notify_one();
                return Ok(());
            }

            match deadline {
                Deadline::Immediate => {
                    return Err(EnqueueError::new(QueueError::RejectedFull, task));
                }
                _ if expired => {
                    return Err(EnqueueError::new(QueueError::TimedOut, task));
                }
                Deadline::At(at) => {
                    expired = self.not_full.wait_until(&mut state, at).timed_out();
                }
                Deadline::Never => self.not_full.wait(&mut state),
            }
        }
    }

    /// Non-blocking `enqueue`
    pub fn try_enqueue(&self, task: Task) -> Result<(), EnqueueError> {
        self.enqueue(task, Duration::ZERO)
    }

    /// Remove the highest-ranked task, waiting up to `timeout` for one to arrive.
    ///
    /// After shutdown the remaining tasks are still handed out; once drained
    /// the call returns `ShutDown` without waiting. Otherwise an empty queue
    /// yields `Empty` for a zero timeout and `TimedOut` when the wait elapses.
    pub fn dequeue(&self, timeout: Duration) -> Result<Task, QueueError> {
        let deadline = Deadline::after(timeout);
        let mut state = self.state.lock();
        let mut expired = false;

        loop {
            if let Some(task) = state.pop() {
                self.not_full.notify_one();
                return Ok(task);
            }

            if state.shutdown {
                return Err(QueueError::ShutDown);
            }

            match deadline {
                Deadline::Immediate => return Err(QueueError::Empty),
                _ if expired => return Err(QueueError::TimedOut),
                Deadline::At(at) => {
                    expired = self.not_empty.wait_until(&mut state, at).timed_out();
                }
                Deadline::Never => self.not_empty.wait(&mut state),
            }
        }
    }

    /// Non-blocking `dequeue`
    pub fn try_dequeue(&self) -> Result<Task, QueueError> {
        self.dequeue(Duration::ZERO)
    }

    /// Copy of the task `dequeue` would return right now.
    ///
    /// Advisory only: another consumer may take it before the caller acts.
    pub fn peek(&self) -> Option<Task> {
        let state = self.state.lock();
        state.heap.peek().map(|queued| queued.task.clone())
    }

    pub fn size(&self) -> usize {
        self.state.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().heap.is_empty()
    }

    /// Always false for an unbounded queue
    pub fn is_full(&self) -> bool {
        !self.state.lock().has_room(self.max_capacity)
    }

    /// Maximum number of queued tasks (0 = unbounded)
    pub fn capacity(&self) -> usize {
        self.max_capacity
    }

    /// Discard every queued task and wake all blocked producers.
    ///
    /// Returns how many tasks were dropped. Shutdown state is left alone.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.heap.len();

        state.heap.clear();
        state.depth = [0; Priority::COUNT];
        state.total_cleared += dropped as u64;

        self.not_full.notify_all();
        dropped
    }

    /// Stop accepting work and release every waiting thread.
    ///
    /// Queued tasks stay available to `dequeue` until drained. Calling this
    /// more than once has no further effect.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        drop(state);

        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Point-in-time summary taken under the lock
    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        self.snapshot(&state)
    }

    fn snapshot(&self, state: &QueueState) -> QueueStats {
        QueueStats {
            current_size: state.heap.len(),
            capacity: self.max_capacity,
            utilization: QueueStats::utilization_of(state.heap.len(), self.max_capacity),
            priority_breakdown: PriorityBreakdown {
                high: state.depth[Priority::High.index()],
                medium: state.depth[Priority::Medium.index()],
                low: state.depth[Priority::Low.index()],
            },
            total_enqueued: state.total_enqueued,
            total_dequeued: state.total_dequeued,
            total_cleared: state.total_cleared,
            is_shutdown: state.shutdown,
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    fn task(id: &str, priority: Priority) -> Task {
        Task::new(id, priority)
    }

    #[test]
    fn test_new_queue() {
        let queue = TaskQueue::default();
        assert_eq!(queue.size(), 0);
        assert!(queue.is_empty());
        assert!(!queue.is_full());
        assert_eq!(queue.capacity(), DEFAULT_CAPACITY);
        assert!(!queue.is_shutdown());

        assert_eq!(TaskQueue::new(100).capacity(), 100);
    }

    #[test]
    fn test_enqueue_dequeue() {
        let queue = TaskQueue::new(10);
        let task = Task::with_payload("task-001", Priority::Medium, json!({"device_id": "sensor-001"}));

        queue.try_enqueue(task).unwrap();
        assert_eq!(queue.size(), 1);

        let dequeued = queue.try_dequeue().unwrap();
        assert_eq!(dequeued.id, "task-001");
        assert_eq!(dequeued.priority, Priority::Medium);
        assert_eq!(dequeued.payload["device_id"], "sensor-001");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_empty() {
        let queue = TaskQueue::new(10);
        assert_eq!(queue.try_dequeue().unwrap_err(), QueueError::Empty);
        assert!(queue.peek().is_none());
    }

    #[test]
    fn test_peek_without_removal() {
        let queue = TaskQueue::new(10);
        queue.try_enqueue(task("low", Priority::Low)).unwrap();
        queue.try_enqueue(task("high", Priority::High)).unwrap();

        assert_eq!(queue.peek().unwrap().id, "high");
        assert_eq!(queue.size(), 2);
        assert_eq!(queue.try_dequeue().unwrap().id, "high");
        assert_eq!(queue.peek().unwrap().id, "low");
    }

    #[test]
    fn test_mixed_priorities_scenario() {
        let queue = TaskQueue::new(3);

        queue.try_enqueue(task("A", Priority::Low)).unwrap();
        queue.try_enqueue(task("B", Priority::High)).unwrap();
        queue.try_enqueue(task("C", Priority::Medium)).unwrap();

        assert_eq!(queue.try_dequeue().unwrap().id, "B");
        assert_eq!(queue.try_dequeue().unwrap().id, "C");
        assert_eq!(queue.try_dequeue().unwrap().id, "A");
        assert_eq!(queue.try_dequeue().unwrap_err(), QueueError::Empty);
    }

    #[test]
    fn test_single_slot_scenario() {
        let queue = TaskQueue::new(1);

        queue.try_enqueue(task("A", Priority::Medium)).unwrap();

        let err = queue.try_enqueue(task("B", Priority::Medium)).unwrap_err();
        assert_eq!(err.reason, QueueError::RejectedFull);
        let b = err.into_task();
        assert_eq!(b.id, "B");

        assert_eq!(queue.try_dequeue().unwrap().id, "A");
        queue.try_enqueue(b).unwrap();
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn test_fifo_with_identical_timestamps() {
        // Same created_at on every task: order must come from insertion order
        let created = chrono::Utc::now();
        let queue = TaskQueue::new(0);

        for i in 0..50 {
            let t = Task::builder(format!("t-{}", i))
                .priority(Priority::High)
                .created_at(created)
                .build()
                .unwrap();
            queue.try_enqueue(t).unwrap();
        }

        for i in 0..50 {
            assert_eq!(queue.try_dequeue().unwrap().id, format!("t-{}", i));
        }
    }

    #[test]
    fn test_capacity_rejection_keeps_size() {
        let queue = TaskQueue::new(3);
        for i in 0..3 {
            queue.try_enqueue(task(&format!("task-{}", i), Priority::Medium)).unwrap();
        }

        assert!(queue.is_full());
        let err = queue.try_enqueue(task("task-4", Priority::High)).unwrap_err();
        assert_eq!(err.reason, QueueError::RejectedFull);
        assert_eq!(queue.size(), 3);
        assert_eq!(queue.stats().priority_breakdown.high, 0);
    }

    #[test]
    fn test_unbounded_never_full() {
        let queue = TaskQueue::new(0);
        for i in 0..1_000 {
            queue.try_enqueue(task(&format!("t-{}", i), Priority::Low)).unwrap();
        }
        assert!(!queue.is_full());
        assert_eq!(queue.size(), 1_000);
    }

    #[test]
    fn test_enqueue_timeout_elapses() {
        let queue = TaskQueue::new(1);
        queue.try_enqueue(task("a", Priority::Medium)).unwrap();

        let start = Instant::now();
        let err = queue
            .enqueue(task("b", Priority::Medium), Duration::from_millis(100))
            .unwrap_err();

        assert_eq!(err.reason, QueueError::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn test_enqueue_waits_for_space() {
        let queue = Arc::new(TaskQueue::new(2));
        queue.try_enqueue(task("task-1", Priority::Medium)).unwrap();
        queue.try_enqueue(task("task-2", Priority::Medium)).unwrap();

        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                queue.try_dequeue().unwrap()
            })
        };

        let start = Instant::now();
        queue
            .enqueue(task("task-3", Priority::Medium), Duration::from_millis(2_000))
            .unwrap();
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(90));
        assert!(elapsed < Duration::from_millis(2_000));
        assert_eq!(consumer.join().unwrap().id, "task-1");
        assert_eq!(queue.size(), 2);
    }

    #[test]
    fn test_dequeue_timeout_elapses() {
        let queue = TaskQueue::new(10);

        let start = Instant::now();
        let err = queue.dequeue(Duration::from_millis(100)).unwrap_err();
        let elapsed = start.elapsed();

        assert_eq!(err, QueueError::TimedOut);
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(1_000));
    }

    #[test]
    fn test_dequeue_waits_for_task() {
        let queue = Arc::new(TaskQueue::new(10));

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                queue.try_enqueue(task("task-1", Priority::High)).unwrap();
            })
        };

        let start = Instant::now();
        let got = queue.dequeue(Duration::from_millis(2_000)).unwrap();
        let elapsed = start.elapsed();

        assert_eq!(got.id, "task-1");
        assert!(elapsed >= Duration::from_millis(90));
        assert!(elapsed < Duration::from_millis(2_000));
        producer.join().unwrap();
    }

    #[test]
    fn test_huge_timeout_waits_without_deadline() {
        let queue = Arc::new(TaskQueue::new(10));

        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.dequeue(Duration::MAX))
        };

        thread::sleep(Duration::from_millis(50));
        queue.try_enqueue(task("late", Priority::Low)).unwrap();
        assert_eq!(consumer.join().unwrap().unwrap().id, "late");
    }

    #[test]
    fn test_clear() {
        let queue = TaskQueue::new(10);
        queue.try_enqueue(task("task-1", Priority::High)).unwrap();
        queue.try_enqueue(task("task-2", Priority::Medium)).unwrap();
        queue.try_enqueue(task("task-3", Priority::Low)).unwrap();

        assert_eq!(queue.clear(), 3);
        assert!(queue.is_empty());
        assert!(!queue.is_shutdown());

        let stats = queue.stats();
        assert_eq!(stats.priority_breakdown, PriorityBreakdown::default());
        assert_eq!(stats.total_cleared, 3);

        queue.try_enqueue(task("task-4", Priority::Low)).unwrap();
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn test_clear_wakes_blocked_producer() {
        let queue = Arc::new(TaskQueue::new(1));
        queue.try_enqueue(task("old", Priority::Low)).unwrap();

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || queue.enqueue(task("new", Priority::High), Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(50));
        queue.clear();

        assert!(producer.join().unwrap().is_ok());
        assert_eq!(queue.try_dequeue().unwrap().id, "new");
    }

    #[test]
    fn test_shutdown_rejects_enqueue() {
        let queue = TaskQueue::new(10);
        queue.shutdown();
        queue.shutdown();

        let err = queue.try_enqueue(task("late", Priority::High)).unwrap_err();
        assert_eq!(err.reason, QueueError::ShutDown);
        assert_eq!(err.task().id, "late");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_shutdown_drains_remaining() {
        let queue = TaskQueue::new(10);
        queue.try_enqueue(task("low", Priority::Low)).unwrap();
        queue.try_enqueue(task("high", Priority::High)).unwrap();
        queue.shutdown();

        assert_eq!(queue.dequeue(Duration::from_secs(5)).unwrap().id, "high");
        assert_eq!(queue.dequeue(Duration::from_secs(5)).unwrap().id, "low");

        let start = Instant::now();
        assert_eq!(queue.dequeue(Duration::from_secs(5)).unwrap_err(), QueueError::ShutDown);
        assert_eq!(queue.try_dequeue().unwrap_err(), QueueError::ShutDown);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_shutdown_releases_blocked_producer() {
        let queue = Arc::new(TaskQueue::new(1));
        queue.try_enqueue(task("a", Priority::Low)).unwrap();

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || queue.enqueue(task("b", Priority::Low), Duration::MAX))
        };

        thread::sleep(Duration::from_millis(50));
        queue.shutdown();

        let err = producer.join().unwrap().unwrap_err();
        assert_eq!(err.reason, QueueError::ShutDown);
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn test_stats() {
        let queue = TaskQueue::new(100);
        queue.try_enqueue(task("task-1", Priority::High)).unwrap();
        queue.try_enqueue(task("task-2", Priority::Medium)).unwrap();
        queue.try_enqueue(task("task-3", Priority::Low)).unwrap();
        queue.try_enqueue(task("task-4", Priority::Low)).unwrap();
        queue.try_dequeue().unwrap();

        let stats = queue.stats();
        assert_eq!(stats.current_size, 3);
        assert_eq!(stats.capacity, 100);
        assert_eq!(stats.utilization, Some(3.0));
        assert_eq!(stats.priority_breakdown.high, 0);
        assert_eq!(stats.priority_breakdown.medium, 1);
        assert_eq!(stats.priority_breakdown.low, 2);
        assert_eq!(stats.total_enqueued, 4);
        assert_eq!(stats.total_dequeued, 1);
        assert!(!stats.is_shutdown);
    }

    #[test]
    fn test_stats_unbounded() {
        let queue = TaskQueue::new(0);
        queue.try_enqueue(task("t", Priority::Medium)).unwrap();

        let stats = queue.stats();
        assert_eq!(stats.capacity, 0);
        assert_eq!(stats.utilization, None);
    }

    #[test]
    fn test_with_config() {
        let config = QueueConfig {
            max_capacity: 7,
            ..QueueConfig::default()
        };
        assert_eq!(TaskQueue::with_config(&config).capacity(), 7);
    }
}
