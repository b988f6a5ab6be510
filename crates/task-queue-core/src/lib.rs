mod task;
mod priority;
mod error;
mod factory;

pub use task::{Task, TaskBuilder, TaskId, TaskPayload};
pub use priority::Priority;
pub use error::{TaskError, QueueError, EnqueueError, Result};
pub use factory::{
    Clock, IdGenerator, SequentialIdGenerator, SteppingClock, SystemClock, TaskFactory,
    UuidGenerator,
};
