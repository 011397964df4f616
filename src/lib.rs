//! Blocking FIFO task queues and a small worker pool that drains them.

pub mod blocking_queue;
pub mod config;
pub mod error;
pub mod logging;
pub mod pool;
pub mod report;
pub mod types;
pub mod worker;
pub mod workload;

pub use blocking_queue::BlockingQueue;
pub use config::{PoolConfig, ShutdownMode};
pub use error::{PoolError, PutError, QueueError, Result};
pub use pool::{Pool, PoolReport};
pub use types::{Task, TaskId, TaskKind, TaskStatus, WorkerId};
