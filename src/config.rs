use std::time::Duration;

use crate::error::{PoolError, Result};

/// How the pool tells its workers to stop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ShutdownMode {
    /// Enqueue one shutdown sentinel per worker queue.
    #[default]
    Sentinel,
    /// Close every worker queue.
    Close,
}

/// Sizing and timing of a [`Pool`](crate::pool::Pool).
#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub workers: usize,
    /// Length of one workload/pause time unit.
    pub unit: Duration,
    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            unit: Duration::from_secs(1),
            thread_name_prefix: "worker".to_string(),
        }
    }
}

impl PoolConfig {
    pub fn new(workers: usize, unit: Duration) -> Self {
        Self {
            workers,
            unit,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(PoolError::config("workers must be > 0"));
        }
        Ok(())
    }
}
