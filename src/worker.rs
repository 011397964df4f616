//! The consumer loop run by each pool thread, and its timing statistics.

use std::time::{Duration, Instant};

use crate::blocking_queue::BlockingQueue;
use crate::types::{Task, TaskStatus, WorkerId};
use crate::workload::Workload;

/// Why a worker loop returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// Dequeued a shutdown sentinel.
    Sentinel,
    /// The queue was closed and drained.
    Closed,
}

/// Per-worker timing totals, in milliseconds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerStats {
    pub id: WorkerId,
    /// Wall time spent executing workloads.
    pub real_ms: u64,
    /// Sum of the nominal workload durations.
    pub work_ms: u64,
    /// Time tasks sat in the queue before execution started.
    pub wait_ms: u64,
    /// Nominal minus real time; negative when the scheduler ran late.
    pub sched_ms: i64,
    pub done: usize,
    pub failed: usize,
    pub exit: ExitReason,
}

impl WorkerStats {
    fn new(id: WorkerId) -> Self {
        Self {
            id,
            real_ms: 0,
            work_ms: 0,
            wait_ms: 0,
            sched_ms: 0,
            done: 0,
            failed: 0,
            exit: ExitReason::Closed,
        }
    }

    fn record(&mut self, task: &Task, real_start: Instant, real_end: Instant, nominal: Duration) {
        let waited = task
            .start_time
            .map(|start| real_start.saturating_duration_since(start))
            .unwrap_or_default();
        let real = real_end.saturating_duration_since(real_start);
        let real_ms = real.as_millis() as u64;
        let nominal_ms = nominal.as_millis() as u64;

        self.wait_ms += waited.as_millis() as u64;
        self.real_ms += real_ms;
        self.work_ms += nominal_ms;
        self.sched_ms += nominal_ms as i64 - real_ms as i64;
    }
}

/// Drain `queue` until it is closed or a shutdown sentinel arrives.
///
/// Each workload runs on the calling thread; `unit` scales the nominal
/// durations.
pub fn run_worker(id: WorkerId, queue: &BlockingQueue, unit: Duration) -> WorkerStats {
    let mut stats = WorkerStats::new(id);
    let owner = format!("worker-{id}");
    tracing::debug!(worker = id, "worker started");

    loop {
        let mut task = match queue.get() {
            Ok(task) => task,
            Err(err) => {
                tracing::debug!(worker = id, %err, "queue drained");
                stats.exit = ExitReason::Closed;
                break;
            }
        };
        if task.kind.is_shutdown() {
            tracing::debug!(worker = id, "shutdown signal received");
            stats.exit = ExitReason::Sentinel;
            break;
        }

        task.owner = Some(owner.clone());
        task.status = TaskStatus::Running;
        let real_start = Instant::now();
        let nominal = match Workload::from_kind(task.kind) {
            Some(workload) => {
                workload.run(unit);
                task.status = TaskStatus::Done;
                task.result = Some(Box::new(workload));
                stats.done += 1;
                workload.duration(unit)
            }
            None => {
                tracing::warn!(worker = id, task = task.id, kind = %task.kind, "unknown task kind");
                task.status = TaskStatus::Failed;
                task.error = Some(format!("unknown task kind {}", task.kind));
                stats.failed += 1;
                Duration::ZERO
            }
        };
        stats.record(&task, real_start, Instant::now(), nominal);
        tracing::trace!(worker = id, ?task, "task finished");
    }

    tracing::debug!(
        worker = id,
        done = stats.done,
        failed = stats.failed,
        exit = ?stats.exit,
        "worker exiting"
    );
    stats
}
