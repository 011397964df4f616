//! Fixed-size worker pool: one blocking queue and one thread per worker.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::blocking_queue::BlockingQueue;
use crate::config::{PoolConfig, ShutdownMode};
use crate::error::{PoolError, Result};
use crate::types::{Task, TaskId, WorkerId};
use crate::worker::{self, WorkerStats};
use crate::workload::{Step, Workload};

/// Outcome of a completed pool run.
#[derive(Debug)]
pub struct PoolReport {
    pub workers: Vec<WorkerStats>,
    /// Tasks still queued after every worker exited.
    pub leftover: usize,
    pub elapsed: Duration,
}

/// A fixed set of workers, each draining its own [`BlockingQueue`].
///
/// Dropping a pool without calling [`shutdown`](Self::shutdown) closes every
/// queue, so the detached workers finish their backlog and exit.
pub struct Pool {
    queues: Vec<Arc<BlockingQueue>>,
    handles: Vec<JoinHandle<WorkerStats>>,
    unit: Duration,
    next_id: TaskId,
    started: Instant,
}

impl Pool {
    /// Create the queues and spawn one named thread per worker.
    pub fn start(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        let queues: Vec<Arc<BlockingQueue>> = (0..config.workers)
            .map(|_| Arc::new(BlockingQueue::new()))
            .collect();

        let mut handles = Vec::with_capacity(config.workers);
        for (id, queue) in queues.iter().enumerate() {
            let queue = Arc::clone(queue);
            let unit = config.unit;
            let spawned = thread::Builder::new()
                .name(format!("{}-{id}", config.thread_name_prefix))
                .spawn(move || worker::run_worker(id, &queue, unit));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    // Let the workers that did start exit on their own.
                    for queue in &queues {
                        queue.close();
                    }
                    return Err(PoolError::Spawn { id, source });
                }
            }
        }
        tracing::info!(workers = config.workers, unit = ?config.unit, "pool started");

        Ok(Self {
            queues,
            handles,
            unit: config.unit,
            next_id: 0,
            started: Instant::now(),
        })
    }

    /// Number of workers, and of queues.
    pub fn worker_count(&self) -> usize {
        self.queues.len()
    }

    /// The queue drained by worker `id`.
    pub fn queue(&self, id: WorkerId) -> Option<&BlockingQueue> {
        self.queues.get(id).map(Arc::as_ref)
    }

    /// Send `workload` to worker `position % worker_count`.
    pub fn dispatch(&mut self, position: usize, workload: Workload) -> Result<WorkerId> {
        let worker = position % self.queues.len();
        let id = self.next_id;
        self.next_id += 1;
        self.queues[worker]
            .put(workload.into_task(id))
            .map_err(|err| PoolError::Dispatch {
                worker,
                source: err.into(),
            })?;
        tracing::debug!(worker, task = id, ?workload, "dispatched");
        Ok(worker)
    }

    /// Run a parsed producer program: dispatch letters, sleep on digits.
    pub fn run_program(&mut self, steps: &[Step]) -> Result<()> {
        for step in steps {
            match *step {
                Step::Dispatch { position, workload } => {
                    self.dispatch(position, workload)?;
                }
                Step::Pause(units) => {
                    tracing::debug!(units, "producer pausing");
                    thread::sleep(self.unit * units);
                }
            }
        }
        Ok(())
    }

    /// Stop every worker, wait for them, and collect their statistics.
    ///
    /// Every worker is joined and every queue is drained even if one of
    /// the workers panicked; the first panic is reported afterwards.
    pub fn shutdown(mut self, mode: ShutdownMode) -> Result<PoolReport> {
        tracing::info!(?mode, "shutting down pool");
        match mode {
            ShutdownMode::Sentinel => {
                for (worker, queue) in self.queues.iter().enumerate() {
                    // A closed queue already ends its worker with `Closed`.
                    if let Err(err) = queue.put(Task::shutdown()) {
                        tracing::debug!(worker, %err, "queue already closed, skipping sentinel");
                    }
                }
            }
            ShutdownMode::Close => self.close_queues(),
        }

        let joined = join_workers(std::mem::take(&mut self.handles));

        // Retire the queues and count anything nobody consumed.
        self.close_queues();
        let mut leftover = 0usize;
        for queue in &self.queues {
            while queue.try_get().is_some() {
                leftover += 1;
            }
        }
        if leftover > 0 {
            tracing::warn!(leftover, "tasks left in queues after shutdown");
        }

        Ok(PoolReport {
            workers: joined?,
            leftover,
            elapsed: self.started.elapsed(),
        })
    }

    fn close_queues(&self) {
        for queue in &self.queues {
            queue.close();
        }
    }
}

impl Drop for Pool {
    // Workers drain what is already queued and exit on `Closed`.
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            tracing::debug!(workers = self.handles.len(), "pool dropped without shutdown");
        }
        self.close_queues();
    }
}

/// Join every handle, then report the first worker that panicked.
fn join_workers(handles: Vec<JoinHandle<WorkerStats>>) -> Result<Vec<WorkerStats>> {
    let mut workers = Vec::with_capacity(handles.len());
    let mut panicked = None;
    for (id, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(stats) => workers.push(stats),
            Err(_) => {
                tracing::error!(worker = id, "worker panicked");
                panicked.get_or_insert(id);
            }
        }
    }
    match panicked {
        Some(id) => Err(PoolError::WorkerPanic(id)),
        None => Ok(workers),
    }
}
