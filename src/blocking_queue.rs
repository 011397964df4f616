//! Thread-safe FIFO of tasks with a blocking `get` and a one-shot `close`.
//!
//! This is a classic monitor: one [`Mutex`] guards the items, the closed
//! flag and the count of blocked consumers, and one [`Condvar`] tied to that
//! mutex wakes consumers when work arrives or the queue closes.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{PutError, QueueError};
use crate::types::Task;

/// Unbounded, blocking FIFO of [`Task`]s.
///
/// Any number of threads may [`put`](Self::put) concurrently; any number may
/// [`get`](Self::get). Each task that is successfully put is returned by
/// exactly one `get`. After [`close`](Self::close) the queue rejects new
/// tasks but keeps handing out the ones it already holds.
pub struct BlockingQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

struct QueueState {
    items: VecDeque<Task>,
    // Never goes back to false once set.
    closed: bool,
    // Consumers parked in `available`; lets `put` skip pointless signals.
    waiting: usize,
}

impl BlockingQueue {
    /// Create an empty, open queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
                waiting: 0,
            }),
            available: Condvar::new(),
        }
    }

    // Every critical section leaves the state consistent, so a panic in
    // another holder does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a task to the tail and wake one blocked consumer.
    ///
    /// Stamps `start_time` and `created_at` with the enqueue time, replacing
    /// whatever the producer set. Fails without enqueuing if the queue is
    /// closed; the task is handed back inside the error.
    pub fn put(&self, mut task: Task) -> Result<(), PutError> {
        let mut state = self.lock();
        if state.closed {
            return Err(PutError::new(task));
        }

        let now = Instant::now();
        task.start_time = Some(now);
        task.created_at = Some(now);
        state.items.push_back(task);

        if state.waiting > 0 {
            self.available.notify_one();
        }
        Ok(())
    }

    /// Remove the head task, blocking while the queue is open and empty.
    ///
    /// Returns [`QueueError::Closed`] once the queue is closed and drained.
    pub fn get(&self) -> Result<Task, QueueError> {
        let mut state = self.lock();
        while state.items.is_empty() && !state.closed {
            state.waiting += 1;
            // Wait releases the lock and re-acquires it before returning.
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
            state.waiting -= 1;
        }
        Self::take_head(&mut state)
    }

    /// Like [`get`](Self::get), but gives up after `timeout`.
    ///
    /// Returns [`QueueError::Timeout`] if the deadline passes while the
    /// queue is still open and empty.
    pub fn get_timeout(&self, timeout: Duration) -> Result<Task, QueueError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        while state.items.is_empty() && !state.closed {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                // Too far in the future to represent: wait as long as we can.
                None => Duration::MAX,
            };
            if remaining.is_zero() {
                return Err(QueueError::Timeout);
            }
            state.waiting += 1;
            let (guard, _) = self
                .available
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
            state.waiting -= 1;
        }
        Self::take_head(&mut state)
    }

    /// Pop the head task without blocking. Does not report closure.
    pub fn try_get(&self) -> Option<Task> {
        let mut state = self.lock();
        Self::take_head(&mut state).ok()
    }

    fn take_head(state: &mut QueueState) -> Result<Task, QueueError> {
        let mut task = state.items.pop_front().ok_or(QueueError::Closed)?;
        let now = Instant::now();
        task.end_time = Some(now);
        task.updated_at = Some(now);
        Ok(task)
    }

    /// Number of queued tasks at the instant the lock was held.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether the queue held no tasks at the instant the lock was held.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Close the queue and wake every blocked consumer. Idempotent.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        self.available.notify_all();
    }
}

impl Default for BlockingQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TaskId, TaskKind};
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::mpsc;
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;

    const KIND_A: TaskKind = TaskKind(b'A');

    fn task(id: TaskId) -> Task {
        Task::new(KIND_A, id)
    }

    /// Spin until `n` consumers are parked inside `get`.
    fn wait_for_waiters(queue: &BlockingQueue, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while queue.lock().waiting < n {
            assert!(Instant::now() < deadline, "consumers never blocked");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn get_returns_tasks_in_put_order() {
        let queue = BlockingQueue::new();
        for id in 0..10 {
            queue.put(task(id)).expect("queue closed");
        }
        for id in 0..10 {
            assert_eq!(queue.get().expect("queue closed").id, id);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn tasks_are_consumed_once() {
        let queue = Arc::new(BlockingQueue::new());
        let total_tasks = 100;
        for id in 0..total_tasks {
            queue.put(task(id)).expect("queue closed");
        }

        let consumers = 4;
        let barrier = Arc::new(Barrier::new(consumers));
        let seen: Arc<Mutex<HashSet<TaskId>>> = Arc::new(Mutex::new(HashSet::new()));

        let mut handles = Vec::new();
        for _ in 0..consumers {
            let queue = Arc::clone(&queue);
            let barrier = Arc::clone(&barrier);
            let seen = Arc::clone(&seen);
            handles.push(thread::spawn(move || {
                barrier.wait();
                while let Some(task) = queue.try_get() {
                    let mut guard = seen.lock().expect("seen mutex poisoned");
                    // Each task id should be observed at most once.
                    assert!(guard.insert(task.id));
                }
            }));
        }

        for handle in handles {
            handle.join().expect("consumer thread panicked");
        }

        let guard = seen.lock().expect("seen mutex poisoned");
        assert_eq!(guard.len(), total_tasks as usize);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn concurrent_producers_and_consumers_lose_nothing() {
        let queue = Arc::new(BlockingQueue::new());
        let producers = 4;
        let per_producer = 250;
        let consumers = 3;

        let mut consumer_handles = Vec::new();
        for _ in 0..consumers {
            let queue = Arc::clone(&queue);
            consumer_handles.push(thread::spawn(move || {
                let mut ids = Vec::new();
                while let Ok(task) = queue.get() {
                    ids.push(task.id);
                }
                ids
            }));
        }

        let mut producer_handles = Vec::new();
        for p in 0..producers {
            let queue = Arc::clone(&queue);
            producer_handles.push(thread::spawn(move || {
                for i in 0..per_producer {
                    queue
                        .put(task((p * per_producer + i) as TaskId))
                        .expect("queue closed");
                }
            }));
        }
        for handle in producer_handles {
            handle.join().expect("producer thread panicked");
        }
        queue.close();

        let mut all = Vec::new();
        for handle in consumer_handles {
            all.extend(handle.join().expect("consumer thread panicked"));
        }
        all.sort_unstable();
        let expected: Vec<TaskId> = (0..(producers * per_producer) as TaskId).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn get_wakes_on_put() {
        let queue = Arc::new(BlockingQueue::new());
        let (tx, rx) = mpsc::channel();

        let queue_clone = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            let task = queue_clone.get().expect("queue closed");
            tx.send(task.id).expect("send task id");
        });

        wait_for_waiters(&queue, 1);
        thread::sleep(Duration::from_millis(20));
        // Putting after the consumer blocks should wake it.
        queue.put(task(99)).expect("queue closed");

        let received = rx
            .recv_timeout(Duration::from_secs(1))
            .expect("receive task id");
        assert_eq!(received, 99);
        handle.join().expect("blocking get thread panicked");
    }

    #[test]
    fn blocked_consumers_each_get_unique_task() {
        let queue = Arc::new(BlockingQueue::new());
        let consumers = 4;
        let (done_tx, done_rx) = mpsc::channel();

        let mut handles = Vec::new();
        for _ in 0..consumers {
            let queue = Arc::clone(&queue);
            let done_tx = done_tx.clone();
            handles.push(thread::spawn(move || {
                let task = queue.get().expect("queue closed");
                done_tx.send(task.id).expect("done");
            }));
        }

        wait_for_waiters(&queue, consumers);
        // Provide exactly one task per consumer.
        for id in 0..consumers as TaskId {
            queue.put(task(id)).expect("queue closed");
        }

        let mut seen = HashSet::new();
        for _ in 0..consumers {
            let id = done_rx
                .recv_timeout(Duration::from_secs(1))
                .expect("done recv");
            assert!(seen.insert(id));
        }

        for handle in handles {
            handle.join().expect("consumer thread panicked");
        }
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.lock().waiting, 0);
    }

    #[test]
    fn get_unblocks_on_close() {
        let queue = Arc::new(BlockingQueue::new());
        let consumers = 3;
        let (done_tx, done_rx) = mpsc::channel();

        let mut handles = Vec::new();
        for _ in 0..consumers {
            let queue = Arc::clone(&queue);
            let done_tx = done_tx.clone();
            handles.push(thread::spawn(move || {
                done_tx.send(queue.get().err()).expect("done");
            }));
        }

        wait_for_waiters(&queue, consumers);
        queue.close();

        for _ in 0..consumers {
            let result = done_rx
                .recv_timeout(Duration::from_secs(1))
                .expect("done recv");
            assert_eq!(result, Some(QueueError::Closed));
        }
        for handle in handles {
            handle.join().expect("consumer thread panicked");
        }
    }

    #[test]
    fn put_fails_after_close_and_returns_task() {
        let queue = BlockingQueue::new();
        queue.close();
        let err = queue.put(task(1)).expect_err("put on closed queue");
        assert_eq!(err.task().id, 1);
        assert!(err.task().start_time.is_none());
        assert_eq!(err.to_string(), "queue is closed");
        let returned = err.into_task();
        assert_eq!(returned.id, 1);
        assert_eq!(
            QueueError::from(queue.put(returned).unwrap_err()),
            QueueError::Closed
        );
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn close_drains_remaining_tasks_first() {
        let queue = BlockingQueue::new();
        for id in 0..3 {
            queue.put(task(id)).expect("queue closed");
        }
        queue.close();
        assert!(queue.put(task(3)).is_err());

        for id in 0..3 {
            assert_eq!(queue.get().expect("task before closure").id, id);
        }
        // Closed and empty is terminal: no blocking, no recovery.
        for _ in 0..3 {
            assert_eq!(queue.get().unwrap_err(), QueueError::Closed);
            assert_eq!(
                queue.get_timeout(Duration::from_secs(5)).unwrap_err(),
                QueueError::Closed
            );
        }
        assert!(queue.put(task(4)).is_err());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn close_is_idempotent() {
        let queue = BlockingQueue::new();
        queue.put(task(7)).expect("queue closed");
        queue.close();
        queue.close();
        assert!(queue.is_closed());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get().expect("drain").id, 7);
        assert_eq!(queue.get().unwrap_err(), QueueError::Closed);
    }

    #[test]
    fn put_and_get_stamp_timestamps() {
        let queue = BlockingQueue::new();
        let mut t = task(1);
        // Producer-supplied stamps are overwritten.
        let stale = Instant::now()
            .checked_sub(Duration::from_secs(60))
            .unwrap_or_else(Instant::now);
        t.start_time = Some(stale);
        t.created_at = Some(stale);

        let before_put = Instant::now();
        queue.put(t).expect("queue closed");
        let after_put = Instant::now();
        thread::sleep(Duration::from_millis(5));

        let before_get = Instant::now();
        let t = queue.get().expect("queue closed");
        let after_get = Instant::now();

        let start = t.start_time.expect("start_time stamped");
        assert_eq!(t.created_at, Some(start));
        assert!(start >= before_put && start <= after_put);

        let end = t.end_time.expect("end_time stamped");
        assert_eq!(t.updated_at, Some(end));
        assert!(end >= before_get && end <= after_get);
        assert!(end >= start);
    }

    #[test]
    fn get_timeout_expires_on_empty_open_queue() {
        let queue = BlockingQueue::new();
        let start = Instant::now();
        let err = queue
            .get_timeout(Duration::from_millis(30))
            .expect_err("nothing to get");
        assert_eq!(err, QueueError::Timeout);
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(queue.lock().waiting, 0);
    }

    #[test]
    fn get_timeout_returns_task_put_while_waiting() {
        let queue = Arc::new(BlockingQueue::new());
        let queue_clone = Arc::clone(&queue);
        let handle =
            thread::spawn(move || queue_clone.get_timeout(Duration::from_secs(5)).map(|t| t.id));

        wait_for_waiters(&queue, 1);
        queue.put(task(42)).expect("queue closed");
        assert_eq!(handle.join().expect("consumer panicked"), Ok(42));
    }

    #[test]
    fn three_consumers_share_nine_tasks() {
        let queue = Arc::new(BlockingQueue::new());
        let mut handles = Vec::new();
        for _ in 0..3 {
            let queue = Arc::clone(&queue);
            handles.push(thread::spawn(move || {
                let mut ids = Vec::new();
                let err = loop {
                    match queue.get() {
                        Ok(task) => ids.push(task.id),
                        Err(err) => break err,
                    }
                };
                (ids, err)
            }));
        }

        for id in 0..9 {
            queue.put(task(id)).expect("queue closed");
        }
        queue.close();

        let mut all = HashSet::new();
        for handle in handles {
            let (ids, err) = handle.join().expect("consumer thread panicked");
            assert_eq!(err, QueueError::Closed);
            for id in ids {
                assert!(all.insert(id), "task {id} delivered twice");
            }
        }
        assert_eq!(all, (0..9).collect::<HashSet<TaskId>>());
    }

    proptest! {
        #[test]
        fn fifo_order_holds(ids in proptest::collection::vec(any::<u64>(), 0..64)) {
            let queue = BlockingQueue::new();
            for &id in &ids {
                queue.put(task(id)).expect("queue closed");
            }
            prop_assert_eq!(queue.len(), ids.len());
            let drained: Vec<TaskId> = std::iter::from_fn(|| queue.try_get())
                .map(|t| t.id)
                .collect();
            prop_assert_eq!(drained, ids);
        }
    }
}
