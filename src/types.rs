//! Shared identifiers and task model used across the system.

use std::any::Any;
use std::fmt;
use std::time::Instant;

/// Caller-assigned task identifier; never interpreted by the queue.
pub type TaskId = u64;
/// Index of a worker (and of the queue it drains).
pub type WorkerId = usize;

/// Opaque value carried by a task. The queue never inspects it.
pub type Payload = Box<dyn Any + Send>;

/// Discriminator selecting the unit of work a task stands for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TaskKind(pub u8);

impl TaskKind {
    /// Conventional shutdown sentinel. Only worker loops give it meaning.
    pub const SHUTDOWN: TaskKind = TaskKind(b'X');

    pub fn is_shutdown(self) -> bool {
        self == Self::SHUTDOWN
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_ascii_graphic() {
            write!(f, "{}", self.0 as char)
        } else {
            write!(f, "{:#04x}", self.0)
        }
    }
}

/// Execution state written by whoever runs the task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Done,
    Failed,
}

/// Unit of work moved through a [`BlockingQueue`](crate::blocking_queue::BlockingQueue).
///
/// The queue stamps `created_at`/`start_time` on `put` and
/// `end_time`/`updated_at` on `get`. Every other field belongs to the
/// producer and to the code that executes the task.
#[derive(Default)]
pub struct Task {
    pub kind: TaskKind,
    pub id: TaskId,
    pub created_at: Option<Instant>,
    pub start_time: Option<Instant>,
    pub end_time: Option<Instant>,
    pub updated_at: Option<Instant>,
    pub payload: Option<Payload>,
    pub status: TaskStatus,
    pub result: Option<Payload>,
    pub error: Option<String>,
    pub owner: Option<String>,
}

impl Task {
    /// Construct a task with the given kind and id; all other fields empty.
    pub fn new(kind: TaskKind, id: TaskId) -> Self {
        Self {
            kind,
            id,
            ..Self::default()
        }
    }

    /// Build the shutdown sentinel understood by worker loops.
    pub fn shutdown() -> Self {
        Self::new(TaskKind::SHUTDOWN, 0)
    }

    pub fn with_payload<P: Any + Send>(mut self, payload: P) -> Self {
        self.payload = Some(Box::new(payload));
        self
    }

    /// Borrow the payload as `P`, if it holds one.
    pub fn payload_ref<P: Any>(&self) -> Option<&P> {
        self.payload.as_ref().and_then(|p| p.downcast_ref::<P>())
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Payload and result are opaque; only report their presence.
        f.debug_struct("Task")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .field("start_time", &self.start_time)
            .field("end_time", &self.end_time)
            .field("updated_at", &self.updated_at)
            .field("has_payload", &self.payload.is_some())
            .field("has_result", &self.result.is_some())
            .field("error", &self.error)
            .field("owner", &self.owner)
            .finish()
    }
}
