//! Simulated workloads and the producer program that schedules them.

use std::thread;
use std::time::Duration;

use crate::types::{Task, TaskId, TaskKind};

/// One of the four fixed-duration simulated jobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Workload {
    A,
    B,
    C,
    D,
}

impl Workload {
    pub const ALL: [Workload; 4] = [Workload::A, Workload::B, Workload::C, Workload::D];

    /// Nominal length of the job, in time units.
    pub fn units(self) -> u32 {
        match self {
            Workload::A => 5,
            Workload::B => 10,
            Workload::C => 15,
            Workload::D => 20,
        }
    }

    pub fn duration(self, unit: Duration) -> Duration {
        unit * self.units()
    }

    pub fn kind(self) -> TaskKind {
        match self {
            Workload::A => TaskKind(b'A'),
            Workload::B => TaskKind(b'B'),
            Workload::C => TaskKind(b'C'),
            Workload::D => TaskKind(b'D'),
        }
    }

    pub fn from_kind(kind: TaskKind) -> Option<Self> {
        match kind.0 {
            b'A' => Some(Workload::A),
            b'B' => Some(Workload::B),
            b'C' => Some(Workload::C),
            b'D' => Some(Workload::D),
            _ => None,
        }
    }

    pub fn into_task(self, id: TaskId) -> Task {
        Task::new(self.kind(), id)
    }

    /// Run the job on the current thread.
    pub fn run(self, unit: Duration) {
        tracing::info!("Task {:?} starting...", self);
        thread::sleep(self.duration(unit));
        tracing::info!("Task {:?} ending...", self);
    }
}

/// One instruction of the producer program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Hand a workload to the worker at `position % worker_count`.
    Dispatch { position: usize, workload: Workload },
    /// Hold the producer for this many time units.
    Pause(u32),
}

/// Parse a program string such as `"ABCD0123"`.
///
/// Letters `A`..`D` become dispatches keyed by their character position,
/// digits become pauses, and every other character is skipped.
pub fn parse_program(input: &str) -> Vec<Step> {
    let mut steps = Vec::with_capacity(input.len());
    for (position, byte) in input.bytes().enumerate() {
        if let Some(workload) = Workload::from_kind(TaskKind(byte)) {
            steps.push(Step::Dispatch { position, workload });
        } else if byte.is_ascii_digit() {
            steps.push(Step::Pause(u32::from(byte - b'0')));
        } else {
            tracing::debug!(position, byte, "ignoring unknown program character");
        }
    }
    steps
}
