//! Workload data model: events and processes.
//!
//! A process is a scripted sequence of CPU and IO bursts. The scheduler
//! serves the head event one tick at a time; when the queue drains, the
//! process is finished.

use std::collections::VecDeque;
use std::fmt;

use crate::types::{Pid, Tick};

/// The two kinds of work a process can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A CPU burst, served while the process occupies a core.
    Cpu,
    /// An IO burst, served while the process sits in the waiting queue.
    Io,
}

/// Number of [`EventKind`] variants; pinned by a test so that every
/// dispatch site is revisited when a variant is added.
pub const EVENT_KIND_COUNT: usize = 2;

impl EventKind {
    /// Parse an event kind from its workload-script spelling.
    ///
    /// The spellings are exact: `"Cpu"` and `"Io"`.
    pub fn try_from_str(s: &str) -> Option<EventKind> {
        match s {
            "Cpu" => Some(EventKind::Cpu),
            "Io" => Some(EventKind::Io),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Cpu => write!(f, "Cpu"),
            EventKind::Io => write!(f, "Io"),
        }
    }
}

/// A single burst of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    /// Remaining ticks of service; decremented once per tick while served.
    /// Must be at least 1 when the event enters the scheduler.
    pub duration: Tick,
    /// Fractional core usage in `(0.0, 1.0]`, feeds the utilisation metric.
    pub resource_usage: f32,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event {{ kind = {}, duration = {}, usage = {}% }}",
            self.kind,
            self.duration,
            (self.resource_usage * 100.0) as u64
        )
    }
}

/// The event queue of a process, served front to back.
pub type EventQueue = VecDeque<Event>;

/// A simulated process.
#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    pub name: String,
    pub pid: Pid,
    /// The tick at which the process arrives at the scheduler.
    pub arrival: Tick,
    pub events: EventQueue,
    /// Set once, on the first dispatch towards a CPU event.
    pub start_time: Option<Tick>,
    /// Set once, when the event queue drains.
    pub finish_time: Option<Tick>,
}

impl Process {
    pub fn new(name: impl Into<String>, pid: Pid, arrival: Tick, events: EventQueue) -> Self {
        Process {
            name: name.into(),
            pid,
            arrival,
            events,
            start_time: None,
            finish_time: None,
        }
    }

    /// Ticks spent between arrival and the first CPU dispatch, or 0 if the
    /// process never reached a CPU.
    pub fn waiting_time(&self) -> Tick {
        self.start_time.map_or(0, |start| start - self.arrival)
    }

    /// Ticks spent between arrival and completion, or 0 if the process has
    /// not finished.
    pub fn turnaround_time(&self) -> Tick {
        self.finish_time.map_or(0, |finish| finish - self.arrival)
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Process {{ name: {}, pid: {}, arrival: {}, waiting time: {}, turnaround time: {} }}",
            self.name,
            self.pid.0,
            self.arrival,
            self.waiting_time(),
            self.turnaround_time()
        )
    }
}
