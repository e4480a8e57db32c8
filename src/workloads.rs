//! Event-queue builders for common workload archetypes.
//!
//! Each function returns an [`EventQueue`] for a well-known process shape.
//! These are composed into simulations by tests and demo drivers.

use crate::process::{Event, EventKind, EventQueue};
use crate::types::Tick;

fn event(kind: EventKind, duration: Tick, resource_usage: f32) -> Event {
    Event {
        kind,
        duration,
        resource_usage,
    }
}

/// Pure CPU-bound process: a single CPU burst.
pub fn cpu_bound(duration: Tick) -> EventQueue {
    EventQueue::from([event(EventKind::Cpu, duration, 1.0)])
}

/// IO-bound process: a long wait followed by a short wrap-up burst.
pub fn io_bound(io_duration: Tick, wrapup: Tick) -> EventQueue {
    EventQueue::from([
        event(EventKind::Io, io_duration, 0.1),
        event(EventKind::Cpu, wrapup, 0.4),
    ])
}

/// Interactive process: `rounds` alternations of a CPU burst and an IO
/// wait, ending on a CPU burst.
pub fn interactive(rounds: usize, cpu: Tick, io: Tick) -> EventQueue {
    let mut events = EventQueue::new();
    for _ in 0..rounds {
        events.push_back(event(EventKind::Cpu, cpu, 0.6));
        events.push_back(event(EventKind::Io, io, 0.1));
    }
    events.push_back(event(EventKind::Cpu, cpu, 0.6));
    events
}
