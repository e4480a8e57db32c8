//! Scheduling policy strategies.
//!
//! A policy is a named callable over the scheduler: once per tick, on every
//! core left idle by the service phases, the engine hands itself to the
//! policy so it can move ready processes onto cores. The two built-in
//! policies are First-Come-First-Served (run to completion) and Round-Robin
//! (quantum slicing).

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::engine::Scheduler;
use crate::process::{Event, EventKind};
use crate::types::Tick;

/// Quantum granted by Round-Robin when none is specified.
pub const DEFAULT_QUANTUM: Tick = 5;

/// The closed set of built-in scheduling policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePolicy {
    FirstComeFirstServed,
    RoundRobin,
}

/// Number of [`SchedulePolicy`] variants; pinned by a test so that every
/// dispatch site is revisited when a variant is added.
pub const SCHEDULE_POLICY_COUNT: usize = 2;

impl SchedulePolicy {
    /// Parse a policy from its script spelling. Spellings are case-sensitive.
    pub fn try_from_str(s: &str) -> Option<SchedulePolicy> {
        match s {
            "FCFS" | "FIFO" | "FirstComeFirstServed" | "FirstInFirstOut" => {
                Some(SchedulePolicy::FirstComeFirstServed)
            }
            "RR" | "RoundRobin" => Some(SchedulePolicy::RoundRobin),
            _ => None,
        }
    }
}

impl fmt::Display for SchedulePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulePolicy::FirstComeFirstServed => write!(f, "First Come First Served"),
            SchedulePolicy::RoundRobin => write!(f, "Round Robin"),
        }
    }
}

/// The behaviour half of a policy: any callable over the scheduler.
pub type ScheduleFn = Rc<dyn Fn(&mut Scheduler)>;

/// A scheduling policy paired with its descriptor.
#[derive(Clone)]
pub struct NamedSchedulePolicy {
    name: String,
    kind: SchedulePolicy,
    callback: ScheduleFn,
}

impl NamedSchedulePolicy {
    pub fn new(name: impl Into<String>, kind: SchedulePolicy, callback: ScheduleFn) -> Self {
        NamedSchedulePolicy {
            name: name.into(),
            kind,
            callback,
        }
    }

    /// Build the named policy for `kind` with its default parameters.
    pub fn from_kind(kind: SchedulePolicy) -> Self {
        match kind {
            SchedulePolicy::FirstComeFirstServed => Self::fcfs(),
            SchedulePolicy::RoundRobin => Self::round_robin(DEFAULT_QUANTUM),
        }
    }

    /// First-Come-First-Served: every idle core takes the front of its
    /// ready queue and runs it to completion.
    pub fn fcfs() -> Self {
        let kind = SchedulePolicy::FirstComeFirstServed;
        Self::new(
            kind.to_string(),
            kind,
            Rc::new(|sched: &mut Scheduler| {
                for t in 0..sched.threads_count() {
                    sched.dispatch_next_ready(t);
                }
            }),
        )
    }

    /// Round-Robin: like FCFS, but a CPU burst longer than the quantum is
    /// split so the process is re-queued after `quantum` ticks.
    pub fn round_robin(quantum: Tick) -> Self {
        let kind = SchedulePolicy::RoundRobin;
        Self::new(
            kind.to_string(),
            kind,
            Rc::new(move |sched: &mut Scheduler| {
                for t in 0..sched.threads_count() {
                    let Some(id) = sched.dispatch_next_ready(t) else {
                        continue;
                    };
                    let process = sched.process_mut(id);
                    let head = process
                        .events
                        .front_mut()
                        .expect("dispatched process must have events");
                    assert!(
                        head.kind == EventKind::Cpu,
                        "dispatched process must lead with a Cpu event"
                    );
                    if head.duration > quantum {
                        head.duration -= quantum;
                        let slice = Event {
                            kind: EventKind::Cpu,
                            duration: quantum,
                            resource_usage: head.resource_usage,
                        };
                        process.events.push_front(slice);
                        debug!(core = t, pid = process.pid.0, quantum, "sliced cpu burst");
                    }
                }
            }),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SchedulePolicy {
        self.kind
    }

    /// Run the policy over the scheduler.
    pub fn apply(&self, sched: &mut Scheduler) {
        (self.callback.as_ref())(sched);
    }
}

impl fmt::Debug for NamedSchedulePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedSchedulePolicy")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_policy_count_is_pinned() {
        // Display and from_kind match exhaustively, so adding a variant
        // breaks them (and this count) before any dispatch site silently
        // falls behind.
        let samples = [
            SchedulePolicy::FirstComeFirstServed,
            SchedulePolicy::RoundRobin,
        ];
        assert_eq!(samples.len(), SCHEDULE_POLICY_COUNT);

        let mut names: Vec<String> = samples.iter().map(SchedulePolicy::to_string).collect();
        names.dedup();
        assert_eq!(names.len(), SCHEDULE_POLICY_COUNT);

        for kind in samples {
            assert_eq!(NamedSchedulePolicy::from_kind(kind).kind(), kind);
        }
    }

    #[test]
    fn policy_spellings_map_case_sensitively() {
        for spelling in ["FCFS", "FIFO", "FirstComeFirstServed", "FirstInFirstOut"] {
            assert_eq!(
                SchedulePolicy::try_from_str(spelling),
                Some(SchedulePolicy::FirstComeFirstServed),
                "{spelling}"
            );
        }
        for spelling in ["RR", "RoundRobin"] {
            assert_eq!(
                SchedulePolicy::try_from_str(spelling),
                Some(SchedulePolicy::RoundRobin),
                "{spelling}"
            );
        }
        for spelling in ["fcfs", "rr", "roundrobin", "SJF", ""] {
            assert_eq!(SchedulePolicy::try_from_str(spelling), None, "{spelling:?}");
        }
    }

    #[test]
    fn named_policies_carry_their_descriptor() {
        let fcfs = NamedSchedulePolicy::from_kind(SchedulePolicy::FirstComeFirstServed);
        assert_eq!(fcfs.name(), "First Come First Served");
        assert_eq!(fcfs.kind(), SchedulePolicy::FirstComeFirstServed);

        let rr = NamedSchedulePolicy::from_kind(SchedulePolicy::RoundRobin);
        assert_eq!(rr.name(), "Round Robin");
        assert_eq!(rr.kind(), SchedulePolicy::RoundRobin);
    }
}
