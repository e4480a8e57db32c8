//! Per-core scheduling lane state.

use std::collections::VecDeque;

use crate::types::ProcId;

/// One logical scheduling lane.
///
/// Each live process is owned by exactly one slot: `pending` before its
/// arrival tick, `ready` while awaiting CPU, `waiting` while serving IO, or
/// `running` while on the core.
#[derive(Debug, Clone, Default)]
pub struct Core {
    /// Spawned processes whose arrival tick has not yet come.
    pub pending: VecDeque<ProcId>,
    /// Processes awaiting CPU, in dispatch order.
    pub ready: VecDeque<ProcId>,
    /// Processes serving an IO event.
    pub waiting: VecDeque<ProcId>,
    /// The process currently on the core, if any.
    pub running: Option<ProcId>,
    /// Fractional usage reported by the running process's current event.
    pub cpu_usage: f32,
}

impl Core {
    pub fn is_idle(&self) -> bool {
        self.running.is_none()
    }

    /// True when no process is owned by any slot of this lane.
    pub fn is_drained(&self) -> bool {
        self.running.is_none()
            && self.pending.is_empty()
            && self.ready.is_empty()
            && self.waiting.is_empty()
    }
}
