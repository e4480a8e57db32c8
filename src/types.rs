//! Newtype wrappers and type aliases for domain concepts.
//!
//! Newtypes for identifiers (pids, arena handles) prevent silent type
//! confusion. Type aliases for quantities (ticks) provide self-documenting
//! code without the boilerplate of implementing arithmetic traits.

/// Process identifier, as assigned by the workload.
///
/// Pids are chosen by the operator (or drawn randomly) and are only required
/// to be unique among the live processes of a single core; the scheduler
/// rejects colliding arrivals at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub u64);

/// Stable handle into the scheduler's process arena.
///
/// Queues hold `ProcId`s rather than owning process state, so a process is
/// owned by exactly one queue slot while the arena keeps its storage alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcId(pub usize);

/// Simulated time in ticks.
pub type Tick = u64;
