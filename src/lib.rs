//! schedsim - Deterministic discrete-time simulator of an OS process scheduler.
//!
//! An operator configures scheduling parameters through a small scripting
//! language, supplies a workload of processes (each a queue of CPU/IO
//! events), and steps a multi-core simulation one tick at a time while
//! observing per-core queues and aggregate metrics.
//!
//! # Architecture
//!
//! - **Engine**: per-tick state machine over per-core pending/ready/waiting
//!   queues, with snapshot/restart support
//! - **Policies**: pluggable strategies (First-Come-First-Served and
//!   Round-Robin with quantum slicing)
//! - **Language**: lexer, recursive-descent parser, and tree-walking
//!   interpreter whose builtins spawn processes and mutate configuration
//!
//! # Usage
//!
//! ```rust,no_run
//! use schedsim::{Interpreter, NamedSchedulePolicy, Scheduler};
//!
//! let mut sched = Scheduler::new(NamedSchedulePolicy::fcfs());
//! let script = r#"
//!     threads_count = 2
//!     spawn_process("worker", 0, 0, [("Cpu", 5), ("Io", 2), ("Cpu", 1)])
//! "#;
//! Interpreter::eval(script, &mut sched).unwrap();
//!
//! while !sched.complete() {
//!     sched.step();
//! }
//! println!("turnaround: {}", sched.average_turnaround_time());
//! ```

pub mod ast;
pub mod cpu;
pub mod engine;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod policy;
pub mod process;
pub mod types;
pub mod workloads;

// Re-export the main public types for convenience.
pub use engine::{Scheduler, MAX_CORES};
pub use interp::{Interpreter, ScriptError, Value, DEFAULT_SEED};
pub use policy::{NamedSchedulePolicy, SchedulePolicy, ScheduleFn, DEFAULT_QUANTUM};
pub use process::{Event, EventKind, EventQueue, Process};
pub use types::{Pid, ProcId, Tick};
