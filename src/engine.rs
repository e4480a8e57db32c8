//! Discrete-time scheduling engine.
//!
//! This is the core of the simulator. It maintains the per-core queues, the
//! simulated clock, the process arena, and drives the configured policy
//! once per tick on every idle core.
//!
//! One `step()` advances simulated time by exactly one tick. Per core, in
//! index order, a tick runs: arrival dispatch, waiting service, running
//! service, policy apply (plus a safety net), observation update. The
//! global timer increments after all cores are processed.

use tracing::{debug, info};

use crate::cpu::Core;
use crate::policy::NamedSchedulePolicy;
use crate::process::{EventKind, EventQueue, Process};
use crate::types::{Pid, ProcId, Tick};

/// Upper bound on the number of scheduling lanes.
pub const MAX_CORES: usize = 9;

/// The multi-core process scheduler.
///
/// All mutation happens inside [`step`](Scheduler::step),
/// [`emplace_process`](Scheduler::emplace_process),
/// [`switch_schedule_policy`](Scheduler::switch_schedule_policy), and
/// [`restart`](Scheduler::restart), each of which must be called from a
/// single driver. No operation suspends, blocks, or performs I/O.
pub struct Scheduler {
    cores: Vec<Core>,
    /// Append-only process storage; queues reference entries by [`ProcId`].
    arena: Vec<Process>,
    policy: NamedSchedulePolicy,
    timer: Tick,

    max_processes: u64,
    max_events_per_process: u64,
    max_single_event_duration: u64,
    max_arrival_time: u64,
    threads_count: usize,

    /// Round-robin placement cursor for `emplace_process`.
    next_thread: usize,

    throughput: f64,
    previous_finished_count: usize,
    /// Frozen deep copies of every process whose event queue drained.
    finished: Vec<Process>,

    /// Deep-copy snapshot of the initial workload, per core.
    processes_backup: Vec<Vec<Process>>,
    valid_backup: bool,
}

impl Scheduler {
    pub fn new(policy: NamedSchedulePolicy) -> Self {
        Scheduler {
            cores: vec![Core::default(); MAX_CORES],
            arena: Vec::new(),
            policy,
            timer: 0,
            max_processes: u64::MAX,
            max_events_per_process: u64::MAX,
            max_single_event_duration: u64::MAX,
            max_arrival_time: u64::MAX,
            threads_count: MAX_CORES,
            next_thread: 0,
            throughput: 0.0,
            previous_finished_count: 0,
            finished: Vec::new(),
            processes_backup: vec![Vec::new(); MAX_CORES],
            valid_backup: false,
        }
    }

    /// Spawn a process into the pending queue of the next lane.
    ///
    /// Placement round-robins across lanes. Until the first `step()` call
    /// the spawn is also recorded in the workload backup that powers
    /// [`restart`](Scheduler::restart).
    pub fn emplace_process(
        &mut self,
        name: impl Into<String>,
        pid: Pid,
        arrival: Tick,
        events: EventQueue,
    ) -> ProcId {
        let process = Process::new(name, pid, arrival, events);
        debug!(
            name = process.name.as_str(),
            pid = pid.0,
            arrival,
            core = self.next_thread,
            "spawned process"
        );

        if !self.valid_backup {
            self.processes_backup[self.next_thread].push(process.clone());
        }

        let id = ProcId(self.arena.len());
        self.arena.push(process);
        self.cores[self.next_thread].pending.push_back(id);
        self.next_thread = (self.next_thread + 1) % self.threads_count;
        id
    }

    /// Replace the active scheduling policy. Queues and clock are untouched.
    pub fn switch_schedule_policy(&mut self, policy: NamedSchedulePolicy) {
        self.policy = policy;
    }

    /// True iff every lane has drained completely.
    pub fn complete(&self) -> bool {
        self.cores.iter().all(Core::is_drained)
    }

    /// Advance simulated time by one tick.
    pub fn step(&mut self) {
        self.valid_backup = true;

        for t in 0..self.threads_count {
            self.dispatch_arrivals(t);
            self.service_waiting(t);
            self.service_running(t);

            if self.cores[t].is_idle() {
                let policy = self.policy.clone();
                policy.apply(self);
            }
            // Safety net: a policy that skipped this lane must not stall it.
            if self.cores[t].is_idle() && !self.cores[t].ready.is_empty() {
                self.dispatch_next_ready(t);
            }

            self.refresh_observations(t);
        }

        self.timer += 1;
    }

    /// Reset the simulation to its initial workload.
    ///
    /// Requires that at least one `step()` has sealed the workload backup.
    /// The clock, placement cursor, metrics and all queues are reset; the
    /// pending queues are repopulated with fresh copies of the originally
    /// spawned processes. Policy and configuration are preserved.
    pub fn restart(&mut self) {
        assert!(
            self.valid_backup,
            "restart requires a sealed workload backup (step the simulation first)"
        );

        self.timer = 0;
        self.next_thread = 0;
        self.throughput = 0.0;
        self.previous_finished_count = 0;
        self.finished.clear();

        for core in &mut self.cores {
            core.pending.clear();
            core.ready.clear();
            core.waiting.clear();
            core.running = None;
            core.cpu_usage = 0.0;
        }

        for t in 0..MAX_CORES {
            for process in &self.processes_backup[t] {
                let id = ProcId(self.arena.len());
                self.arena.push(process.clone());
                self.cores[t].pending.push_back(id);
            }
        }

        info!("simulation restarted from workload backup");
    }

    /// Pop the front of a lane's ready queue onto the core, if it is idle.
    ///
    /// This is the primitive the built-in policies (and the tick loop's
    /// safety net) are built from. Returns the dispatched process id.
    pub fn dispatch_next_ready(&mut self, core: usize) -> Option<ProcId> {
        if self.cores[core].running.is_some() {
            return None;
        }
        let id = self.cores[core].ready.pop_front()?;
        let timer = self.timer;
        let process = &mut self.arena[id.0];
        let head = process
            .events
            .front()
            .expect("ready process must have events");
        assert!(
            head.kind == EventKind::Cpu && head.duration > 0,
            "ready process must lead with a positive-duration Cpu event"
        );
        // First transition into CPU execution; set once.
        if process.start_time.is_none() {
            process.start_time = Some(timer);
        }
        debug!(
            core,
            pid = process.pid.0,
            task = process.name.as_str(),
            "running"
        );
        self.cores[core].running = Some(id);
        Some(id)
    }

    // -- per-tick phases ---------------------------------------------------

    /// Move every pending process whose arrival tick is now into the lane,
    /// dropping arrivals that collide on pid or carry no events.
    fn dispatch_arrivals(&mut self, t: usize) {
        let mut idx = 0;
        while idx < self.cores[t].pending.len() {
            let id = self.cores[t].pending[idx];
            let process = &self.arena[id.0];
            if process.arrival != self.timer {
                idx += 1;
                continue;
            }

            let (pid, name) = (process.pid, process.name.clone());
            self.cores[t].pending.remove(idx);

            if !self.pid_is_unique(t, pid) {
                eprintln!(
                    "[ERROR] (scheduler) process {} with pid {} is already in use, skipping...",
                    name, pid.0
                );
                continue;
            }
            if self.arena[id.0].events.is_empty() {
                eprintln!(
                    "[ERROR] (scheduler) process {} with pid {} should at least have one event, skipping...",
                    name, pid.0
                );
                continue;
            }

            self.dispatch_by_first_event(t, id);
        }
    }

    /// Serve one tick of IO for every waiting process; completed waits are
    /// re-dispatched or finalised.
    fn service_waiting(&mut self, t: usize) {
        let mut to_dispatch = Vec::new();
        let mut idx = 0;
        while idx < self.cores[t].waiting.len() {
            let id = self.cores[t].waiting[idx];
            let process = &mut self.arena[id.0];
            let event = process
                .events
                .front_mut()
                .expect("waiting process must have events");
            assert!(
                event.kind == EventKind::Io && event.duration > 0,
                "waiting process must be serving a positive-duration Io event"
            );
            event.duration -= 1;

            if event.duration == 0 {
                process.events.pop_front();
                self.cores[t].waiting.remove(idx);
                if self.arena[id.0].events.is_empty() {
                    self.finalize(t, id);
                } else {
                    to_dispatch.push(id);
                }
            } else {
                idx += 1;
            }
        }

        for id in to_dispatch {
            self.dispatch_by_first_event(t, id);
        }
    }

    /// Serve one tick of CPU for the running process, if any; a completed
    /// burst vacates the core and the process is re-dispatched or finalised.
    fn service_running(&mut self, t: usize) {
        let Some(id) = self.cores[t].running else {
            return;
        };
        let process = &mut self.arena[id.0];
        let event = process
            .events
            .front_mut()
            .expect("running process must have events");
        assert!(
            event.kind == EventKind::Cpu && event.duration > 0,
            "running process must be serving a positive-duration Cpu event"
        );
        event.duration -= 1;

        if event.duration == 0 {
            process.events.pop_front();
            self.cores[t].running = None;
            if self.arena[id.0].events.is_empty() {
                self.finalize(t, id);
            } else {
                self.dispatch_by_first_event(t, id);
            }
        }
    }

    /// Route a process into ready or waiting based on its head event.
    fn dispatch_by_first_event(&mut self, t: usize, id: ProcId) {
        let process = &self.arena[id.0];
        let head = process
            .events
            .front()
            .expect("dispatched process must have events");
        match head.kind {
            EventKind::Cpu => self.cores[t].ready.push_back(id),
            EventKind::Io => self.cores[t].waiting.push_back(id),
        }
    }

    /// Record a drained process as finished and freeze a copy of its state.
    fn finalize(&mut self, t: usize, id: ProcId) {
        let process = &mut self.arena[id.0];
        if process.finish_time.is_none() {
            process.finish_time = Some(self.timer);
        }
        info!(
            core = t,
            task = process.name.as_str(),
            pid = process.pid.0,
            finish = self.timer,
            "FINISHED"
        );
        self.finished.push(process.clone());
    }

    /// Refresh utilisation and throughput after a lane's tick phases.
    fn refresh_observations(&mut self, t: usize) {
        if let Some(id) = self.cores[t].running {
            let head = self.arena[id.0]
                .events
                .front()
                .expect("running process must have events");
            self.cores[t].cpu_usage = head.resource_usage;
        }

        if self.complete() {
            for core in &mut self.cores {
                core.cpu_usage = 0.0;
            }
        }

        self.throughput = if self.timer != 0 {
            self.finished.len() as f64 / self.timer as f64
        } else {
            0.0
        };
        self.previous_finished_count = self.finished.len();
    }

    /// A pid is unique on a lane when no live (running/ready/waiting)
    /// process of that lane carries it. Pending entries are not considered:
    /// they have not arrived yet.
    fn pid_is_unique(&self, t: usize, pid: Pid) -> bool {
        let core = &self.cores[t];
        let live = |id: &ProcId| self.arena[id.0].pid == pid;
        core.running.map_or(true, |id| self.arena[id.0].pid != pid)
            && !core.ready.iter().any(live)
            && !core.waiting.iter().any(live)
    }

    // -- metrics -----------------------------------------------------------

    /// Mean of `start_time - arrival` over finished processes.
    pub fn average_waiting_time(&self) -> Tick {
        if self.finished.is_empty() {
            return 0;
        }
        let total: Tick = self
            .finished
            .iter()
            .filter_map(|p| p.start_time.map(|start| start - p.arrival))
            .sum();
        total / self.finished.len() as Tick
    }

    /// Mean of `finish_time - arrival` over finished processes.
    pub fn average_turnaround_time(&self) -> Tick {
        if self.finished.is_empty() {
            return 0;
        }
        let total: Tick = self
            .finished
            .iter()
            .filter_map(|p| p.finish_time.map(|finish| finish - p.arrival))
            .sum();
        total / self.finished.len() as Tick
    }

    /// Mean fractional usage across the active lanes.
    pub fn average_cpu_usage(&self) -> f64 {
        let total: f64 = self.cores[..self.threads_count]
            .iter()
            .map(|core| core.cpu_usage as f64)
            .sum();
        total / self.threads_count as f64
    }

    // -- observation surface ----------------------------------------------

    pub fn timer(&self) -> Tick {
        self.timer
    }

    /// Finished processes per tick.
    pub fn throughput(&self) -> f64 {
        self.throughput
    }

    pub fn policy(&self) -> &NamedSchedulePolicy {
        &self.policy
    }

    pub fn threads_count(&self) -> usize {
        self.threads_count
    }

    pub fn finished(&self) -> &[Process] {
        &self.finished
    }

    /// Finished count as of the previous observation update.
    pub fn previous_finished_count(&self) -> usize {
        self.previous_finished_count
    }

    pub fn cpu_usage(&self, core: usize) -> f32 {
        self.cores[core].cpu_usage
    }

    pub fn running(&self, core: usize) -> Option<&Process> {
        self.cores[core].running.map(|id| &self.arena[id.0])
    }

    pub fn ready(&self, core: usize) -> impl Iterator<Item = &Process> {
        self.cores[core].ready.iter().map(|id| &self.arena[id.0])
    }

    pub fn waiting(&self, core: usize) -> impl Iterator<Item = &Process> {
        self.cores[core].waiting.iter().map(|id| &self.arena[id.0])
    }

    pub fn pending(&self, core: usize) -> impl Iterator<Item = &Process> {
        self.cores[core].pending.iter().map(|id| &self.arena[id.0])
    }

    pub fn process(&self, id: ProcId) -> &Process {
        &self.arena[id.0]
    }

    /// Mutable process access for policy callbacks (e.g. quantum slicing).
    pub fn process_mut(&mut self, id: ProcId) -> &mut Process {
        &mut self.arena[id.0]
    }

    // -- configuration -----------------------------------------------------

    pub fn max_processes(&self) -> u64 {
        self.max_processes
    }

    pub fn set_max_processes(&mut self, value: u64) {
        self.max_processes = value;
    }

    pub fn max_events_per_process(&self) -> u64 {
        self.max_events_per_process
    }

    pub fn set_max_events_per_process(&mut self, value: u64) {
        self.max_events_per_process = value;
    }

    pub fn max_single_event_duration(&self) -> u64 {
        self.max_single_event_duration
    }

    pub fn set_max_single_event_duration(&mut self, value: u64) {
        self.max_single_event_duration = value;
    }

    pub fn max_arrival_time(&self) -> u64 {
        self.max_arrival_time
    }

    pub fn set_max_arrival_time(&mut self, value: u64) {
        self.max_arrival_time = value;
    }

    /// Set the number of scheduling lanes, clamped to `[1, MAX_CORES]`.
    pub fn set_threads_count(&mut self, value: u64) {
        self.threads_count = (value as usize).clamp(1, MAX_CORES);
        // Keep the placement cursor inside the active lanes.
        self.next_thread %= self.threads_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::NamedSchedulePolicy;
    use crate::workloads;

    fn fcfs_scheduler(threads: u64) -> Scheduler {
        let mut sched = Scheduler::new(NamedSchedulePolicy::fcfs());
        sched.set_threads_count(threads);
        sched
    }

    #[test]
    fn threads_count_is_clamped() {
        let mut sched = fcfs_scheduler(1);
        assert_eq!(sched.threads_count(), 1);
        sched.set_threads_count(0);
        assert_eq!(sched.threads_count(), 1);
        sched.set_threads_count(100);
        assert_eq!(sched.threads_count(), MAX_CORES);
    }

    #[test]
    fn shrinking_threads_count_rewinds_placement_cursor() {
        let mut sched = fcfs_scheduler(4);
        for pid in 0..3 {
            sched.emplace_process("p", Pid(pid), 0, workloads::cpu_bound(1));
        }
        // Cursor sits on lane 3; shrinking to 2 lanes must pull it back in.
        sched.set_threads_count(2);
        sched.emplace_process("p", Pid(3), 0, workloads::cpu_bound(1));
        assert_eq!(sched.pending(1).count(), 2);
    }

    #[test]
    fn emplace_round_robins_across_lanes() {
        let mut sched = fcfs_scheduler(2);
        for pid in 0..4 {
            sched.emplace_process("p", Pid(pid), 0, workloads::cpu_bound(1));
        }
        let lane0: Vec<u64> = sched.pending(0).map(|p| p.pid.0).collect();
        let lane1: Vec<u64> = sched.pending(1).map(|p| p.pid.0).collect();
        assert_eq!(lane0, vec![0, 2]);
        assert_eq!(lane1, vec![1, 3]);
    }

    #[test]
    fn backup_seals_on_first_step() {
        let mut sched = fcfs_scheduler(1);
        sched.emplace_process("early", Pid(0), 0, workloads::cpu_bound(1));
        sched.step();
        // Spawns after the first step are not part of the backup.
        sched.emplace_process("late", Pid(1), 5, workloads::cpu_bound(1));
        while !sched.complete() {
            sched.step();
        }
        assert_eq!(sched.finished().len(), 2);

        sched.restart();
        assert_eq!(sched.pending(0).count(), 1);
        assert_eq!(sched.pending(0).next().unwrap().name, "early");
        assert_eq!(sched.timer(), 0);
        assert!(sched.finished().is_empty());
        assert_eq!(sched.throughput(), 0.0);
        assert_eq!(sched.previous_finished_count(), 0);
    }

    #[test]
    fn completed_simulation_is_frozen() {
        let mut sched = fcfs_scheduler(1);
        sched.emplace_process("a", Pid(0), 0, workloads::cpu_bound(2));
        while !sched.complete() {
            sched.step();
        }
        let finished = sched.finished().len();

        sched.step();
        sched.step();
        assert_eq!(sched.finished().len(), finished);
        assert!(sched.complete());
        for t in 0..sched.threads_count() {
            assert_eq!(sched.cpu_usage(t), 0.0);
            assert!(sched.running(t).is_none());
            assert_eq!(sched.ready(t).count(), 0);
            assert_eq!(sched.waiting(t).count(), 0);
            assert_eq!(sched.pending(t).count(), 0);
        }
    }

    #[test]
    fn late_spawned_arrival_in_the_past_never_dispatches() {
        let mut sched = fcfs_scheduler(1);
        sched.emplace_process("a", Pid(0), 0, workloads::cpu_bound(1));
        sched.step();
        sched.step();
        // Arrival tick 1 already elapsed; the process stays pending.
        sched.emplace_process("ghost", Pid(1), 1, workloads::cpu_bound(1));
        for _ in 0..5 {
            sched.step();
        }
        assert_eq!(sched.pending(0).count(), 1);
        assert!(!sched.complete());
    }

    #[test]
    fn empty_event_queue_is_rejected_at_dispatch() {
        let mut sched = fcfs_scheduler(1);
        sched.emplace_process("hollow", Pid(0), 0, EventQueue::new());
        sched.step();
        assert!(sched.complete());
        assert!(sched.finished().is_empty());
    }
}
