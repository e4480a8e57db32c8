//! Integration scenarios for the scheduling engine.

use schedsim::{workloads, NamedSchedulePolicy, Pid, Scheduler};

/// Step until the simulation drains, with a stall guard.
fn run_to_completion(sched: &mut Scheduler) -> u64 {
    let mut steps = 0;
    while !sched.complete() {
        assert!(steps < 10_000, "simulation stalled");
        sched.step();
        steps += 1;
    }
    steps
}

fn assert_invariants(sched: &Scheduler) {
    for t in 0..sched.threads_count() {
        if let Some(process) = sched.running(t) {
            let head = process.events.front().expect("running process has events");
            assert_eq!(head.kind, schedsim::EventKind::Cpu);
            assert!(head.duration > 0);
        }
        for process in sched.waiting(t) {
            let head = process.events.front().expect("waiting process has events");
            assert_eq!(head.kind, schedsim::EventKind::Io);
            assert!(head.duration > 0);
        }

        // No pid is owned by more than one live slot of a lane.
        let mut live: Vec<Pid> = sched.running(t).map(|p| p.pid).into_iter().collect();
        live.extend(sched.ready(t).map(|p| p.pid));
        live.extend(sched.waiting(t).map(|p| p.pid));
        let mut deduped = live.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(live.len(), deduped.len(), "duplicate live pid on lane {t}");
    }

    for process in sched.finished() {
        assert!(process.events.is_empty());
        if let (Some(start), Some(finish)) = (process.start_time, process.finish_time) {
            assert!(start <= finish);
        }
    }
}

#[test]
fn single_cpu_only_process_on_one_core() {
    let mut sched = Scheduler::new(NamedSchedulePolicy::fcfs());
    sched.set_threads_count(1);
    sched.emplace_process("A", Pid(0), 0, workloads::cpu_bound(3));

    let steps = run_to_completion(&mut sched);
    assert_eq!(steps, 4);
    assert_eq!(sched.timer(), 4);

    assert_eq!(sched.finished().len(), 1);
    let a = &sched.finished()[0];
    assert_eq!(a.start_time, Some(0));
    assert_eq!(a.finish_time, Some(3));
    assert_eq!(sched.average_turnaround_time(), 3);
    assert_eq!(sched.average_waiting_time(), 0);
}

#[test]
fn mixed_cpu_io_process() {
    let mut sched = Scheduler::new(NamedSchedulePolicy::fcfs());
    sched.set_threads_count(1);
    // [Cpu 2, Io 2, Cpu 1]
    let mut events = workloads::cpu_bound(2);
    events.append(&mut workloads::io_bound(2, 1));
    sched.emplace_process("B", Pid(1), 0, events);

    run_to_completion(&mut sched);
    assert_eq!(sched.finished().len(), 1);
    let b = &sched.finished()[0];
    assert_eq!(b.start_time, Some(0));
    assert_eq!(b.finish_time, Some(5));
    assert_eq!(sched.average_turnaround_time(), 5);
}

#[test]
fn round_robin_preempts_on_quantum() {
    let mut sched = Scheduler::new(NamedSchedulePolicy::round_robin(2));
    sched.set_threads_count(1);
    sched.emplace_process("X", Pid(10), 0, workloads::cpu_bound(5));
    sched.emplace_process("Y", Pid(11), 0, workloads::cpu_bound(3));

    let steps = run_to_completion(&mut sched);

    // Quanta execute as X(2), Y(2), X(2), Y(1), X(1).
    assert_eq!(sched.finished().len(), 2);
    let y = &sched.finished()[0];
    let x = &sched.finished()[1];
    assert_eq!(y.pid, Pid(11));
    assert_eq!(y.finish_time, Some(7));
    assert_eq!(x.pid, Pid(10));
    assert_eq!(x.finish_time, Some(8));
    assert_eq!(steps, 9);

    // X ran first; Y first reached the core after X's first quantum.
    assert_eq!(x.start_time, Some(0));
    assert_eq!(y.start_time, Some(2));
}

#[test]
fn duplicate_pid_is_dropped_at_dispatch() {
    let mut sched = Scheduler::new(NamedSchedulePolicy::fcfs());
    sched.set_threads_count(1);
    sched.emplace_process("first", Pid(7), 0, workloads::cpu_bound(2));
    sched.emplace_process("second", Pid(7), 0, workloads::cpu_bound(2));

    run_to_completion(&mut sched);
    assert_eq!(sched.finished().len(), 1);
    assert_eq!(sched.finished()[0].name, "first");
}

#[test]
fn restart_replays_the_initial_workload() {
    let build = |sched: &mut Scheduler| {
        sched.set_threads_count(2);
        sched.emplace_process("a", Pid(0), 0, workloads::interactive(1, 2, 3));
        sched.emplace_process("b", Pid(1), 1, workloads::cpu_bound(4));
        sched.emplace_process("c", Pid(2), 2, workloads::io_bound(3, 1));
        sched.emplace_process("d", Pid(3), 0, workloads::cpu_bound(2));
    };

    let mut sched = Scheduler::new(NamedSchedulePolicy::fcfs());
    build(&mut sched);
    let steps = run_to_completion(&mut sched);

    let mut results: Vec<(Pid, Option<u64>)> = sched
        .finished()
        .iter()
        .map(|p| (p.pid, p.finish_time))
        .collect();
    results.sort();
    let final_timer = sched.timer();

    sched.restart();
    assert_eq!(sched.timer(), 0);
    assert!(sched.finished().is_empty());
    assert_eq!(sched.throughput(), 0.0);
    assert_eq!(sched.pending(0).count(), 2);
    assert_eq!(sched.pending(1).count(), 2);

    for _ in 0..steps {
        sched.step();
    }
    let mut replayed: Vec<(Pid, Option<u64>)> = sched
        .finished()
        .iter()
        .map(|p| (p.pid, p.finish_time))
        .collect();
    replayed.sort();

    assert_eq!(results, replayed);
    assert_eq!(sched.timer(), final_timer);
    assert!(sched.complete());
}

#[test]
fn restart_mid_run_is_deterministic() {
    let mut reference = Scheduler::new(NamedSchedulePolicy::round_robin(2));
    reference.set_threads_count(1);
    reference.emplace_process("x", Pid(0), 0, workloads::cpu_bound(6));
    reference.emplace_process("y", Pid(1), 1, workloads::io_bound(2, 3));
    let steps = run_to_completion(&mut reference);

    let mut sched = Scheduler::new(NamedSchedulePolicy::round_robin(2));
    sched.set_threads_count(1);
    sched.emplace_process("x", Pid(0), 0, workloads::cpu_bound(6));
    sched.emplace_process("y", Pid(1), 1, workloads::io_bound(2, 3));
    for _ in 0..4 {
        sched.step();
    }
    sched.restart();
    for _ in 0..steps {
        sched.step();
    }

    assert!(sched.complete());
    assert_eq!(sched.timer(), reference.timer());
    assert_eq!(sched.finished().len(), reference.finished().len());
    for (a, b) in sched.finished().iter().zip(reference.finished()) {
        assert_eq!(a.pid, b.pid);
        assert_eq!(a.finish_time, b.finish_time);
    }
}

#[test]
fn emplace_round_robins_placement_across_cores() {
    let mut sched = Scheduler::new(NamedSchedulePolicy::fcfs());
    sched.set_threads_count(2);
    for (name, pid) in [("A", 0), ("B", 1), ("C", 2), ("D", 3)] {
        sched.emplace_process(name, Pid(pid), 0, workloads::cpu_bound(1));
    }

    let lane0: Vec<&str> = sched.pending(0).map(|p| p.name.as_str()).collect();
    let lane1: Vec<&str> = sched.pending(1).map(|p| p.name.as_str()).collect();
    assert_eq!(lane0, vec!["A", "C"]);
    assert_eq!(lane1, vec!["B", "D"]);

    run_to_completion(&mut sched);
    assert_eq!(sched.finished().len(), 4);
}

#[test]
fn fcfs_schedules_in_arrival_order_without_preemption() {
    let mut sched = Scheduler::new(NamedSchedulePolicy::fcfs());
    sched.set_threads_count(1);
    let durations = [3u64, 2, 4];
    for (i, duration) in durations.into_iter().enumerate() {
        sched.emplace_process(format!("p{i}"), Pid(i as u64), 0, workloads::cpu_bound(duration));
    }

    run_to_completion(&mut sched);

    // Schedule order is arrival order, and each start time is at least the
    // total service demand of everything scheduled before it.
    let mut elapsed = 0;
    for (process, duration) in sched.finished().iter().zip(durations) {
        let start = process.start_time.expect("finished process has started");
        assert!(start - process.arrival >= elapsed);
        elapsed += duration;
    }
    assert_eq!(sched.average_waiting_time(), (0 + 3 + 5) / 3);
    assert_eq!(sched.average_turnaround_time(), (3 + 5 + 9) / 3);
}

#[test]
fn invariants_hold_throughout_a_mixed_multicore_run() {
    let mut sched = Scheduler::new(NamedSchedulePolicy::round_robin(3));
    sched.set_threads_count(3);
    for pid in 0..9u64 {
        let events = match pid % 3 {
            0 => workloads::cpu_bound(4 + pid),
            1 => workloads::io_bound(3, 2),
            _ => workloads::interactive(2, 2, 2),
        };
        sched.emplace_process(format!("p{pid}"), Pid(pid), pid % 4, events);
    }

    let mut previous_timer = 0;
    let mut steps = 0;
    while !sched.complete() {
        assert!(steps < 10_000, "simulation stalled");
        sched.step();
        steps += 1;
        assert!(sched.timer() > previous_timer);
        previous_timer = sched.timer();
        assert_invariants(&sched);
    }

    assert_eq!(sched.finished().len(), 9);
    for t in 0..sched.threads_count() {
        assert_eq!(sched.cpu_usage(t), 0.0);
    }
}
