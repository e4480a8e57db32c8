//! schedsim - Run scheduler simulations from workload scripts.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use schedsim::{
    Interpreter, NamedSchedulePolicy, SchedulePolicy, Scheduler, DEFAULT_QUANTUM, DEFAULT_SEED,
};

/// Run scheduler simulations from workload scripts.
#[derive(Parser)]
#[command(name = "schedsim")]
struct Cli {
    /// Path to a workload script.
    script: PathBuf,

    /// Scheduling policy (FCFS, FIFO, FirstComeFirstServed, FirstInFirstOut,
    /// RR, RoundRobin). A `schedule_policy` assignment in the script
    /// overrides this.
    #[arg(short, long, default_value = "FCFS")]
    policy: String,

    /// Round-Robin quantum in ticks.
    #[arg(short, long, default_value_t = DEFAULT_QUANTUM)]
    quantum: u64,

    /// PRNG seed for random spawns and per-event resource usage.
    #[arg(long, env = "SCHEDSIM_SEED", default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Abort if the simulation has not completed after this many ticks.
    #[arg(long, default_value_t = 1_000_000)]
    max_steps: u64,

    /// Print per-core queue lengths after every tick.
    #[arg(long)]
    dump_queues: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let Some(kind) = SchedulePolicy::try_from_str(&cli.policy) else {
        bail!("failed to deduce schedule policy from: {}", cli.policy);
    };
    let policy = match kind {
        SchedulePolicy::FirstComeFirstServed => NamedSchedulePolicy::fcfs(),
        SchedulePolicy::RoundRobin => NamedSchedulePolicy::round_robin(cli.quantum),
    };

    let mut sched = Scheduler::new(policy);

    let source = std::fs::read_to_string(&cli.script)
        .with_context(|| format!("unable to read file {}", cli.script.display()))?;
    Interpreter::eval_seeded(&source, &mut sched, cli.seed)
        .with_context(|| format!("could not correctly evaluate script {}", cli.script.display()))?;

    let mut steps = 0u64;
    while !sched.complete() {
        if steps >= cli.max_steps {
            bail!(
                "simulation did not complete within {} ticks; \
                 a pending process may have an unreachable arrival time",
                cli.max_steps
            );
        }
        sched.step();
        steps += 1;

        if cli.dump_queues {
            dump_queues(&sched);
        }
    }

    report(&sched);
    Ok(())
}

fn dump_queues(sched: &Scheduler) {
    println!("--- tick {} ---", sched.timer());
    for t in 0..sched.threads_count() {
        let running = sched
            .running(t)
            .map_or_else(|| "idle".to_string(), |p| p.name.clone());
        println!(
            "core {t}: running={running} ready={} waiting={} pending={} usage={:.0}%",
            sched.ready(t).count(),
            sched.waiting(t).count(),
            sched.pending(t).count(),
            sched.cpu_usage(t) * 100.0,
        );
    }
}

fn report(sched: &Scheduler) {
    println!(
        "--- simulation complete (ticks: {}, policy: {}) ---",
        sched.timer(),
        sched.policy().name()
    );
    println!("finished processes:");
    for process in sched.finished() {
        println!("    {process}");
    }
    println!(
        "throughput: {:.3} processes/tick",
        sched.throughput()
    );
    println!("average waiting time: {} ticks", sched.average_waiting_time());
    println!(
        "average turnaround time: {} ticks",
        sched.average_turnaround_time()
    );
    println!(
        "average cpu usage: {:.0}%",
        sched.average_cpu_usage() * 100.0
    );
}
