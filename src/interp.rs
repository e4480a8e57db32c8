//! Tree-walking evaluator binding scripts to a scheduler.
//!
//! Statements execute in program order against a mutable [`Scheduler`].
//! Lex and parse failures abort the whole script; evaluation failures
//! report a diagnostic and null out the offending expression while the
//! remaining top-level statements still execute.
//!
//! Diagnostics are written to stderr prefixed `[ERROR]`/`[NOTE]` and tagged
//! with the subsystem, e.g.
//! `[ERROR] (interpreter) failed to parse number from string: 12x`.

use std::fmt;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::ast::{Ast, ExpressionId, ExpressionKind, StatementKind};
use crate::engine::Scheduler;
use crate::lexer::{LexError, Lexer, Token};
use crate::parser::{ParseError, Parser};
use crate::policy::{NamedSchedulePolicy, SchedulePolicy};
use crate::process::{Event, EventKind, EventQueue};
use crate::types::Pid;

/// Seed used by [`Interpreter::eval`] when none is given.
pub const DEFAULT_SEED: u64 = 42;

const EVENT_TUPLE_EXAMPLE: &str = "(e.g. [(event_type: `Io` or `Cpu`, duration: int)])";

macro_rules! report_error {
    ($($arg:tt)*) => {
        eprintln!("[ERROR] (interpreter) {}", format_args!($($arg)*))
    };
}

macro_rules! report_note {
    ($($arg:tt)*) => {
        eprintln!("[NOTE] (interpreter) {}", format_args!($($arg)*))
    };
}

/// Fatal script-processing failures. Evaluation errors are not represented
/// here: they are diagnostics, and the script keeps running.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptError {
    Lex(LexError),
    Parse(ParseError),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Lex(e) => write!(f, "lex error: {e}"),
            ScriptError::Parse(e) => write!(f, "parse error: {e}"),
        }
    }
}

impl std::error::Error for ScriptError {}

impl From<LexError> for ScriptError {
    fn from(e: LexError) -> Self {
        ScriptError::Lex(e)
    }
}

impl From<ParseError> for ScriptError {
    fn from(e: ParseError) -> Self {
        ScriptError::Parse(e)
    }
}

/// Runtime value produced by evaluating an expression.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    None,
    String(String),
    Unsigned(u64),
    List(Vec<Value>),
}

impl Value {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            Value::Unsigned(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }
}

/// The tree-walking evaluator.
pub struct Interpreter<'a> {
    sched: &'a mut Scheduler,
    ast: Ast,
    rng: SmallRng,
    /// Pids handed out by `spawn_random_process`, for rejection sampling.
    spawned_pids: Vec<u64>,
}

impl<'a> Interpreter<'a> {
    /// Evaluate `source` against `sched` with the default seed.
    pub fn eval(source: &str, sched: &mut Scheduler) -> Result<(), ScriptError> {
        Self::eval_seeded(source, sched, DEFAULT_SEED)
    }

    /// Evaluate `source` against `sched`.
    ///
    /// The seed drives every random draw (random spawns and per-event
    /// resource usage), so identical scripts with identical seeds produce
    /// identical workloads.
    pub fn eval_seeded(source: &str, sched: &mut Scheduler, seed: u64) -> Result<(), ScriptError> {
        let tokens = Lexer::lex(source).map_err(|e| {
            report_error!("{e}");
            e
        })?;
        let ast = Parser::parse(tokens).map_err(|e| {
            report_error!("{e}");
            e
        })?;

        let mut interpreter = Interpreter {
            sched,
            ast,
            rng: SmallRng::seed_from_u64(seed),
            spawned_pids: Vec::new(),
        };
        interpreter.run();
        Ok(())
    }

    fn run(&mut self) {
        for idx in 0..self.ast.statements.len() {
            let StatementKind::Expression(id) = self.ast.statements[idx].kind;
            // Failures were already reported; sibling statements continue.
            let _ = self.evaluate(id);
        }
    }

    fn evaluate(&mut self, id: ExpressionId) -> Option<Value> {
        let kind = self.ast.expression(id).kind.clone();
        match kind {
            ExpressionKind::Call { callee, arguments } => self.call(&callee, &arguments),
            ExpressionKind::StringLiteral { literal } => Some(Value::String(literal.lexeme)),
            ExpressionKind::Number { number } => {
                parse_number(&number.lexeme).map(Value::Unsigned)
            }
            ExpressionKind::List { elements } | ExpressionKind::Tuple { elements } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }
                Some(Value::List(values))
            }
            // Identifiers are symbolic: a bare variable reads as its lexeme.
            ExpressionKind::Variable { name } => Some(Value::String(name.lexeme)),
            ExpressionKind::Constant { name, value } => self.assign_constant(&name, value),
            ExpressionKind::Range { start, end } => {
                let start = parse_number(&start.lexeme)?;
                let end = parse_number(&end.lexeme)?;
                Some(Value::List(vec![
                    Value::Unsigned(start),
                    Value::Unsigned(end),
                ]))
            }
            ExpressionKind::For { binder: _, range, body } => self.run_for(range, &body),
        }
    }

    /// `for` over a half-open range. The binder is deliberately not bound
    /// anywhere: body expressions referencing it read the identifier as a
    /// plain string.
    fn run_for(&mut self, range: ExpressionId, body: &[ExpressionId]) -> Option<Value> {
        let range_value = self.evaluate(range)?;
        let bounds = range_value.as_list().and_then(|values| {
            Some((values.first()?.as_unsigned()?, values.get(1)?.as_unsigned()?))
        });
        let Some((start, end)) = bounds else {
            report_error!("`for` expects a `start..end` range to iterate over");
            return None;
        };

        for _ in start..end {
            for &expression in body {
                // A failing body expression does not stop the loop.
                let _ = self.evaluate(expression);
            }
        }

        Some(Value::None)
    }

    fn assign_constant(&mut self, name: &Token, value: ExpressionId) -> Option<Value> {
        let key = name.lexeme.as_str();
        let value_kind = self.ast.expression(value).kind.clone();

        match value_kind {
            ExpressionKind::Variable { name: policy_name } => {
                if key == "schedule_policy" {
                    let Some(kind) = SchedulePolicy::try_from_str(&policy_name.lexeme) else {
                        report_error!(
                            "failed to deduce schedule policy from: {}",
                            policy_name.lexeme
                        );
                        return None;
                    };
                    debug!(policy = %kind, "switching schedule policy");
                    self.sched
                        .switch_schedule_policy(NamedSchedulePolicy::from_kind(kind));
                } else {
                    self.report_unknown_constant(key);
                }
            }
            ExpressionKind::Number { number } => {
                let parsed = parse_number(&number.lexeme)?;
                match key {
                    "max_processes" => self.sched.set_max_processes(parsed),
                    "max_events_per_process" => self.sched.set_max_events_per_process(parsed),
                    "max_single_event_duration" => {
                        self.sched.set_max_single_event_duration(parsed)
                    }
                    "max_arrival_time" => self.sched.set_max_arrival_time(parsed),
                    "threads_count" => self.sched.set_threads_count(parsed),
                    _ => self.report_unknown_constant(key),
                }
            }
            other => {
                report_error!(
                    "constant `{key}` must be assigned a number or a bare policy name, not a {}",
                    other.name()
                );
                return None;
            }
        }

        Some(Value::None)
    }

    fn report_unknown_constant(&self, key: &str) {
        report_error!("invalid constant for current simulation: {key}");
        report_note!(
            "available constants are: schedule_policy, max_processes, max_events_per_process, \
             max_single_event_duration, max_arrival_time, threads_count"
        );
    }

    fn call(&mut self, callee: &Token, arguments: &[ExpressionId]) -> Option<Value> {
        match callee.lexeme.as_str() {
            "spawn_process" => self.spawn_process(arguments),
            "spawn_random_process" => self.spawn_random_process(arguments),
            other => {
                report_error!("call to `{other}` is not implemented");
                None
            }
        }
    }

    fn spawn_process(&mut self, arguments: &[ExpressionId]) -> Option<Value> {
        const NAME: &str = "spawn_process";
        const ARGC: usize = 4;
        if arguments.len() != ARGC {
            report_error!(
                "failed to interpret call to builtin `{NAME}`: expected {ARGC} arguments, {} were provided",
                arguments.len()
            );
            return None;
        }

        let name_value = self.evaluate(arguments[0])?;
        let Some(name) = name_value.as_string() else {
            report_error!(
                "mismatched type for argument #0 of builtin `{NAME}`: expected type `string`"
            );
            return None;
        };
        let name = name.to_string();

        let Some(pid) = self.evaluate(arguments[1])?.as_unsigned() else {
            report_error!(
                "mismatched type for argument #1 of builtin `{NAME}`: expected type `int`"
            );
            return None;
        };

        let Some(arrival) = self.evaluate(arguments[2])?.as_unsigned() else {
            report_error!(
                "mismatched type for argument #2 of builtin `{NAME}`: expected type `int`"
            );
            return None;
        };

        let events_value = self.evaluate(arguments[3])?;
        let Some(event_values) = events_value.as_list() else {
            report_error!(
                "mismatched type for argument #3 of builtin `{NAME}`: expected type `List<Tuple: Event>`"
            );
            report_note!("{EVENT_TUPLE_EXAMPLE}");
            return None;
        };

        let events = self.list_as_event_queue(event_values)?;
        self.sched.emplace_process(name, Pid(pid), arrival, events);

        Some(Value::None)
    }

    /// Convert evaluated `(kind, duration)` tuples into an event queue,
    /// assigning each event a fresh random resource usage.
    fn list_as_event_queue(&mut self, values: &[Value]) -> Option<EventQueue> {
        let mut events = EventQueue::new();

        for tuple_value in values {
            let Some(tuple) = tuple_value.as_list() else {
                report_error!("event description must be a `(kind, duration)` tuple");
                report_note!("{EVENT_TUPLE_EXAMPLE}");
                return None;
            };
            if tuple.len() != 2 {
                report_error!(
                    "event description must have exactly two fields, {} were provided",
                    tuple.len()
                );
                report_note!("{EVENT_TUPLE_EXAMPLE}");
                return None;
            }

            let Some(kind_str) = tuple[0].as_string() else {
                report_note!("{EVENT_TUPLE_EXAMPLE}");
                return None;
            };
            let Some(duration) = tuple[1].as_unsigned() else {
                report_note!("{EVENT_TUPLE_EXAMPLE}");
                return None;
            };

            let Some(kind) = EventKind::try_from_str(kind_str) else {
                report_error!("unknown event kind: {kind_str}");
                report_note!("{EVENT_TUPLE_EXAMPLE}");
                return None;
            };
            if duration == 0 {
                report_error!("event duration must be at least 1");
                return None;
            }

            events.push_back(Event {
                kind,
                duration,
                resource_usage: self.random_usage(),
            });
        }

        Some(events)
    }

    fn spawn_random_process(&mut self, arguments: &[ExpressionId]) -> Option<Value> {
        const NAME: &str = "spawn_random_process";
        const ARGC: usize = 0;
        if arguments.len() != ARGC {
            report_error!(
                "failed to interpret call to builtin `{NAME}`: expected {ARGC} arguments, {} were provided",
                arguments.len()
            );
            return None;
        }

        let max_processes = self.sched.max_processes();
        if [
            max_processes,
            self.sched.max_events_per_process(),
            self.sched.max_single_event_duration(),
            self.sched.max_arrival_time(),
        ]
        .contains(&u64::MAX)
        {
            report_error!("`{NAME}` requires the simulation bounds to be configured");
            report_note!(
                "set `max_processes`, `max_events_per_process`, `max_single_event_duration` \
                 and `max_arrival_time` first"
            );
            return None;
        }
        if self.spawned_pids.len() as u64 >= max_processes {
            report_error!("cannot spawn another random process: all {max_processes} pids are taken");
            return None;
        }

        let mut pid = self.rng.gen_range(0..max_processes);
        while self.spawned_pids.contains(&pid) {
            pid = self.rng.gen_range(0..max_processes);
        }
        self.spawned_pids.push(pid);

        let arrival = self.rng.gen_range(0..=self.sched.max_arrival_time());
        let events_count = self.rng.gen_range(1..=self.sched.max_events_per_process());
        let mut events = EventQueue::new();
        for _ in 0..events_count {
            events.push_back(self.random_event());
        }

        self.sched.emplace_process("Process", Pid(pid), arrival, events);

        Some(Value::None)
    }

    fn random_event(&mut self) -> Event {
        let kind = if self.rng.gen_bool(0.5) {
            EventKind::Cpu
        } else {
            EventKind::Io
        };
        Event {
            kind,
            duration: self.rng.gen_range(1..=self.sched.max_single_event_duration()),
            resource_usage: self.random_usage(),
        }
    }

    fn random_usage(&mut self) -> f32 {
        self.rng.gen_range(0.01..=1.0)
    }
}

fn parse_number(lexeme: &str) -> Option<u64> {
    match lexeme.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            report_error!("failed to parse number from string: {lexeme}");
            None
        }
    }
}
