//! The real-time executor: drives compiled plans on wall-clock time without
//! drift, enforces period budgets, and surfaces stop conditions (§4.3, §5).
//!
//! Scheduling model: rather than one OS thread per clock (which would pull
//! in an async runtime or raw thread spawning this workspace's teacher does
//! not use), every clock's absolute firing schedule is merged onto a single
//! cooperative loop ordered by scheduled time — exactly the "conflict
//! policy" the design explicitly sanctions for a single-core host ("tasks
//! execute serially... a conflict policy of higher-frequency clock defers
//! by one tick is acceptable"). Each clock still gets its own independent
//! absolute re-arming timeline; only the act of *waiting* is shared.

use std::collections::{BinaryHeap, HashMap};
use std::io::{Read, Write};
use std::time::{Duration, Instant};

use std::cmp::Reverse;

use bdrt_telemetry::TunerLink;

use crate::block::{BlockId, Kind, ParamValue};
use crate::error::ExecutorError;
use crate::graph::{ClockId, Graph};
use crate::logging::{Event, LogSink, Sink};
use crate::planner::{DispatchOp, Plan};

/// Wall-clock setup buffer on a host computer: time reserved before the
/// first tick to let every clock's timer get armed (§4.3).
pub const SETUP_BUFFER_HOST: Duration = Duration::from_secs(1);
/// Wall-clock setup buffer on an embedded target: none, the timers are
/// armed synchronously at startup.
pub const SETUP_BUFFER_EMBEDDED: Duration = Duration::from_secs(0);

/// Why the executor stopped.
#[derive(Debug, Clone)]
pub enum StopCause {
    /// `state.stop` was set externally (a tuner `stop` frame).
    Requested,
    /// `state.T` was reached.
    MaxTimeReached,
    /// A block failed during a tick.
    Failure(ExecutorError),
}

impl std::fmt::Display for StopCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopCause::Requested => write!(f, "stop requested"),
            StopCause::MaxTimeReached => write!(f, "max time reached"),
            StopCause::Failure(e) => write!(f, "block failure: {e}"),
        }
    }
}

/// Run-time configuration not carried by the graph itself.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Time reserved between `run` start and the first tick.
    pub setup_buffer: Duration,
    /// Soft deadline: the executor stops once simulation time reaches this,
    /// if set (`state.T`).
    pub max_time: Option<f64>,
    /// If `true`, the first tick of every non-Source block in the plan is
    /// skipped, per the configurable variant of design note (iii) — off by
    /// default, since the recommended canonical behavior is not to skip.
    pub skip_first_tick: bool,
}

impl RunConfig {
    /// Host defaults: 1s setup buffer, no max time, no skipped tick.
    pub fn host() -> Self {
        RunConfig {
            setup_buffer: SETUP_BUFFER_HOST,
            max_time: None,
            skip_first_tick: false,
        }
    }

    /// Embedded defaults: no setup buffer.
    pub fn embedded() -> Self {
        RunConfig {
            setup_buffer: SETUP_BUFFER_EMBEDDED,
            max_time: None,
            skip_first_tick: false,
        }
    }
}

/// Abstracts wall-clock time so tests can run a schedule without waiting in
/// real time.
pub trait WallClock {
    /// The current instant.
    fn now(&self) -> Instant;
    /// Blocks (or busy-waits, or does nothing) until `deadline`.
    fn sleep_until(&self, deadline: Instant);
}

/// The real wall clock: sleeps with [`std::thread::sleep`].
pub struct RealClock;

impl WallClock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) {
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }
}

/// Encodes a `(block, parameter name)` pair as the wire identifier used in
/// tuner `param` frames and node definitions.
pub fn encode_param_id(block: BlockId, name: &str) -> String {
    format!("{block}:{name}")
}

/// The inverse of [`encode_param_id`].
pub fn decode_param_id(id: &str) -> Option<(BlockId, &str)> {
    let (block, name) = id.split_once(':')?;
    Some((block.parse().ok()?, name))
}

fn to_core_param_value(value: bdrt_telemetry::ParamValue) -> ParamValue {
    match value {
        bdrt_telemetry::ParamValue::Number(n) => ParamValue::Number(n),
        bdrt_telemetry::ParamValue::Text(s) => ParamValue::Text(s),
        bdrt_telemetry::ParamValue::Bool(b) => ParamValue::Bool(b),
    }
}

struct Schedule {
    t_prev: HashMap<ClockId, f64>,
    next_fire: BinaryHeap<Reverse<(Instant, ClockId)>>,
    period: HashMap<ClockId, Duration>,
}

/// Runs every plan in `plans` against `graph` until a stop condition is
/// reached.
///
/// `link`, if present, is polled for pending parameter updates and `stop`
/// requests once per tick of the last (most frequent) clock, and is never
/// touched outside that boundary (§5: "the link task owns the socket; the
/// executor never touches it directly" — here the executor touches only the
/// bounded drain queues `TunerLink` exposes, not the socket).
pub fn run<S: Read + Write>(
    graph: &mut Graph,
    plans: &HashMap<ClockId, Plan>,
    wall: &impl WallClock,
    config: RunConfig,
    mut link: Option<&mut TunerLink<S>>,
) -> Result<(), ExecutorError> {
    run_with_sink(graph, plans, wall, config, link.as_deref_mut(), &LogSink)
}

/// As [`run`], but with an explicit [`Sink`] for lifecycle events instead of
/// the default [`LogSink`].
pub fn run_with_sink<S: Read + Write>(
    graph: &mut Graph,
    plans: &HashMap<ClockId, Plan>,
    wall: &impl WallClock,
    config: RunConfig,
    mut link: Option<&mut TunerLink<S>>,
    sink: &dyn Sink,
) -> Result<(), ExecutorError> {
    for (&clock, plan) in plans {
        sink.emit(&Event::Planned {
            clock,
            block_count: plan.len(),
        });
    }

    let last_most_frequent = plans
        .keys()
        .copied()
        .min_by(|&a, &b| {
            graph
                .clock(a)
                .period
                .partial_cmp(&graph.clock(b).period)
                .expect("clock periods are never NaN")
                .then(a.cmp(&b))
        })
        .expect("at least one clock must have a plan");

    graph.start_all();

    let t0 = wall.now() + config.setup_buffer;
    let mut schedule = Schedule {
        t_prev: HashMap::new(),
        next_fire: BinaryHeap::new(),
        period: HashMap::new(),
    };
    for &clock in plans.keys() {
        let c = graph.clock(clock);
        let period = Duration::from_secs_f64(c.period);
        let first = t0 + Duration::from_secs_f64(c.offset);
        schedule.period.insert(clock, period);
        schedule.t_prev.insert(clock, -c.period);
        schedule.next_fire.push(Reverse((first, clock)));
    }

    let mut executed_order: Vec<BlockId> = Vec::new();
    let mut global_t = 0.0_f64;
    let mut skip_seen: std::collections::HashSet<BlockId> = std::collections::HashSet::new();

    let stop_cause = 'run: loop {
        let Reverse((ts, clock)) = match schedule.next_fire.pop() {
            Some(entry) => entry,
            None => break 'run StopCause::MaxTimeReached,
        };

        wall.sleep_until(ts);
        let tick_wall_start = wall.now();

        let prev_t = schedule.t_prev[&clock];
        global_t = ts.duration_since(t0).as_secs_f64();
        let dt = if prev_t < 0.0 {
            graph.clock(clock).period
        } else {
            global_t - prev_t
        };
        schedule.t_prev.insert(clock, global_t);

        sink.emit(&Event::TickStarted { clock, t: global_t });

        let plan = &plans[&clock];
        let mut failure = None;
        for entry in plan {
            if config.skip_first_tick
                && graph.kind(entry.block) != Kind::Source
                && skip_seen.insert(entry.block)
            {
                continue;
            }
            executed_order.push(entry.block);
            let result = match entry.op {
                DispatchOp::Clocked => graph.invoke_tick(entry.block, dt).and_then(|_| {
                    if graph.nout(entry.block) > 0 {
                        let produced = graph.invoke_output(entry.block, global_t)?;
                        for (port, sample) in produced.iter().enumerate() {
                            graph.propagate(entry.block, port, sample);
                        }
                    }
                    Ok(())
                }),
                DispatchOp::Sink => graph.invoke_step(entry.block),
                DispatchOp::Output => graph.invoke_output(entry.block, global_t).map(|produced| {
                    for (port, sample) in produced.iter().enumerate() {
                        graph.propagate(entry.block, port, sample);
                    }
                }),
            };
            if let Err(e) = result {
                failure = Some(ExecutorError::BlockFailure {
                    block: entry.block,
                    reason: e.0,
                });
                break;
            }
        }

        let wall_elapsed = wall.now().duration_since(tick_wall_start);
        sink.emit(&Event::TickStopped {
            clock,
            t: global_t,
            wall_secs: wall_elapsed.as_secs_f64(),
        });

        if let Some(e) = failure {
            break 'run StopCause::Failure(e);
        }

        if clock == last_most_frequent {
            if let Some(link) = link.as_deref_mut() {
                link.poll_inbound();
                for update in link.drain_param_updates() {
                    if let Some((block, name)) = decode_param_id(&update.param_id) {
                        if let Err(e) = graph.set_param(block, name, to_core_param_value(update.value)) {
                            log::warn!("tuner parameter update ignored: {e}");
                        }
                    }
                }
                if link.take_stop() {
                    break 'run StopCause::Requested;
                }
                link.flush_signals();
            }
        }

        if let Some(max_t) = config.max_time {
            if global_t >= max_t {
                break 'run StopCause::MaxTimeReached;
            }
        }

        let period = schedule.period[&clock];
        let mut next = ts + period;
        if wall_elapsed > period {
            sink.emit(&Event::BudgetViolation {
                clock,
                over_by_secs: (wall_elapsed - period).as_secs_f64(),
            });
            let now = wall.now();
            while next <= now {
                next += period;
            }
        }
        schedule.next_fire.push(Reverse((next, clock)));
    };

    graph.done_in_order(&executed_order.iter().rev().copied().collect::<Vec<_>>());
    sink.emit(&Event::Stopped {
        cause: stop_cause.to_string(),
    });

    match stop_cause {
        StopCause::Failure(e) => Err(e),
        StopCause::Requested | StopCause::MaxTimeReached => Ok(()),
    }
}
