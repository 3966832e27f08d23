//! Structured lifecycle events, forwarded to the `log` facade by default.
//!
//! Mirrors `timely::logging`'s pattern of a small closed event enum behind a
//! sink trait, scaled down to the handful of lifecycle events this executor
//! actually needs: plan announcement, tick boundaries, budget violations,
//! and the terminal stop. Tooling that wants structured events rather than
//! text can supply its own [`Sink`]; the CLI driver uses [`LogSink`], which
//! forwards everything to `log::*!`.

use crate::graph::ClockId;

/// One lifecycle event raised by the planner or executor.
#[derive(Debug, Clone)]
pub enum Event {
    /// A plan was compiled for `clock`, containing `block_count` blocks.
    Planned {
        /// The clock the plan belongs to.
        clock: ClockId,
        /// Number of blocks in the plan, in schedule order.
        block_count: usize,
    },
    /// `clock`'s plan began executing at simulation time `t`.
    TickStarted {
        /// The firing clock.
        clock: ClockId,
        /// Simulation time, seconds since `t0`.
        t: f64,
    },
    /// `clock`'s plan finished executing; `wall_secs` is how long it took.
    TickStopped {
        /// The firing clock.
        clock: ClockId,
        /// Simulation time at tick start.
        t: f64,
        /// Wall-clock duration of the tick, in seconds.
        wall_secs: f64,
    },
    /// A tick's wall-clock duration exceeded the clock's period.
    BudgetViolation {
        /// The clock whose budget was exceeded.
        clock: ClockId,
        /// How far over budget the tick ran, in seconds.
        over_by_secs: f64,
    },
    /// The executor stopped; `cause` describes why.
    Stopped {
        /// Human-readable stop cause.
        cause: String,
    },
}

/// Receives [`Event`]s as they occur.
pub trait Sink {
    /// Handles one event.
    fn emit(&self, event: &Event);
}

/// The default sink: forwards every event to the `log` facade.
pub struct LogSink;

impl Sink for LogSink {
    fn emit(&self, event: &Event) {
        match event {
            Event::Planned { clock, block_count } => {
                log::info!("clock {clock}: plan has {block_count} block(s)");
            }
            Event::TickStarted { clock, t } => {
                log::debug!("clock {clock}: tick started at t={t:.6}");
            }
            Event::TickStopped { clock, t, wall_secs } => {
                log::trace!("clock {clock}: tick at t={t:.6} took {wall_secs:.6}s");
            }
            Event::BudgetViolation { clock, over_by_secs } => {
                log::warn!(
                    "clock {clock}: period budget exceeded by {over_by_secs:.6}s"
                );
            }
            Event::Stopped { cause } => {
                log::info!("executor stopped: {cause}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct CollectingSink(RefCell<Vec<String>>);
    impl Sink for CollectingSink {
        fn emit(&self, event: &Event) {
            self.0.borrow_mut().push(format!("{event:?}"));
        }
    }

    #[test]
    fn sink_receives_events_in_order() {
        let sink = CollectingSink(RefCell::new(Vec::new()));
        sink.emit(&Event::Planned {
            clock: 0,
            block_count: 3,
        });
        sink.emit(&Event::Stopped {
            cause: "state.T reached".into(),
        });
        let log = sink.0.into_inner();
        assert_eq!(log.len(), 2);
        assert!(log[0].contains("Planned"));
        assert!(log[1].contains("Stopped"));
    }
}
