//! `bdrt-core` is the planner and real-time executor for a block-diagram
//! dataflow framework.
//!
//! A user describes a computation as a directed graph of *blocks* (sources,
//! sinks, pure functions, clocked stateful elements) wired by typed ports.
//! The code is organized so that each stage depends as little as possible on
//! the next:
//!
//! **Graph model**: the [`graph`] module holds blocks, wires, and clocks, and
//! enforces the structural invariants a plan can rely on (every input wired
//! exactly once, no cycles within a tick).
//!
//! **Planning**: the [`planner`] module turns a compiled graph into a map
//! from [`Clock`](graph::Clock) to an ordered [`Plan`](planner::Plan) —
//! the sequence in which a clock's blocks are stepped on every tick.
//!
//! **Execution**: the [`executor`] module drives each plan from a monotonic
//! clock in wall-clock time, propagating values along wires and applying
//! tuner parameter updates between ticks.
//!
//! # Example
//!
//! ```
//! use bdrt_core::block::{Block, BlockId, Kind, Sample};
//! use bdrt_core::graph::{Graph, InPort, OutPort};
//!
//! struct Constant(f64);
//! impl Block for Constant {
//!     fn kind(&self) -> Kind { Kind::Source }
//!     fn nin(&self) -> usize { 0 }
//!     fn nout(&self) -> usize { 1 }
//!     fn output(&mut self, _inputs: &[Sample], _t: f64) -> Result<Vec<Sample>, bdrt_core::block::BlockError> {
//!         Ok(vec![Sample::Scalar(self.0)])
//!     }
//! }
//!
//! let mut graph = Graph::new();
//! let _src = graph.add_block(Box::new(Constant(1.0)));
//! graph.compile().unwrap();
//! ```

#![forbid(unsafe_code)]

pub mod block;
pub mod context;
pub mod error;
pub mod executor;
pub mod graph;
pub mod logging;
pub mod order;
pub mod planner;
pub mod registry;

pub use context::BuildContext;
pub use error::{ExecutorError, GraphError, PlanError};
pub use executor::{RealClock, RunConfig, WallClock};
pub use graph::Graph;
pub use planner::plan;
