//! Error taxonomy for the graph model, planner, and executor.
//!
//! One `thiserror`-derived enum per component, matching the condition-based
//! taxonomy of the design (not one giant crate-wide enum), the way
//! `aion_sim::SimError` groups every failure mode of its simulation kernel in
//! a single component-scoped type.

use crate::block::BlockId;

/// Failures raised while building or compiling a [`crate::graph::Graph`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum GraphError {
    /// `connect` targeted an input port that already has a wire.
    #[error("input port {block}:{port} is already wired")]
    ArityError {
        /// The block owning the already-wired input port.
        block: BlockId,
        /// The input port index.
        port: usize,
    },
    /// `connect` referenced a port index outside the block's declared arity.
    #[error("block {block} has no {direction} port {port}")]
    ShapeError {
        /// The offending block.
        block: BlockId,
        /// Whether the out-of-range port was an input or output.
        direction: PortDirection,
        /// The requested port index.
        port: usize,
    },
    /// `compile` found an input port with no incoming wire.
    #[error("block {block} input port {port} is unconnected")]
    TopologyError {
        /// The block with the dangling input.
        block: BlockId,
        /// The unconnected input port index.
        port: usize,
    },
    /// A block's `Kind::Clocked`-ness and its clock assignment disagree.
    #[error("block {0} is Clocked but has no clock assigned, or vice versa")]
    ClockError(BlockId),
}

/// Which side of a port an index was out of range for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    /// An input port index.
    In,
    /// An output port index.
    Out,
}

impl std::fmt::Display for PortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PortDirection::In => "input",
            PortDirection::Out => "output",
        })
    }
}

/// Failures raised while turning a compiled graph into a clock → plan map.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlanError {
    /// A non-`sim_only` continuous-time transfer block is present.
    #[error("block {0} is a continuous-time transfer block and cannot be planned for real-time execution")]
    UnsupportedBlockError(BlockId),
    /// Two clocks coexist whose periods are not integer multiples of each other.
    #[error("clock periods {a} and {b} are not divisible by one another")]
    RatioError {
        /// The first clock's period, in seconds.
        a: f64,
        /// The second clock's period, in seconds.
        b: f64,
    },
    /// After planning every clock, some non-`sim_only` block was never placed.
    #[error("blocks not reachable from any clock: {0:?}")]
    UnreachableBlockError(Vec<BlockId>),
}

/// Runtime failures from the real-time executor.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutorError {
    /// A block's `output`/`step`/`tick` failed during a tick.
    #[error("block {block} failed during tick: {reason}")]
    BlockFailure {
        /// The block whose capability call failed.
        block: BlockId,
        /// The failure's description.
        reason: String,
    },
    /// Planning failed before any timer was armed.
    #[error("planning failed: {0}")]
    Plan(#[from] PlanError),
    /// Compiling the graph failed before planning began.
    #[error("graph compilation failed: {0}")]
    Graph(#[from] GraphError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_error_message() {
        let e = GraphError::ArityError { block: 3, port: 1 };
        assert_eq!(e.to_string(), "input port 3:1 is already wired");
    }

    #[test]
    fn shape_error_message() {
        let e = GraphError::ShapeError {
            block: 2,
            direction: PortDirection::Out,
            port: 5,
        };
        assert_eq!(e.to_string(), "block 2 has no output port 5");
    }

    #[test]
    fn ratio_error_message() {
        let e = PlanError::RatioError {
            a: 1.0 / 60.0,
            b: 1.0 / 25.0,
        };
        assert!(e.to_string().contains("not divisible"));
    }

    #[test]
    fn unreachable_block_error_lists_blocks() {
        let e = PlanError::UnreachableBlockError(vec![4, 7]);
        assert_eq!(
            e.to_string(),
            "blocks not reachable from any clock: [4, 7]"
        );
    }

    #[test]
    fn clock_error_message() {
        let e = GraphError::ClockError(6);
        assert!(e.to_string().contains("block 6"));
    }

    #[test]
    fn block_failure_message() {
        let e = ExecutorError::BlockFailure {
            block: 1,
            reason: "division by zero".into(),
        };
        assert_eq!(e.to_string(), "block 1 failed during tick: division by zero");
    }

    #[test]
    fn executor_error_wraps_plan_error() {
        let e: ExecutorError = PlanError::UnsupportedBlockError(9).into();
        assert!(e.to_string().contains("planning failed"));
    }
}
