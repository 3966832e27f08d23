//! Block capability interface and the sample/parameter types that flow
//! across it.
//!
//! A block is a node in the computation graph with a fixed input/output
//! arity and one dominant operation, selected by its [`Kind`]. Rather than
//! have the core duck-type block implementations, [`Block`] exposes
//! `output`/`step`/`tick` as capabilities with no-op defaults; the planner
//! and executor only ever invoke the operation that a block's `Kind`
//! declares dominant (see [`crate::executor`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The closed set of block kinds the core understands.
///
/// A block's kind fixes which of [`Block::output`], [`Block::step`], and
/// [`Block::tick`] is dominant, and constrains its arity (§3 of the spec):
/// `Source` blocks have `nin == 0`, `Sink` blocks have `nout == 0`, and
/// `Clocked` blocks must carry a [`crate::graph::ClockId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// No inputs; produces output from internal state and simulation time.
    Source,
    /// No outputs; consumes its inputs as a side effect.
    Sink,
    /// Pure projection from current inputs (and optionally state) to outputs.
    Function,
    /// Stateful; advances once per tick of its associated clock.
    Clocked,
}

/// An opaque sample value carried along a wire.
///
/// The core never inspects sample contents — the planner and executor treat
/// every variant identically as "a value exists or it doesn't". The variant
/// set is narrow and closed so that the telemetry link (`bdrt-telemetry`) can
/// serialize any sample without a block-specific schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum Sample {
    /// The slot sentinel used by [`crate::graph::Graph::reset`]; no value has
    /// been produced yet on this tick.
    #[default]
    Unset,
    /// A single scalar reading.
    Scalar(f64),
    /// A fixed-order vector of scalars (e.g. a multi-lane signal).
    Vector(Vec<f64>),
    /// A raw encoded video/image frame.
    Image {
        /// Frame width in pixels.
        width: u32,
        /// Frame height in pixels.
        height: u32,
        /// Encoding name (e.g. `"bgr8"`, `"jpeg"`), opaque to the core.
        encoding: String,
        /// Encoded frame bytes.
        bytes: Vec<u8>,
    },
    /// A named bundle of nested samples, for blocks whose output is a record.
    Struct(BTreeMap<String, Sample>),
}

impl Sample {
    /// `true` if this slot still holds the reset sentinel.
    pub fn is_unset(&self) -> bool {
        matches!(self, Sample::Unset)
    }
}

/// A runtime-mutable scalar parameter exported by a block.
///
/// Mirrors the `Tuner.param(...)` constructor of the original `bdsim_realtime`
/// tuning package: a value plus an optional GUI presentation contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Stable name, used both as the tuner wire identifier and GUI label.
    pub name: String,
    /// Current value.
    pub value: ParamValue,
    /// Presentation/validity constraints.
    pub constraint: ParamConstraint,
    /// If `true`, export to the tuner even if no block declares it required.
    pub force_gui: bool,
}

/// A parameter's runtime value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// A numeric value, usable with `min`/`max`/`step`/`log_scale`.
    Number(f64),
    /// A free-text value.
    Text(String),
    /// A boolean toggle.
    Bool(bool),
}

/// Presentation and validity constraints on a [`Parameter`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamConstraint {
    /// Minimum value, for numeric parameters presented as a slider.
    pub min: Option<f64>,
    /// Maximum value, for numeric parameters presented as a slider.
    pub max: Option<f64>,
    /// Discrete choices, presented as a dropdown.
    pub oneof: Option<Vec<ParamValue>>,
    /// Slider step interval; ignored if `log_scale` is set.
    pub step: Option<f64>,
    /// Whether the slider should use a logarithmic scale.
    pub log_scale: bool,
    /// Default value for a nullable parameter (enables an enabled/disabled
    /// toggle in the GUI rather than always requiring a value).
    pub default: Option<ParamValue>,
}

/// Stable identity of a block within its owning [`crate::graph::Graph`].
pub type BlockId = usize;

/// Error returned when a tuner update names a parameter the block does not
/// export.
#[derive(Debug, Clone, thiserror::Error)]
#[error("block has no parameter named `{0}`")]
pub struct UnknownParam(pub String);

/// A block-raised failure from `output`/`step`/`tick`, fatal for the current
/// tick (spec's `BlockFailure` condition).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct BlockError(pub String);

impl From<&str> for BlockError {
    fn from(s: &str) -> Self {
        BlockError(s.to_string())
    }
}

impl From<String> for BlockError {
    fn from(s: String) -> Self {
        BlockError(s)
    }
}

/// The capability interface the core requires of every block.
///
/// Implementations live outside `bdrt-core` (waveform generators, camera
/// capture, GPIO/ADC/PWM drivers, ...); the core discovers them through
/// [`crate::registry::Registry`]. Every method has a default no-op so a
/// block only implements the operation its [`Kind`] makes dominant.
pub trait Block {
    /// This block's kind; fixes which operation below is dominant.
    fn kind(&self) -> Kind;

    /// Number of input ports (`0` for `Source`).
    fn nin(&self) -> usize;

    /// Number of output ports (`0` for `Sink`).
    fn nout(&self) -> usize;

    /// Excluded from real-time plans; checked only during simulation.
    fn sim_only(&self) -> bool {
        false
    }

    /// `true` for a continuous-time transfer-function block. Numerical
    /// integration of such blocks is out of scope for this core (it is a
    /// simulation-only concern); the planner rejects any non-`sim_only`
    /// block that reports `true` here.
    fn is_transfer(&self) -> bool {
        false
    }

    /// Pure projection from current inputs, state, and simulation time to
    /// outputs. Dominant for `Source` and `Function`; `Clocked` blocks may
    /// also implement it to expose a state feedthrough (see
    /// [`crate::executor`]'s tick algorithm).
    fn output(&mut self, _inputs: &[Sample], _t: f64) -> Result<Vec<Sample>, BlockError> {
        Ok(Vec::new())
    }

    /// Consumes the current input vector as a side effect. Dominant for
    /// `Sink`.
    fn step(&mut self, _inputs: &[Sample]) -> Result<(), BlockError> {
        Ok(())
    }

    /// Advances internal state by one clock period. Dominant for `Clocked`.
    fn tick(&mut self, _dt: f64) -> Result<(), BlockError> {
        Ok(())
    }

    /// Called once before the first tick, after [`crate::graph::Graph::reset`].
    fn start(&mut self) {}

    /// Called on every exit path to release owned resources.
    fn done(&mut self) {}

    /// Tunable parameters this block exports, in declaration order.
    fn params(&self) -> Vec<Parameter> {
        Vec::new()
    }

    /// Applies a tuner-driven update to a named parameter.
    fn set_param(&mut self, _name: &str, _value: ParamValue) -> Result<(), UnknownParam> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_default_is_unset() {
        assert!(Sample::default().is_unset());
        assert!(!Sample::Scalar(0.0).is_unset());
    }

    struct NoOpBlock;
    impl Block for NoOpBlock {
        fn kind(&self) -> Kind {
            Kind::Function
        }
        fn nin(&self) -> usize {
            1
        }
        fn nout(&self) -> usize {
            1
        }
    }

    #[test]
    fn default_capabilities_are_inert() {
        let mut b = NoOpBlock;
        assert!(b.output(&[Sample::Unset], 0.0).unwrap().is_empty());
        b.step(&[]).unwrap();
        b.tick(0.1).unwrap();
        assert!(b.params().is_empty());
        assert!(b.set_param("gain", ParamValue::Number(1.0)).is_ok());
    }
}
