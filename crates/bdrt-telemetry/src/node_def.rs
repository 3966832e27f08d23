//! Wire-level node definition: the first frame sent after a successful
//! handshake, enumerating exported parameters and signal/video scopes.
//!
//! These types are intentionally independent of `bdrt-core`'s `Parameter`
//! and `Sample` types — the link only needs to serialize and deserialize
//! values, never to interpret them — the way `timely_communication`'s wire
//! types know nothing of `timely`'s `Stream`/`Operator` abstractions. The
//! executor's driver (`bdrt-cli`) is responsible for translating between
//! the two.

use serde::{Deserialize, Serialize};

/// Which end of the link a peer is declaring itself as, during the
/// handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Sends signal/video frames, receives parameter updates.
    Sender,
    /// Receives signal/video frames, sends parameter updates.
    Receiver,
}

/// A parameter's current value on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A numeric value.
    Number(f64),
    /// A free-text value.
    Text(String),
    /// A boolean toggle.
    Bool(bool),
}

/// Wire-level presentation/validity constraints for a parameter, mirroring
/// `bdrt_core::block::ParamConstraint`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamConstraint {
    /// Minimum value.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min: Option<f64>,
    /// Maximum value.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max: Option<f64>,
    /// Discrete choices.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub oneof: Option<Vec<ParamValue>>,
    /// Slider step interval.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub step: Option<f64>,
    /// Whether the slider should use a logarithmic scale.
    #[serde(default)]
    pub log_scale: bool,
    /// Default value for a nullable parameter.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub default: Option<ParamValue>,
}

/// One exported, tunable parameter, as advertised in the node definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    /// Stable wire identifier, unique within a node definition.
    pub param_id: String,
    /// Display label.
    pub label: String,
    /// Current value.
    pub value: ParamValue,
    /// Presentation/validity constraints.
    #[serde(default)]
    pub constraint: ParamConstraint,
}

/// One exported signal scope: a lane of scalar values over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeDescriptor {
    /// Stable wire identifier.
    pub scope_id: u32,
    /// Display label.
    pub label: String,
    /// Number of value lanes carried per `signal` frame for this scope.
    pub lanes: u32,
    /// Per-lane display styles (e.g. colors), opaque to the link.
    #[serde(default)]
    pub styles: Vec<String>,
}

/// One exported video stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    /// Stable wire identifier.
    pub stream_id: u32,
    /// Display label.
    pub label: String,
}

/// The first outbound frame after a successful handshake: every exported
/// parameter and scope, enumerated once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Exported tunable parameters.
    pub params: Vec<ParamDescriptor>,
    /// Exported signal scopes.
    pub scopes: Vec<ScopeDescriptor>,
    /// Exported video streams.
    #[serde(default)]
    pub videos: Vec<VideoDescriptor>,
}
