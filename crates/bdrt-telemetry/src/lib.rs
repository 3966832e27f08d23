//! `bdrt-telemetry` is the length-framed, self-describing binary link
//! between the real-time executor and an external dashboard/broker.
//!
//! Layered the way `timely_communication` separates wire framing
//! ([`frame`]) from the higher-level connection lifecycle
//! ([`handshake`], [`link`]): a message is always a 4-byte big-endian
//! length prefix followed by a msgpack payload, and everything above that
//! — the handshake, the node definition, back-pressure policy — is built
//! on top of that one primitive.

#![forbid(unsafe_code)]

pub mod error;
pub mod frame;
pub mod handshake;
pub mod link;
pub mod node_def;

pub use error::TelemetryError;
pub use frame::{read_frame, write_frame, Frame};
pub use handshake::{handshake_accept, handshake_initiate, HandshakeMsg, PROTOCOL_VERSION};
pub use link::{ParamUpdate, TunerLink};
pub use node_def::{
    NodeDefinition, ParamConstraint, ParamDescriptor, ParamValue, Role, ScopeDescriptor,
    VideoDescriptor,
};
