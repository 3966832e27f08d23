//! Error taxonomy for the telemetry/tuning link.

use std::io;

/// Failures from framing, handshake, or the link's I/O.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The underlying byte stream failed.
    #[error("telemetry stream I/O error: {0}")]
    Io(#[from] io::Error),
    /// A frame's payload failed to encode.
    #[error("failed to encode frame payload: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    /// A frame's payload failed to decode, or matched no known frame shape.
    #[error("failed to decode frame payload: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    /// A frame's payload exceeded the 4-byte length prefix's range.
    #[error("frame payload of {0} bytes exceeds the maximum frame size")]
    FrameTooLarge(usize),
    /// The handshake's version field did not match the peer's.
    #[error("tuner handshake version mismatch: expected `{expected}`, got `{got}`")]
    HandshakeError {
        /// The initiator's own version string.
        expected: String,
        /// The version string echoed back by the peer.
        got: String,
    },
    /// The peer echoed a role incompatible with the initiator's.
    #[error("tuner handshake role mismatch: initiator is `{initiator:?}`, peer echoed `{peer:?}`")]
    RoleMismatch {
        /// The initiator's declared role.
        initiator: crate::node_def::Role,
        /// The role the peer echoed back.
        peer: crate::node_def::Role,
    },
}
