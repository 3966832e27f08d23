//! Length-prefixed, self-describing binary framing.
//!
//! Each message is a 4-byte big-endian length prefix followed by a
//! msgpack-encoded payload (§4.4). Grounded on
//! `timely_communication::networking::MessageHeader`'s `try_read`/`write_to`
//! pair, but using `byteorder` + `rmp_serde` instead of `Abomonation`'s
//! unsafe transmute encoding, since the payload here must be self-describing
//! across languages rather than a fixed Rust-only binary layout.

use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::error::TelemetryError;
use crate::handshake::HandshakeMsg;
use crate::node_def::{NodeDefinition, ParamValue};

/// Every message shape the link can carry, discriminated structurally by
/// its field set rather than an explicit tag — the wire payload is exactly
/// the reserved-key map described in §6, not a tagged Rust enum encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Frame {
    /// One leg of the three-way version/role handshake.
    Handshake(HandshakeMsg),
    /// The node definition sent as the first frame after a handshake.
    NodeDefinition(NodeDefinition),
    /// Outbound: one signal scope's values at simulation time `t`.
    Signal {
        /// The originating scope.
        scope_id: u32,
        /// Simulation time, seconds since `t0`.
        t: f64,
        /// Per-lane values.
        values: Vec<f64>,
    },
    /// Outbound: one video frame.
    Video {
        /// The originating stream.
        stream_id: u32,
        /// Monotonic frame counter within the stream.
        frame_id: u64,
        /// Frame width in pixels.
        width: u32,
        /// Frame height in pixels.
        height: u32,
        /// Encoding name, opaque to the link.
        encoding: String,
        /// Encoded frame bytes.
        #[serde(with = "serde_bytes")]
        bytes: Vec<u8>,
    },
    /// Inbound: a parameter update.
    Param {
        /// The target parameter's wire identifier.
        param_id: String,
        /// The new value.
        value: ParamValue,
    },
    /// Inbound: request to stop the executor.
    Stop {
        /// Always `true`; presence of the `stop` key is itself the signal.
        stop: bool,
    },
}

/// Writes one length-prefixed frame to `w`.
pub fn write_frame<W: Write>(w: &mut W, frame: &Frame) -> Result<(), TelemetryError> {
    let payload = rmp_serde::to_vec_named(frame)?;
    let len = u32::try_from(payload.len())
        .map_err(|_| TelemetryError::FrameTooLarge(payload.len()))?;
    w.write_u32::<BigEndian>(len)?;
    w.write_all(&payload)?;
    Ok(())
}

/// Blocks until one full length-prefixed frame has arrived on `r`, then
/// decodes it.
pub fn read_frame<R: Read>(r: &mut R) -> Result<Frame, TelemetryError> {
    let len = r.read_u32::<BigEndian>()?;
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    let frame = rmp_serde::from_slice(&buf)?;
    Ok(frame)
}
