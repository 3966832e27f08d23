//! The three-way version/role handshake that opens a tuner link.
//!
//! Initiator sends `{version, role}`; the peer echoes `{version, role}`;
//! the initiator sends a final confirmation of the same shape. A version
//! mismatch is fatal (§4.4); this implementation also rejects a peer
//! echoing back its own role unchanged, since a sender talking to another
//! sender (instead of a receiver) can never make progress.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::TelemetryError;
use crate::frame::{read_frame, write_frame, Frame};
use crate::node_def::Role;

/// Current protocol version string, advertised in every handshake.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// One leg of the three-way handshake: a version/role announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakeMsg {
    /// Protocol version string.
    pub version: String,
    /// The sender's declared role.
    pub role: Role,
}

fn expect_handshake(frame: Frame) -> Result<HandshakeMsg, TelemetryError> {
    match frame {
        Frame::Handshake(msg) => Ok(msg),
        other => Err(TelemetryError::Decode(rmp_serde::decode::Error::Syntax(
            format!("expected a handshake frame, got {other:?}"),
        ))),
    }
}

/// Performs the initiator side of the handshake: send, receive the peer's
/// echo, confirm.
pub fn handshake_initiate<S: Read + Write>(
    stream: &mut S,
    role: Role,
) -> Result<(), TelemetryError> {
    let outgoing = HandshakeMsg {
        version: PROTOCOL_VERSION.to_string(),
        role,
    };
    write_frame(stream, &Frame::Handshake(outgoing.clone()))?;

    let echoed = expect_handshake(read_frame(stream)?)?;
    if echoed.version != outgoing.version {
        return Err(TelemetryError::HandshakeError {
            expected: outgoing.version,
            got: echoed.version,
        });
    }
    if echoed.role == role {
        return Err(TelemetryError::RoleMismatch {
            initiator: role,
            peer: echoed.role,
        });
    }

    write_frame(stream, &Frame::Handshake(outgoing))?;
    Ok(())
}

/// Performs the peer side of the handshake: receive, echo back, wait for
/// confirmation.
pub fn handshake_accept<S: Read + Write>(
    stream: &mut S,
    role: Role,
) -> Result<(), TelemetryError> {
    let incoming = expect_handshake(read_frame(stream)?)?;
    if incoming.role == role {
        return Err(TelemetryError::RoleMismatch {
            initiator: incoming.role,
            peer: role,
        });
    }

    let reply = HandshakeMsg {
        version: PROTOCOL_VERSION.to_string(),
        role,
    };
    write_frame(stream, &Frame::Handshake(reply.clone()))?;

    let confirmation = expect_handshake(read_frame(stream)?)?;
    if confirmation.version != reply.version {
        return Err(TelemetryError::HandshakeError {
            expected: reply.version,
            got: confirmation.version,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// A duplex in-memory stream: reads come from `inbox`, writes go to
    /// `outbox`, so both sides of a handshake can run against fixed scripts
    /// without a real socket.
    struct Duplex {
        inbox: Cursor<Vec<u8>>,
        outbox: Vec<u8>,
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inbox.read(buf)
        }
    }
    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.outbox.write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn encode(frame: &Frame) -> Vec<u8> {
        let mut buf = Vec::new();
        write_frame(&mut buf, frame).unwrap();
        buf
    }

    #[test]
    fn matching_version_and_complementary_roles_succeed() {
        let mut scripted_inbox = Vec::new();
        scripted_inbox.extend(encode(&Frame::Handshake(HandshakeMsg {
            version: PROTOCOL_VERSION.to_string(),
            role: Role::Receiver,
        })));
        let mut stream = Duplex {
            inbox: Cursor::new(scripted_inbox),
            outbox: Vec::new(),
        };
        handshake_initiate(&mut stream, Role::Sender).unwrap();
    }

    #[test]
    fn version_mismatch_is_fatal() {
        let mut scripted_inbox = Vec::new();
        scripted_inbox.extend(encode(&Frame::Handshake(HandshakeMsg {
            version: "9.9.9".to_string(),
            role: Role::Receiver,
        })));
        let mut stream = Duplex {
            inbox: Cursor::new(scripted_inbox),
            outbox: Vec::new(),
        };
        let err = handshake_initiate(&mut stream, Role::Sender).unwrap_err();
        assert!(matches!(err, TelemetryError::HandshakeError { .. }));
    }

    #[test]
    fn identical_roles_are_rejected() {
        let mut scripted_inbox = Vec::new();
        scripted_inbox.extend(encode(&Frame::Handshake(HandshakeMsg {
            version: PROTOCOL_VERSION.to_string(),
            role: Role::Sender,
        })));
        let mut stream = Duplex {
            inbox: Cursor::new(scripted_inbox),
            outbox: Vec::new(),
        };
        let err = handshake_initiate(&mut stream, Role::Sender).unwrap_err();
        assert!(matches!(err, TelemetryError::RoleMismatch { .. }));
    }
}
