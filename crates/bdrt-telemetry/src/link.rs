//! The tuner link: a thin stateful wrapper around a byte stream that
//! applies the back-pressure and reconnect policy of §4.4/§5.
//!
//! Grounded on the design note "use a bounded SPSC queue per direction plus
//! a coalescing map keyed by `scope_id`... the link task owns the socket;
//! the executor never touches it directly." The executor polls
//! [`TunerLink::drain_param_updates`]/[`TunerLink::take_stop`] once per tick
//! boundary (§4.3 step 3) instead of reading the stream itself.

use std::collections::{BTreeMap, VecDeque};
use std::io::{Read, Write};

use crate::error::TelemetryError;
use crate::frame::{read_frame, write_frame, Frame};
use crate::handshake::{handshake_accept, handshake_initiate};
use crate::node_def::{NodeDefinition, ParamValue, Role};

/// An inbound parameter update, drained by the executor at the designated
/// tick boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamUpdate {
    /// The target parameter's wire identifier.
    pub param_id: String,
    /// The new value.
    pub value: ParamValue,
}

/// A framed, bidirectional tuner connection.
///
/// `S` must be set non-blocking by the caller (e.g.
/// `TcpStream::set_nonblocking(true)`); [`TunerLink::poll_inbound`] treats
/// [`std::io::ErrorKind::WouldBlock`] as "no frame available yet", not as a
/// transport failure.
pub struct TunerLink<S> {
    stream: S,
    pending_params: VecDeque<ParamUpdate>,
    pending_stop: bool,
    outbound_signals: BTreeMap<u32, Frame>,
    reconnecting: bool,
}

impl<S: Read + Write> TunerLink<S> {
    /// Opens a link as the initiator: sends the first handshake leg.
    pub fn connect(mut stream: S, role: Role) -> Result<Self, TelemetryError> {
        handshake_initiate(&mut stream, role)?;
        Ok(TunerLink::from_handshaken(stream))
    }

    /// Opens a link as the peer: waits for the initiator's handshake leg.
    pub fn accept(mut stream: S, role: Role) -> Result<Self, TelemetryError> {
        handshake_accept(&mut stream, role)?;
        Ok(TunerLink::from_handshaken(stream))
    }

    fn from_handshaken(stream: S) -> Self {
        TunerLink {
            stream,
            pending_params: VecDeque::new(),
            pending_stop: false,
            outbound_signals: BTreeMap::new(),
            reconnecting: false,
        }
    }

    /// Sends the node definition frame. Should be called exactly once, right
    /// after a successful handshake (§4.4).
    pub fn send_node_definition(&mut self, def: NodeDefinition) -> Result<(), TelemetryError> {
        write_frame(&mut self.stream, &Frame::NodeDefinition(def))
    }

    /// Queues a signal frame for `scope_id`. If a frame for the same scope
    /// is already queued and has not yet been flushed, it is replaced —
    /// only the latest value per scope survives to the next flush (§4.4
    /// back-pressure policy).
    pub fn queue_signal(&mut self, scope_id: u32, t: f64, values: Vec<f64>) {
        self.outbound_signals
            .insert(scope_id, Frame::Signal { scope_id, t, values });
    }

    /// Writes every queued signal frame. A write failure puts the link into
    /// a reconnect state rather than propagating to the executor (§7:
    /// "transport errors on the tuner link do not stop execution").
    pub fn flush_signals(&mut self) {
        let frames: Vec<Frame> = std::mem::take(&mut self.outbound_signals)
            .into_values()
            .collect();
        for frame in frames {
            if let Err(e) = write_frame(&mut self.stream, &frame) {
                log::warn!("tuner link write failed, entering reconnect state: {e}");
                self.reconnecting = true;
                return;
            }
        }
    }

    /// Sends one video frame immediately. Dropped, not queued, while the
    /// link is reconnecting (§4.4: "video frames are dropped when the
    /// writer is not ready").
    pub fn send_video(
        &mut self,
        stream_id: u32,
        frame_id: u64,
        width: u32,
        height: u32,
        encoding: String,
        bytes: Vec<u8>,
    ) {
        if self.reconnecting {
            log::debug!("dropping video frame {frame_id} on stream {stream_id}: link reconnecting");
            return;
        }
        let frame = Frame::Video {
            stream_id,
            frame_id,
            width,
            height,
            encoding,
            bytes,
        };
        if let Err(e) = write_frame(&mut self.stream, &frame) {
            log::warn!("tuner link video write failed, entering reconnect state: {e}");
            self.reconnecting = true;
        }
    }

    /// Drains every frame currently available on the stream without
    /// blocking, filing `param`/`stop` frames into the pending queues.
    pub fn poll_inbound(&mut self) {
        loop {
            match read_frame(&mut self.stream) {
                Ok(Frame::Param { param_id, value }) => {
                    self.pending_params.push_back(ParamUpdate { param_id, value });
                }
                Ok(Frame::Stop { stop }) => {
                    if stop {
                        self.pending_stop = true;
                    }
                }
                Ok(other) => {
                    log::debug!("tuner link: ignoring unexpected inbound frame {other:?}");
                }
                Err(TelemetryError::Io(e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    break;
                }
                Err(e) => {
                    log::warn!("tuner link read failed, entering reconnect state: {e}");
                    self.reconnecting = true;
                    break;
                }
            }
        }
    }

    /// Drains every parameter update filed since the last drain. Applied
    /// atomically by the executor at the last-most-frequent clock's tick
    /// boundary (§5).
    pub fn drain_param_updates(&mut self) -> Vec<ParamUpdate> {
        self.pending_params.drain(..).collect()
    }

    /// `true` exactly once, the first time a `stop` frame has been seen
    /// since the last call.
    pub fn take_stop(&mut self) -> bool {
        std::mem::take(&mut self.pending_stop)
    }

    /// `true` if the last read or write failed and the link has not yet
    /// recovered.
    pub fn is_reconnecting(&self) -> bool {
        self.reconnecting
    }

    /// Clears the reconnect flag once the caller has re-established the
    /// underlying transport.
    pub fn mark_recovered(&mut self) {
        self.reconnecting = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque as Deque;
    use std::io;

    /// An in-memory duplex stream whose `read` returns `WouldBlock` once its
    /// scripted inbox is exhausted, so [`TunerLink::poll_inbound`] can be
    /// exercised without a real non-blocking socket.
    struct MockStream {
        inbox: Deque<u8>,
        outbox: Vec<u8>,
    }

    impl MockStream {
        fn new() -> Self {
            MockStream {
                inbox: Deque::new(),
                outbox: Vec::new(),
            }
        }

        fn script(&mut self, frame: &Frame) {
            let mut buf = Vec::new();
            write_frame(&mut buf, frame).unwrap();
            self.inbox.extend(buf);
        }
    }

    impl Read for MockStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.inbox.is_empty() {
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "no data"));
            }
            let mut n = 0;
            while n < buf.len() {
                match self.inbox.pop_front() {
                    Some(byte) => {
                        buf[n] = byte;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    impl Write for MockStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.outbox.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn linked() -> TunerLink<MockStream> {
        TunerLink::from_handshaken(MockStream::new())
    }

    #[test]
    fn signal_coalescing_keeps_only_latest_per_scope() {
        let mut link = linked();
        link.queue_signal(1, 0.0, vec![1.0]);
        link.queue_signal(1, 0.01, vec![2.0]);
        link.queue_signal(2, 0.0, vec![9.0]);
        assert_eq!(link.outbound_signals.len(), 2);
        link.flush_signals();
        assert!(link.outbound_signals.is_empty());
    }

    #[test]
    fn param_and_stop_frames_are_filed_separately() {
        let mut link = linked();
        link.stream.script(&Frame::Param {
            param_id: "gain".into(),
            value: ParamValue::Number(3.0),
        });
        link.stream.script(&Frame::Stop { stop: true });
        link.poll_inbound();

        let updates = link.drain_param_updates();
        assert_eq!(
            updates,
            vec![ParamUpdate {
                param_id: "gain".into(),
                value: ParamValue::Number(3.0),
            }]
        );
        assert!(link.take_stop());
        assert!(!link.take_stop());
    }

    #[test]
    fn would_block_stops_polling_without_entering_reconnect() {
        let mut link = linked();
        link.poll_inbound();
        assert!(!link.is_reconnecting());
        assert!(link.drain_param_updates().is_empty());
    }

    #[test]
    fn video_frames_are_dropped_while_reconnecting() {
        let mut link = linked();
        link.reconnecting = true;
        link.send_video(1, 0, 4, 4, "bgr8".into(), vec![0; 48]);
        assert!(link.stream.outbox.is_empty());
    }
}
