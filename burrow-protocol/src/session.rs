//! Session State Machine
//!
//! Manages the lifecycle of a burrow session from handshake through data
//! transfer to shutdown. The session owns the sequence/acknowledgment
//! bookkeeping, the outgoing byte queue, and the retransmission gate; an
//! external poll loop drives it by alternately asking for an outgoing
//! frame and handing it received frames.
//!
//! Reliability is stop-and-wait: bytes stay in the outgoing queue until
//! the peer's cumulative acknowledgment covers them, and whatever is
//! unacknowledged when the retransmission gate reopens is re-sent
//! verbatim. There is exactly one in-flight span at a time, bounded by
//! the carrier's frame budget.

use crate::buffer::ByteQueue;
use crate::driver::Driver;
use crate::packet::{FinPayload, MsgPayload, Packet, PacketBody, PacketError, SessionOptions, SynPayload};
use crate::sequence::SeqNumber;
use crate::timer::{RetransmitTimer, DEFAULT_RETRANSMIT_DELAY};
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Session state
///
/// "Closed" is not a state: shutdown is the orthogonal `is_shutdown`
/// flag, and a session never regresses from `Established`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handshake not yet completed; SYN frames go out each interval
    New,
    /// Handshake complete, carrying data
    Established,
}

/// Terminal session errors
///
/// Survivable anomalies (stray frames, failed SEQ/ACK validation,
/// undecodable input) are logged and swallowed; only violations that end
/// the session surface here, after the session has already moved to its
/// terminal state. The hosting application decides what to do next.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("peer sent an unrecognized frame kind: 0x{0:02x}")]
    UnknownFrameKind(u8),
}

/// Session construction parameters
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Optional human-readable label, advertised in the SYN
    pub name: Option<String>,
    /// Fixed initial sequence number instead of a random one (testing)
    pub initial_seq: Option<u16>,
    /// Delay between transmission attempts
    pub retransmit_delay: Duration,
    /// Log every constructed and parsed frame
    pub packet_trace: bool,
    /// Options advertised during the handshake
    pub options: SessionOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            name: None,
            initial_seq: None,
            retransmit_delay: DEFAULT_RETRANSMIT_DELAY,
            packet_trace: false,
            options: SessionOptions::default(),
        }
    }
}

/// Session traffic counters
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Total frames produced
    pub frames_sent: u64,
    /// Total frames accepted for processing
    pub frames_received: u64,
    /// Total payload bytes emitted, retransmissions included
    pub bytes_sent: u64,
    /// Total payload bytes delivered to the driver
    pub bytes_received: u64,
    /// Frames dropped by decode or SEQ/ACK validation
    pub frames_dropped: u64,
}

/// A burrow session
///
/// One logical conversation over one carrier, bound to exactly one
/// driver for its whole life. Single-threaded by design: one poll loop
/// owns the session and calls [`Session::poll_outgoing`] and
/// [`Session::handle_incoming`]; nothing here is shared or locked.
pub struct Session {
    /// Session identifier, random at creation
    id: u16,
    /// Current state
    state: SessionState,
    /// Our sequence number: ISN plus total bytes the peer has acked
    my_seq: SeqNumber,
    /// Peer's sequence number we expect on the next MSG
    their_seq: SeqNumber,
    /// Set when local data is exhausted or a close condition was seen
    is_shutdown: bool,
    /// Set once the FIN has been produced; nothing follows it
    fin_sent: bool,
    /// Negotiated options; replaced by the peer's on handshake
    options: SessionOptions,
    /// Optional label
    name: Option<String>,
    /// Fixed-rate transmission gate
    timer: RetransmitTimer,
    /// Application bytes not yet acknowledged by the peer
    outgoing: ByteQueue,
    /// The bound carrier driver, owned by the session
    driver: Box<dyn Driver>,
    driver_closed: bool,
    packet_trace: bool,
    stats: SessionStats,
}

impl Session {
    /// Create a session bound to `driver`
    ///
    /// Assigns a random session id and, unless the config overrides it, a
    /// random initial sequence number.
    pub fn new(driver: Box<dyn Driver>, config: SessionConfig) -> Self {
        let id = rand::random::<u16>();

        let my_seq = match config.initial_seq {
            Some(isn) => {
                warn!("overriding the initial sequence number can be dangerous!");
                SeqNumber::new(isn)
            }
            None => SeqNumber::new(rand::random::<u16>()),
        };

        if let Some(name) = &config.name {
            info!("session {:#06x}: labeled {:?}", id, name);
        }

        Session {
            id,
            state: SessionState::New,
            my_seq,
            their_seq: SeqNumber::new(0),
            is_shutdown: false,
            fin_sent: false,
            options: config.options,
            name: config.name,
            timer: RetransmitTimer::new(config.retransmit_delay),
            outgoing: ByteQueue::new(),
            driver,
            driver_closed: false,
            packet_trace: config.packet_trace,
            stats: SessionStats::default(),
        }
    }

    /// Session identifier
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Our current sequence number
    pub fn my_seq(&self) -> SeqNumber {
        self.my_seq
    }

    /// Peer sequence number expected on the next MSG
    pub fn their_seq(&self) -> SeqNumber {
        self.their_seq
    }

    /// Session label, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Currently negotiated options
    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// Whether the session has reached its terminal shutdown
    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown
    }

    /// Bytes queued and not yet acknowledged by the peer
    pub fn pending_bytes(&self) -> usize {
        self.outgoing.remaining()
    }

    /// Traffic counters
    pub fn stats(&self) -> SessionStats {
        self.stats.clone()
    }

    /// Poll the driver for fresh data and queue it for transmission
    ///
    /// The queue has to stay current even on receive-only polls, because
    /// outgoing MSG frames acknowledge against it. A driver that reports
    /// permanent end of data moves the session into shutdown once the
    /// queue drains.
    fn poll_for_data(&mut self) {
        if self.is_shutdown || self.driver_closed {
            return;
        }

        match self.driver.get_outgoing(usize::MAX) {
            None => {
                if self.outgoing.is_empty() {
                    info!("session {:#06x}: local data exhausted, shutting down", self.id);
                    self.is_shutdown = true;
                }
            }
            Some(data) => {
                if !data.is_empty() {
                    self.outgoing.append(&data);
                }
            }
        }
    }

    /// Produce the next outgoing frame, if it is time for one
    ///
    /// `max_len` is the carrier's frame budget; payload is sized to fit
    /// under it after the MSG overhead. Returns `None` when the
    /// retransmission gate is still closed (callers poll again later) and
    /// forever after the FIN has gone out.
    pub fn poll_outgoing(&mut self, max_len: usize) -> Option<Bytes> {
        self.poll_for_data();

        if self.fin_sent {
            return None;
        }

        if !self.timer.ready() {
            debug!(
                "session {:#06x}: retransmission timer hasn't expired, not re-sending",
                self.id
            );
            return None;
        }

        let packet = match self.state {
            SessionState::New => {
                if self.is_shutdown {
                    // Shut down before the handshake completed; there is
                    // no conversation to close.
                    return None;
                }
                info!(
                    "session {:#06x}: in New, sending SYN (SEQ = {})",
                    self.id, self.my_seq
                );
                Packet::syn(self.id, self.my_seq, self.options, self.name.as_deref())
            }
            SessionState::Established => {
                if self.is_shutdown {
                    info!("session {:#06x}: sending FIN", self.id);
                    self.fin_sent = true;
                    Packet::fin(self.id, "Stream closed")
                } else {
                    let budget = max_len.saturating_sub(Packet::msg_overhead(self.options));
                    let data = self.outgoing.peek(budget);
                    debug!(
                        "session {:#06x}: sending MSG (SEQ = {}, ACK = {}, {} bytes)",
                        self.id,
                        self.my_seq,
                        self.their_seq,
                        data.len()
                    );
                    self.stats.bytes_sent += data.len() as u64;
                    Packet::msg(self.id, self.my_seq, self.their_seq, data)
                }
            }
        };

        self.timer.mark_transmit();
        self.stats.frames_sent += 1;
        self.trace_frame("outgoing", &packet);
        Some(packet.to_bytes(self.options))
    }

    /// Process one received frame
    ///
    /// Survivable anomalies are logged and dropped here; the only errors
    /// that surface are terminal ones, returned after the session has
    /// already shut itself down.
    pub fn handle_incoming(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        let packet = match Packet::from_bytes(bytes, self.options) {
            Ok(packet) => packet,
            Err(PacketError::UnknownKind(kind)) => {
                error!(
                    "session {:#06x}: unrecognized frame kind 0x{:02x}, closing session",
                    self.id, kind
                );
                // Fatal: the session goes dark without even a FIN.
                self.is_shutdown = true;
                self.fin_sent = true;
                self.close_driver();
                return Err(SessionError::UnknownFrameKind(kind));
            }
            Err(err) => {
                warn!("session {:#06x}: dropping undecodable frame: {}", self.id, err);
                self.stats.frames_dropped += 1;
                return Ok(());
            }
        };

        self.trace_frame("incoming", &packet);
        self.stats.frames_received += 1;

        self.poll_for_data();

        match self.state {
            SessionState::New => match packet.body {
                PacketBody::Syn(syn) => self.handle_handshake(syn),
                PacketBody::Msg(_) => {
                    warn!(
                        "session {:#06x}: in New, received unexpected MSG (ignoring)",
                        self.id
                    );
                }
                PacketBody::Fin(fin) => self.handle_fin(fin),
            },
            SessionState::Established => match packet.body {
                PacketBody::Syn(_) => {
                    warn!(
                        "session {:#06x}: in Established, received SYN (ignoring)",
                        self.id
                    );
                }
                PacketBody::Msg(msg) => self.handle_msg(msg),
                PacketBody::Fin(fin) => self.handle_fin(fin),
            },
        }

        Ok(())
    }

    /// Complete the handshake from the peer's SYN
    fn handle_handshake(&mut self, syn: SynPayload) {
        info!(
            "session {:#06x}: received SYN (ISN = {}), session established",
            self.id, syn.seq
        );
        self.their_seq = syn.seq;
        self.options = syn.options;
        self.state = SessionState::Established;
    }

    /// Validate and apply one MSG frame
    ///
    /// The SEQ check admits exactly the expected sequence number; there is
    /// no reordering window. The ACK check bounds the cumulative
    /// acknowledgment by what is actually buffered. A frame failing either
    /// check is dropped whole, with no state change and no reply.
    fn handle_msg(&mut self, msg: MsgPayload) {
        if msg.seq != self.their_seq {
            warn!(
                "session {:#06x}: bad SEQ (expected {}, received {})",
                self.id, self.their_seq, msg.seq
            );
            self.stats.frames_dropped += 1;
            return;
        }

        let bytes_acked = self.my_seq.offset_to(msg.ack);
        if bytes_acked as usize > self.outgoing.remaining() {
            warn!(
                "session {:#06x}: bad ACK ({} bytes acked, {} in the queue)",
                self.id,
                bytes_acked,
                self.outgoing.remaining()
            );
            self.stats.frames_dropped += 1;
            return;
        }

        self.their_seq.advance(msg.data.len() as u16);

        self.outgoing.consume(bytes_acked as usize);
        if bytes_acked != 0 {
            self.my_seq.advance(bytes_acked);
        }

        if !msg.data.is_empty() {
            self.stats.bytes_received += msg.data.len() as u64;
            self.driver.data_received(&msg.data);
        }
    }

    /// Terminal shutdown on a peer FIN, graceful in either state
    fn handle_fin(&mut self, fin: FinPayload) {
        info!(
            "session {:#06x}: received FIN: {} - closing session",
            self.id, fin.reason
        );
        self.is_shutdown = true;
        self.close_driver();
    }

    fn close_driver(&mut self) {
        if !self.driver_closed {
            self.driver_closed = true;
            self.driver.close();
        }
    }

    fn trace_frame(&self, direction: &str, packet: &Packet) {
        if self.packet_trace {
            info!("session {:#06x}: {} {:?}", self.id, direction, packet);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close_driver();
    }
}
