//! Frame Structures and Serialization
//!
//! This module implements the burrow wire format: a 5-byte header (packet
//! id, frame kind, session id) followed by a kind-specific body. There are
//! three frame kinds — SYN opens a session, MSG carries payload plus a
//! cumulative acknowledgment, FIN closes the session. All multi-byte
//! fields are big-endian.

use crate::sequence::SeqNumber;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use thiserror::Error;

/// Size of the common frame header in bytes (packet id + kind + session id)
pub const HEADER_SIZE: usize = 5;

/// Frame kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketKind {
    /// Session open / handshake
    Syn = 0x00,
    /// Payload plus cumulative acknowledgment
    Msg = 0x01,
    /// Session close
    Fin = 0x02,
}

impl PacketKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(PacketKind::Syn),
            0x01 => Some(PacketKind::Msg),
            0x02 => Some(PacketKind::Fin),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketKind::Syn => write!(f, "SYN"),
            PacketKind::Msg => write!(f, "MSG"),
            PacketKind::Fin => write!(f, "FIN"),
        }
    }
}

/// Session options advertised in the SYN exchange
///
/// Carried as a 16-bit flag field. The side that opens the session
/// advertises its options; the peer's SYN overrides them wholesale, so
/// both ends frame subsequent traffic identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionOptions {
    /// SYN carries a NUL-terminated session name
    pub name: bool,
    /// Session speaks the command sub-protocol rather than a raw stream
    pub command: bool,
}

impl SessionOptions {
    const OPT_NAME: u16 = 0x0001;
    const OPT_COMMAND: u16 = 0x0020;

    /// Convert to the wire flag field
    pub fn to_flags(self) -> u16 {
        let mut flags = 0u16;
        if self.name {
            flags |= Self::OPT_NAME;
        }
        if self.command {
            flags |= Self::OPT_COMMAND;
        }
        flags
    }

    /// Parse from the wire flag field; undefined bits are ignored
    pub fn from_flags(flags: u16) -> Self {
        SessionOptions {
            name: (flags & Self::OPT_NAME) != 0,
            command: (flags & Self::OPT_COMMAND) != 0,
        }
    }
}

/// SYN body: initial sequence number, advertised options, optional name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynPayload {
    /// Sender's initial sequence number
    pub seq: SeqNumber,
    /// Advertised session options
    pub options: SessionOptions,
    /// Session name, present iff the name option is advertised
    pub name: Option<String>,
}

/// MSG body: sequence number, cumulative ack, payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgPayload {
    /// Sequence number of the first payload byte
    pub seq: SeqNumber,
    /// Cumulative acknowledgment: total bytes received from the peer
    pub ack: SeqNumber,
    /// Payload bytes (may be empty; an empty MSG still carries the ack)
    pub data: Bytes,
}

/// FIN body: human-readable close reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinPayload {
    pub reason: String,
}

/// Kind-specific frame body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketBody {
    Syn(SynPayload),
    Msg(MsgPayload),
    Fin(FinPayload),
}

/// A complete frame
///
/// The packet id is random per frame; request/response carriers (DNS in
/// particular) use it to defeat resolver caching. It carries no protocol
/// state and is ignored on receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub packet_id: u16,
    pub session_id: u16,
    pub body: PacketBody,
}

impl Packet {
    /// Build a SYN frame
    pub fn syn(
        session_id: u16,
        seq: SeqNumber,
        mut options: SessionOptions,
        name: Option<&str>,
    ) -> Self {
        options.name = name.is_some();
        Packet {
            packet_id: rand::random::<u16>(),
            session_id,
            body: PacketBody::Syn(SynPayload {
                seq,
                options,
                name: name.map(str::to_owned),
            }),
        }
    }

    /// Build a MSG frame
    pub fn msg(session_id: u16, seq: SeqNumber, ack: SeqNumber, data: Bytes) -> Self {
        Packet {
            packet_id: rand::random::<u16>(),
            session_id,
            body: PacketBody::Msg(MsgPayload { seq, ack, data }),
        }
    }

    /// Build a FIN frame
    pub fn fin(session_id: u16, reason: &str) -> Self {
        Packet {
            packet_id: rand::random::<u16>(),
            session_id,
            body: PacketBody::Fin(FinPayload {
                reason: reason.to_owned(),
            }),
        }
    }

    /// Get the frame kind
    pub fn kind(&self) -> PacketKind {
        match &self.body {
            PacketBody::Syn(_) => PacketKind::Syn,
            PacketBody::Msg(_) => PacketKind::Msg,
            PacketBody::Fin(_) => PacketKind::Fin,
        }
    }

    /// Size in bytes of a MSG frame's header and fixed fields
    ///
    /// Everything in a MSG frame except the payload itself: the amount an
    /// outgoing-frame budget must reserve before payload bytes fit. Sized
    /// per session options because option-negotiated MSG variants extend
    /// the fixed fields.
    pub fn msg_overhead(_options: SessionOptions) -> usize {
        HEADER_SIZE + 4
    }

    /// Serialize the frame to bytes
    pub fn to_bytes(&self, options: SessionOptions) -> Bytes {
        let mut buf = match &self.body {
            PacketBody::Msg(msg) => {
                BytesMut::with_capacity(Self::msg_overhead(options) + msg.data.len())
            }
            _ => BytesMut::with_capacity(HEADER_SIZE + 16),
        };

        buf.put_u16(self.packet_id);
        buf.put_u8(self.kind().as_u8());
        buf.put_u16(self.session_id);

        match &self.body {
            PacketBody::Syn(syn) => {
                buf.put_u16(syn.seq.as_raw());
                buf.put_u16(syn.options.to_flags());
                if let Some(name) = &syn.name {
                    buf.put_slice(name.as_bytes());
                    buf.put_u8(0);
                }
            }
            PacketBody::Msg(msg) => {
                buf.put_u16(msg.seq.as_raw());
                buf.put_u16(msg.ack.as_raw());
                buf.put_slice(&msg.data);
            }
            PacketBody::Fin(fin) => {
                buf.put_slice(fin.reason.as_bytes());
                buf.put_u8(0);
            }
        }

        buf.freeze()
    }

    /// Parse a frame from received bytes
    ///
    /// `options` are the session's negotiated options; MSG framing is
    /// option-dependent on the wire.
    pub fn from_bytes(bytes: &[u8], options: SessionOptions) -> Result<Self, PacketError> {
        if bytes.len() < HEADER_SIZE {
            return Err(PacketError::Truncated {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let mut buf = bytes;
        let packet_id = buf.get_u16();
        let kind_raw = buf.get_u8();
        let session_id = buf.get_u16();

        let kind = PacketKind::from_u8(kind_raw).ok_or(PacketError::UnknownKind(kind_raw))?;

        let body = match kind {
            PacketKind::Syn => {
                if buf.remaining() < 4 {
                    return Err(PacketError::Truncated {
                        expected: HEADER_SIZE + 4,
                        actual: bytes.len(),
                    });
                }
                let seq = SeqNumber::new(buf.get_u16());
                let syn_options = SessionOptions::from_flags(buf.get_u16());
                let name = if syn_options.name {
                    Some(read_ntstring(&mut buf)?)
                } else {
                    None
                };
                PacketBody::Syn(SynPayload {
                    seq,
                    options: syn_options,
                    name,
                })
            }
            PacketKind::Msg => {
                let fields = Self::msg_overhead(options) - HEADER_SIZE;
                if buf.remaining() < fields {
                    return Err(PacketError::Truncated {
                        expected: Self::msg_overhead(options),
                        actual: bytes.len(),
                    });
                }
                let seq = SeqNumber::new(buf.get_u16());
                let ack = SeqNumber::new(buf.get_u16());
                PacketBody::Msg(MsgPayload {
                    seq,
                    ack,
                    data: Bytes::copy_from_slice(buf),
                })
            }
            PacketKind::Fin => PacketBody::Fin(FinPayload {
                reason: read_ntstring(&mut buf)?,
            }),
        };

        Ok(Packet {
            packet_id,
            session_id,
            body,
        })
    }
}

/// Read a NUL-terminated UTF-8 string, consuming the terminator
fn read_ntstring(buf: &mut &[u8]) -> Result<String, PacketError> {
    let nul = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or(PacketError::UnterminatedString)?;
    let s = std::str::from_utf8(&buf[..nul])
        .map_err(|_| PacketError::InvalidString)?
        .to_owned();
    buf.advance(nul + 1);
    Ok(s)
}

/// Frame parsing and validation errors
#[derive(Error, Debug)]
pub enum PacketError {
    #[error("frame truncated: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("unrecognized frame kind: 0x{0:02x}")]
    UnknownKind(u8),

    #[error("string field missing its NUL terminator")]
    UnterminatedString,

    #[error("string field is not valid UTF-8")]
    InvalidString,
}
