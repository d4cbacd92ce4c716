//! Burrow Protocol Core Implementation
//!
//! This crate implements the burrow session protocol: a reliable,
//! stop-and-wait byte stream over carriers that guarantee nothing. It
//! contains the frame codec, sequence numbers, the outgoing byte queue,
//! the retransmission gate, the driver contract, and the session state
//! machine that ties them together under an external poll loop.

pub mod buffer;
pub mod driver;
pub mod packet;
pub mod sequence;
pub mod session;
pub mod timer;

pub use buffer::ByteQueue;
pub use driver::Driver;
pub use packet::{
    FinPayload, MsgPayload, Packet, PacketBody, PacketError, PacketKind, SessionOptions,
    SynPayload, HEADER_SIZE,
};
pub use sequence::SeqNumber;
pub use session::{Session, SessionConfig, SessionError, SessionState, SessionStats};
pub use timer::{RetransmitTimer, DEFAULT_RETRANSMIT_DELAY};
