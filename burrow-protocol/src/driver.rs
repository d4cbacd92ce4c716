//! Transport driver contract
//!
//! A driver binds one session to one concrete carrier endpoint: it sources
//! the raw application bytes the session should carry and sinks the bytes
//! the session receives. Drivers own no protocol state; the session never
//! blocks on one.

use bytes::Bytes;

/// Carrier-specific source and sink of application bytes
///
/// Implementations live outside the protocol core, one per concrete
/// carrier (console, in-memory channel, ...).
pub trait Driver {
    /// Pull up to `max_len` bytes of fresh outgoing application data
    ///
    /// Must not block. `Some` with an empty buffer means nothing is
    /// available right now; `None` means the source is exhausted and no
    /// more data will ever be produced. Once `None` has been returned,
    /// every subsequent call must also return `None`.
    fn get_outgoing(&mut self, max_len: usize) -> Option<Bytes>;

    /// Deliver application bytes received from the peer
    fn data_received(&mut self, data: &[u8]);

    /// Shut the driver down; no further delivery or production follows
    fn close(&mut self);
}
