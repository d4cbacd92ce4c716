//! In-memory channel driver
//!
//! Bridges a session to any host code that can push and pull bytes: the
//! driver half is handed to the session, the handle half stays with the
//! host. Dropping the handle's sender (or calling `finish`) is how the
//! host signals that no more data will ever be produced.

use burrow_protocol::Driver;
use bytes::Bytes;
use crossbeam::channel::{unbounded, Receiver, Sender, TryRecvError};
use tracing::debug;

/// Driver half: owned by the session
pub struct ChannelDriver {
    outgoing: Receiver<Bytes>,
    incoming: Sender<Bytes>,
    /// Leftover from a chunk that exceeded a call's length budget
    stash: Bytes,
    closed: bool,
}

/// Host half: feeds outgoing data in, takes received data out
pub struct ChannelHandle {
    outgoing: Option<Sender<Bytes>>,
    incoming: Receiver<Bytes>,
}

impl ChannelDriver {
    /// Create a connected driver/handle pair
    pub fn pair() -> (ChannelDriver, ChannelHandle) {
        let (outgoing_tx, outgoing_rx) = unbounded();
        let (incoming_tx, incoming_rx) = unbounded();

        let driver = ChannelDriver {
            outgoing: outgoing_rx,
            incoming: incoming_tx,
            stash: Bytes::new(),
            closed: false,
        };
        let handle = ChannelHandle {
            outgoing: Some(outgoing_tx),
            incoming: incoming_rx,
        };
        (driver, handle)
    }
}

impl Driver for ChannelDriver {
    fn get_outgoing(&mut self, max_len: usize) -> Option<Bytes> {
        if self.closed {
            return None;
        }

        let mut collected = Vec::new();

        if !self.stash.is_empty() {
            let n = max_len.min(self.stash.len());
            collected.extend_from_slice(&self.stash.split_to(n));
        }

        while collected.len() < max_len {
            match self.outgoing.try_recv() {
                Ok(mut chunk) => {
                    let budget = max_len - collected.len();
                    if chunk.len() > budget {
                        self.stash = chunk.split_off(budget);
                    }
                    collected.extend_from_slice(&chunk);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if collected.is_empty() && self.stash.is_empty() {
                        return None;
                    }
                    break;
                }
            }
        }

        Some(Bytes::from(collected))
    }

    fn data_received(&mut self, data: &[u8]) {
        if self.closed {
            return;
        }
        if self.incoming.send(Bytes::copy_from_slice(data)).is_err() {
            debug!("channel driver: receiver side gone, discarding {} bytes", data.len());
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

impl ChannelHandle {
    /// Queue application bytes for the session to carry
    ///
    /// Returns false once the driver side is gone.
    pub fn send(&self, data: impl Into<Bytes>) -> bool {
        match &self.outgoing {
            Some(tx) => tx.send(data.into()).is_ok(),
            None => false,
        }
    }

    /// Signal that no more data will ever be produced
    pub fn finish(&mut self) {
        self.outgoing = None;
    }

    /// Take one pending chunk of data the session received, if any
    pub fn try_recv(&self) -> Option<Bytes> {
        self.incoming.try_recv().ok()
    }

    /// Drain everything the session has received so far
    pub fn drain_received(&self) -> Vec<u8> {
        let mut out = Vec::new();
        while let Ok(chunk) = self.incoming.try_recv() {
            out.extend_from_slice(&chunk);
        }
        out
    }
}
