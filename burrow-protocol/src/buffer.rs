//! Outgoing byte queue
//!
//! An ordered queue of application bytes awaiting acknowledgment. The
//! contract that makes retransmission correct: `peek` never removes
//! anything, so the same bytes are re-sent verbatim every timer interval
//! until an acknowledgment `consume`s them off the front.

use bytes::Bytes;
use std::collections::VecDeque;

/// Ordered byte queue with non-destructive peek and explicit consume
#[derive(Debug, Default)]
pub struct ByteQueue {
    data: VecDeque<u8>,
}

impl ByteQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        ByteQueue {
            data: VecDeque::new(),
        }
    }

    /// Append bytes to the back of the queue
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend(bytes.iter().copied());
    }

    /// Copy up to `max_len` bytes from the front without removing them
    ///
    /// Repeated calls return the identical bytes until `consume` is called.
    pub fn peek(&self, max_len: usize) -> Bytes {
        let n = max_len.min(self.data.len());
        let (front, back) = self.data.as_slices();
        if n <= front.len() {
            Bytes::copy_from_slice(&front[..n])
        } else {
            let mut out = Vec::with_capacity(n);
            out.extend_from_slice(front);
            out.extend_from_slice(&back[..n - front.len()]);
            Bytes::from(out)
        }
    }

    /// Drop the first `n` bytes from the queue
    ///
    /// Removes at most the bytes actually present; callers validate `n`
    /// against `remaining()` first.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.data.len());
        self.data.drain(..n);
    }

    /// Number of bytes currently queued
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    /// Check whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
