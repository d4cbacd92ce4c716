//! Interactive console driver
//!
//! Sources outgoing bytes from stdin and sinks received bytes to stdout.
//! A dedicated reader thread pumps stdin into a bounded channel so the
//! poll-driven session never blocks; stdin EOF propagates as the
//! permanent end-of-data signal.

use burrow_protocol::Driver;
use bytes::Bytes;
use crossbeam::channel::{bounded, Receiver, TryRecvError};
use std::io::{self, Read, Write};
use std::thread;
use tracing::{info, warn};

const READ_CHUNK: usize = 1024;

/// Console-backed driver (stdin source, stdout sink)
pub struct ConsoleDriver {
    stdin: Receiver<Bytes>,
    stash: Bytes,
    closed: bool,
}

impl ConsoleDriver {
    /// Create the driver and start its stdin reader thread
    pub fn new() -> Self {
        let (tx, rx) = bounded(64);

        thread::spawn(move || {
            let mut stdin = io::stdin();
            let mut buf = [0u8; READ_CHUNK];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(Bytes::copy_from_slice(&buf[..n])).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!("console driver: stdin read failed: {}", err);
                        break;
                    }
                }
            }
            // Dropping the sender disconnects the channel, which the
            // driver reports as permanent end of data.
        });

        ConsoleDriver {
            stdin: rx,
            stash: Bytes::new(),
            closed: false,
        }
    }
}

impl Default for ConsoleDriver {
    fn default() -> Self {
        ConsoleDriver::new()
    }
}

impl Driver for ConsoleDriver {
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
            match self.stdin.try_recv() {
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
        let mut stdout = io::stdout();
        if let Err(err) = stdout.write_all(data).and_then(|_| stdout.flush()) {
            warn!("console driver: stdout write failed: {}", err);
        }
    }

    fn close(&mut self) {
        if !self.closed {
            info!("console driver closed");
            self.closed = true;
        }
    }
}
