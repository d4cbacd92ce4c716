//! Burrow Carrier Drivers
//!
//! Concrete implementations of the [`burrow_protocol::Driver`] contract,
//! one per carrier endpoint: an interactive console driver and an
//! in-memory channel driver for embedding sessions in host applications
//! and tests.

pub mod channel;
pub mod console;

pub use channel::{ChannelDriver, ChannelHandle};
pub use console::ConsoleDriver;
