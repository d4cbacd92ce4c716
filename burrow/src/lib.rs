//! Burrow - reliable sessions over covert carriers
//!
//! High-level API re-exporting the protocol core and the bundled carrier
//! drivers.

pub use burrow_protocol as protocol;
pub use burrow_io as io;

// Re-export commonly used types
pub use protocol::{Driver, Session, SessionConfig, SessionError, SessionState};
