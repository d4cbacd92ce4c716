//! Burrow CLI Library
//!
//! Shared functionality for the burrow command-line tools.

pub mod config;

pub use config::{ClientConfig, ConfigError};
