//! Configuration file support for the burrow CLI

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Session name advertised in the handshake
    pub name: Option<String>,
    /// Fixed initial sequence number (testing only)
    pub isn: Option<u16>,
    /// Delay between transmission attempts in milliseconds
    #[serde(default = "default_retransmit_delay_ms")]
    pub retransmit_delay_ms: u64,
    /// Maximum frame size the carrier accepts
    #[serde(default = "default_max_frame")]
    pub max_frame: usize,
    /// Log every constructed and parsed frame
    #[serde(default)]
    pub packet_trace: bool,
    /// Fraction of frames the simulated carrier drops (0.0 to 1.0)
    #[serde(default)]
    pub drop_rate: f64,
}

fn default_retransmit_delay_ms() -> u64 {
    1000
}

fn default_max_frame() -> usize {
    256
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            name: None,
            isn: None,
            retransmit_delay_ms: default_retransmit_delay_ms(),
            max_frame: default_max_frame(),
            packet_trace: false,
            drop_rate: 0.0,
        }
    }
}

impl ClientConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.drop_rate) {
            return Err(ConfigError::Invalid(format!(
                "drop_rate must be in [0.0, 1.0), got {}",
                self.drop_rate
            )));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
