//! Client configuration
//!
//! All settings have defaults matching the demo protocol, so an empty JSON
//! object (or no file at all) yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::protocol::{
    scanner::PLATFORM_PORT_PREFIX, HandshakeScript, LineSettings, ParameterMessage,
    PortCandidates, SessionOptions, DEFAULT_FRAME_CAPACITY, DEFAULT_PARAMETERS,
    DEFAULT_SCAN_FIRST, DEFAULT_SCAN_LAST, DEFAULT_SETTLE_DELAY_MS, START_MARKER,
};

/// Errors loading or validating a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("cannot access {}", .path.display())]
    Io {
        /// Config file
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// File is not valid JSON for a [`ClientConfig`]
    #[error("invalid config file")]
    Parse(#[from] serde_json::Error),

    /// Values are inconsistent
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which ports to probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortScanConfig {
    /// Name prefix, e.g. "COM" or "/dev/ttyACM"
    pub prefix: String,
    /// First index probed
    pub first: u8,
    /// Last index probed (inclusive)
    pub last: u8,
    /// Use exactly this port instead of scanning
    pub port: Option<String>,
}

impl Default for PortScanConfig {
    fn default() -> Self {
        Self {
            prefix: PLATFORM_PORT_PREFIX.to_string(),
            first: DEFAULT_SCAN_FIRST,
            last: DEFAULT_SCAN_LAST,
            port: None,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Ports to probe
    pub ports: PortScanConfig,
    /// Line parameters applied to the committed port
    pub line: LineSettings,
    /// End-of-delivery character appended by the device
    pub sentinel: char,
    /// Wait after reset, in milliseconds
    pub settle_delay_ms: u64,
    /// Largest frame accepted from the device
    pub frame_capacity: usize,
    /// Start message, sentinel included
    pub start_marker: String,
    /// The two values sent to the device (0-999)
    pub parameters: [u16; 2],
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ports: PortScanConfig::default(),
            line: LineSettings::default(),
            sentinel: '#',
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            frame_capacity: DEFAULT_FRAME_CAPACITY,
            start_marker: String::from_utf8_lossy(START_MARKER).into_owned(),
            parameters: DEFAULT_PARAMETERS,
        }
    }
}

impl ClientConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ClientConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sentinel.is_ascii() {
            return Err(ConfigError::Invalid(format!(
                "sentinel {:?} is not a single byte",
                self.sentinel
            )));
        }
        if self.start_marker.is_empty() {
            return Err(ConfigError::Invalid("start marker is empty".into()));
        }
        if !self.start_marker.ends_with(self.sentinel) {
            return Err(ConfigError::Invalid(format!(
                "start marker {:?} does not end with sentinel {:?}",
                self.start_marker, self.sentinel
            )));
        }
        if self.frame_capacity < self.start_marker.len() {
            return Err(ConfigError::Invalid(format!(
                "frame capacity {} is smaller than the start marker",
                self.frame_capacity
            )));
        }
        if self.ports.port.is_none() && self.ports.first > self.ports.last {
            return Err(ConfigError::Invalid(format!(
                "empty port range {}..={}",
                self.ports.first, self.ports.last
            )));
        }
        if self.line.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud rate must be non-zero".into()));
        }
        self.parameter_message()?;
        Ok(())
    }

    /// Sentinel as a byte; non-ASCII characters are rejected by [`validate`](Self::validate)
    pub fn sentinel_byte(&self) -> u8 {
        u8::try_from(self.sentinel).unwrap_or(b'#')
    }

    fn parameter_message(&self) -> Result<ParameterMessage, ConfigError> {
        let [first, second] = self.parameters;
        ParameterMessage::new(first, second).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Ports to probe, in order
    pub fn candidates(&self) -> PortCandidates {
        match &self.ports.port {
            Some(port) => PortCandidates::single(port.clone()),
            None => PortCandidates::numbered(&self.ports.prefix, self.ports.first..=self.ports.last),
        }
    }

    /// Settings applied to the committed port
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            line: self.line,
            sentinel: self.sentinel_byte(),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            frame_capacity: self.frame_capacity,
        }
    }

    /// Messages exchanged with the device
    pub fn script(&self) -> Result<HandshakeScript, ConfigError> {
        Ok(HandshakeScript {
            start_marker: self.start_marker.as_bytes().to_vec(),
            parameters: self.parameter_message()?,
        })
    }
}
