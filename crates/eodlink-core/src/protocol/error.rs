//! Protocol errors

use std::fmt;
use thiserror::Error;

/// Configuration step applied to the committed port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStep {
    /// Baud rate, data bits, parity, stop bits
    LineSettings,
    /// Asserting DTR, which resets the microcontroller
    ResetLine,
    /// Arming end-of-delivery detection
    Sentinel,
}

impl fmt::Display for ConfigStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigStep::LineSettings => "setting line parameters",
            ConfigStep::ResetLine => "asserting reset line",
            ConfigStep::Sentinel => "arming EOD detection",
        };
        f.write_str(name)
    }
}

/// Broad classification of a [`ProtocolError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Candidate port is unusable; the scanner moves on to the next one
    ScanSkip,
    /// Committed port could not be configured
    Configuration,
    /// An expected frame was missing or malformed, or a write was short
    Protocol,
    /// No candidate port could be opened
    Exhausted,
}

/// Errors that can occur during protocol communication
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Candidate could not be opened
    #[error("cannot open {port}: {reason}")]
    OpenFailed {
        /// Candidate identifier
        port: String,
        /// Operating system's explanation
        reason: String,
    },

    /// Candidate opened but did not report line settings
    #[error("{port} is not a serial device: {reason}")]
    NotASerialDevice {
        /// Candidate identifier
        port: String,
        /// Operating system's explanation
        reason: String,
    },

    /// The committed port refused a configuration step
    #[error("error {step} on {port}: {reason}")]
    Configuration {
        /// Committed port
        port: String,
        /// Step that failed
        step: ConfigStep,
        /// Operating system's explanation
        reason: String,
    },

    /// Every candidate was skipped
    #[error("no active port found (tried {})", .tried.join(", "))]
    NoPortFound {
        /// Candidates in probe order
        tried: Vec<String>,
    },

    /// EOD fired with nothing queued
    #[error("EOD signalled but no bytes queued")]
    NoData,

    /// More bytes queued than a frame may hold
    #[error("frame of {queued} bytes exceeds capacity of {capacity} bytes")]
    FrameOverflow {
        /// Bytes queued when EOD fired
        queued: usize,
        /// Session's frame capacity
        capacity: usize,
    },

    /// First frame shorter than the start marker
    #[error("start message too short: received {received} bytes, expected {expected}")]
    StartMarkerTooShort {
        /// Frame length
        received: usize,
        /// Marker length
        expected: usize,
    },

    /// First frame does not end with the start marker
    #[error("start message mismatch: expected '{expected}', got '{actual}'")]
    StartMarkerMismatch {
        /// Marker looked for
        expected: String,
        /// Tail of the frame, same length as the marker
        actual: String,
    },

    /// The device accepted fewer bytes than sent
    #[error("short write: sent {written} of {requested} bytes")]
    ShortWrite {
        /// Bytes accepted
        written: usize,
        /// Bytes in the message
        requested: usize,
    },

    /// Parameter above 999
    #[error("parameter {0} does not fit in three digits")]
    ParameterOutOfRange(u16),

    /// Transport failure during a read, write or EOD wait
    #[error("I/O error")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::OpenFailed { .. } | ProtocolError::NotASerialDevice { .. } => {
                ErrorKind::ScanSkip
            }
            ProtocolError::Configuration { .. } => ErrorKind::Configuration,
            ProtocolError::NoPortFound { .. } => ErrorKind::Exhausted,
            _ => ErrorKind::Protocol,
        }
    }
}
