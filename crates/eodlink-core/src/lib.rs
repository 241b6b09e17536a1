//! # eodlink Core Library
//!
//! Client side of a minimal EOD-framed serial protocol spoken by
//! Arduino-class microcontrollers.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Serial port scanning and session setup (line parameters, reset, EOD arming)
//! - Framed reads keyed on the end-of-delivery byte, and synchronous writes
//! - The fixed start/parameters/result handshake as an explicit state machine
//! - JSON-backed client configuration
//!
//! ## Example
//!
//! ```rust,ignore
//! use eodlink_core::{config::ClientConfig, protocol::{Handshake, SerialConnector}};
//!
//! let config = ClientConfig::default();
//! let mut handshake = Handshake::new(
//!     SerialConnector::new(config.line.baud_rate),
//!     config.candidates(),
//!     config.session_options(),
//!     config.script()?,
//! );
//! let outcome = handshake.run()?;
//! println!("{}", outcome.result.to_text_lossy());
//! ```

pub mod config;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ClientConfig, ConfigError};
    pub use crate::protocol::{
        Frame, Handshake, HandshakeError, HandshakeEvent, HandshakeOutcome, HandshakeState,
        PortCandidates, ProtocolError, SerialConnector, Session, SessionOptions, Transport,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
