//! Error handling for the link engine
//!
//! One taxonomy for the whole crate: transport faults are fatal to the
//! in-flight submission, reply timeouts surface as `NoReply` after retry
//! exhaustion, and framing corruption never escapes the scanner.

use thiserror::Error;

/// Link engine error type
#[derive(Error, Debug, Clone)]
pub enum LinkError {
    /// Physical transport fault (device unreachable, I/O error). Fatal to
    /// the in-flight submission; never auto-retried.
    #[error("Transport error: {0}")]
    Transport(String),

    /// No matching reply frame arrived after all attempts.
    #[error("No reply for opcode 0x{opcode:02X} after {attempts} attempts")]
    NoReply { opcode: u8, attempts: u32 },

    /// Payload exceeds the one-byte length field. Rejected before any I/O.
    #[error("Payload too large: {0} bytes (max 255)")]
    PayloadTooLarge(usize),

    /// Malformed or unexpected reply content.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller-side parameter validation errors
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The owning link task has shut down.
    #[error("Link closed")]
    Closed,
}

/// Result type alias for the link engine
pub type Result<T> = std::result::Result<T, LinkError>;

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::Transport(err.to_string())
    }
}

impl LinkError {
    pub fn transport(msg: impl Into<String>) -> Self {
        LinkError::Transport(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        LinkError::Protocol(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        LinkError::Config(msg.into())
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        LinkError::InvalidParameter(msg.into())
    }
}
