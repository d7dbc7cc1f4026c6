//! Error types for distmap
//!
//! Provides a unified error type for all operations.
//!
//! A conditional operation whose condition does not hold (`replace` with a
//! stale expected value, `remove` of a non-matching value, ...) is not an
//! error: it resolves to `false` or `0`.

use thiserror::Error;

/// Result type alias using MapError
pub type Result<T> = std::result::Result<T, MapError>;

/// Unified error type for distmap operations
#[derive(Debug, Error)]
pub enum MapError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// The store answered with a reply shape the operation does not expect
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The store executed the request and answered with an error reply
    #[error("Remote error: {0}")]
    Remote(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MapError {
    /// True for connection and network failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, MapError::Io(_) | MapError::Transport(_))
    }

    /// True when stored bytes could not be turned back into a value.
    pub fn is_decode(&self) -> bool {
        matches!(self, MapError::Decode(_))
    }

    /// True when the store replied with an unexpected shape.
    pub fn is_protocol(&self) -> bool {
        matches!(self, MapError::Protocol(_))
    }
}

impl From<bincode::Error> for MapError {
    fn from(e: bincode::Error) -> Self {
        MapError::Decode(e.to_string())
    }
}
