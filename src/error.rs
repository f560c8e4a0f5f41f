//! Error types for vksc-server
//!
//! Provides a unified error type for all operations.
//!
//! Kinds split into two groups:
//! - transport/protocol failures, which terminate a single connection
//! - application failures, which the dispatcher turns into `status: false`

use thiserror::Error;

/// Result type alias using VkscError
pub type Result<T> = std::result::Result<T, VkscError>;

/// Unified error type for vksc-server operations
#[derive(Debug, Error)]
pub enum VkscError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

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
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unknown request type: {0}")]
    UnknownRequestType(u32),

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: u32, max: u32 },

    #[error("Unexpected response type: expected {expected}, got {actual}")]
    UnexpectedResponse { expected: u32, actual: u32 },

    #[error("Connection lost")]
    ConnectionLost,

    // -------------------------------------------------------------------------
    // Content Store Errors
    // -------------------------------------------------------------------------
    #[error("Invalid content name: {0}")]
    InvalidContentName(String),

    #[error("Content {name:?} too large: {size} bytes (max {max})")]
    ContentTooLarge { name: String, size: u64, max: u64 },

    // -------------------------------------------------------------------------
    // Worker Errors
    // -------------------------------------------------------------------------
    #[error("Shader compilation failed: {0}")]
    Compilation(String),

    #[error("Pipeline cache build failed: {0}")]
    CacheBuild(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl VkscError {
    /// Whether this error must terminate the connection it occurred on
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VkscError::Io(_)
                | VkscError::Decode(_)
                | VkscError::Protocol(_)
                | VkscError::UnknownRequestType(_)
                | VkscError::PayloadTooLarge { .. }
                | VkscError::UnexpectedResponse { .. }
                | VkscError::ConnectionLost
        )
    }
}

impl From<bincode::Error> for VkscError {
    fn from(err: bincode::Error) -> Self {
        match *err {
            bincode::ErrorKind::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                VkscError::Decode("unexpected end of payload".to_string())
            }
            other => VkscError::Decode(other.to_string()),
        }
    }
}
