//! # Error Types
//!
//! Custom error types for Watt Node using `thiserror`.

use thiserror::Error;

/// Main error type for Watt Node
#[derive(Debug, Error)]
pub enum NodeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors (snapshot storage, sensor files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload or snapshot (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network transport failure (no response obtained)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Current sensor read failure
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Link probe failure
    #[error("Link error: {0}")]
    Link(String),
}

/// Result type alias for Watt Node
pub type Result<T> = std::result::Result<T, NodeError>;
