//! Error types for qplay

use thiserror::Error;

/// Main error type for qplay
#[derive(Error, Debug)]
pub enum QPlayError {
    #[error("Emulator error: {0}")]
    Emulator(String),

    #[error("Invalid action index {index} (catalog has {count} actions)")]
    InvalidAction { index: usize, count: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for qplay operations
pub type Result<T> = std::result::Result<T, QPlayError>;
