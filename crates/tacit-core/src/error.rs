//! Unified error types for Tacit

use thiserror::Error;

/// Unified error type for all Tacit operations
#[derive(Error, Debug)]
pub enum TacitError {
    // Page errors
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Page script error: {0}")]
    PageScript(String),

    // Remote service errors
    #[error("Service error: {0}")]
    Service(String),

    #[error("Service at {endpoint} returned status {status}")]
    ServiceStatus { endpoint: String, status: u16 },

    // Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using TacitError
pub type Result<T> = std::result::Result<T, TacitError>;
