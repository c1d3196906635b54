use thiserror::Error;

use crate::config::ConfigError;
use telnet_automata::SessionError;

/// Errors surfaced by the mudlink tool
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O related errors (capture files, stdout, config writes)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be read or is invalid
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The protocol session refused input (buffer growth failure)
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Capture file is not valid hex
    #[error("Invalid capture: {0}")]
    InvalidCapture(String),

    /// JSON report could not be produced
    #[error("Report error: {0}")]
    Report(#[from] serde_json::Error),
}

/// Result type alias for mudlink operations
pub type AppResult<T> = Result<T, AppError>;
