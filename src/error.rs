//! Error types for Tierlimit.

use thiserror::Error;

/// Main error type for Tierlimit operations.
///
/// Admission checks never fail; only loading configuration can.
#[derive(Error, Debug)]
pub enum TierlimitError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Layered configuration loading errors
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Tierlimit operations.
pub type Result<T> = std::result::Result<T, TierlimitError>;
