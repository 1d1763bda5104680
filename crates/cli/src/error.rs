//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[allow(dead_code)]
#[derive(Error, Debug)]
pub enum CliError {
    /// Recording file not found
    #[error("Recording file not found: {path}")]
    RecordingNotFound { path: String },

    /// Header parsing error
    #[error("Failed to parse recording header: {message}")]
    HeaderParse { message: String },

    /// Series composition error
    #[error("Series validation failed: {message}")]
    SeriesValidation { message: String },

    /// Synchronization run error
    #[error("Synchronization failed: {message}")]
    Synchronization { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

#[allow(dead_code)]
impl CliError {
    pub fn recording_not_found(path: impl Into<String>) -> Self {
        Self::RecordingNotFound { path: path.into() }
    }

    pub fn header_parse(message: impl Into<String>) -> Self {
        Self::HeaderParse {
            message: message.into(),
        }
    }

    pub fn series_validation(message: impl Into<String>) -> Self {
        Self::SeriesValidation {
            message: message.into(),
        }
    }

    pub fn synchronization(message: impl Into<String>) -> Self {
        Self::Synchronization {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, CliError>;
