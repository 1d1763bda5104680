//! Layered error definitions
//!
//! Categorized by source: series composition / user input / header data /
//! io. Programming-precondition violations (for example an out-of-range
//! global index handed to `locate`) are asserts, never error values: they
//! indicate a broken invariant, not bad input.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum RecordingError {
    // ===== Series Composition Errors =====
    /// Pairwise segment validation failure; construction is all-or-nothing.
    /// The message wording is part of the contract and asserted by tests.
    #[error("series error for '{path}': {message}")]
    Series { path: PathBuf, message: String },

    // ===== Synchronization Input Errors =====
    /// Unsupported data kind handed to start-time synchronization.
    /// Never retried, surfaced verbatim.
    #[error("invalid synchronization input: {message}")]
    UserInput { message: String },

    // ===== Header / Index Data Errors =====
    /// Malformed header or index data.
    #[error("data format error: {message}")]
    DataFormat { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl RecordingError {
    /// Create a series-compatibility error naming the offending file.
    pub fn series(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Series {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a user-input error.
    pub fn user_input(message: impl Into<String>) -> Self {
        Self::UserInput {
            message: message.into(),
        }
    }

    /// Create a data-format error.
    pub fn data_format(message: impl Into<String>) -> Self {
        Self::DataFormat {
            message: message.into(),
        }
    }

    /// Create a data-format error naming the offending file.
    pub fn data_format_at(path: &Path, message: impl Into<String>) -> Self {
        Self::DataFormat {
            message: format!("'{}': {}", path.display(), message.into()),
        }
    }
}

/// Exact validation phrases for series composition failures. Test suites
/// assert on this wording, so it lives in one place.
pub mod series_rule {
    pub const EMPTY: &str = "cannot create a series from zero files";
    pub const SPACING: &str = "spacing info different than reference";
    pub const DATA_TYPE: &str = "data type different than reference";
    pub const FRAME_RATE: &str = "different frame rate than reference";
    pub const OVERLAP: &str = "temporally overlaps with the reference";
    pub const CHANNEL_COUNT: &str = "mismatching number of cells/channels";
}
