//! Unified error handling for the summit-detector library.
//!
//! Only conditions that stop a run are errors. A track that parses but
//! produces no qualifying stops is a normal, empty [`crate::DetectionResult`].

use thiserror::Error;

use crate::pipeline::DetectionPhase;

/// Unified error type for summit detection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SummitError {
    /// Input bytes are not well-formed track data
    #[error("Failed to parse track: {message}")]
    Parse { message: String },

    /// Input parsed but contains no usable fixes
    #[error("Track contains no points")]
    EmptyTrack,

    /// A configuration value is out of range
    #[error("Invalid configuration for '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    /// The progress observer asked the pipeline to stop
    #[error("Detection cancelled before {}", phase.as_str())]
    Cancelled { phase: DetectionPhase },

    /// Reading a track file failed
    #[error("Failed to read '{path}': {message}")]
    Io { path: String, message: String },
}

impl SummitError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        SummitError::Parse {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_config(field: &str, message: impl Into<String>) -> Self {
        SummitError::InvalidConfig {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// True for errors caused by the track file itself (bad bytes or no data),
    /// as opposed to configuration, I/O or cancellation.
    pub fn is_track_error(&self) -> bool {
        matches!(self, SummitError::Parse { .. } | SummitError::EmptyTrack)
    }
}

/// Result type alias for summit-detector operations.
pub type Result<T> = std::result::Result<T, SummitError>;
