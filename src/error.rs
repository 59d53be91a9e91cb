// src/error.rs
use thiserror::Error;

/// Structural problems with the input that make the whole run meaningless.
/// Missing landmarks and degenerate geometry are not errors; they surface as
/// unavailable values in the report.
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("frame numbers must increase: frame {current} follows frame {previous}")]
    NonMonotonicFrames { previous: u32, current: u32 },
    #[error("frame {frame_number} has a non-finite timestamp")]
    InvalidTimestamp { frame_number: u32 },
    #[error("invalid video metadata: {0}")]
    InvalidMetadata(String),
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
