use thiserror::Error;

/// A single detection pass failed.
///
/// Per-frame only: the counter logs it and keeps processing later frames.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("Failed to perform face detection: {0}")]
    Failed(String),
}
