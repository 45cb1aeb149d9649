//! Common error types for stepscribe-platform.

use stepscribe_core::{CaptureError, MonitorError, RecognitionError};
use thiserror::Error;

/// Platform-level errors.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("input hook unavailable: {0}")]
    HookUnavailable(String),
    #[error("capture failed: {0}")]
    Capture(String),
    #[error("OCR backend setup failed: {0}")]
    Ocr(String),
}

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

impl From<PlatformError> for MonitorError {
    fn from(err: PlatformError) -> Self {
        MonitorError::Unavailable(err.to_string())
    }
}

impl From<PlatformError> for CaptureError {
    fn from(err: PlatformError) -> Self {
        CaptureError::Backend(err.to_string())
    }
}

impl From<PlatformError> for RecognitionError {
    fn from(err: PlatformError) -> Self {
        RecognitionError::Unavailable(err.to_string())
    }
}
