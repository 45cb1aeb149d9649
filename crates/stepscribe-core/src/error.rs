//! Error types shared across the pipeline.

use crate::storage::StorageError;
use thiserror::Error;

/// Screen capture failures.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no monitors available")]
    NoMonitors,
    #[error("monitor not found: {0}")]
    MonitorNotFound(u32),
    #[error("capture backend failed: {0}")]
    Backend(String),
}

pub type CaptureResult<T> = Result<T, CaptureError>;

/// Text recognition backend failures.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("recognizer unavailable: {0}")]
    Unavailable(String),
    #[error("recognizer failed: {0}")]
    Backend(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("unexpected response: {0}")]
    Protocol(String),
}

pub type RecognitionResult<T> = Result<T, RecognitionError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Input monitoring could not be started.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("input monitoring unavailable: {0}")]
    Unavailable(String),
}

/// Failure converting one queued event into a step.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("no screenshot attached to {0} event")]
    MissingScreenshot(&'static str),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
