//! Audio error types

use thiserror::Error;

use super::config::DeviceId;
use crate::error::ErrorKind;

/// Errors that can occur during audio operations
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio devices available
    #[error("No audio devices found")]
    NoDevices,

    /// Host reports no default device for the requested direction
    #[error("No default audio {0} device")]
    NoDefaultDevice(&'static str),

    /// Device index not in the catalog
    #[error("Audio device not found: {0}")]
    DeviceNotFound(DeviceId),

    /// Device offers no usable sample format
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// No usable stream configuration
    #[error("Failed to get device config: {0}")]
    Config(String),

    /// Driver call failed
    #[error("Audio driver failed to {operation}: {message}")]
    Driver {
        operation: &'static str,
        message: String,
    },
}

impl AudioError {
    pub fn driver(operation: &'static str, err: impl std::fmt::Display) -> Self {
        AudioError::Driver {
            operation,
            message: err.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AudioError::NoDevices
            | AudioError::NoDefaultDevice(_)
            | AudioError::DeviceNotFound(_)
            | AudioError::UnsupportedFormat(_) => ErrorKind::Validation,
            AudioError::Config(_) | AudioError::Driver { .. } => ErrorKind::Driver,
        }
    }
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
