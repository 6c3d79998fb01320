//! Track error types

use thiserror::Error;

use crate::audio::{AudioError, DeviceId};
use crate::error::ErrorKind;

/// Channel direction a device binding needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

/// Errors from tracks and the track manager
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Track index {index} out of range ({count} tracks)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Track {index} was removed")]
    TrackRemoved { index: usize },

    #[error("Audio device {device_id} has no {direction} channels")]
    MissingChannels {
        device_id: DeviceId,
        direction: Direction,
    },

    #[error(transparent)]
    Device(#[from] AudioError),
}

impl TrackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackError::Device(e) => e.kind(),
            _ => ErrorKind::Validation,
        }
    }
}

pub type TrackResult<T> = Result<T, TrackError>;
