//! MIDI error types

use daw_core::framework::EngineError;
use daw_core::ErrorKind;

/// Errors from the MIDI engine
#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("Invalid MIDI port number: {port} ({available} ports available)")]
    PortOutOfRange { port: usize, available: usize },

    #[error("MIDI driver failed to {operation}: {message}")]
    Driver {
        operation: &'static str,
        message: String,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl MidiError {
    pub fn driver(operation: &'static str, err: impl std::fmt::Display) -> Self {
        MidiError::Driver {
            operation,
            message: err.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MidiError::PortOutOfRange { .. } => ErrorKind::Validation,
            MidiError::Driver { .. } => ErrorKind::Driver,
            MidiError::Engine(e) => e.kind(),
        }
    }
}

pub type MidiResult<T> = Result<T, MidiError>;
