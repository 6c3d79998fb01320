//! Error classification shared by every subsystem
//!
//! Each subsystem owns its own error enum; `kind()` on those enums maps every
//! variant onto one of the categories below so callers can tell a bad argument
//! from a failing driver without matching on subsystem-specific variants.

use std::fmt;

/// Category of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid device index, port number, track index or unusable device.
    /// Surfaced synchronously to the caller.
    Validation,
    /// The underlying audio/MIDI driver or the OS failed (open, close, start,
    /// stop, thread spawn).
    Driver,
    /// An engine reached a state or command it cannot handle. Fatal for the
    /// single dispatch, never for the worker thread.
    Logic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Driver => "driver",
            ErrorKind::Logic => "logic",
        };
        f.write_str(name)
    }
}
