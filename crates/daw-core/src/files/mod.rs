//! File descriptors used as track inputs
//!
//! Only headers are read here; decoding sample data belongs to whoever feeds
//! the track's [`AudioFeed`](crate::track::AudioFeed).

pub mod midi;
pub mod wav;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::ErrorKind;

pub use midi::MidiFile;
pub use wav::{SampleFormat, WavFile};

/// Errors opening a track input file
#[derive(Error, Debug)]
pub enum FileError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid WAV file {}: {message}", .path.display())]
    InvalidWav { path: PathBuf, message: String },

    #[error("Invalid MIDI file {}: {message}", .path.display())]
    InvalidMidi { path: PathBuf, message: String },
}

impl FileError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

pub type FileResult<T> = Result<T, FileError>;

/// Absolute path and display name for `path`
fn resolve(path: &Path) -> FileResult<(PathBuf, String)> {
    let filepath = path.canonicalize().map_err(|source| FileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let filename = filepath
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok((filepath, filename))
}
