//! Standard MIDI file header via midly

use std::path::{Path, PathBuf};

use super::{resolve, FileError, FileResult};

/// A standard MIDI file usable as a track input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiFile {
    pub filepath: PathBuf,
    pub filename: String,
    /// SMF format: 0 (single track), 1 (parallel), 2 (sequential)
    pub format: u8,
    pub track_count: usize,
}

impl MidiFile {
    /// Parse and validate `path`
    pub fn open(path: impl AsRef<Path>) -> FileResult<Self> {
        let (filepath, filename) = resolve(path.as_ref())?;
        let bytes = std::fs::read(&filepath).map_err(|source| FileError::Io {
            path: filepath.clone(),
            source,
        })?;

        let smf = midly::Smf::parse(&bytes).map_err(|e| FileError::InvalidMidi {
            path: filepath.clone(),
            message: e.to_string(),
        })?;

        let format = match smf.header.format {
            midly::Format::SingleTrack => 0,
            midly::Format::Parallel => 1,
            midly::Format::Sequential => 2,
        };
        let track_count = smf.tracks.len();

        log::debug!(
            "Opened MIDI file {}: format {}, {} tracks",
            filename,
            format,
            track_count
        );

        Ok(Self {
            filepath,
            filename,
            format,
            track_count,
        })
    }
}
