//! WAV file header via hound

use std::fmt;
use std::path::{Path, PathBuf};

use super::{resolve, FileError, FileResult};

/// Sample encoding of a WAV file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    Int { bits: u16 },
    Float { bits: u16 },
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleFormat::Int { bits } => write!(f, "{}-bit PCM", bits),
            SampleFormat::Float { bits } => write!(f, "{}-bit float", bits),
        }
    }
}

/// A WAV file usable as a track input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavFile {
    pub filepath: PathBuf,
    pub filename: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub format: SampleFormat,
    /// Frames per channel
    pub duration_frames: u32,
}

impl WavFile {
    /// Read the header of `path`
    pub fn open(path: impl AsRef<Path>) -> FileResult<Self> {
        let (filepath, filename) = resolve(path.as_ref())?;
        let reader = hound::WavReader::open(&filepath).map_err(|e| FileError::InvalidWav {
            path: filepath.clone(),
            message: e.to_string(),
        })?;

        let spec = reader.spec();
        let format = match spec.sample_format {
            hound::SampleFormat::Int => SampleFormat::Int {
                bits: spec.bits_per_sample,
            },
            hound::SampleFormat::Float => SampleFormat::Float {
                bits: spec.bits_per_sample,
            },
        };

        log::debug!(
            "Opened WAV {}: {}Hz, {} channels, {}",
            filename,
            spec.sample_rate,
            spec.channels,
            format
        );

        Ok(Self {
            duration_frames: reader.duration(),
            filepath,
            filename,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            format,
        })
    }

    /// Length in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        f64::from(self.duration_frames) / f64::from(self.sample_rate)
    }
}
