//! Application configuration
//!
//! ```yaml
//! audio:
//!   output_device: null
//!   buffer_size: !Fixed 256
//!   sample_rate: 48000
//! midi:
//!   input_port: 0
//!   queue_capacity: 1024
//! engine:
//!   tick_interval_ms: 10
//!   queue_capacity: null
//! ```
//!
//! Every section and field is optional; missing values take their defaults.

mod io;
mod paths;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use crate::audio::AudioConfig;
pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path, CONFIG_FILE_NAME};

use crate::framework::{EngineSettings, DEFAULT_TICK_INTERVAL};

/// Bounded capacity of the MIDI engine queue
pub const DEFAULT_MIDI_QUEUE_CAPACITY: usize = 1024;

/// MIDI input settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    /// Port opened at startup (None = no MIDI input)
    pub input_port: Option<usize>,
    /// MIDI engine queue capacity; driver messages beyond it are dropped
    pub queue_capacity: usize,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            input_port: None,
            queue_capacity: DEFAULT_MIDI_QUEUE_CAPACITY,
        }
    }
}

/// Worker loop settings for resource engines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tick_interval_ms: u64,
    /// None = unbounded
    pub queue_capacity: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u64,
            queue_capacity: None,
        }
    }
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Blocking-pop settings with this tick and capacity
    pub fn blocking_settings(&self) -> EngineSettings {
        let settings = EngineSettings::blocking().with_tick_interval(self.tick_interval());
        match self.queue_capacity {
            Some(capacity) => settings.with_queue_capacity(capacity),
            None => settings,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DawConfig {
    pub audio: AudioConfig,
    pub midi: MidiConfig,
    pub engine: EngineConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::BufferSize;
    use std::path::Path;

    #[test]
    fn test_load_nonexistent_returns_default() {
        let config: DawConfig = load_config(Path::new("/nonexistent/daw/config.yaml"));
        assert_eq!(config, DawConfig::default());
        assert_eq!(config.midi.queue_capacity, DEFAULT_MIDI_QUEUE_CAPACITY);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = DawConfig::default();
        config.audio = AudioConfig::default().with_output_device(1).with_buffer_frames(256);
        config.midi.input_port = Some(2);
        config.engine.tick_interval_ms = 5;

        save_config(&config, &path).unwrap();
        let loaded: DawConfig = load_config(&path);

        assert_eq!(loaded, config);
        assert_eq!(loaded.audio.buffer_size, BufferSize::Fixed(256));
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "audio: [this is not a map").unwrap();

        let loaded: DawConfig = load_config(&path);
        assert_eq!(loaded, DawConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "midi:\n  input_port: 3\n").unwrap();

        let loaded: DawConfig = load_config(&path);
        assert_eq!(loaded.midi.input_port, Some(3));
        assert_eq!(loaded.midi.queue_capacity, DEFAULT_MIDI_QUEUE_CAPACITY);
        assert_eq!(loaded.engine, EngineConfig::default());
    }

    #[test]
    fn test_engine_settings_from_config() {
        let config = EngineConfig {
            tick_interval_ms: 0,
            queue_capacity: Some(16),
        };
        let settings = config.blocking_settings();
        assert_eq!(settings.tick_interval, Duration::from_millis(1));
        assert_eq!(settings.queue_capacity, Some(16));
    }
}
