//! Audio configuration
//!
//! Device selection, buffer and sample-rate preferences for the output stream.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Maximum buffer size to pre-allocate for the real-time callback (frames)
/// Larger driver buffers are processed in chunks of this size.
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Default buffer size when no preference is specified (frames)
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

/// Default sample rate (48kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Audio engine worker tick
pub const AUDIO_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Sample rates probed against each device's supported ranges
pub const COMMON_SAMPLE_RATES: [u32; 6] = [44100, 48000, 88200, 96000, 176400, 192000];

/// Index of a device in the catalog's enumeration order
pub type DeviceId = u32;

/// Preferred buffer size for the output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    /// Let the driver choose
    #[default]
    Default,
    /// Request a specific buffer size in frames (clamped to 64..=MAX_BUFFER_SIZE)
    Fixed(u32),
}

impl BufferSize {
    /// Buffer size in frames, or None for the driver default
    pub fn as_frames(&self) -> Option<u32> {
        match self {
            BufferSize::Default => None,
            BufferSize::Fixed(frames) => Some((*frames).clamp(64, MAX_BUFFER_SIZE as u32)),
        }
    }

    /// One-way output latency in milliseconds
    pub fn latency_ms(&self, sample_rate: u32) -> f32 {
        let frames = self.as_frames().unwrap_or(DEFAULT_BUFFER_SIZE);
        (frames as f32 / sample_rate as f32) * 1000.0
    }
}

/// Output stream configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device (None = system default)
    pub output_device: Option<DeviceId>,

    /// Preferred buffer size
    pub buffer_size: BufferSize,

    /// Preferred sample rate (None = DEFAULT_SAMPLE_RATE if supported)
    pub sample_rate: Option<u32>,
}

impl AudioConfig {
    pub fn with_output_device(mut self, device: DeviceId) -> Self {
        self.output_device = Some(device);
        self
    }

    /// Set a fixed buffer size in frames
    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_size = BufferSize::Fixed(frames);
        self
    }

    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    /// Requested sample rate, falling back to DEFAULT_SAMPLE_RATE
    pub fn target_sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_buffer_is_clamped() {
        assert_eq!(BufferSize::Fixed(16).as_frames(), Some(64));
        assert_eq!(BufferSize::Fixed(256).as_frames(), Some(256));
        assert_eq!(BufferSize::Fixed(100_000).as_frames(), Some(MAX_BUFFER_SIZE as u32));
        assert_eq!(BufferSize::Default.as_frames(), None);
    }

    #[test]
    fn test_latency_ms() {
        let latency = BufferSize::Fixed(480).latency_ms(48000);
        assert!((latency - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_builder() {
        let config = AudioConfig::default()
            .with_output_device(2)
            .with_buffer_frames(128)
            .with_sample_rate(44100);
        assert_eq!(config.output_device, Some(2));
        assert_eq!(config.buffer_size, BufferSize::Fixed(128));
        assert_eq!(config.target_sample_rate(), 44100);
        assert_eq!(AudioConfig::default().target_sample_rate(), DEFAULT_SAMPLE_RATE);
    }
}
