//! Audio subsystem
//!
//! - [`engine`]: transport state machine on a worker thread
//! - [`callback`]: the real-time callback contract, testable without a device
//! - [`stream`]: cpal output stream running the callback
//! - [`device`]: device catalog (cpal-backed or static)
//! - [`state`]: lock-free state and statistics shared with the callback

pub mod callback;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod message;
pub mod state;
pub mod stream;

pub use callback::{AudioCallback, MixSource, Silence};
pub use config::{
    AudioConfig, BufferSize, DeviceId, AUDIO_TICK_INTERVAL, DEFAULT_BUFFER_SIZE,
    DEFAULT_SAMPLE_RATE, MAX_BUFFER_SIZE,
};
pub use device::{AudioDeviceInfo, CpalDeviceCatalog, DeviceCatalog, StaticDeviceCatalog};
pub use engine::AudioEngine;
pub use error::{AudioError, AudioResult};
pub use message::{AudioCommand, AudioMessage};
pub use state::{AudioAtomics, AudioState, AudioStatistics};
pub use stream::OutputStreamHandle;
