//! cpal output stream running the real-time callback
//!
//! ```text
//! ┌──────────────────┐   Play/Stop    ┌─────────────────────┐
//! │   Any thread     │───try_push()──►│ Audio engine worker │
//! └──────────────────┘                └──────────┬──────────┘
//!                                                │ AudioAtomics::state
//!                                                ▼
//! ┌──────────────────┐   try_lock     ┌─────────────────────┐
//! │    TrackList     │◄───────────────│  cpal audio thread  │
//! │   (MixSource)    │  mix_into()    │   (AudioCallback)   │
//! └──────────────────┘                └─────────────────────┘
//! ```
//!
//! Only f32 output is supported; devices without an f32 configuration are
//! rejected with `UnsupportedFormat`.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig};

use super::callback::AudioCallback;
use super::config::AudioConfig;
use super::device::CpalDeviceCatalog;
use super::error::{AudioError, AudioResult};

/// Keeps the output stream alive. Drop (or `close()`) to stop audio.
pub struct OutputStreamHandle {
    stream: Option<Stream>,
    device_name: String,
    sample_rate: u32,
    /// Requested buffer size in frames, None = driver default
    buffer_size: Option<u32>,
    channels: u16,
}

impl OutputStreamHandle {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn buffer_size(&self) -> Option<u32> {
        self.buffer_size
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Stop the stream
    ///
    /// Idempotent. Teardown failures are logged and ignored.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::warn!("AudioEngine: failed to pause output stream: {}", e);
            }
            drop(stream);
            log::info!("AudioEngine: output stream on '{}' closed", self.device_name);
        }
    }
}

impl Drop for OutputStreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Open and start an output stream driving `callback`
pub fn open_output_stream(
    catalog: &CpalDeviceCatalog,
    config: &AudioConfig,
    callback: AudioCallback,
) -> AudioResult<OutputStreamHandle> {
    let device = match config.output_device {
        Some(id) => catalog.cpal_device(id)?,
        None => catalog.default_output()?,
    };

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("AudioEngine: using output device: {}", device_name);

    let supported_config = get_output_config(&device, config)?;
    let sample_rate = supported_config.sample_rate().0;
    let buffer_size = config.buffer_size.as_frames();

    let stream_config = StreamConfig {
        channels: supported_config.channels(),
        sample_rate: supported_config.sample_rate(),
        buffer_size: match buffer_size {
            Some(frames) => CpalBufferSize::Fixed(frames),
            None => CpalBufferSize::Default,
        },
    };

    log::info!(
        "AudioEngine: {} channels, {}Hz, buffer {} (~{:.1}ms latency)",
        stream_config.channels,
        sample_rate,
        buffer_size.map_or_else(|| "default".to_string(), |f| format!("{} frames", f)),
        config.buffer_size.latency_ms(sample_rate)
    );

    let stream = build_output_stream(&device, &stream_config, callback)?;
    stream
        .play()
        .map_err(|e| AudioError::driver("start output stream", e))?;

    log::info!("AudioEngine: output stream started");

    Ok(OutputStreamHandle {
        stream: Some(stream),
        device_name,
        sample_rate,
        buffer_size,
        channels: stream_config.channels,
    })
}

/// Pick an f32 configuration, preferring stereo and the requested rate
fn get_output_config(
    device: &cpal::Device,
    config: &AudioConfig,
) -> AudioResult<cpal::SupportedStreamConfig> {
    let supported_configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::driver("query output configs", e))?
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .collect();

    if supported_configs.is_empty() {
        return Err(AudioError::UnsupportedFormat(
            "device has no f32 output configuration".to_string(),
        ));
    }

    let target_sample_rate = config.target_sample_rate();
    let in_range = |c: &&cpal::SupportedStreamConfigRange| {
        target_sample_rate >= c.min_sample_rate().0 && target_sample_rate <= c.max_sample_rate().0
    };

    let best_config = supported_configs
        .iter()
        .filter(|c| c.channels() >= 2)
        .find(in_range)
        .or_else(|| supported_configs.iter().find(in_range))
        .or_else(|| supported_configs.iter().find(|c| c.channels() >= 2))
        .or_else(|| supported_configs.first())
        .ok_or_else(|| AudioError::Config("no suitable output configuration found".to_string()))?;

    let sample_rate = if in_range(&best_config) {
        cpal::SampleRate(target_sample_rate)
    } else {
        let fallback = best_config.max_sample_rate();
        log::warn!(
            "AudioEngine: device doesn't support {}Hz, falling back to {}Hz",
            target_sample_rate,
            fallback.0
        );
        fallback
    };

    Ok(best_config.clone().with_sample_rate(sample_rate))
}

fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut callback: AudioCallback,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    callback.process(data, channels);
                }));
                if result.is_err() {
                    callback.process_silence(data, channels);
                }
            },
            move |err| {
                log::error!("AudioEngine: output stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::driver("build output stream", e))
}
