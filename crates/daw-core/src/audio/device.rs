//! Audio device enumeration
//!
//! Devices are identified by their index in the default host's enumeration
//! order. Tracks validate device bindings through the [`DeviceCatalog`] trait so
//! that validation can run against a fixed list when no hardware is present.

use cpal::traits::{DeviceTrait, HostTrait};

use super::config::{DeviceId, COMMON_SAMPLE_RATES};
use super::error::{AudioError, AudioResult};

/// Information about an audio device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDeviceInfo {
    /// Index in the catalog
    pub id: DeviceId,
    /// Human-readable device name
    pub name: String,
    /// Maximum input channels (0 = output only)
    pub input_channels: u16,
    /// Maximum output channels (0 = input only)
    pub output_channels: u16,
    /// Channels usable in both directions at once
    pub duplex_channels: u16,
    /// Supported sample rates (common ones)
    pub sample_rates: Vec<u32>,
    /// Rate the device runs at by default, 0 if unknown
    pub preferred_sample_rate: u32,
    pub is_default_input: bool,
    pub is_default_output: bool,
}

impl AudioDeviceInfo {
    pub fn has_input(&self) -> bool {
        self.input_channels > 0
    }

    pub fn has_output(&self) -> bool {
        self.output_channels > 0
    }
}

impl std::fmt::Display for AudioDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} (in: {}, out: {}, rates: {:?})",
            self.id, self.name, self.input_channels, self.output_channels, self.sample_rates
        )?;
        if self.is_default_output {
            f.write_str(" [default output]")?;
        }
        if self.is_default_input {
            f.write_str(" [default input]")?;
        }
        Ok(())
    }
}

/// Source of device information for tracks and the application
pub trait DeviceCatalog: Send + Sync {
    /// All devices, in id order
    fn audio_devices(&self) -> AudioResult<Vec<AudioDeviceInfo>>;

    fn audio_device(&self, id: DeviceId) -> AudioResult<AudioDeviceInfo> {
        self.audio_devices()?
            .into_iter()
            .find(|d| d.id == id)
            .ok_or(AudioError::DeviceNotFound(id))
    }

    fn default_input_device(&self) -> AudioResult<AudioDeviceInfo> {
        self.audio_devices()?
            .into_iter()
            .find(|d| d.is_default_input)
            .ok_or(AudioError::NoDefaultDevice("input"))
    }

    fn default_output_device(&self) -> AudioResult<AudioDeviceInfo> {
        self.audio_devices()?
            .into_iter()
            .find(|d| d.is_default_output)
            .ok_or(AudioError::NoDefaultDevice("output"))
    }
}

/// Catalog backed by the default cpal host
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalDeviceCatalog;

impl CpalDeviceCatalog {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a catalog id to the cpal device handle
    pub fn cpal_device(&self, id: DeviceId) -> AudioResult<cpal::Device> {
        let host = cpal::default_host();
        host.devices()
            .map_err(|e| AudioError::driver("enumerate devices", e))?
            .nth(id as usize)
            .ok_or(AudioError::DeviceNotFound(id))
    }

    /// Default output device of the default host
    pub fn default_output(&self) -> AudioResult<cpal::Device> {
        cpal::default_host()
            .default_output_device()
            .ok_or(AudioError::NoDefaultDevice("output"))
    }
}

impl DeviceCatalog for CpalDeviceCatalog {
    fn audio_devices(&self) -> AudioResult<Vec<AudioDeviceInfo>> {
        let host = cpal::default_host();

        let default_input_name = host
            .default_input_device()
            .and_then(|d: cpal::Device| d.name().ok());
        let default_output_name = host
            .default_output_device()
            .and_then(|d: cpal::Device| d.name().ok());

        let devices_iter = host
            .devices()
            .map_err(|e| AudioError::driver("enumerate devices", e))?;

        let mut devices = Vec::new();
        for (index, device) in devices_iter.enumerate() {
            let name = match device.name() {
                Ok(n) => n,
                Err(e) => {
                    log::debug!("Audio device {} has no name: {}", index, e);
                    format!("Device {}", index)
                }
            };

            let input_configs: Vec<_> = device
                .supported_input_configs()
                .map(|c| c.collect())
                .unwrap_or_default();
            let output_configs: Vec<_> = device
                .supported_output_configs()
                .map(|c| c.collect())
                .unwrap_or_default();

            let input_channels = input_configs.iter().map(|c| c.channels()).max().unwrap_or(0);
            let output_channels = output_configs.iter().map(|c| c.channels()).max().unwrap_or(0);

            // Add common sample rates that fall within any supported range
            let mut sample_rates: Vec<u32> = Vec::new();
            for config in input_configs.iter().chain(output_configs.iter()) {
                for rate in COMMON_SAMPLE_RATES {
                    if rate >= config.min_sample_rate().0
                        && rate <= config.max_sample_rate().0
                        && !sample_rates.contains(&rate)
                    {
                        sample_rates.push(rate);
                    }
                }
            }
            sample_rates.sort_unstable();

            let preferred_sample_rate = device
                .default_output_config()
                .or_else(|_| device.default_input_config())
                .map(|c| c.sample_rate().0)
                .unwrap_or(0);

            devices.push(AudioDeviceInfo {
                id: index as DeviceId,
                is_default_input: default_input_name.as_ref() == Some(&name),
                is_default_output: default_output_name.as_ref() == Some(&name),
                name,
                input_channels,
                output_channels,
                duplex_channels: input_channels.min(output_channels),
                sample_rates,
                preferred_sample_rate,
            });
        }

        if devices.is_empty() {
            return Err(AudioError::NoDevices);
        }

        log::info!("Enumerated {} audio devices", devices.len());
        Ok(devices)
    }
}

/// Fixed device list, for headless runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticDeviceCatalog {
    devices: Vec<AudioDeviceInfo>,
}

impl StaticDeviceCatalog {
    pub fn new(devices: Vec<AudioDeviceInfo>) -> Self {
        Self { devices }
    }
}

impl DeviceCatalog for StaticDeviceCatalog {
    fn audio_devices(&self) -> AudioResult<Vec<AudioDeviceInfo>> {
        if self.devices.is_empty() {
            return Err(AudioError::NoDevices);
        }
        Ok(self.devices.clone())
    }
}
