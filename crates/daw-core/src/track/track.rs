//! Track: observer of MIDI and transport events, source of audio frames
//!
//! ```text
//!  MIDI engine worker ──update()──► midi_queue ──handle_midi_message()──► main loop
//!  Audio engine worker ──update()──► transport_running
//!  AudioFeed producer ──rtrb──► feed ──get_next_audio_frame()──► audio callback
//! ```
//!
//! `update` only takes the short-lived queue lock. The audio callback pulls
//! through `try_lock` and outputs silence if the source slot is busy.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};

use super::error::{Direction, TrackError, TrackResult};
use super::feed::{AudioFeed, DEFAULT_FEED_CAPACITY};
use crate::audio::{AudioCommand, AudioMessage, DeviceCatalog, DeviceId};
use crate::files::{MidiFile, WavFile};
use crate::framework::{Observer, ObserverError};
use crate::midi::{MidiMessage, MidiMessageType};

/// What a track plays from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrackSource {
    #[default]
    None,
    WavFile(WavFile),
    MidiFile(MidiFile),
    AudioInput(DeviceId),
}

impl fmt::Display for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackSource::None => f.write_str("none"),
            TrackSource::WavFile(wav) => write!(f, "WAV file '{}'", wav.filename),
            TrackSource::MidiFile(midi) => write!(f, "MIDI file '{}'", midi.filename),
            TrackSource::AudioInput(id) => write!(f, "audio input {}", id),
        }
    }
}

/// Source description plus the consumer end of its sample ring
#[derive(Default)]
struct SourceSlot {
    kind: TrackSource,
    feed: Option<rtrb::Consumer<f32>>,
}

/// A per-channel unit with its own event queue and a pull-based audio contract
pub struct Track {
    name: RwLock<String>,
    midi_queue: Mutex<VecDeque<MidiMessage>>,
    transport_running: AtomicBool,
    input_device: RwLock<Option<DeviceId>>,
    output_device: RwLock<Option<DeviceId>>,
    source: Mutex<SourceSlot>,
    catalog: Arc<dyn DeviceCatalog>,
}

impl Track {
    pub fn new(name: impl Into<String>, catalog: Arc<dyn DeviceCatalog>) -> Self {
        Self {
            name: RwLock::new(name.into()),
            midi_queue: Mutex::new(VecDeque::new()),
            transport_running: AtomicBool::new(false),
            input_device: RwLock::new(None),
            output_device: RwLock::new(None),
            source: Mutex::new(SourceSlot::default()),
            catalog,
        }
    }

    pub fn name(&self) -> String {
        self.name.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.write().unwrap_or_else(PoisonError::into_inner) = name.into();
    }

    // ─── MIDI ───

    /// Process at most one queued MIDI message
    ///
    /// Called by a consumer such as the main loop, never by the notifying
    /// engine. Returns the processed message.
    pub fn handle_midi_message(&self) -> Option<MidiMessage> {
        let message = self
            .midi_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()?;

        let name = self.name();
        match message.message_type {
            MidiMessageType::NoteOn => log::info!(
                "Track '{}': Note On - Channel: {}, Note: {}, Velocity: {}",
                name,
                message.channel,
                message.data1,
                message.data2
            ),
            MidiMessageType::NoteOff => log::info!(
                "Track '{}': Note Off - Channel: {}, Note: {}",
                name,
                message.channel,
                message.data1
            ),
            MidiMessageType::ControlChange => log::info!(
                "Track '{}': Control Change - Channel: {}, Controller: {}, Value: {}",
                name,
                message.channel,
                message.data1,
                message.data2
            ),
            other => log::debug!("Track '{}': {} - {}", name, other, message),
        }
        Some(message)
    }

    /// Queued MIDI messages not yet handled
    pub fn pending_midi_messages(&self) -> usize {
        self.midi_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    // ─── Audio pull ───

    /// Fill `output[..n_frames]` with this track's next frames
    ///
    /// Never blocks. Writes exactly `n_frames` samples (clamped to the buffer
    /// length), zero-padding on underrun. Silence when no sample source is
    /// bound. Transport gating is the caller's job: the audio callback only
    /// pulls while the engine is `Running`. Returns true if any source samples
    /// were written.
    pub fn get_next_audio_frame(&self, output: &mut [f32], n_frames: usize) -> bool {
        let n_frames = n_frames.min(output.len());
        let output = &mut output[..n_frames];
        output.fill(0.0);

        let mut slot = match self.source.try_lock() {
            Ok(slot) => slot,
            Err(TryLockError::WouldBlock) => return false,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        let Some(feed) = slot.feed.as_mut() else {
            return false;
        };

        let mut produced = false;
        for sample in output.iter_mut() {
            match feed.pop() {
                Ok(value) => {
                    *sample = value;
                    produced = true;
                }
                Err(_) => break,
            }
        }
        produced
    }

    /// Last transport command seen by this track
    ///
    /// False for a track attached after Play was sent, until the next Play.
    pub fn is_transport_running(&self) -> bool {
        self.transport_running.load(Ordering::Acquire)
    }

    // ─── Device and source binding ───

    /// Bind an input device after checking it has input channels
    ///
    /// On failure the track is left untouched. On success the returned feed
    /// replaces the previous source.
    pub fn add_audio_input(&self, device_id: DeviceId) -> TrackResult<AudioFeed> {
        let device = self.catalog.audio_device(device_id)?;
        if !device.has_input() {
            return Err(TrackError::MissingChannels {
                device_id,
                direction: Direction::Input,
            });
        }

        *self
            .input_device
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(device_id);
        log::info!("Track '{}': input bound to '{}'", self.name(), device.name);
        Ok(self.replace_source(TrackSource::AudioInput(device_id)))
    }

    /// Bind an output device after checking it has output channels
    pub fn add_audio_output(&self, device_id: DeviceId) -> TrackResult<()> {
        let device = self.catalog.audio_device(device_id)?;
        if !device.has_output() {
            return Err(TrackError::MissingChannels {
                device_id,
                direction: Direction::Output,
            });
        }

        *self
            .output_device
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(device_id);
        log::info!("Track '{}': output bound to '{}'", self.name(), device.name);
        Ok(())
    }

    pub fn add_default_audio_input(&self) -> TrackResult<AudioFeed> {
        let device = self.catalog.default_input_device()?;
        self.add_audio_input(device.id)
    }

    pub fn add_default_audio_output(&self) -> TrackResult<DeviceId> {
        let device = self.catalog.default_output_device()?;
        self.add_audio_output(device.id)?;
        Ok(device.id)
    }

    /// Play from a WAV file; the decoder pushes into the returned feed
    pub fn add_wav_file_input(&self, wav: WavFile) -> AudioFeed {
        log::info!(
            "Track '{}': WAV input '{}' ({}Hz, {} channels, {})",
            self.name(),
            wav.filename,
            wav.sample_rate,
            wav.channels,
            wav.format
        );
        self.replace_source(TrackSource::WavFile(wav))
    }

    /// Take events from a MIDI file; no audio feed is attached
    pub fn add_midi_file_input(&self, midi: MidiFile) {
        log::info!("Track '{}': MIDI input '{}'", self.name(), midi.filename);
        let mut slot = self.source.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = SourceSlot {
            kind: TrackSource::MidiFile(midi),
            feed: None,
        };
    }

    pub fn source(&self) -> TrackSource {
        self.source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .kind
            .clone()
    }

    pub fn audio_input(&self) -> Option<DeviceId> {
        *self.input_device.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn audio_output(&self) -> Option<DeviceId> {
        *self.output_device.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn has_audio_input(&self) -> bool {
        self.audio_input().is_some()
    }

    pub fn has_audio_output(&self) -> bool {
        self.audio_output().is_some()
    }

    fn replace_source(&self, kind: TrackSource) -> AudioFeed {
        let (feed, consumer) = AudioFeed::channel(DEFAULT_FEED_CAPACITY);
        let mut slot = self.source.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = SourceSlot {
            kind,
            feed: Some(consumer),
        };
        feed
    }
}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("name", &self.name())
            .field("input_device", &self.audio_input())
            .field("output_device", &self.audio_output())
            .field("pending_midi", &self.pending_midi_messages())
            .finish()
    }
}

impl Observer<MidiMessage> for Track {
    fn update(&self, message: &MidiMessage) -> Result<(), ObserverError> {
        self.midi_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(*message);
        Ok(())
    }
}

impl Observer<AudioMessage> for Track {
    fn update(&self, message: &AudioMessage) -> Result<(), ObserverError> {
        let running = matches!(message.command, AudioCommand::Play);
        self.transport_running.store(running, Ordering::Release);
        Ok(())
    }
}
