//! Application context: owns one instance of each engine and the tracks
//!
//! Startup order is audio worker, MIDI worker, MIDI port, output stream.
//! Shutdown runs in reverse and is safe to call more than once.

use std::sync::Arc;

use anyhow::{Context, Result};

use daw_core::audio::{AudioEngine, CpalDeviceCatalog, DeviceCatalog, OutputStreamHandle};
use daw_core::config::DawConfig;
use daw_core::track::{Track, TrackId, TrackManager, TrackResult};
use daw_midi::{MidiEngine, MidiInputBackend, MidirBackend};

pub struct AppContext {
    config: DawConfig,
    audio: AudioEngine,
    midi: MidiEngine,
    tracks: TrackManager,
    stream: Option<OutputStreamHandle>,
    started: bool,
}

impl AppContext {
    /// Context on the system's audio and MIDI drivers
    pub fn new(config: DawConfig) -> Self {
        Self::with_drivers(
            config,
            Arc::new(CpalDeviceCatalog::new()),
            Box::new(MidirBackend::new()),
        )
    }

    pub fn with_drivers(
        config: DawConfig,
        catalog: Arc<dyn DeviceCatalog>,
        midi_backend: Box<dyn MidiInputBackend>,
    ) -> Self {
        let midi_settings = config
            .engine
            .blocking_settings()
            .with_queue_capacity(config.midi.queue_capacity);

        Self {
            audio: AudioEngine::new(),
            midi: MidiEngine::with_backend(midi_backend, midi_settings),
            tracks: TrackManager::new(catalog),
            stream: None,
            started: false,
            config,
        }
    }

    /// Start both engine workers and open the configured MIDI port
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }

        self.audio
            .start_thread()
            .context("Failed to start audio engine")?;
        self.midi.start().context("Failed to start MIDI engine")?;
        self.started = true;

        if let Some(port) = self.config.midi.input_port {
            if let Err(e) = self.midi.open_input_port(port) {
                log::warn!("MIDI: could not open input port {}: {}", port, e);
            }
        }

        log::info!("AppContext: engines started");
        Ok(())
    }

    /// Open the output stream; audio failures leave the app running silent
    pub fn open_output(&mut self) -> bool {
        if self.stream.is_some() {
            return true;
        }
        match self
            .audio
            .open_output_stream(&self.config.audio, self.tracks.mix_source())
        {
            Ok(stream) => {
                log::info!(
                    "AudioEngine: output open on '{}' ({} Hz, {} channels)",
                    stream.device_name(),
                    stream.sample_rate(),
                    stream.channels()
                );
                self.stream = Some(stream);
                true
            }
            Err(e) => {
                log::error!("AudioEngine: could not open output stream: {}", e);
                false
            }
        }
    }

    /// Add a track observing both engines
    pub fn add_track(&self) -> TrackResult<(TrackId, Arc<Track>)> {
        let id = self.tracks.add_track();
        let track = self.tracks.get_track(id)?;
        self.midi.attach(&track);
        self.audio.attach(&track);
        Ok((id, track))
    }

    /// Handle every pending MIDI message on every track
    pub fn drain_midi(&self) -> usize {
        let mut handled = 0;
        for (_, track) in self.tracks.tracks() {
            while track.handle_midi_message().is_some() {
                handled += 1;
            }
        }
        handled
    }

    pub fn audio(&self) -> &AudioEngine {
        &self.audio
    }

    pub fn midi(&self) -> &MidiEngine {
        &self.midi
    }

    pub fn tracks(&self) -> &TrackManager {
        &self.tracks
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn shutdown(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
        self.midi.close_input_port();

        if !self.started {
            return;
        }
        self.started = false;

        self.midi.stop();
        if let Err(e) = self.audio.stop() {
            log::debug!("AudioEngine: stop command not queued: {}", e);
        }
        self.audio.stop_thread();
        self.tracks.clear_tracks();
        log::info!("AppContext: shut down");
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
