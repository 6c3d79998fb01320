//! Audio engine: transport state machine on a worker thread
//!
//! `play()`/`stop()` only enqueue commands. The worker dequeues them, moves the
//! state machine, then forwards the message to observers (tracks). The
//! real-time callback reads the state through [`AudioAtomics`] and never takes a
//! lock the worker holds.
//!
//! Worker lifecycle uses `start_thread()`/`stop_thread()` because `play()` and
//! `stop()` are transport commands.

use std::sync::Arc;

use super::callback::{AudioCallback, MixSource};
use super::config::{AudioConfig, AUDIO_TICK_INTERVAL};
use super::device::CpalDeviceCatalog;
use super::error::AudioResult;
use super::message::{AudioCommand, AudioMessage};
use super::state::{AudioAtomics, AudioState, AudioStatistics};
use super::stream::{open_output_stream, OutputStreamHandle};
use crate::framework::{
    EngineError, EngineResult, EngineSettings, EngineStatus, MessageProcessor, Observer,
    QueueError, ResourceEngine,
};

/// Worker-side state machine
pub struct AudioProcessor {
    atomics: Arc<AudioAtomics>,
}

impl AudioProcessor {
    fn transition(&self, from: AudioState, to: AudioState) {
        if from != to {
            log::info!("AudioEngine: {} -> {}", from, to);
            self.atomics.set_state(to);
        }
    }
}

impl MessageProcessor<AudioMessage> for AudioProcessor {
    fn on_start(&self) {
        self.transition(self.atomics.state(), AudioState::Init);
    }

    fn process(&self, message: &AudioMessage) -> EngineResult<()> {
        let current = self.atomics.state();
        let next = match (current, message.command) {
            (AudioState::Idle, command) => {
                return Err(EngineError::Logic(format!(
                    "AudioEngine: {} received while idle",
                    command
                )))
            }
            (_, AudioCommand::Play) => AudioState::Running,
            // Nothing to stop before the first Play
            (AudioState::Init, AudioCommand::Stop) => AudioState::Init,
            (_, AudioCommand::Stop) => AudioState::Stopped,
        };
        self.transition(current, next);
        Ok(())
    }

    fn on_stop(&self) {
        self.transition(self.atomics.state(), AudioState::Idle);
    }
}

/// Owns the audio worker and the state the callback reads
pub struct AudioEngine {
    engine: ResourceEngine<AudioMessage, AudioProcessor>,
    atomics: Arc<AudioAtomics>,
}

impl AudioEngine {
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::polling(AUDIO_TICK_INTERVAL))
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        let atomics = Arc::new(AudioAtomics::new());
        let processor = AudioProcessor {
            atomics: Arc::clone(&atomics),
        };
        Self {
            engine: ResourceEngine::new("audio-engine", settings, processor),
            atomics,
        }
    }

    /// Start the worker; state becomes `Init`
    pub fn start_thread(&self) -> EngineResult<()> {
        self.engine.start()
    }

    /// Stop the worker; state returns to `Idle`
    pub fn stop_thread(&self) {
        self.engine.stop();
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    pub fn status(&self) -> EngineStatus {
        self.engine.status()
    }

    /// Request the Running state
    ///
    /// Non-blocking; the transition happens later on the worker.
    pub fn play(&self) -> Result<(), QueueError<AudioMessage>> {
        self.engine.try_push(AudioMessage::play())
    }

    /// Request the Stopped state
    pub fn stop(&self) -> Result<(), QueueError<AudioMessage>> {
        self.engine.try_push(AudioMessage::stop())
    }

    pub fn get_state(&self) -> AudioState {
        self.atomics.state()
    }

    pub fn get_statistics(&self) -> AudioStatistics {
        self.atomics.statistics()
    }

    pub fn atomics(&self) -> Arc<AudioAtomics> {
        Arc::clone(&self.atomics)
    }

    pub fn attach<O: Observer<AudioMessage> + 'static>(&self, observer: &Arc<O>) -> bool {
        self.engine.attach(observer)
    }

    pub fn detach<O: Observer<AudioMessage> + 'static>(&self, observer: &Arc<O>) -> bool {
        self.engine.detach(observer)
    }

    /// Real-time callback context mixing from `mix`
    pub fn callback(&self, mix: Arc<dyn MixSource>) -> AudioCallback {
        AudioCallback::new(Arc::clone(&self.atomics), mix)
    }

    /// Open the configured output device and run the callback on it
    pub fn open_output_stream(
        &self,
        config: &AudioConfig,
        mix: Arc<dyn MixSource>,
    ) -> AudioResult<OutputStreamHandle> {
        open_output_stream(&CpalDeviceCatalog::new(), config, self.callback(mix))
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new()
    }
}
