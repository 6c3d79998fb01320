//! Audio engine state machine and lock-free shared counters
//!
//! `AudioAtomics` is the only state shared between the engine worker, the
//! real-time callback and readers on any other thread. Every field is an
//! independent atomic, so a reader never sees a torn value; the two statistics
//! counters may however be read from two different callback invocations.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};

use crate::framework::EngineError;

/// Audio engine state
///
/// ```text
/// Idle ──worker start──► Init ──Play──► Running ⇄ Stopped ──worker stop──► Idle
/// ```
///
/// Stop while `Init` is ignored. Any command while `Idle` is a logic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AudioState {
    #[default]
    Idle = 0,
    Init = 1,
    Stopped = 2,
    Running = 3,
}

impl TryFrom<u8> for AudioState {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AudioState::Idle),
            1 => Ok(AudioState::Init),
            2 => Ok(AudioState::Stopped),
            3 => Ok(AudioState::Running),
            other => Err(EngineError::Logic(format!("unknown audio state {}", other))),
        }
    }
}

impl fmt::Display for AudioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AudioState::Idle => "Idle",
            AudioState::Init => "Init",
            AudioState::Stopped => "Stopped",
            AudioState::Running => "Running",
        };
        f.write_str(name)
    }
}

/// Snapshot of the callback counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioStatistics {
    /// Tracks that contributed audio in the last callback
    pub tracks_playing: usize,
    /// Frames handed to the driver since the engine was created
    pub total_frames_processed: u64,
}

/// Lock-free state shared by the worker, the audio callback and readers
///
/// The worker is the only writer of `state`; the callback is the only writer
/// of the statistics counters.
#[derive(Debug, Default)]
pub struct AudioAtomics {
    pub state: AtomicU8,
    pub tracks_playing: AtomicUsize,
    pub total_frames_processed: AtomicU64,
}

impl AudioAtomics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state (lock-free)
    ///
    /// The worker only stores valid discriminants; anything else reads as Idle.
    #[inline]
    pub fn state(&self) -> AudioState {
        AudioState::try_from(self.state.load(Ordering::Acquire)).unwrap_or_default()
    }

    #[inline]
    pub(crate) fn set_state(&self, state: AudioState) {
        self.state.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state() == AudioState::Running
    }

    /// Read both counters (lock-free)
    pub fn statistics(&self) -> AudioStatistics {
        AudioStatistics {
            tracks_playing: self.tracks_playing.load(Ordering::Relaxed),
            total_frames_processed: self.total_frames_processed.load(Ordering::Relaxed),
        }
    }

    /// Called last by the audio callback
    #[inline]
    pub(crate) fn record_block(&self, tracks_playing: usize, frames: usize) {
        self.tracks_playing.store(tracks_playing, Ordering::Relaxed);
        self.total_frames_processed
            .fetch_add(frames as u64, Ordering::Relaxed);
    }
}
