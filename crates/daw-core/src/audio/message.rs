//! Control messages carried by the audio engine's queue

use std::fmt;

/// Transport command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCommand {
    Play,
    Stop,
}

impl fmt::Display for AudioCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioCommand::Play => f.write_str("Play"),
            AudioCommand::Stop => f.write_str("Stop"),
        }
    }
}

/// Message dequeued by the audio engine and forwarded to its observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioMessage {
    pub command: AudioCommand,
}

impl AudioMessage {
    pub fn play() -> Self {
        Self {
            command: AudioCommand::Play,
        }
    }

    pub fn stop() -> Self {
        Self {
            command: AudioCommand::Stop,
        }
    }
}

impl From<AudioCommand> for AudioMessage {
    fn from(command: AudioCommand) -> Self {
        Self { command }
    }
}
