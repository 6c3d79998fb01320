//! MIDI message model shared by the MIDI engine and tracks

pub mod message;

pub use message::{MidiMessage, MidiMessageType};
