//! DAW Core - engines, notification fabric and tracks for the DAW prototype
//!
//! # Architecture
//!
//! ```text
//! driver thread ──parse──► Engine queue ──► Engine worker ──notify──► Track::update
//!                                                                        │
//!                                  main loop / audio callback ◄── Track queue / feed
//! ```
//!
//! - [`framework`]: message queue, observer/subject, threaded and resource engines
//! - [`audio`]: audio engine state machine, real-time callback, devices, output stream
//! - [`midi`]: structured MIDI messages parsed from raw driver bytes
//! - [`track`]: tracks and the track manager
//! - [`files`]: WAV / MIDI file descriptors used as track inputs
//! - [`config`]: YAML configuration

pub mod audio;
pub mod config;
pub mod error;
pub mod files;
pub mod framework;
pub mod midi;
pub mod track;

pub use error::ErrorKind;
