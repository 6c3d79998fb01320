//! DAW MIDI - MIDI input engine
//!
//! ```text
//! midir thread ──MidiInputSink::receive──► parse ──try_push──► engine queue
//!                                                                  │ pop
//!                                                   worker ──notify──► Track::update
//! ```
//!
//! The driver callback never blocks: it parses, stamps the delta time and
//! enqueues with `try_push`, dropping (and logging) the message if the bounded
//! queue is full.
//!
//! # Example
//!
//! ```ignore
//! let midi = MidiEngine::new(&MidiConfig::default());
//! midi.start()?;
//! for port in midi.get_ports()? {
//!     println!("{}", port);
//! }
//! midi.open_input_port(0)?;
//! midi.attach(&track);
//! ```

pub mod backend;
pub mod engine;
pub mod error;
pub mod input;

pub use backend::{MidiInputBackend, MidiInputConnectionHandle, MidiPortInfo, MidirBackend};
pub use engine::{MidiEngine, MidiProcessor};
pub use error::{MidiError, MidiResult};
pub use input::MidiInputSink;
