//! MIDI port discovery and connection
//!
//! [`MidirBackend`] uses midir (ALSA on Linux, CoreMIDI on macOS, WinMM on
//! Windows). The engine talks to it through [`MidiInputBackend`] so it can run
//! against other sources.

use std::fmt;

use midir::{MidiInput, MidiInputConnection};

use crate::error::{MidiError, MidiResult};
use crate::input::MidiInputSink;

/// An available MIDI input port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiPortInfo {
    pub port_number: usize,
    pub port_name: String,
}

impl fmt::Display for MidiPortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Port {}: {}", self.port_number, self.port_name)
    }
}

/// An open input connection
pub trait MidiInputConnectionHandle: Send {
    fn port_name(&self) -> &str;

    /// Disconnect; the driver stops invoking the sink
    fn close(self: Box<Self>);
}

/// Source of MIDI input ports
pub trait MidiInputBackend: Send + Sync {
    fn ports(&self) -> MidiResult<Vec<MidiPortInfo>>;

    /// Connect to `port`; the driver feeds raw messages into `sink`
    fn connect(
        &self,
        port: usize,
        sink: MidiInputSink,
    ) -> MidiResult<Box<dyn MidiInputConnectionHandle>>;
}

/// midir-backed port catalog and connector
#[derive(Debug, Default, Clone, Copy)]
pub struct MidirBackend;

impl MidirBackend {
    pub fn new() -> Self {
        Self
    }

    fn midi_input(client_name: &str) -> MidiResult<MidiInput> {
        MidiInput::new(client_name).map_err(|e| MidiError::driver("initialize MIDI input", e))
    }
}

impl MidiInputBackend for MidirBackend {
    fn ports(&self) -> MidiResult<Vec<MidiPortInfo>> {
        let midi_in = Self::midi_input("daw-midi-list")?;
        let ports = midi_in
            .ports()
            .iter()
            .enumerate()
            .map(|(port_number, port)| MidiPortInfo {
                port_number,
                port_name: midi_in
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Port {}", port_number)),
            })
            .collect();
        Ok(ports)
    }

    fn connect(
        &self,
        port: usize,
        sink: MidiInputSink,
    ) -> MidiResult<Box<dyn MidiInputConnectionHandle>> {
        let midi_in = Self::midi_input("daw-midi-in")?;
        let ports = midi_in.ports();
        let input_port = ports.get(port).ok_or(MidiError::PortOutOfRange {
            port,
            available: ports.len(),
        })?;

        let port_name = midi_in
            .port_name(input_port)
            .map_err(|e| MidiError::driver("get port name", e))?;

        let connection = midi_in
            .connect(
                input_port,
                "daw-midi-input",
                |timestamp, bytes, sink: &mut MidiInputSink| sink.receive(timestamp, bytes),
                sink,
            )
            .map_err(|e| MidiError::driver("open input port", e))?;

        Ok(Box::new(MidirConnection {
            connection,
            port_name,
        }))
    }
}

/// Keeps the midir connection (and with it the callback) alive
struct MidirConnection {
    connection: MidiInputConnection<MidiInputSink>,
    port_name: String,
}

impl MidiInputConnectionHandle for MidirConnection {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn close(self: Box<Self>) {
        let (_midi_in, sink) = self.connection.close();
        if sink.dropped() > 0 {
            log::warn!(
                "MIDI: {} messages dropped on '{}'",
                sink.dropped(),
                self.port_name
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_ports() {
        // Port availability depends on the system; just make sure this doesn't panic
        match MidirBackend::new().ports() {
            Ok(ports) => {
                for port in ports {
                    println!("  - {}", port);
                }
            }
            Err(e) => println!("MIDI unavailable: {}", e),
        }
    }
}
