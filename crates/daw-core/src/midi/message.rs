//! Structured MIDI messages parsed from raw driver bytes
//!
//! Message format:
//! - Note Off: 0x8n kk vv (n=channel, kk=key, vv=velocity)
//! - Note On: 0x9n kk vv
//! - Poly Aftertouch: 0xAn kk pp
//! - Control Change: 0xBn cc vv
//! - Program Change: 0xCn pp
//! - Channel Aftertouch: 0xDn pp
//! - Pitch Bend: 0xEn ll mm
//! - System: 0xF0..=0xFF
//!
//! Unknown or running-status bytes still produce a message tagged `Unknown`
//! so delta-time accounting stays intact.

use std::fmt;

/// Classification by the status byte's high nibble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MidiMessageType {
    NoteOff,
    NoteOn,
    PolyAftertouch,
    ControlChange,
    ProgramChange,
    ChannelAftertouch,
    PitchBend,
    System,
    Unknown,
}

impl MidiMessageType {
    pub fn from_status(status: u8) -> Self {
        match status & 0xF0 {
            0x80 => Self::NoteOff,
            0x90 => Self::NoteOn,
            0xA0 => Self::PolyAftertouch,
            0xB0 => Self::ControlChange,
            0xC0 => Self::ProgramChange,
            0xD0 => Self::ChannelAftertouch,
            0xE0 => Self::PitchBend,
            0xF0 => Self::System,
            _ => Self::Unknown,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::NoteOff => "Note Off",
            Self::NoteOn => "Note On",
            Self::PolyAftertouch => "Poly Aftertouch",
            Self::ControlChange => "Control Change",
            Self::ProgramChange => "Program Change",
            Self::ChannelAftertouch => "Channel Aftertouch",
            Self::PitchBend => "Pitch Bend",
            Self::System => "System",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether the low nibble of the status byte is a channel
    pub fn is_channel_message(&self) -> bool {
        !matches!(self, Self::System | Self::Unknown)
    }
}

impl fmt::Display for MidiMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// One MIDI event as delivered to tracks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiMessage {
    /// Seconds since the previous message on the same input
    pub delta_time: f64,
    pub status_byte: u8,
    pub message_type: MidiMessageType,
    /// 0-15 for channel messages, 0 otherwise
    pub channel: u8,
    pub data1: u8,
    pub data2: u8,
}

impl MidiMessage {
    /// Parse raw bytes from the driver
    ///
    /// Returns `None` only for an empty buffer. Missing data bytes read as 0.
    pub fn parse(delta_time: f64, bytes: &[u8]) -> Option<Self> {
        let status_byte = *bytes.first()?;
        let message_type = if status_byte < 0x80 {
            MidiMessageType::Unknown
        } else {
            MidiMessageType::from_status(status_byte)
        };
        let channel = if message_type.is_channel_message() {
            status_byte & 0x0F
        } else {
            0
        };

        Some(Self {
            delta_time,
            status_byte,
            message_type,
            channel,
            data1: bytes.get(1).copied().unwrap_or(0),
            data2: bytes.get(2).copied().unwrap_or(0),
        })
    }

    fn channel_message(message_type: MidiMessageType, base: u8, channel: u8, data1: u8, data2: u8) -> Self {
        let channel = channel & 0x0F;
        Self {
            delta_time: 0.0,
            status_byte: base | channel,
            message_type,
            channel,
            data1,
            data2,
        }
    }

    pub fn note_on(channel: u8, key: u8, velocity: u8) -> Self {
        Self::channel_message(MidiMessageType::NoteOn, 0x90, channel, key, velocity)
    }

    pub fn note_off(channel: u8, key: u8, velocity: u8) -> Self {
        Self::channel_message(MidiMessageType::NoteOff, 0x80, channel, key, velocity)
    }

    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        Self::channel_message(MidiMessageType::ControlChange, 0xB0, channel, controller, value)
    }

    pub fn type_name(&self) -> &'static str {
        self.message_type.type_name()
    }

    /// 14-bit pitch bend value, centred on 8192
    pub fn pitch_bend_value(&self) -> Option<u16> {
        (self.message_type == MidiMessageType::PitchBend)
            .then(|| (u16::from(self.data2 & 0x7F) << 7) | u16::from(self.data1 & 0x7F))
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ch={} d1={} d2={} (status {:#04x}, +{:.4}s)",
            self.message_type, self.channel, self.data1, self.data2, self.status_byte, self.delta_time
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channel_messages() {
        let msg = MidiMessage::parse(0.5, &[0x93, 60, 100]).unwrap();
        assert_eq!(msg.message_type, MidiMessageType::NoteOn);
        assert_eq!(msg.channel, 3);
        assert_eq!((msg.data1, msg.data2), (60, 100));
        assert_eq!(msg.delta_time, 0.5);

        let cc = MidiMessage::parse(0.0, &[0xBF, 7, 127]).unwrap();
        assert_eq!(cc.message_type, MidiMessageType::ControlChange);
        assert_eq!(cc.channel, 15);

        let bend = MidiMessage::parse(0.0, &[0xE0, 0x00, 0x40]).unwrap();
        assert_eq!(bend.pitch_bend_value(), Some(8192));
    }

    #[test]
    fn test_parse_short_messages_pad_with_zero() {
        let program = MidiMessage::parse(0.0, &[0xC1, 5]).unwrap();
        assert_eq!(program.message_type, MidiMessageType::ProgramChange);
        assert_eq!((program.data1, program.data2), (5, 0));

        let clock = MidiMessage::parse(0.0, &[0xF8]).unwrap();
        assert_eq!(clock.message_type, MidiMessageType::System);
        assert_eq!(clock.channel, 0);
    }

    #[test]
    fn test_unknown_status_is_kept() {
        let msg = MidiMessage::parse(0.25, &[0x40, 1, 2]).unwrap();
        assert_eq!(msg.message_type, MidiMessageType::Unknown);
        assert_eq!(msg.type_name(), "Unknown");
        assert_eq!(msg.delta_time, 0.25);
        assert!(MidiMessage::parse(0.0, &[]).is_none());
    }

    #[test]
    fn test_constructors_match_parse() {
        assert_eq!(
            MidiMessage::note_on(2, 64, 90),
            MidiMessage::parse(0.0, &[0x92, 64, 90]).unwrap()
        );
        assert_eq!(
            MidiMessage::note_off(0, 64, 0),
            MidiMessage::parse(0.0, &[0x80, 64, 0]).unwrap()
        );
    }
}
