// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Structured MIDI messages exchanged with the host.

use std::fmt;

use super::{is_status, messages};

/// A short MIDI message: one status byte followed by up to two data bytes.
///
/// The message never stores a length on the wire; the serial framing derives
/// it from the status byte. A status-only message (no data bytes) is valid
/// here and is what the bridge uses for its diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MidiMessage {
    bytes: [u8; 3],
    len: u8,
}

impl MidiMessage {
    /// Largest message this type can hold
    pub const MAX_LEN: usize = 3;

    /// Build a message from a status byte and optional data bytes.
    ///
    /// Data bytes are masked to 7 bits. `data2` is ignored without `data1`.
    pub fn new(status: u8, data1: Option<u8>, data2: Option<u8>) -> Self {
        let mut bytes = [status, 0, 0];
        let mut len = 1;
        if let Some(d1) = data1 {
            bytes[1] = d1 & 0x7F;
            len = 2;
            if let Some(d2) = data2 {
                bytes[2] = d2 & 0x7F;
                len = 3;
            }
        }
        Self { bytes, len }
    }

    /// A message consisting of the status byte alone
    pub fn status_only(status: u8) -> Self {
        Self::new(status, None, None)
    }

    /// Parse raw bytes. Returns `None` for empty input, input longer than
    /// three bytes, or input that does not start with a status byte.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let (&status, rest) = data.split_first()?;
        if !is_status(status) || rest.len() > 2 {
            return None;
        }
        Some(Self::new(status, rest.first().copied(), rest.get(1).copied()))
    }

    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(messages::NOTE_ON | (channel & 0x0F), Some(note), Some(velocity))
    }

    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(messages::NOTE_OFF | (channel & 0x0F), Some(note), Some(velocity))
    }

    /// Program Change: channel (0-15), program (0-127)
    pub fn program_change(channel: u8, program: u8) -> Self {
        Self::new(messages::PROGRAM_CHANGE | (channel & 0x0F), Some(program), None)
    }

    /// Control Change: channel (0-15), controller (0-127), value (0-127)
    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        Self::new(
            messages::CONTROL_CHANGE | (channel & 0x0F),
            Some(controller),
            Some(value),
        )
    }

    pub fn status(&self) -> u8 {
        self.bytes[0]
    }

    /// Message kind (upper nibble of the status byte)
    pub fn kind(&self) -> u8 {
        self.bytes[0] & messages::KIND_MASK
    }

    /// Channel (0-15) for channel voice messages, `None` for system messages.
    pub fn channel(&self) -> Option<u8> {
        if self.kind() < messages::SYSEX_START {
            Some(self.bytes[0] & messages::CHANNEL_MASK)
        } else {
            None
        }
    }

    pub fn data1(&self) -> Option<u8> {
        (self.len >= 2).then(|| self.bytes[1])
    }

    pub fn data2(&self) -> Option<u8> {
        (self.len >= 3).then(|| self.bytes[2])
    }

    /// The bytes carried by this message
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Exactly `len` bytes for the wire, zero-padding missing data bytes.
    pub(crate) fn frame(&self, len: usize) -> [u8; 3] {
        let mut frame = [0u8; 3];
        let n = len.min(self.len as usize);
        frame[..n].copy_from_slice(&self.bytes[..n]);
        frame
    }

    fn kind_name(&self) -> &'static str {
        match self.kind() {
            messages::NOTE_OFF => "NoteOff",
            messages::NOTE_ON => "NoteOn",
            messages::POLY_AFTERTOUCH => "PolyAftertouch",
            messages::CONTROL_CHANGE => "ControlChange",
            messages::PROGRAM_CHANGE => "ProgramChange",
            messages::CHANNEL_AFTERTOUCH => "ChannelAftertouch",
            messages::PITCH_BEND => "PitchBend",
            _ => "System",
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind_name())?;
        if let Some(channel) = self.channel() {
            // Channels are shown 1-16
            write!(f, " ch{}", channel + 1)?;
        }
        write!(f, " [")?;
        for (i, byte) in self.as_bytes().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_note_on() {
        let msg = MidiMessage::from_bytes(&[0x90, 60, 100]).unwrap();
        assert_eq!(msg.status(), 0x90);
        assert_eq!(msg.kind(), messages::NOTE_ON);
        assert_eq!(msg.channel(), Some(0));
        assert_eq!(msg.data1(), Some(60));
        assert_eq!(msg.data2(), Some(100));
        assert_eq!(msg, MidiMessage::note_on(0, 60, 100));
    }

    #[test]
    fn test_parse_program_change() {
        let msg = MidiMessage::from_bytes(&[0xC3, 5]).unwrap();
        assert_eq!(msg.channel(), Some(3));
        assert_eq!(msg.data1(), Some(5));
        assert_eq!(msg.data2(), None);
        assert_eq!(msg.as_bytes(), &[0xC3, 5]);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(MidiMessage::from_bytes(&[]), None);
        assert_eq!(MidiMessage::from_bytes(&[0x40, 0x40]), None);
        assert_eq!(MidiMessage::from_bytes(&[0x90, 1, 2, 3]), None);
    }

    #[test]
    fn test_status_only() {
        let msg = MidiMessage::status_only(0x89);
        assert_eq!(msg.as_bytes(), &[0x89]);
        assert_eq!(msg.channel(), Some(9));
        assert_eq!(msg.data1(), None);
    }

    #[test]
    fn test_data_bytes_are_masked() {
        let msg = MidiMessage::note_on(0, 0xC0, 0xFF);
        assert_eq!(msg.as_bytes(), &[0x90, 0x40, 0x7F]);
    }

    #[test]
    fn test_system_messages_have_no_channel() {
        let msg = MidiMessage::status_only(messages::TIMING_CLOCK);
        assert_eq!(msg.channel(), None);
    }

    #[test]
    fn test_frame_pads_missing_bytes() {
        let msg = MidiMessage::status_only(0x82);
        assert_eq!(msg.frame(3), [0x82, 0, 0]);

        let msg = MidiMessage::note_on(1, 60, 100);
        assert_eq!(&msg.frame(3)[..], &[0x91, 60, 100]);
    }

    #[test]
    fn test_display() {
        let msg = MidiMessage::note_on(9, 0x40, 0x64);
        assert_eq!(msg.to_string(), "NoteOn ch10 [99 40 64]");
    }
}
