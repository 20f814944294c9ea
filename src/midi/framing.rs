// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Wire length lookup for the serial MIDI link.
//!
//! Only the channel voice kinds listed in [`wire_len`] are carried over the
//! link. Everything else (control change, system common, real-time, SysEx)
//! has length 0 and is never framed.

use serde::{Deserialize, Serialize};

use super::messages;

/// How many bytes a note-off occupies on the wire.
///
/// Standard MIDI sends note-off as status, note, velocity. Some firmware
/// drops the release velocity and sends only status and note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteOffLength {
    /// Status and note number
    Two,
    /// Status, note number and release velocity
    #[default]
    Three,
}

impl NoteOffLength {
    /// Frame length in bytes
    pub fn bytes(self) -> usize {
        match self {
            NoteOffLength::Two => 2,
            NoteOffLength::Three => 3,
        }
    }
}

/// Number of bytes a message with this status byte occupies on the wire.
///
/// Returns 0 for kinds the link does not carry.
pub fn wire_len(status: u8, note_off: NoteOffLength) -> usize {
    match status & messages::KIND_MASK {
        messages::NOTE_OFF => note_off.bytes(),
        messages::NOTE_ON => 3,
        messages::POLY_AFTERTOUCH => 3,
        messages::PROGRAM_CHANGE => 2,
        messages::CHANNEL_AFTERTOUCH => 2,
        messages::PITCH_BEND => 3,
        _ => 0,
    }
}

/// True for status bytes (top bit set), false for data bytes.
pub fn is_status(byte: u8) -> bool {
    byte & 0x80 != 0
}

/// True for system real-time bytes, which may appear between the bytes of
/// any other message.
pub fn is_realtime(byte: u8) -> bool {
    byte >= messages::TIMING_CLOCK
}
