// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI message types and serial wire framing.
//!
//! Messages travel between the host and the bridge as `MidiMessage` values.
//! On the serial line they are bare status/data bytes with no length field,
//! so the length of every frame is derived from its status byte.

pub mod framing;
pub mod message;

pub use framing::{is_realtime, is_status, wire_len, NoteOffLength};
pub use message::MidiMessage;

/// MIDI message constants
pub mod messages {
    // Channel Voice Messages (upper nibble, lower nibble is channel 0-15)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const POLY_AFTERTOUCH: u8 = 0xA0;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const CHANNEL_AFTERTOUCH: u8 = 0xD0;
    pub const PITCH_BEND: u8 = 0xE0;

    // System Common Messages
    pub const SYSEX_START: u8 = 0xF0;

    // System Real-Time Messages (0xF8-0xFF)
    pub const TIMING_CLOCK: u8 = 0xF8;

    /// Mask selecting the message kind from a status byte
    pub const KIND_MASK: u8 = 0xF0;
    /// Mask selecting the channel from a channel voice status byte
    pub const CHANNEL_MASK: u8 = 0x0F;
}
