// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI over a serial link.
//!
//! A [`UartBridge`] sends host MIDI messages on one channel to a serial
//! device and turns bytes coming back from the device into MIDI messages.
//! Everything runs inside the host's processing cycle without blocking.

pub mod bridge;
pub mod config;
pub mod error;
#[cfg(feature = "midi-host")]
pub mod host;
pub mod midi;
pub mod serial;

pub use bridge::{TransportState, UartBridge};
pub use config::{BridgeConfig, BridgeFile, BridgeSettings, HostConfig};
pub use error::TransportError;
pub use midi::{MidiMessage, NoteOffLength};
pub use serial::{MemoryTransport, PortId, SerialTransport, SystemTransport};
