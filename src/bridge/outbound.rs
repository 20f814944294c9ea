// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Outbound framer: writes host messages on the bridge channel to the wire.

use tracing::debug;

use crate::error::TransportError;
use crate::midi::{wire_len, MidiMessage, NoteOffLength};
use crate::serial::{SerialTransport, TransportHandle};

/// Result of draining one cycle's host messages
#[derive(Debug, Default, PartialEq, Eq)]
pub struct OutboundReport {
    /// Messages written to the wire
    pub sent: usize,
    /// First write failure, if any. The failed message is dropped.
    pub failure: Option<TransportError>,
}

/// Splits the host stream into messages for the wire and pass-through.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutboundFramer {
    note_off: NoteOffLength,
}

impl OutboundFramer {
    pub fn new(note_off: NoteOffLength) -> Self {
        Self { note_off }
    }

    /// Send every message for `channel` to the open link, in order.
    ///
    /// Messages that are not sent are appended to `passthrough` unchanged.
    /// After a write failure nothing more is written this cycle and the
    /// remaining messages pass through.
    pub fn drain<T: SerialTransport>(
        &self,
        inputs: &[MidiMessage],
        channel: u8,
        enabled: bool,
        handle: &mut TransportHandle<T>,
        passthrough: &mut Vec<MidiMessage>,
    ) -> OutboundReport {
        let mut report = OutboundReport::default();

        for message in inputs {
            let len = wire_len(message.status(), self.note_off);
            let claim = enabled
                && report.failure.is_none()
                && handle.is_open()
                && len > 0
                && message.channel() == Some(channel);
            if !claim {
                passthrough.push(*message);
                continue;
            }

            let frame = message.frame(len);
            match handle.send(&frame[..len]) {
                Ok(()) => {
                    debug!("Sent {}", message);
                    report.sent += 1;
                }
                Err(e) => report.failure = Some(e),
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::{LineConfig, MemoryTransport, PortId};

    fn open_handle() -> (MemoryTransport, TransportHandle<MemoryTransport>) {
        let transport = MemoryTransport::with_ports(&["COM1"]);
        let mut handle = TransportHandle::new(transport.clone());
        handle
            .open(&PortId::from_name("COM1"), &LineConfig::default())
            .unwrap();
        (transport, handle)
    }

    #[test]
    fn test_sends_channel_messages() {
        let (transport, mut handle) = open_handle();
        let framer = OutboundFramer::default();
        let inputs = [
            MidiMessage::note_on(9, 36, 100),
            MidiMessage::program_change(9, 4),
        ];
        let mut out = Vec::new();

        let report = framer.drain(&inputs, 9, true, &mut handle, &mut out);
        assert_eq!(report.sent, 2);
        assert!(report.failure.is_none());
        assert!(out.is_empty());
        assert_eq!(transport.take_written(), vec![0x99, 36, 100, 0xC9, 4]);
    }

    #[test]
    fn test_other_channels_pass_through_in_order() {
        let (transport, mut handle) = open_handle();
        let framer = OutboundFramer::default();
        let inputs = [
            MidiMessage::note_on(0, 60, 100),
            MidiMessage::note_on(9, 36, 100),
            MidiMessage::note_off(1, 60, 0),
        ];
        let mut out = Vec::new();

        framer.drain(&inputs, 9, true, &mut handle, &mut out);
        assert_eq!(out, vec![inputs[0], inputs[2]]);
        assert_eq!(transport.take_written(), vec![0x99, 36, 100]);
    }

    #[test]
    fn test_unsupported_kinds_pass_through() {
        let (transport, mut handle) = open_handle();
        let framer = OutboundFramer::default();
        let inputs = [
            MidiMessage::control_change(9, 7, 100),
            MidiMessage::status_only(0xF8),
        ];
        let mut out = Vec::new();

        let report = framer.drain(&inputs, 9, true, &mut handle, &mut out);
        assert_eq!(report.sent, 0);
        assert_eq!(out, inputs.to_vec());
        assert!(transport.take_written().is_empty());
    }

    #[test]
    fn test_disabled_or_closed_passes_through() {
        let (transport, mut handle) = open_handle();
        let framer = OutboundFramer::default();
        let inputs = [MidiMessage::note_on(9, 36, 100)];
        let mut out = Vec::new();

        framer.drain(&inputs, 9, false, &mut handle, &mut out);
        assert_eq!(out, inputs.to_vec());

        handle.close();
        out.clear();
        framer.drain(&inputs, 9, true, &mut handle, &mut out);
        assert_eq!(out, inputs.to_vec());
        assert!(transport.take_written().is_empty());
    }

    #[test]
    fn test_write_failure_drops_message_and_stops() {
        let (transport, mut handle) = open_handle();
        transport.state().fail_write = true;
        let framer = OutboundFramer::default();
        let inputs = [
            MidiMessage::note_on(9, 36, 100),
            MidiMessage::note_on(9, 38, 100),
            MidiMessage::note_on(2, 60, 100),
        ];
        let mut out = Vec::new();

        let report = framer.drain(&inputs, 9, true, &mut handle, &mut out);
        assert_eq!(report.sent, 0);
        assert!(matches!(report.failure, Some(TransportError::Write(_))));
        // First message is consumed by the failed write, the rest pass through
        assert_eq!(out, vec![inputs[1], inputs[2]]);
    }

    #[test]
    fn test_short_status_only_message_is_padded() {
        let (transport, mut handle) = open_handle();
        let framer = OutboundFramer::default();
        let mut out = Vec::new();

        framer.drain(&[MidiMessage::status_only(0x83)], 3, true, &mut handle, &mut out);
        assert_eq!(transport.take_written(), vec![0x83, 0, 0]);
    }

    #[test]
    fn test_two_byte_note_off() {
        let (transport, mut handle) = open_handle();
        let framer = OutboundFramer::new(NoteOffLength::Two);
        let mut out = Vec::new();

        framer.drain(&[MidiMessage::note_off(0, 60, 64)], 0, true, &mut handle, &mut out);
        assert_eq!(transport.take_written(), vec![0x80, 60]);
    }
}
