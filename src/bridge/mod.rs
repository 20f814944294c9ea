// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI-over-serial bridge.
//!
//! [`UartBridge::process`] is called once per host cycle. Each call runs,
//! in order:
//!
//! 1. the lifecycle check, which opens, closes or switches the serial port;
//! 2. the outbound framer, which writes host messages on the bridge channel
//!    to the port and passes every other message through;
//! 3. one non-blocking read into the receive buffer;
//! 4. the reassembler, which turns complete frames back into messages.
//!
//! Nothing blocks and nothing is retried within a cycle. Every failure
//! degrades to "no device attached" until a later cycle recovers.

pub mod directory;
pub mod inbound;
pub mod lifecycle;
pub mod outbound;

pub use directory::PortDirectory;
pub use inbound::{Reassembler, RECEIVE_BUFFER_SIZE};
pub use lifecycle::{LifecycleManager, LifecycleOutcome, TransportState};
pub use outbound::{OutboundFramer, OutboundReport};

use std::time::Instant;

use tracing::debug;

use crate::config::{BridgeConfig, BridgeSettings};
use crate::midi::{messages, MidiMessage};
use crate::serial::{PortId, SerialTransport, TransportHandle};

/// Event injected into the output stream when a port fails to open:
/// a bare note-off status on the bridge channel.
pub fn diagnostic_event(channel: u8) -> MidiMessage {
    MidiMessage::status_only(messages::NOTE_OFF | (channel & 0x0F))
}

/// One bridge instance: a serial port and everything needed to drive it
pub struct UartBridge<T: SerialTransport> {
    handle: TransportHandle<T>,
    directory: PortDirectory,
    lifecycle: LifecycleManager,
    outbound: OutboundFramer,
    inbound: Reassembler,
}

impl<T: SerialTransport> UartBridge<T> {
    /// Create a bridge and take the first inventory of serial ports.
    pub fn new(transport: T, settings: &BridgeSettings) -> Self {
        let mut handle = TransportHandle::new(transport);
        let mut directory = PortDirectory::new();
        directory.refresh(&mut handle);

        Self {
            handle,
            directory,
            lifecycle: LifecycleManager::new(
                settings.line(),
                settings.cooldown(),
                settings.refresh_interval(),
            ),
            outbound: OutboundFramer::new(settings.note_off_length),
            inbound: Reassembler::new(settings.note_off_length),
        }
    }

    /// Run one processing cycle.
    ///
    /// Returns the output stream: diagnostic events first, then the host
    /// messages that were not written to the port, then messages received
    /// from the port. Relative order within each group is preserved.
    pub fn process(
        &mut self,
        config: &BridgeConfig,
        inputs: &[MidiMessage],
        now: Instant,
    ) -> Vec<MidiMessage> {
        let channel = config.channel();
        let mut outputs = Vec::with_capacity(inputs.len() + 1);

        let desired = if config.enabled {
            self.directory.resolve(config.port_selector).cloned()
        } else {
            None
        };
        let outcome = self.lifecycle.evaluate(
            now,
            desired.as_ref(),
            &mut self.handle,
            &mut self.directory,
        );
        match outcome {
            LifecycleOutcome::Unchanged => {}
            LifecycleOutcome::OpenFailed => {
                outputs.push(diagnostic_event(channel));
                self.inbound.clear();
            }
            _ => self.inbound.clear(),
        }
        if !config.enabled {
            self.inbound.clear();
        }

        let report = self.outbound.drain(
            inputs,
            channel,
            config.enabled,
            &mut self.handle,
            &mut outputs,
        );
        if let Some(error) = report.failure {
            self.lifecycle.fail(&mut self.handle, &error);
        }

        self.receive();

        if config.enabled {
            let received = self.inbound.drain(&mut outputs);
            if received > 0 {
                debug!("Received {} messages from serial", received);
            }
        }

        outputs
    }

    /// [`process`](Self::process) at the current time
    pub fn process_now(&mut self, config: &BridgeConfig, inputs: &[MidiMessage]) -> Vec<MidiMessage> {
        self.process(config, inputs, Instant::now())
    }

    fn receive(&mut self) {
        if !self.handle.is_open() || self.inbound.is_full() {
            return;
        }
        match self.handle.receive(self.inbound.spare_mut()) {
            Ok(n) => self.inbound.commit(n),
            Err(e) => self.lifecycle.fail(&mut self.handle, &e),
        }
    }

    pub fn state(&self) -> &TransportState {
        self.lifecycle.state()
    }

    /// Port currently open, if any
    pub fn open_port(&self) -> Option<&PortId> {
        self.handle.port()
    }

    pub fn directory(&self) -> &PortDirectory {
        &self.directory
    }

    /// Re-enumerate serial ports now
    pub fn refresh_ports(&mut self) -> &[PortId] {
        self.directory.refresh(&mut self.handle)
    }

    /// Received bytes still waiting for the rest of their frame
    pub fn pending_bytes(&self) -> &[u8] {
        self.inbound.pending()
    }

    pub fn transport(&self) -> &T {
        self.handle.transport()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::serial::MemoryTransport;

    fn config(channel: u8) -> BridgeConfig {
        BridgeConfig {
            output_channel: channel,
            port_selector: 1.0,
            enabled: true,
        }
    }

    #[test]
    fn test_diagnostic_event() {
        assert_eq!(diagnostic_event(9).as_bytes(), &[0x89]);
        assert_eq!(diagnostic_event(0x1F).as_bytes(), &[0x8F]);
    }

    #[test]
    fn test_bridge_opens_selected_port() {
        let transport = MemoryTransport::with_ports(&["COM1", "COM2"]);
        let mut bridge = UartBridge::new(transport.clone(), &BridgeSettings::default());
        let now = Instant::now();

        let out = bridge.process(&config(0), &[], now);
        assert!(out.is_empty());
        assert_eq!(bridge.open_port().map(PortId::name), Some("COM2"));
        assert_eq!(bridge.state(), &TransportState::Open(PortId::from_name("COM2")));
    }

    #[test]
    fn test_bridge_round_trip_through_loopback() {
        let transport = MemoryTransport::loopback("COM1");
        let mut bridge = UartBridge::new(transport, &BridgeSettings::default());
        let now = Instant::now();
        let note = MidiMessage::note_on(9, 36, 127);

        // Written and read back within the same cycle
        let out = bridge.process(&config(9), &[note], now);
        assert_eq!(out, vec![note]);
    }

    #[test]
    fn test_bridge_reports_failed_open_once() {
        let transport = MemoryTransport::with_ports(&["COM1"]);
        transport.state().unavailable.push("COM1".to_string());
        let mut bridge = UartBridge::new(transport.clone(), &BridgeSettings::default());
        let start = Instant::now();

        let out = bridge.process(&config(3), &[], start);
        assert_eq!(out, vec![diagnostic_event(3)]);

        let out = bridge.process(&config(3), &[], start + Duration::from_millis(10));
        assert!(out.is_empty());
        assert_eq!(transport.open_attempts(), 1);
    }

    #[test]
    fn test_read_failure_closes_port() {
        let transport = MemoryTransport::with_ports(&["COM1"]);
        let mut bridge = UartBridge::new(transport.clone(), &BridgeSettings::default());
        let now = Instant::now();
        bridge.process(&config(0), &[], now);

        transport.state().fail_read = true;
        bridge.process(&config(0), &[], now);
        assert_eq!(bridge.state(), &TransportState::Closed);
        assert!(transport.state().open_port.is_none());
    }
}
