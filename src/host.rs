// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI port I/O for the command-line host.
//!
//! Feeds messages from a MIDI input port into the bridge and sends the
//! bridge output to a MIDI output port. Ports are picked by a
//! case-insensitive substring of their name.

use std::sync::mpsc::{self, Receiver, Sender};

use anyhow::{anyhow, Result};
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tracing::{debug, info};

use crate::config::HostConfig;
use crate::midi::MidiMessage;

const CLIENT_NAME: &str = "midibridge";

/// Connected MIDI ports for one bridge
pub struct MidiHost {
    _input: Option<MidiInputConnection<()>>,
    output: Option<MidiOutputConnection>,
    receiver: Receiver<MidiMessage>,
}

impl MidiHost {
    /// Connect the ports named in `config`. Either side may be left out.
    pub fn connect(config: &HostConfig) -> Result<Self> {
        let (tx, rx): (Sender<MidiMessage>, Receiver<MidiMessage>) = mpsc::channel();

        let input = match &config.midi_input {
            Some(pattern) => Some(connect_input(pattern, tx)?),
            None => None,
        };
        let output = match &config.midi_output {
            Some(pattern) => Some(connect_output(pattern)?),
            None => None,
        };

        Ok(Self {
            _input: input,
            output,
            receiver: rx,
        })
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Receive all pending MIDI messages
    pub fn recv_all(&self) -> Vec<MidiMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Send messages to the output port, if one is connected
    pub fn send(&mut self, messages: &[MidiMessage]) -> Result<()> {
        let Some(output) = self.output.as_mut() else {
            return Ok(());
        };
        for msg in messages {
            output
                .send(msg.as_bytes())
                .map_err(|e| anyhow!("Failed to send MIDI message: {}", e))?;
        }
        Ok(())
    }
}

fn connect_input(pattern: &str, tx: Sender<MidiMessage>) -> Result<MidiInputConnection<()>> {
    let midi_in = MidiInput::new(CLIENT_NAME)
        .map_err(|e| anyhow!("Failed to create MIDI input: {}", e))?;
    let ports = midi_in.ports();
    let names: Vec<String> = ports
        .iter()
        .map(|p| midi_in.port_name(p).unwrap_or_default())
        .collect();
    let index = find_port(&names, pattern)
        .ok_or_else(|| anyhow!("No MIDI input found matching '{}'", pattern))?;
    info!("Connecting MIDI input {}", names[index]);

    midi_in
        .connect(
            &ports[index],
            "midibridge-in",
            move |_timestamp, data, _| match MidiMessage::from_bytes(data) {
                Some(msg) => {
                    let _ = tx.send(msg);
                }
                None => debug!("Ignoring MIDI input of {} bytes", data.len()),
            },
            (),
        )
        .map_err(|e| anyhow!("Failed to connect to MIDI input: {}", e))
}

fn connect_output(pattern: &str) -> Result<MidiOutputConnection> {
    let midi_out = MidiOutput::new(CLIENT_NAME)
        .map_err(|e| anyhow!("Failed to create MIDI output: {}", e))?;
    let ports = midi_out.ports();
    let names: Vec<String> = ports
        .iter()
        .map(|p| midi_out.port_name(p).unwrap_or_default())
        .collect();
    let index = find_port(&names, pattern)
        .ok_or_else(|| anyhow!("No MIDI output found matching '{}'", pattern))?;
    info!("Connecting MIDI output {}", names[index]);

    midi_out
        .connect(&ports[index], "midibridge-out")
        .map_err(|e| anyhow!("Failed to connect to MIDI output: {}", e))
}

/// Index of the first name containing `pattern`, ignoring case
pub fn find_port(names: &[String], pattern: &str) -> Option<usize> {
    let pattern = pattern.to_lowercase();
    names
        .iter()
        .position(|name| name.to_lowercase().contains(&pattern))
}

/// List MIDI input ports
pub fn list_inputs() -> Vec<(usize, String)> {
    let mut result = Vec::new();
    if let Ok(midi_in) = MidiInput::new(CLIENT_NAME) {
        for (i, port) in midi_in.ports().iter().enumerate() {
            let name = midi_in
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown {}", i));
            result.push((i, name));
        }
    }
    result
}

/// List MIDI output ports
pub fn list_outputs() -> Vec<(usize, String)> {
    let mut result = Vec::new();
    if let Ok(midi_out) = MidiOutput::new(CLIENT_NAME) {
        for (i, port) in midi_out.ports().iter().enumerate() {
            let name = midi_out
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown {}", i));
            result.push((i, name));
        }
    }
    result
}

/// Print all MIDI ports to stdout
pub fn print_ports() {
    for (label, ports) in [("inputs", list_inputs()), ("outputs", list_outputs())] {
        if ports.is_empty() {
            println!("No MIDI {} found.", label);
        } else {
            println!("Available MIDI {}:", label);
            for (i, name) in ports {
                println!("  {}: {}", i, name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_find_port_substring() {
        let ports = names(&["IAC Driver Bus 1", "Keystation 49 MK3", "Launchpad X"]);
        assert_eq!(find_port(&ports, "keystation"), Some(1));
        assert_eq!(find_port(&ports, "Bus"), Some(0));
        assert_eq!(find_port(&ports, "Push"), None);
    }

    #[test]
    fn test_find_port_first_match_wins() {
        let ports = names(&["Launchpad X LPX DAW", "Launchpad X LPX MIDI"]);
        assert_eq!(find_port(&ports, "launchpad"), Some(0));
    }
}
