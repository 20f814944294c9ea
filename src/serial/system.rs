// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! OS serial ports through the `serialport` crate.

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::error::{Result, TransportError};

use super::{LineConfig, PortId, SerialLink, SerialTransport};

/// Serial ports provided by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTransport;

impl SystemTransport {
    pub fn new() -> Self {
        Self
    }
}

impl SerialTransport for SystemTransport {
    type Link = SystemLink;

    fn enumerate(&mut self) -> Result<Vec<PortId>> {
        let ports = serialport::available_ports()
            .map_err(|e| TransportError::Enumerate(e.to_string()))?;
        Ok(ports
            .into_iter()
            .map(|info| PortId::from_name(info.port_name))
            .collect())
    }

    fn open(&mut self, port: &PortId, line: &LineConfig) -> Result<SystemLink> {
        // A zero timeout makes reads return immediately with whatever is buffered
        let serial = serialport::new(port.name(), line.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(Duration::ZERO)
            .open()
            .map_err(|e| TransportError::Open {
                port: port.name().to_string(),
                reason: e.to_string(),
            })?;
        Ok(SystemLink { port: serial })
    }
}

/// An open OS serial port
pub struct SystemLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink for SystemLink {
    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        self.port
            .write(bytes)
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let available = self
            .port
            .bytes_to_read()
            .map_err(|e| TransportError::Read(e.to_string()))? as usize;
        if available == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = available.min(buf.len());
        match self.port.read(&mut buf[..want]) {
            Ok(n) => Ok(n),
            Err(e) if is_nothing_pending(&e) => Ok(0),
            Err(e) => Err(TransportError::Read(e.to_string())),
        }
    }
}

fn is_nothing_pending(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumerate_does_not_panic() {
        // Results vary by machine; enumeration may even be unsupported
        let mut transport = SystemTransport::new();
        match transport.enumerate() {
            Ok(ports) => println!("Found {} serial ports", ports.len()),
            Err(e) => println!("Enumeration failed: {}", e),
        }
    }

    #[test]
    fn test_open_missing_port_fails() {
        let mut transport = SystemTransport::new();
        let port = PortId::from_name("/nonexistent/ttyMIDI99");
        let result = transport.open(&port, &LineConfig::default());
        assert!(matches!(result, Err(TransportError::Open { .. })));
    }

    #[test]
    fn test_nothing_pending_kinds() {
        assert!(is_nothing_pending(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(!is_nothing_pending(&io::Error::from(
            io::ErrorKind::BrokenPipe
        )));
    }
}
