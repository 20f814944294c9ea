// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Serial transport abstraction.
//!
//! The bridge talks to the serial hardware through two small traits so that
//! the OS backend (`system`) and the in-memory backend (`memory`) can be used
//! interchangeably. [`TransportHandle`] owns at most one open link at a time.

pub mod memory;
pub mod system;

use std::fmt;

use tracing::{debug, info};

use crate::error::{Result, TransportError};

pub use memory::{MemoryLink, MemoryState, MemoryTransport};
pub use system::{SystemLink, SystemTransport};

/// Baud rate agreed with the bridge firmware
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// A serial port as seen by enumeration.
///
/// `number` is the numeric identifier taken from the end of the OS name
/// (`COM3` is 3, `/dev/ttyUSB0` is 0). Ports order by number first, then by
/// name, so a sorted list is stable between enumerations of the same set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortId {
    number: u32,
    name: String,
}

impl PortId {
    pub fn new(number: u32, name: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
        }
    }

    /// Build an id from an OS port name, taking its trailing digits as the number
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let digits = name
            .bytes()
            .rev()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let number = name[name.len() - digits..].parse().unwrap_or(0);
        Self { number, name }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Path or device name used to open the port
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Line discipline. Always 8 data bits, 1 stop bit, no parity, no flow
/// control; only the baud rate is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineConfig {
    pub baud_rate: u32,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// An open serial connection.
///
/// Dropping the link closes the port.
pub trait SerialLink {
    /// Write bytes, returning how many were accepted by the port.
    fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Read whatever is available right now into `buf` without blocking.
    ///
    /// Returns 0 when nothing is pending.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Source of serial ports: enumeration and opening.
pub trait SerialTransport {
    type Link: SerialLink;

    /// List the ports currently present, in any order.
    fn enumerate(&mut self) -> Result<Vec<PortId>>;

    /// Open a port with the given line discipline in non-blocking read mode.
    fn open(&mut self, port: &PortId, line: &LineConfig) -> Result<Self::Link>;
}

/// Owns the transport and at most one open link.
pub struct TransportHandle<T: SerialTransport> {
    transport: T,
    link: Option<(PortId, T::Link)>,
}

impl<T: SerialTransport> TransportHandle<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            link: None,
        }
    }

    /// Open `port`, closing any link that is already open first.
    pub fn open(&mut self, port: &PortId, line: &LineConfig) -> Result<()> {
        self.close();
        let link = self.transport.open(port, line)?;
        info!("Opened serial port {} at {} baud", port, line.baud_rate);
        self.link = Some((port.clone(), link));
        Ok(())
    }

    /// Close the open link, if any. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some((port, link)) = self.link.take() {
            drop(link);
            info!("Closed serial port {}", port);
        }
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    /// Port of the open link
    pub fn port(&self) -> Option<&PortId> {
        self.link.as_ref().map(|(port, _)| port)
    }

    /// Write all of `bytes`. A partial write is an error.
    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let (_, link) = self.link.as_mut().ok_or(TransportError::NotOpen)?;
        let written = link.write(bytes)?;
        if written != bytes.len() {
            return Err(TransportError::ShortWrite {
                expected: bytes.len(),
                written,
            });
        }
        Ok(())
    }

    /// Read up to `buf.len()` bytes that are already available.
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        let (_, link) = self.link.as_mut().ok_or(TransportError::NotOpen)?;
        let n = link.read(buf)?;
        if n > 0 {
            debug!("Received {} bytes", n);
        }
        Ok(n.min(buf.len()))
    }

    /// Enumerate ports through the underlying transport
    pub fn enumerate(&mut self) -> Result<Vec<PortId>> {
        self.transport.enumerate()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: SerialTransport> Drop for TransportHandle<T> {
    fn drop(&mut self) {
        self.close();
    }
}
