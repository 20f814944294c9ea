// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! In-memory serial transport.
//!
//! Backs the `--loopback` mode of the binary and the test suite. Every clone
//! shares the same [`MemoryState`], so a test can keep one clone to script
//! failures and inspect traffic while the bridge owns another.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Result, TransportError};

use super::{LineConfig, PortId, SerialLink, SerialTransport};

/// Shared state of a [`MemoryTransport`]
#[derive(Debug, Default)]
pub struct MemoryState {
    /// Ports reported by enumeration, in the order given
    pub ports: Vec<PortId>,
    /// Port names that refuse to open even when listed
    pub unavailable: Vec<String>,
    /// Make enumeration fail
    pub fail_enumerate: bool,
    /// Make every write fail
    pub fail_write: bool,
    /// Make every read fail
    pub fail_read: bool,
    /// Accept one byte less than requested on every write
    pub short_write: bool,
    /// Maximum bytes handed out per read (unlimited when `None`)
    pub chunk_limit: Option<usize>,
    /// Feed written bytes straight back to the receive side
    pub loopback: bool,
    /// Port currently held open by a link
    pub open_port: Option<PortId>,
    /// Baud rate of the last successful open
    pub baud_rate: Option<u32>,
    /// Every open attempt, successful or not
    pub open_attempts: Vec<PortId>,
    /// Number of enumerations performed
    pub enumerations: usize,
    /// Bytes written while a link was open
    pub written: Vec<u8>,
    /// Bytes waiting to be read
    pub incoming: VecDeque<u8>,
}

/// Cloneable handle to an in-memory set of serial ports
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport listing the given port names
    pub fn with_ports(names: &[&str]) -> Self {
        let transport = Self::new();
        transport.set_ports(names);
        transport
    }

    /// A single port that echoes everything written to it
    pub fn loopback(name: &str) -> Self {
        let transport = Self::with_ports(&[name]);
        transport.state().loopback = true;
        transport
    }

    /// Lock the shared state for inspection or scripting
    pub fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the enumerated port list
    pub fn set_ports(&self, names: &[&str]) {
        self.state().ports = names.iter().map(|n| PortId::from_name(*n)).collect();
    }

    /// Queue bytes on the receive side
    pub fn feed(&self, bytes: &[u8]) {
        self.state().incoming.extend(bytes.iter().copied());
    }

    /// Take everything written so far
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.state().written)
    }

    pub fn open_attempts(&self) -> usize {
        self.state().open_attempts.len()
    }

    pub fn enumerations(&self) -> usize {
        self.state().enumerations
    }
}

impl SerialTransport for MemoryTransport {
    type Link = MemoryLink;

    fn enumerate(&mut self) -> Result<Vec<PortId>> {
        let mut state = self.state();
        state.enumerations += 1;
        if state.fail_enumerate {
            return Err(TransportError::Enumerate("enumeration disabled".to_string()));
        }
        Ok(state.ports.clone())
    }

    fn open(&mut self, port: &PortId, line: &LineConfig) -> Result<MemoryLink> {
        let mut state = self.state();
        state.open_attempts.push(port.clone());

        let listed = state.ports.contains(port);
        let refused = state.unavailable.iter().any(|n| n == port.name());
        if !listed || refused {
            return Err(TransportError::Open {
                port: port.name().to_string(),
                reason: "no such device".to_string(),
            });
        }
        if state.open_port.is_some() {
            return Err(TransportError::Open {
                port: port.name().to_string(),
                reason: "port busy".to_string(),
            });
        }

        state.open_port = Some(port.clone());
        state.baud_rate = Some(line.baud_rate);
        Ok(MemoryLink {
            port: port.clone(),
            state: Arc::clone(&self.state),
        })
    }
}

/// Open link of a [`MemoryTransport`]
#[derive(Debug)]
pub struct MemoryLink {
    port: PortId,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryLink {
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SerialLink for MemoryLink {
    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut state = self.state();
        if state.fail_write {
            return Err(TransportError::Write("device removed".to_string()));
        }
        let accepted = if state.short_write {
            bytes.len().saturating_sub(1)
        } else {
            bytes.len()
        };
        state.written.extend_from_slice(&bytes[..accepted]);
        if state.loopback {
            state.incoming.extend(bytes[..accepted].iter().copied());
        }
        Ok(accepted)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.state();
        if state.fail_read {
            return Err(TransportError::Read("device removed".to_string()));
        }
        let limit = state.chunk_limit.unwrap_or(usize::MAX);
        let n = buf.len().min(limit).min(state.incoming.len());
        for (slot, byte) in buf.iter_mut().zip(state.incoming.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Drop for MemoryLink {
    fn drop(&mut self) {
        let mut state = self.state();
        if state.open_port.as_ref() == Some(&self.port) {
            state.open_port = None;
        }
    }
}
