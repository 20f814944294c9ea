// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Port directory: the sorted list of serial ports and the mapping from the
//! continuous port selector to one of them.

use tracing::{debug, warn};

use crate::serial::{PortId, SerialTransport, TransportHandle};

/// Sorted snapshot of the ports found by the last enumeration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortDirectory {
    ports: Vec<PortId>,
}

impl PortDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from an unsorted port list
    pub fn from_ports(mut ports: Vec<PortId>) -> Self {
        ports.sort();
        ports.dedup();
        Self { ports }
    }

    /// Re-enumerate and replace the list wholesale.
    ///
    /// An enumeration failure leaves the directory empty.
    pub fn refresh<T: SerialTransport>(&mut self, handle: &mut TransportHandle<T>) -> &[PortId] {
        let ports = match handle.enumerate() {
            Ok(ports) => ports,
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        };
        *self = Self::from_ports(ports);
        debug!(
            "Found {} serial ports: {:?}",
            self.ports.len(),
            self.ports.iter().map(PortId::name).collect::<Vec<_>>()
        );
        &self.ports
    }

    pub fn ports(&self) -> &[PortId] {
        &self.ports
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Map a selector in [0, 1] to a port.
    ///
    /// 0 is "none"; otherwise `round(selector * count)` is a 1-based position
    /// into the sorted list, where position 0 is also "none". Values above 1
    /// select the last port.
    pub fn resolve(&self, selector: f32) -> Option<&PortId> {
        // Also rejects NaN
        if !(selector > 0.0) || self.ports.is_empty() {
            return None;
        }
        let position = (selector.min(1.0) * self.ports.len() as f32).round() as usize;
        position.checked_sub(1).and_then(|i| self.ports.get(i))
    }

    /// Selector value that lands exactly on `port`
    pub fn selector_for(&self, port: &PortId) -> Option<f32> {
        let index = self.ports.iter().position(|p| p == port)?;
        Some((index + 1) as f32 / self.ports.len() as f32)
    }

    /// Name of the port a selector resolves to, or "NONE"
    pub fn display_name(&self, selector: f32) -> String {
        self.resolve(selector)
            .map(|port| port.name().to_string())
            .unwrap_or_else(|| "NONE".to_string())
    }
}
