// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Transport lifecycle state machine.
//!
//! Runs once at the start of every cycle and decides whether the serial link
//! is closed, (re)opened or left alone. Failed opens are throttled by a fixed
//! cooldown, and each failure re-enumerates the ports since the device list
//! itself may have changed.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::serial::{LineConfig, PortId, SerialTransport, TransportHandle};

use super::PortDirectory;

/// Default delay after a failed open before the next attempt
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(2000);

/// Default interval between port list refreshes while idle
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(2000);

/// Transport state owned by the lifecycle manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportState {
    Closed,
    Open(PortId),
    /// Opening failed; no retry before this instant
    Cooldown(Instant),
}

/// What a lifecycle evaluation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// Nothing changed
    Unchanged,
    /// A port was opened (possibly replacing another)
    Opened,
    /// The open port was closed and nothing replaced it
    Closed,
    /// An open attempt failed and a cooldown started
    OpenFailed,
    /// A cooldown was dropped because no port is wanted any more
    CooldownCleared,
}

/// Decides per cycle what happens to the transport handle
#[derive(Debug)]
pub struct LifecycleManager {
    state: TransportState,
    line: LineConfig,
    cooldown: Duration,
    refresh_interval: Duration,
    next_refresh: Option<Instant>,
}

impl LifecycleManager {
    pub fn new(line: LineConfig, cooldown: Duration, refresh_interval: Duration) -> Self {
        Self {
            state: TransportState::Closed,
            line,
            cooldown,
            refresh_interval,
            next_refresh: None,
        }
    }

    pub fn state(&self) -> &TransportState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, TransportState::Open(_))
    }

    /// Bring the transport in line with `desired`.
    pub fn evaluate<T: SerialTransport>(
        &mut self,
        now: Instant,
        desired: Option<&PortId>,
        handle: &mut TransportHandle<T>,
        directory: &mut PortDirectory,
    ) -> LifecycleOutcome {
        match (&self.state, desired) {
            (TransportState::Open(current), Some(port)) if current == port => {
                LifecycleOutcome::Unchanged
            }
            (TransportState::Open(_), Some(port)) => {
                handle.close();
                self.state = TransportState::Closed;
                self.try_open(now, port, handle, directory)
            }
            (TransportState::Open(_), None) => {
                handle.close();
                self.state = TransportState::Closed;
                LifecycleOutcome::Closed
            }
            (TransportState::Closed, Some(port)) => self.try_open(now, port, handle, directory),
            (TransportState::Closed, None) => {
                self.refresh_when_due(now, handle, directory);
                LifecycleOutcome::Unchanged
            }
            (TransportState::Cooldown(until), Some(port)) => {
                if now >= *until {
                    self.try_open(now, port, handle, directory)
                } else {
                    LifecycleOutcome::Unchanged
                }
            }
            (TransportState::Cooldown(_), None) => {
                debug!("Cooldown cleared, no port selected");
                self.state = TransportState::Closed;
                LifecycleOutcome::CooldownCleared
            }
        }
    }

    /// Record an I/O failure on the open link: close it and fall back to
    /// `Closed` so the next cycle reopens from scratch.
    pub fn fail<T: SerialTransport>(&mut self, handle: &mut TransportHandle<T>, error: &TransportError) {
        warn!("{}", error);
        handle.close();
        self.state = TransportState::Closed;
    }

    fn try_open<T: SerialTransport>(
        &mut self,
        now: Instant,
        port: &PortId,
        handle: &mut TransportHandle<T>,
        directory: &mut PortDirectory,
    ) -> LifecycleOutcome {
        info!("Opening serial port {}", port);
        match handle.open(port, &self.line) {
            Ok(()) => {
                self.state = TransportState::Open(port.clone());
                LifecycleOutcome::Opened
            }
            Err(e) => {
                warn!("{}", e);
                directory.refresh(handle);
                self.state = TransportState::Cooldown(now + self.cooldown);
                self.next_refresh = Some(now + self.refresh_interval);
                LifecycleOutcome::OpenFailed
            }
        }
    }

    fn refresh_when_due<T: SerialTransport>(
        &mut self,
        now: Instant,
        handle: &mut TransportHandle<T>,
        directory: &mut PortDirectory,
    ) {
        let due = self.next_refresh.map_or(true, |at| now >= at);
        if due {
            directory.refresh(handle);
            self.next_refresh = Some(now + self.refresh_interval);
        }
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new(LineConfig::default(), DEFAULT_COOLDOWN, DEFAULT_REFRESH_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::MemoryTransport;

    struct Fixture {
        transport: MemoryTransport,
        handle: TransportHandle<MemoryTransport>,
        directory: PortDirectory,
        manager: LifecycleManager,
        start: Instant,
    }

    impl Fixture {
        fn new(names: &[&str]) -> Self {
            let transport = MemoryTransport::with_ports(names);
            let mut handle = TransportHandle::new(transport.clone());
            let mut directory = PortDirectory::new();
            directory.refresh(&mut handle);
            Self {
                transport,
                handle,
                directory,
                manager: LifecycleManager::default(),
                start: Instant::now(),
            }
        }

        fn at(&mut self, millis: u64, desired: Option<&str>) -> LifecycleOutcome {
            let port = desired.map(PortId::from_name);
            self.manager.evaluate(
                self.start + Duration::from_millis(millis),
                port.as_ref(),
                &mut self.handle,
                &mut self.directory,
            )
        }
    }

    #[test]
    fn test_closed_opens_desired_port() {
        let mut f = Fixture::new(&["COM1"]);
        assert_eq!(f.at(0, Some("COM1")), LifecycleOutcome::Opened);
        assert_eq!(
            f.manager.state(),
            &TransportState::Open(PortId::from_name("COM1"))
        );
        assert!(f.handle.is_open());
        assert_eq!(f.at(5, Some("COM1")), LifecycleOutcome::Unchanged);
        assert_eq!(f.transport.open_attempts(), 1);
    }

    #[test]
    fn test_open_to_none_closes() {
        let mut f = Fixture::new(&["COM1"]);
        f.at(0, Some("COM1"));
        assert_eq!(f.at(5, None), LifecycleOutcome::Closed);
        assert_eq!(f.manager.state(), &TransportState::Closed);
        assert!(!f.handle.is_open());
        assert!(f.transport.state().open_port.is_none());
    }

    #[test]
    fn test_switching_ports() {
        let mut f = Fixture::new(&["COM1", "COM2"]);
        f.at(0, Some("COM1"));
        assert_eq!(f.at(5, Some("COM2")), LifecycleOutcome::Opened);
        assert_eq!(
            f.transport.state().open_port,
            Some(PortId::from_name("COM2"))
        );
    }

    #[test]
    fn test_failed_open_enters_cooldown_and_refreshes() {
        let mut f = Fixture::new(&["COM1"]);
        let enumerations = f.transport.enumerations();

        assert_eq!(f.at(0, Some("COM9")), LifecycleOutcome::OpenFailed);
        assert_eq!(
            f.manager.state(),
            &TransportState::Cooldown(f.start + DEFAULT_COOLDOWN)
        );
        assert_eq!(f.transport.enumerations(), enumerations + 1);
    }

    #[test]
    fn test_cooldown_suppresses_retries() {
        let mut f = Fixture::new(&["COM1"]);
        f.transport.state().unavailable.push("COM1".to_string());

        assert_eq!(f.at(0, Some("COM1")), LifecycleOutcome::OpenFailed);
        for millis in (3..2000).step_by(3) {
            assert_eq!(f.at(millis, Some("COM1")), LifecycleOutcome::Unchanged);
        }
        assert_eq!(f.transport.open_attempts(), 1);

        assert_eq!(f.at(2000, Some("COM1")), LifecycleOutcome::OpenFailed);
        assert_eq!(f.transport.open_attempts(), 2);
    }

    #[test]
    fn test_cooldown_retry_succeeds_once_device_returns() {
        let mut f = Fixture::new(&["COM1"]);
        f.transport.state().unavailable.push("COM1".to_string());
        f.at(0, Some("COM1"));

        f.transport.state().unavailable.clear();
        assert_eq!(f.at(1999, Some("COM1")), LifecycleOutcome::Unchanged);
        assert_eq!(f.at(2001, Some("COM1")), LifecycleOutcome::Opened);
        assert!(f.manager.is_open());
    }

    #[test]
    fn test_cooldown_cleared_when_nothing_wanted() {
        let mut f = Fixture::new(&["COM1"]);
        f.transport.state().unavailable.push("COM1".to_string());
        f.at(0, Some("COM1"));

        assert_eq!(f.at(10, None), LifecycleOutcome::CooldownCleared);
        assert_eq!(f.manager.state(), &TransportState::Closed);
    }

    #[test]
    fn test_fail_forces_closed() {
        let mut f = Fixture::new(&["COM1"]);
        f.at(0, Some("COM1"));

        f.manager
            .fail(&mut f.handle, &TransportError::Write("unplugged".to_string()));
        assert_eq!(f.manager.state(), &TransportState::Closed);
        assert!(!f.handle.is_open());

        // Next cycle reopens straight away
        assert_eq!(f.at(1, Some("COM1")), LifecycleOutcome::Opened);
    }

    #[test]
    fn test_idle_refreshes_periodically() {
        let mut f = Fixture::new(&[]);
        let base = f.transport.enumerations();

        f.at(0, None);
        assert_eq!(f.transport.enumerations(), base + 1);
        f.at(1000, None);
        f.at(1999, None);
        assert_eq!(f.transport.enumerations(), base + 1);
        f.at(2000, None);
        assert_eq!(f.transport.enumerations(), base + 2);
    }

    #[test]
    fn test_idle_refresh_picks_up_new_ports() {
        let mut f = Fixture::new(&[]);
        f.at(0, None);
        assert!(f.directory.is_empty());

        f.transport.set_ports(&["COM5"]);
        f.at(2000, None);
        assert_eq!(f.directory.resolve(1.0).map(PortId::name), Some("COM5"));
    }
}
