// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! File watcher for hot-reloading bridge settings.
//!
//! The running bridge picks up channel, port selector and power changes from
//! its settings file without restarting. The watcher observes the file's
//! directory, since many editors save by replacing the file.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::debug;

use super::BridgeFile;

/// Events emitted by the config watcher
#[derive(Debug, Clone)]
pub enum ConfigEvent {
    /// Settings file changed and parsed cleanly
    Reloaded(Box<BridgeFile>),
    /// Settings file changed but could not be loaded
    Error(String),
    /// Settings file was removed
    Removed(PathBuf),
}

/// Debouncing watcher for one settings file
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    event_receiver: Receiver<ConfigEvent>,
    watched_path: PathBuf,
}

impl ConfigWatcher {
    /// Watch `path` for changes.
    ///
    /// # Arguments
    /// * `path` - Settings file to watch
    /// * `debounce_ms` - Quiet period before reloading (default: 250)
    pub fn new<P: AsRef<Path>>(path: P, debounce_ms: Option<u64>) -> Result<Self> {
        let watched_path = path.as_ref().to_path_buf();
        let file_name = watched_path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| anyhow!("Not a file path: {:?}", watched_path))?;
        let directory = match watched_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let debounce = Duration::from_millis(debounce_ms.unwrap_or(250));

        let (event_tx, event_rx): (Sender<ConfigEvent>, Receiver<ConfigEvent>) = mpsc::channel();
        let (notify_tx, notify_rx): (Sender<Event>, Receiver<Event>) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if let Ok(event) = res {
                    let _ = notify_tx.send(event);
                }
            },
            Config::default(),
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {:?}", directory))?;

        let target = watched_path.clone();
        std::thread::spawn(move || {
            let mut changed_at: Option<Instant> = None;

            loop {
                match notify_rx.recv_timeout(Duration::from_millis(50)) {
                    Ok(event) => {
                        let ours = event
                            .paths
                            .iter()
                            .any(|p| p.file_name() == Some(file_name.as_os_str()));
                        if !ours {
                            continue;
                        }
                        match event.kind {
                            EventKind::Create(_) | EventKind::Modify(_) => {
                                changed_at = Some(Instant::now());
                            }
                            EventKind::Remove(_) => {
                                // An editor may recreate the file right away
                                if !target.exists() {
                                    let _ = event_tx.send(ConfigEvent::Removed(target.clone()));
                                }
                            }
                            _ => {}
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        if changed_at.map_or(false, |at| at.elapsed() >= debounce) {
                            changed_at = None;
                            debug!("Reloading {:?}", target);
                            let event = match BridgeFile::load(&target) {
                                Ok(file) => ConfigEvent::Reloaded(Box::new(file)),
                                Err(e) => ConfigEvent::Error(format!("{:#}", e)),
                            };
                            if event_tx.send(event).is_err() {
                                break;
                            }
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => {
                        // Watcher was dropped, exit thread
                        break;
                    }
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            event_receiver: event_rx,
            watched_path,
        })
    }

    /// Try to receive the next config event (non-blocking)
    pub fn try_recv(&self) -> Option<ConfigEvent> {
        self.event_receiver.try_recv().ok()
    }

    /// Receive all pending config events
    pub fn recv_all(&self) -> Vec<ConfigEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }

    /// Wait up to `timeout` for the next config event
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ConfigEvent> {
        self.event_receiver.recv_timeout(timeout).ok()
    }

    /// Get the path being watched
    pub fn watched_path(&self) -> &Path {
        &self.watched_path
    }
}

/// Load and validate a settings file without applying it
pub fn validate_config<P: AsRef<Path>>(path: P) -> Result<BridgeFile> {
    BridgeFile::load(path)
}
