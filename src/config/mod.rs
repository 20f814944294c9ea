// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration system for the bridge.
//!
//! [`BridgeConfig`] is the control surface read every cycle: output channel,
//! port selector and power. [`BridgeSettings`] holds the values fixed when a
//! bridge is built. [`BridgeFile`] ties both together with the command-line
//! host settings in one TOML file.

pub mod watcher;

pub use watcher::{validate_config, ConfigEvent, ConfigWatcher};

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::midi::NoteOffLength;
use crate::serial::{LineConfig, DEFAULT_BAUD_RATE};

/// Per-cycle control surface
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    /// MIDI channel (0-15) carried over the serial link
    #[serde(default = "default_output_channel")]
    pub output_channel: u8,
    /// Port selector: 0 is no port, otherwise a position in the port list
    #[serde(default = "default_port_selector")]
    pub port_selector: f32,
    /// Power switch
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Channel 10
fn default_output_channel() -> u8 {
    9
}
fn default_port_selector() -> f32 {
    1.0
}
fn default_enabled() -> bool {
    true
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            output_channel: default_output_channel(),
            port_selector: default_port_selector(),
            enabled: default_enabled(),
        }
    }
}

impl BridgeConfig {
    /// Build from normalized host parameters in [0, 1].
    ///
    /// The channel maps onto 0-15 by rounding; power of 0.5 or more is on.
    pub fn from_parameters(channel: f32, port: f32, power: f32) -> Self {
        Self {
            output_channel: (channel.clamp(0.0, 1.0) * 15.0).round() as u8,
            port_selector: port.clamp(0.0, 1.0),
            enabled: power >= 0.5,
        }
    }

    /// Output channel limited to 0-15
    pub fn channel(&self) -> u8 {
        self.output_channel & 0x0F
    }

    /// Channel as a normalized host parameter
    pub fn channel_parameter(&self) -> f32 {
        f32::from(self.channel()) / 15.0
    }
}

/// Settings fixed for the lifetime of a bridge
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BridgeSettings {
    /// Baud rate (always 8 data bits, 1 stop bit, no parity)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Delay after a failed open before retrying, in milliseconds
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Interval between port list refreshes while idle, in milliseconds
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Note-off frame length used by the connected hardware
    #[serde(default)]
    pub note_off_length: NoteOffLength,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}
fn default_cooldown_ms() -> u64 {
    2000
}
fn default_refresh_interval_ms() -> u64 {
    2000
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            cooldown_ms: default_cooldown_ms(),
            refresh_interval_ms: default_refresh_interval_ms(),
            note_off_length: NoteOffLength::default(),
        }
    }
}

impl BridgeSettings {
    pub fn line(&self) -> LineConfig {
        LineConfig {
            baud_rate: self.baud_rate,
        }
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

/// Settings for the command-line host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    /// Cycle length in milliseconds
    #[serde(default = "default_cycle_ms")]
    pub cycle_ms: u64,
    /// MIDI input port to read host messages from (name substring)
    #[serde(default)]
    pub midi_input: Option<String>,
    /// MIDI output port for the bridge output (name substring)
    #[serde(default)]
    pub midi_output: Option<String>,
}

fn default_cycle_ms() -> u64 {
    5
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            cycle_ms: default_cycle_ms(),
            midi_input: None,
            midi_output: None,
        }
    }
}

impl HostConfig {
    pub fn cycle(&self) -> Duration {
        Duration::from_millis(self.cycle_ms)
    }
}

/// Root of a bridge settings file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BridgeFile {
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub serial: BridgeSettings,
    #[serde(default)]
    pub host: HostConfig,
}

impl BridgeFile {
    /// Load settings from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate settings from a TOML string
    pub fn from_toml(text: &str) -> Result<Self> {
        let file: Self = toml::from_str(text).context("Failed to parse TOML configuration")?;
        file.validate()?;
        Ok(file)
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Save settings to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let text = self.to_toml()?;
        fs::write(path.as_ref(), text)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))
    }

    /// Reject values the bridge cannot use
    pub fn validate(&self) -> Result<()> {
        if self.bridge.output_channel > 15 {
            bail!(
                "output_channel must be 0-15, got {}",
                self.bridge.output_channel
            );
        }
        if !(0.0..=1.0).contains(&self.bridge.port_selector) {
            bail!(
                "port_selector must be between 0 and 1, got {}",
                self.bridge.port_selector
            );
        }
        if self.serial.baud_rate == 0 {
            bail!("baud_rate must be greater than 0");
        }
        if self.host.cycle_ms == 0 {
            bail!("cycle_ms must be greater than 0");
        }
        Ok(())
    }
}
