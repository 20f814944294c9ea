// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use tracing::{info, warn, Level};

#[cfg(feature = "midi-host")]
use midibridge::host::{self, MidiHost};
use midibridge::bridge::PortDirectory;
use midibridge::config::{BridgeFile, ConfigEvent, ConfigWatcher};
use midibridge::serial::{MemoryTransport, SerialTransport, SystemTransport, TransportHandle};
use midibridge::{MidiMessage, TransportState, UartBridge};

/// How long the test note is held
const TEST_NOTE_LENGTH: Duration = Duration::from_millis(500);

fn print_usage() {
    println!("MIDIBRIDGE - MIDI over a serial link");
    println!();
    println!("Usage: midibridge [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --list-ports            List serial ports and their selector values");
    #[cfg(feature = "midi-host")]
    println!("  --list-midi             List MIDI input and output ports");
    println!("  --config <FILE>         Load settings from FILE and watch it for changes");
    println!("  --write-config <FILE>   Write default settings to FILE");
    println!("  --loopback              Use an in-memory loopback port instead of serial");
    println!("  --test-note             Send a test note on the output channel");
    println!("  --verbose               Show debug logging");
    println!("  --help                  Show this help message");
}

#[derive(Debug, Default)]
struct Options {
    list_ports: bool,
    list_midi: bool,
    config: Option<PathBuf>,
    write_config: Option<PathBuf>,
    loopback: bool,
    test_note: bool,
    verbose: bool,
    help: bool,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut options = Options::default();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--list-ports" => options.list_ports = true,
            "--list-midi" => options.list_midi = true,
            "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config = Some(PathBuf::from(path));
            }
            "--write-config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow!("--write-config requires a file path"))?;
                options.write_config = Some(PathBuf::from(path));
            }
            "--loopback" => options.loopback = true,
            "--test-note" => options.test_note = true,
            "--verbose" | "-v" => options.verbose = true,
            "--help" | "-h" => options.help = true,
            other => return Err(anyhow!("Unknown option: {}", other)),
        }
    }

    Ok(options)
}

fn list_ports() {
    let mut handle = TransportHandle::new(SystemTransport::new());
    let mut directory = PortDirectory::new();
    directory.refresh(&mut handle);

    if directory.is_empty() {
        println!("No serial ports found.");
        return;
    }
    println!("Available serial ports:");
    for port in directory.ports() {
        let selector = directory.selector_for(port).unwrap_or(0.0);
        println!("  {:.3}: {}", selector, port);
    }
}

fn run_bridge<T: SerialTransport>(
    transport: T,
    mut file: BridgeFile,
    watcher: Option<ConfigWatcher>,
    test_note: bool,
) -> Result<()> {
    let mut bridge = UartBridge::new(transport, &file.serial);
    #[cfg(feature = "midi-host")]
    let mut midi = MidiHost::connect(&file.host)?;

    let cycle = file.host.cycle();
    let start = Instant::now();
    let mut note_on_sent = false;
    let mut note_off_sent = false;
    let mut last_state = bridge.state().clone();

    info!(
        "Bridge on channel {} -> port {}",
        file.bridge.channel() + 1,
        bridge.directory().display_name(file.bridge.port_selector)
    );

    loop {
        if let Some(watcher) = &watcher {
            for event in watcher.recv_all() {
                match event {
                    ConfigEvent::Reloaded(reloaded) => {
                        info!("Settings reloaded");
                        // Serial and host settings apply on restart
                        file.bridge = reloaded.bridge;
                    }
                    ConfigEvent::Error(e) => warn!("Ignoring settings change: {}", e),
                    ConfigEvent::Removed(path) => warn!("Settings file {:?} was removed", path),
                }
            }
        }

        #[cfg(feature = "midi-host")]
        let mut inputs = midi.recv_all();
        #[cfg(not(feature = "midi-host"))]
        let mut inputs: Vec<MidiMessage> = Vec::new();

        if test_note {
            let channel = file.bridge.channel();
            if !note_on_sent && bridge.open_port().is_some() {
                inputs.push(MidiMessage::note_on(channel, 60, 100));
                note_on_sent = true;
                println!("Note On sent");
            } else if note_on_sent && !note_off_sent && start.elapsed() >= TEST_NOTE_LENGTH {
                inputs.push(MidiMessage::note_off(channel, 60, 0));
                note_off_sent = true;
                println!("Note Off sent");
            }
        }

        let outputs = bridge.process(&file.bridge, &inputs, Instant::now());

        if bridge.state() != &last_state {
            last_state = bridge.state().clone();
            match &last_state {
                TransportState::Open(port) => println!("Connected to {}", port),
                TransportState::Closed => println!("Disconnected"),
                TransportState::Cooldown(_) => println!("Port unavailable, retrying shortly"),
            }
        }

        #[cfg(feature = "midi-host")]
        let printed = if midi.has_output() {
            midi.send(&outputs)?;
            false
        } else {
            true
        };
        #[cfg(not(feature = "midi-host"))]
        let printed = true;

        if printed {
            for msg in &outputs {
                println!("{}", msg);
            }
        }

        if test_note && note_off_sent && start.elapsed() >= TEST_NOTE_LENGTH * 2 {
            println!("Test complete!");
            return Ok(());
        }
        if test_note && !note_on_sent && start.elapsed() >= Duration::from_secs(5) {
            return Err(anyhow!(
                "No serial port opened for {}",
                bridge.directory().display_name(file.bridge.port_selector)
            ));
        }

        thread::sleep(cycle);
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    if options.help {
        print_usage();
        return Ok(());
    }

    let level = if options.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    if let Some(path) = &options.write_config {
        BridgeFile::default().save(path)?;
        println!("Wrote default settings to {}", path.display());
        return Ok(());
    }

    if options.list_ports {
        list_ports();
        return Ok(());
    }

    if options.list_midi {
        #[cfg(feature = "midi-host")]
        host::print_ports();
        #[cfg(not(feature = "midi-host"))]
        eprintln!("MIDI port support is not enabled in this build (feature \"midi-host\")");
        return Ok(());
    }

    let (file, watcher) = match &options.config {
        Some(path) => {
            let file = BridgeFile::load(path)?;
            let watcher = ConfigWatcher::new(path, None)?;
            info!("Watching {:?} for changes", watcher.watched_path());
            (file, Some(watcher))
        }
        None => (BridgeFile::default(), None),
    };

    if options.loopback {
        run_bridge(
            MemoryTransport::loopback("loopback0"),
            file,
            watcher,
            options.test_note,
        )
    } else {
        run_bridge(SystemTransport::new(), file, watcher, options.test_note)
    }
}
