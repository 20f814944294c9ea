// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Performance benchmarks for the bridge
//!
//! Run with: cargo bench
//!
//! These benchmarks measure:
//! - Reassembly of received bytes into messages
//! - Outbound framing of host messages
//! - A full bridge cycle over the loopback transport

use std::time::Instant;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use midibridge::bridge::{OutboundFramer, Reassembler};
use midibridge::config::{BridgeConfig, BridgeSettings};
use midibridge::serial::{LineConfig, MemoryTransport, PortId, TransportHandle};
use midibridge::{MidiMessage, UartBridge};

/// Mixed traffic: note on/off pairs, a program change and some noise
fn sample_stream(len: usize) -> Vec<u8> {
    let pattern = [
        0x90, 0x3C, 0x64, 0xC0, 0x05, 0x80, 0x3C, 0x00, 0x12, 0xE0, 0x00, 0x40,
    ];
    pattern.iter().copied().cycle().take(len).collect()
}

/// Benchmark reassembly at different read sizes
fn bench_reassembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassembly");
    let stream = sample_stream(1200);

    for chunk in [1usize, 3, 8, 20].iter() {
        group.bench_with_input(BenchmarkId::new("chunk", chunk), chunk, |b, &chunk| {
            let mut out = Vec::with_capacity(512);
            b.iter(|| {
                let mut reassembler = Reassembler::default();
                out.clear();
                for piece in stream.chunks(chunk) {
                    reassembler.push(piece);
                    reassembler.drain(&mut out);
                }
                black_box(out.len())
            })
        });
    }

    group.finish();
}

/// Benchmark splitting host traffic between the wire and pass-through
fn bench_outbound(c: &mut Criterion) {
    let mut group = c.benchmark_group("outbound");
    let transport = MemoryTransport::with_ports(&["COM1"]);
    let mut handle = TransportHandle::new(transport.clone());
    handle
        .open(&PortId::from_name("COM1"), &LineConfig::default())
        .expect("open COM1");
    let framer = OutboundFramer::default();

    for size in [16usize, 128, 1024].iter() {
        let inputs: Vec<MidiMessage> = (0..*size)
            .map(|i| MidiMessage::note_on((i % 16) as u8, (i % 128) as u8, 100))
            .collect();

        group.bench_with_input(BenchmarkId::new("drain", size), &inputs, |b, inputs| {
            let mut passthrough = Vec::with_capacity(inputs.len());
            b.iter(|| {
                passthrough.clear();
                let report = framer.drain(inputs, 9, true, &mut handle, &mut passthrough);
                transport.take_written();
                black_box(report.sent)
            })
        });
    }

    group.finish();
}

/// Benchmark one complete cycle: write, loop back, read and reassemble
fn bench_cycle(c: &mut Criterion) {
    let mut bridge = UartBridge::new(
        MemoryTransport::loopback("loopback0"),
        &BridgeSettings::default(),
    );
    let config = BridgeConfig::default();
    let inputs = [
        MidiMessage::note_on(9, 36, 127),
        MidiMessage::note_on(0, 60, 100),
        MidiMessage::note_off(9, 36, 0),
    ];
    bridge.process(&config, &[], Instant::now());

    c.bench_function("bridge_cycle", |b| {
        b.iter(|| black_box(bridge.process(&config, black_box(&inputs), Instant::now())))
    });
}

criterion_group!(benches, bench_reassembly, bench_outbound, bench_cycle);
criterion_main!(benches);
