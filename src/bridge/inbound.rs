// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Inbound reassembler.
//!
//! Serial reads hand over bytes in whatever chunks the driver happens to
//! have. The reassembler keeps a small fixed buffer, pulls complete frames
//! off its head and shifts the unfinished tail down for the next cycle.
//!
//! There is no running status: every frame must start with its own status
//! byte. Data bytes outside a frame are discarded, and a status byte inside
//! an unfinished frame abandons that frame and starts a new one. System
//! real-time bytes are not carried and are dropped where they stand, so a
//! clock tick in the middle of a frame leaves the frame intact. All of these
//! rules only look at bytes already received, so the output does not depend
//! on how the stream was split into chunks.

use tracing::trace;

use crate::midi::{is_realtime, is_status, wire_len, MidiMessage, NoteOffLength};

/// Capacity of the receive buffer in bytes
pub const RECEIVE_BUFFER_SIZE: usize = 20;

#[derive(Debug, Clone)]
pub struct Reassembler {
    buf: [u8; RECEIVE_BUFFER_SIZE],
    len: usize,
    note_off: NoteOffLength,
}

impl Reassembler {
    pub fn new(note_off: NoteOffLength) -> Self {
        Self {
            buf: [0; RECEIVE_BUFFER_SIZE],
            len: 0,
            note_off,
        }
    }

    /// Bytes received but not yet consumed
    pub fn pending(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn is_full(&self) -> bool {
        self.len == RECEIVE_BUFFER_SIZE
    }

    pub fn free_space(&self) -> usize {
        RECEIVE_BUFFER_SIZE - self.len
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Free tail of the buffer, for reading straight from the transport.
    /// Follow with [`commit`](Self::commit).
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.len..]
    }

    /// Mark `n` bytes written into [`spare_mut`](Self::spare_mut) as received
    pub fn commit(&mut self, n: usize) {
        self.len = (self.len + n).min(RECEIVE_BUFFER_SIZE);
    }

    /// Append bytes, returning how many fit. The rest are dropped.
    pub fn push(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.free_space());
        self.buf[self.len..self.len + n].copy_from_slice(&bytes[..n]);
        self.len += n;
        n
    }

    /// Move every complete frame into `out` and compact the buffer.
    ///
    /// Returns the number of messages emitted.
    pub fn drain(&mut self, out: &mut Vec<MidiMessage>) -> usize {
        self.strip_realtime();

        let mut emitted = 0;
        let mut pos = 0;

        while pos < self.len {
            let status = self.buf[pos];
            if !is_status(status) {
                trace!("Skipping stray data byte {:02X}", status);
                pos += 1;
                continue;
            }

            let need = wire_len(status, self.note_off);
            if need == 0 {
                trace!("Skipping unsupported status {:02X}", status);
                pos += 1;
                continue;
            }

            let end = (pos + need).min(self.len);
            if let Some(offset) = self.buf[pos + 1..end].iter().position(|b| is_status(*b)) {
                trace!("Abandoning incomplete frame at {:02X}", status);
                pos += 1 + offset;
                continue;
            }

            if pos + need > self.len {
                // Wait for the rest of this frame
                break;
            }

            if let Some(message) = MidiMessage::from_bytes(&self.buf[pos..pos + need]) {
                out.push(message);
                emitted += 1;
            }
            pos += need;
        }

        self.buf.copy_within(pos..self.len, 0);
        self.len -= pos;
        emitted
    }

    fn strip_realtime(&mut self) {
        let mut kept = 0;
        for i in 0..self.len {
            let byte = self.buf[i];
            if is_realtime(byte) {
                trace!("Dropping real-time byte {:02X}", byte);
            } else {
                self.buf[kept] = byte;
                kept += 1;
            }
        }
        self.len = kept;
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new(NoteOffLength::default())
    }
}
