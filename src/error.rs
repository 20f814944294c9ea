// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error types for the serial transport.
//!
//! None of these are fatal. The bridge turns each of them into "no device
//! attached" behaviour and keeps processing.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(String),

    #[error("failed to open serial port {port}: {reason}")]
    Open { port: String, reason: String },

    #[error("serial write failed: {0}")]
    Write(String),

    #[error("short serial write: {written} of {expected} bytes")]
    ShortWrite { expected: usize, written: usize },

    #[error("serial read failed: {0}")]
    Read(String),

    #[error("serial port is not open")]
    NotOpen,
}

pub type Result<T> = std::result::Result<T, TransportError>;
