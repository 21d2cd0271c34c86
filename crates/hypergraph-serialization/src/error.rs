// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use hypergraph_npu_runtime::TopologyError;
use thiserror::Error;

/// Snapshot I/O errors. Any of these aborts a load; nothing is applied.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid magic number: expected HGSNAP, got {0:?}")]
    BadMagic(Vec<u8>),

    #[error("Truncated snapshot: {0} bytes is shorter than the header")]
    Truncated(usize),

    #[error("Unsupported snapshot version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Checksum mismatch: expected {expected:#018x}, got {actual:#018x}")]
    ChecksumMismatch { expected: u64, actual: u64 },

    #[error("Size mismatch: header says {expected} bytes, payload has {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("Serialization error: {0}")]
    Encode(String),

    #[error("Deserialization error: {0}")]
    Decode(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Not a brain snapshot: format tag '{0}'")]
    Format(String),

    #[error("Snapshot topology rejected: {0}")]
    Topology(#[from] TopologyError),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
