// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Hypergraph Snapshot Serialization
//!
//! Versioned binary snapshots of a paused brain.
//!
//! ## Design Goals
//! - **Complete**: every registry slot, in-flight delay-buffer signals,
//!   learning traces and queued rewards
//! - **Stable**: ids survive a round trip, and re-exporting an imported
//!   snapshot yields the same bytes
//! - **Safe**: magic, version and checksum are verified before anything is
//!   decoded; a failed load never touches existing state
//! - **Compact**: optional LZ4 (feature `compression`, on by default)
//!
//! ## Usage
//! ```ignore
//! use hypergraph_serialization::{decode, encode, BrainSnapshot};
//!
//! let snapshot = BrainSnapshot::capture(&topology, step, rewards);
//! let bytes = encode(&snapshot, true)?;
//! let topology = decode(&bytes)?.to_topology()?;
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod error;
mod format;
mod snapshot;

pub use error::{Result, SnapshotError};
pub use format::{
    calculate_checksum, decode, encode, load_snapshot, save_snapshot, SnapshotHeader, FLAG_LZ4,
    FORMAT_VERSION, HEADER_LEN, MAGIC,
};
pub use snapshot::{BrainSnapshot, NeuronRecord, SynapseRecord, FORMAT_TAG};
