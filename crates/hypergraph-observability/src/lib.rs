// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # hypergraph-observability
//!
//! Logging infrastructure shared by every hypergraph crate.
//!
//! Library crates only emit `tracing` events; binaries and tests call
//! [`init_logging`] once to install a subscriber. Per-crate debug output is
//! switched on with `--debug-<crate>` arguments or `HYPERGRAPH_DEBUG`.
//!
//! ## Features
//! - `file-logging`: daily-rotated log files via `tracing-appender`

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "hypergraph-config",
    "hypergraph-npu-neural",
    "hypergraph-npu-accelerator",
    "hypergraph-npu-runtime",
    "hypergraph-npu-plasticity",
    "hypergraph-connectivity",
    "hypergraph-serialization",
    "hypergraph-brain",
];
