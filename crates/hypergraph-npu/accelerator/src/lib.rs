// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Accelerator Offload Path
//!
//! Batched elementwise variants of the numerically hot kernels:
//! - Hebbian deltas
//! - spike-timing deltas
//! - leaky integration
//! - homeostatic energy/health update
//!
//! [`CpuBackend`] is the reference implementation and is always available.
//! [`WgpuBackend`] (feature `gpu`) packs the arrays, uploads them, dispatches a
//! WGSL kernel and reads the result back. Any failure is reported as a
//! [`BackendError`]; [`OffloadPath`] catches it, warns, counts the fallback and
//! reruns the batch on the CPU.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod offload;

pub use backend::{
    create_backend, select_backend, BackendConfig, BackendDecision, BackendError, BackendResult,
    BackendType, ComputeBackend, CpuBackend, LeakyBatch,
};
#[cfg(feature = "gpu")]
pub use backend::WgpuBackend;
pub use offload::OffloadPath;
