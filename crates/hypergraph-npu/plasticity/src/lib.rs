// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Hypergraph Plasticity
//!
//! The learning system, run after every network step:
//! - per-synapse rules (Hebbian, spike-timing, BCM, Oja, reward-modulated)
//! - a seeded sparse-update gate and attention gating
//! - homeostatic synaptic scaling on a fixed interval
//! - structural plasticity: pruning weak synapses and growing new ones
//!   between co-active neurons
//!
//! Rule math lives in `hypergraph_npu_neural::plasticity`; Hebbian and
//! spike-timing deltas are batched through the accelerator offload path.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod gate;
pub mod homeostasis;
pub mod structural;
pub mod system;
pub mod update;

pub use gate::{compose_attention, derive_seed, SparseGate};
pub use homeostasis::{apply_homeostasis, scaling_factor};
pub use structural::{grow, prune, prune_candidates, GrowthOutcome};
pub use system::{
    ConsolidationDue, ConsolidationReport, Execution, LearningReport, LearningState,
    LearningSystem,
};
pub use update::{update_region, LearningView, UpdateCounts};
