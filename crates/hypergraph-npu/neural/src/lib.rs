// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Hypergraph Neural Data Model
//!
//! Foundation of the substrate engine:
//! - **Types**: identifiers, error types, lock-free float cells
//! - **Neuron**: bounded activation unit with refractory window and metabolic state
//! - **Synapse**: weighted, delayed, plastic directed edge between two neuron ids
//! - **Plasticity**: closed rule set (enum + per-rule parameters) and pure rule kernels
//! - **Models**: leaky integration, oscillatory gain and energy/health kernels
//!
//! Everything here is addressed by integer id. Neurons and synapses never hold
//! references to each other; the runtime registries resolve ids.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod models;
pub mod neuron;
pub mod plasticity;
pub mod synapse;
pub mod types;

pub use models::{leaky_integrate, oscillation_gain, MetabolismParams};
pub use neuron::{Neuron, NeuronDynamics, NeuronParams, NeuronState};
pub use plasticity::{
    BcmParams, HebbianParams, OjaParams, PlasticityRule, RewardParams, StdpParams,
};
pub use synapse::{PendingSignal, Synapse, SynapseParams, WeightBounds};
pub use types::{AtomicF32, NeuralError, NeuronId, RegionId, Result, SynapseId};
