// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Hypergraph NPU Runtime
//!
//! Storage and per-step processing for the substrate:
//! - [`NeuronArray`] / [`SynapseArray`]: dense, id-indexed registries with tombstones
//! - [`Region`]: owned neuron ids, cached afferent/efferent views, processing modes
//! - [`Topology`]: the registries plus regions, and the only place structure changes
//!
//! Regions hold ids, never references. A region step only writes to the
//! neurons it owns, so any number of regions can step concurrently against a
//! shared `&Topology`.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod neuron_array;
pub mod region;
pub mod synapse_array;
pub mod topology;

pub use error::{TopologyError, TopologyResult};
pub use neuron_array::NeuronArray;
pub use region::{
    ProcessingMode, Region, RegionLayout, RegionSpec, RegionStats, RegionStepReport, RegionType,
    RegionViews,
};
pub use synapse_array::SynapseArray;
pub use topology::Topology;
