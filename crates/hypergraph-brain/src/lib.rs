// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Hypergraph Brain
//!
//! [`HypergraphBrain`] owns the topology, the learning system and the compute
//! backend, and drives them one step at a time.
//!
//! ## Lifecycle
//! Regions and connectivity are created while the brain is Uninitialized or
//! Initializing. `start` moves it to Running; `pause`/`resume` toggle between
//! Running and Paused at step boundaries. Snapshots are taken and restored
//! only while Paused.
//!
//! ## Usage
//! ```ignore
//! use hypergraph_brain::HypergraphBrain;
//! use hypergraph_config::HypergraphConfig;
//! use hypergraph_npu_runtime::{RegionSpec, RegionType};
//!
//! let brain = HypergraphBrain::new(HypergraphConfig::default())?;
//! let v1 = brain.add_region(RegionSpec::new("v1", RegionType::Cortical, 256))?;
//! brain.start()?;
//! brain.inject_input(v1, &[0.4; 16])?;
//! let stats = brain.process_step(1.0)?;
//! println!("{} neurons fired", stats.neurons_fired);
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod brain;
mod error;
mod lifecycle;
mod schedule;
mod stats;

pub use brain::HypergraphBrain;
pub use error::{BrainError, BrainResult};
pub use lifecycle::BrainState;
pub use schedule::{OrderFn, Scheduling};
pub use stats::{RegionActivity, StepStats, WeightSummary};
