// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Hypergraph - plastic, region-scheduled neural graph simulation
//!
//! A large, sparsely connected, weighted directed graph of neurons whose
//! synapses change under several local learning rules while the graph is
//! processed in fixed time-steps across named regions.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! hypergraph = "0.1"
//! ```
//!
//! ```rust,no_run
//! use hypergraph::prelude::*;
//!
//! let brain = HypergraphBrain::new(HypergraphConfig::default())?;
//! let sensory = brain.add_region(RegionSpec::new("sensory", RegionType::Subcortical, 64))?;
//! let cortex = brain.add_region(RegionSpec::new("cortex", RegionType::Cortical, 256))?;
//!
//! let plan = ConnectivityPlan::new().with_seed(7).rule(
//!     ConnectionRule::new(sensory, cortex, ConnectivityType::Feedforward)
//!         .with_probability(0.05)
//!         .with_rule(PlasticityRule::SpikeTiming),
//! );
//! let report = brain.connect(&plan)?;
//! println!("created {} synapses", report.created);
//!
//! brain.start()?;
//! for _ in 0..100 {
//!     brain.inject_input(sensory, &[0.8; 64])?;
//!     brain.process_step(1.0)?;
//! }
//! brain.pause()?;
//! let blob = brain.export()?;
//! let copy = HypergraphBrain::import(&blob, HypergraphConfig::default())?;
//! assert_eq!(copy.current_step(), 100);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature Flags
//! - **`compression`** (default): LZ4-compressed snapshots
//! - **`gpu`**: WGPU accelerator offload with CPU fallback
//! - **`file-logging`**: rolling log files via `tracing-appender`
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: config, observability                      │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  NPU: neural (model), accelerator (backends),           │
//! │       runtime (registries, regions), plasticity         │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Algorithms: connectivity    Persistence: serialization │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Orchestration: brain (lifecycle, scheduling, stats)    │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub use hypergraph_brain as brain;
pub use hypergraph_config as config;
pub use hypergraph_connectivity as connectivity;
pub use hypergraph_npu_accelerator as accelerator;
pub use hypergraph_npu_neural as neural;
pub use hypergraph_npu_plasticity as plasticity;
pub use hypergraph_npu_runtime as runtime;
pub use hypergraph_observability as observability;
pub use hypergraph_serialization as serialization;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::brain::{
        BrainError, BrainState, HypergraphBrain, Scheduling, StepStats, WeightSummary,
    };
    pub use crate::config::{load_config, validate_config, HypergraphConfig, SchedulingMode};
    pub use crate::connectivity::{
        BuildReport, ConnectionRule, ConnectivityManager, ConnectivityPlan, ConnectivityType,
        Distribution, WeightSpec,
    };
    pub use crate::accelerator::{ComputeBackend, CpuBackend};
    pub use crate::neural::{NeuronId, PlasticityRule, RegionId, SynapseId};
    pub use crate::runtime::{ProcessingMode, RegionSpec, RegionType, Topology};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;
        let _region = RegionId(0);
        let _config = HypergraphConfig::default();
    }
}
