// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Hypergraph Connectivity

Declarative, seeded topology generation. A [`ConnectivityPlan`] lists
[`ConnectionRule`]s; the [`ConnectivityManager`] walks each rule's eligible
pairs in a fixed order, draws one Bernoulli sample per pair and registers
accepted synapses through the topology factory.

## Example

```rust
use hypergraph_connectivity::{ConnectionRule, ConnectivityManager, ConnectivityPlan, ConnectivityType};
use hypergraph_npu_neural::{NeuronParams, SynapseParams};
use hypergraph_npu_runtime::{RegionSpec, RegionType, Topology};

let mut topology = Topology::new(NeuronParams::default(), SynapseParams::default());
let a = topology.add_region(RegionSpec::new("a", RegionType::Cortical, 16)).unwrap();
let b = topology.add_region(RegionSpec::new("b", RegionType::Cortical, 16)).unwrap();

let plan = ConnectivityPlan::new()
    .with_seed(7)
    .rule(ConnectionRule::new(a, b, ConnectivityType::Feedforward).with_probability(0.25));
let report = ConnectivityManager::new(0).build(&mut topology, &plan);
assert_eq!(report.created, topology.synapse_count());
```
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod distribution;
pub mod manager;
pub mod types;

pub use distribution::{connection_probability, distance, sample_weight, Placement};
pub use manager::{BuildReport, ConnectivityManager};
pub use types::{ConnectionRule, ConnectivityPlan, ConnectivityType, Distribution, WeightSpec};

// Topology errors surface through build reports
pub use hypergraph_npu_runtime::TopologyError;
