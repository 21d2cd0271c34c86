// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `hypergraph_configuration.toml`. Neuron, synapse, rule and metabolism
//! sections reuse the parameter structs of `hypergraph-npu-neural` directly.

use hypergraph_npu_neural::{
    BcmParams, HebbianParams, MetabolismParams, NeuronParams, OjaParams, PlasticityRule,
    RewardParams, StdpParams, SynapseParams,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HypergraphConfig {
    pub neuron: NeuronParams,
    pub synapse: SynapseParams,
    pub learning: LearningConfig,
    pub metabolism: MetabolismParams,
    pub scheduling: SchedulingConfig,
    pub accelerator: AcceleratorConfig,
    pub connectivity: ConnectivityConfig,
    pub snapshot: SnapshotConfig,
    pub logging: LoggingConfig,
}

/// Learning system configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Master switch for rule application
    pub enabled: bool,

    /// Fraction of a region's synapses updated per step (sparse-update gate)
    pub update_fraction: f32,

    /// Seed for the sparse gate and synaptogenesis
    pub seed: u64,

    pub hebbian: HebbianParams,
    pub stdp: StdpParams,
    pub bcm: BcmParams,
    pub oja: OjaParams,
    pub reward: RewardParams,
    pub homeostasis: HomeostasisConfig,
    pub structural: StructuralConfig,
    pub attention: AttentionConfig,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            update_fraction: 1.0,
            seed: 0x5eed,
            hebbian: HebbianParams::default(),
            stdp: StdpParams::default(),
            bcm: BcmParams::default(),
            oja: OjaParams::default(),
            reward: RewardParams::default(),
            homeostasis: HomeostasisConfig::default(),
            structural: StructuralConfig::default(),
            attention: AttentionConfig::default(),
        }
    }
}

/// Homeostatic synaptic scaling
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HomeostasisConfig {
    pub enabled: bool,

    /// Steps between scaling passes (also the firing-rate window)
    pub interval: u64,

    /// Target spikes per step
    pub target_rate: f32,

    /// No rescale while |rate - target| ≤ tolerance
    pub tolerance: f32,

    /// Proportional gain on the relative rate error
    pub gain: f32,

    /// Largest relative change per pass
    pub max_step: f32,
}

impl Default for HomeostasisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: 100,
            target_rate: 0.05,
            tolerance: 0.005,
            gain: 0.5,
            max_step: 0.1,
        }
    }
}

/// Structural plasticity (pruning + growth)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StructuralConfig {
    pub enabled: bool,

    /// Steps between structural passes
    pub interval: u64,

    /// Synapses with weight strictly below this are pruned
    pub prune_threshold: f32,

    /// Per co-active unconnected pair
    pub growth_probability: f32,

    /// Cap on synapses grown per pass
    pub max_new_per_pass: usize,

    /// Neurons that fired within this many steps count as co-active
    pub coactivity_window: u64,

    pub initial_weight: f32,

    pub growth_rule: PlasticityRule,
}

impl Default for StructuralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: 1000,
            prune_threshold: 0.01,
            growth_probability: 0.001,
            max_new_per_pass: 64,
            coactivity_window: 3,
            initial_weight: 0.1,
            growth_rule: PlasticityRule::Hebbian,
        }
    }
}

/// How several attention gates on one synapse combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttentionComposition {
    /// Product of all gates
    #[default]
    Multiplicative,
    /// Smallest gate wins
    Min,
    /// Largest gate wins
    Max,
}

/// Attention gating
///
/// Gates are composed in the fixed order `[rule gate, post attention, pre attention]`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AttentionConfig {
    pub composition: AttentionComposition,
    pub rule_gates: RuleGates,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            composition: AttentionComposition::Multiplicative,
            rule_gates: RuleGates::default(),
        }
    }
}

/// Per-rule attention gate multipliers
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RuleGates {
    pub hebbian: f32,
    pub stdp: f32,
    pub bcm: f32,
    pub oja: f32,
    pub reward: f32,
}

impl RuleGates {
    pub fn gate(&self, rule: PlasticityRule) -> f32 {
        match rule {
            PlasticityRule::Hebbian => self.hebbian,
            PlasticityRule::SpikeTiming => self.stdp,
            PlasticityRule::Bcm => self.bcm,
            PlasticityRule::Oja => self.oja,
            PlasticityRule::RewardModulated => self.reward,
            PlasticityRule::Static => 0.0,
        }
    }
}

impl Default for RuleGates {
    fn default() -> Self {
        Self {
            hebbian: 1.0,
            stdp: 1.0,
            bcm: 1.0,
            oja: 1.0,
            reward: 1.0,
        }
    }
}

/// Region scheduling order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulingMode {
    /// Region-id order on the caller thread
    #[default]
    Sequential,
    /// One task per region on the worker pool, joined before learning
    Parallel,
    /// Topological order of declared region dependencies
    Hierarchical,
}

impl fmt::Display for SchedulingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingMode::Sequential => write!(f, "sequential"),
            SchedulingMode::Parallel => write!(f, "parallel"),
            SchedulingMode::Hierarchical => write!(f, "hierarchical"),
        }
    }
}

impl FromStr for SchedulingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(SchedulingMode::Sequential),
            "parallel" => Ok(SchedulingMode::Parallel),
            "hierarchical" => Ok(SchedulingMode::Hierarchical),
            _ => Err(format!("Unknown scheduling mode: {}", s)),
        }
    }
}

/// Scheduling configuration
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub mode: SchedulingMode,

    /// Worker pool size for parallel mode (0 = one per core)
    pub worker_threads: usize,
}

/// Accelerator offload configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AcceleratorConfig {
    /// "cpu", "wgpu" or "auto"
    pub backend: String,

    /// Minimum neurons to consider the GPU in auto mode
    pub gpu_neuron_threshold: usize,

    /// Minimum synapses to consider the GPU in auto mode
    pub gpu_synapse_threshold: usize,

    pub force_cpu: bool,
    pub force_gpu: bool,
}

impl Default for AcceleratorConfig {
    fn default() -> Self {
        Self {
            backend: "cpu".to_string(),
            gpu_neuron_threshold: 500_000,
            gpu_synapse_threshold: 50_000_000,
            force_cpu: false,
            force_gpu: false,
        }
    }
}

/// Topology builder configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Seed used when a plan does not carry its own
    pub seed: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

/// Snapshot configuration
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// LZ4-compress exported snapshots (requires the `compression` feature)
    pub compress: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for all hypergraph crates
    pub level: String,

    /// Crates logged at debug level (e.g. "hypergraph-brain")
    pub debug_crates: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            debug_crates: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: HypergraphConfig = toml::from_str("").unwrap();
        assert_eq!(config, HypergraphConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config: HypergraphConfig = toml::from_str(
            r#"
            [synapse]
            weight_max = 2.0

            [learning.structural]
            prune_threshold = 0.1
            growth_rule = "Oja"

            [learning.attention]
            composition = "min"

            [scheduling]
            mode = "parallel"
            worker_threads = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.synapse.weight_max, 2.0);
        assert_eq!(config.synapse.weight_min, 0.0);
        assert_eq!(config.learning.structural.prune_threshold, 0.1);
        assert_eq!(config.learning.structural.growth_rule, PlasticityRule::Oja);
        assert_eq!(config.learning.attention.composition, AttentionComposition::Min);
        assert_eq!(config.scheduling.mode, SchedulingMode::Parallel);
        assert_eq!(config.scheduling.worker_threads, 4);
    }

    #[test]
    fn test_scheduling_mode_parse() {
        assert_eq!("Parallel".parse::<SchedulingMode>(), Ok(SchedulingMode::Parallel));
        assert!("random".parse::<SchedulingMode>().is_err());
    }

    #[test]
    fn test_static_rule_has_no_gate() {
        assert_eq!(RuleGates::default().gate(PlasticityRule::Static), 0.0);
    }
}
