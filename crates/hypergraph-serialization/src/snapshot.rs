// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Serializable brain state
//!
//! Every registry slot is recorded, tombstones included, so ids survive a
//! round trip unchanged and `export -> import -> export` is byte-identical.

use hypergraph_npu_neural::{
    Neuron, NeuronDynamics, NeuronId, NeuronParams, PendingSignal, PlasticityRule, RegionId,
    Synapse, SynapseId, SynapseParams,
};
use hypergraph_npu_runtime::{RegionLayout, Topology};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SnapshotError};

/// Payload format tag
pub const FORMAT_TAG: &str = "hypergraph-brain";

/// One neuron slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuronRecord {
    pub id: NeuronId,
    pub region: RegionId,
    pub valid: bool,
    pub threshold: f32,
    pub decay_rate: f32,
    pub activation_min: f32,
    pub activation_max: f32,
    pub reset_activation: f32,
    pub refractory_steps: u32,
    pub min_fire_energy: f32,
    pub position: Option<[f32; 3]>,
    pub dynamics: NeuronDynamics,
}

impl NeuronRecord {
    fn capture(neuron: &Neuron, valid: bool) -> Self {
        Self {
            id: neuron.id,
            region: neuron.region,
            valid,
            threshold: neuron.threshold,
            decay_rate: neuron.decay_rate,
            activation_min: neuron.activation_min,
            activation_max: neuron.activation_max,
            reset_activation: neuron.reset_activation,
            refractory_steps: neuron.refractory_steps,
            min_fire_energy: neuron.min_fire_energy,
            position: neuron.position,
            dynamics: neuron.dynamics(),
        }
    }

    fn restore(&self, defaults: &NeuronParams) -> Neuron {
        let params = NeuronParams {
            activation_min: self.activation_min,
            activation_max: self.activation_max,
            threshold: self.threshold,
            decay_rate: self.decay_rate,
            reset_activation: self.reset_activation,
            refractory_steps: self.refractory_steps,
            min_fire_energy: self.min_fire_energy,
            ..*defaults
        };
        let mut neuron = Neuron::new(self.id, self.region, &params);
        neuron.position = self.position;
        neuron.restore_dynamics(&self.dynamics);
        neuron
    }
}

/// One synapse slot, including in-flight signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynapseRecord {
    pub id: SynapseId,
    pub source: NeuronId,
    pub target: NeuronId,
    pub valid: bool,
    pub weight: f32,
    pub rule: PlasticityRule,
    pub delay: u32,
    pub eligibility: f32,
    pub update_count: u64,
    pub last_delta: f32,
    pub flagged: bool,
    pub pending: Vec<PendingSignal>,
}

impl SynapseRecord {
    fn capture(synapse: &Synapse, valid: bool) -> Self {
        Self {
            id: synapse.id,
            source: synapse.source,
            target: synapse.target,
            valid,
            weight: synapse.weight(),
            rule: synapse.rule,
            delay: synapse.delay,
            eligibility: synapse.eligibility(),
            update_count: synapse.update_count(),
            last_delta: synapse.last_delta(),
            flagged: synapse.is_flagged(),
            pending: synapse.pending_signals(),
        }
    }

    fn restore(&self, params: &SynapseParams) -> Synapse {
        let synapse = Synapse::new(
            self.id,
            self.source,
            self.target,
            self.weight,
            self.rule,
            self.delay,
            params.bounds(),
        );
        synapse.set_eligibility(self.eligibility);
        synapse.restore_history(self.update_count, self.last_delta);
        synapse.restore_pending(&self.pending);
        if self.flagged {
            synapse.flag_for_pruning();
        }
        synapse
    }
}

/// Complete brain state at a step boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrainSnapshot {
    pub format: String,
    /// Steps processed so far
    pub step: u64,
    pub neuron_params: NeuronParams,
    pub synapse_params: SynapseParams,
    pub regions: Vec<RegionLayout>,
    pub neurons: Vec<NeuronRecord>,
    pub synapses: Vec<SynapseRecord>,
    /// Rewards queued but not yet applied
    pub pending_rewards: Vec<(RegionId, f32)>,
}

impl BrainSnapshot {
    pub fn capture(topology: &Topology, step: u64, pending_rewards: Vec<(RegionId, f32)>) -> Self {
        Self {
            format: FORMAT_TAG.to_string(),
            step,
            neuron_params: *topology.neuron_params(),
            synapse_params: *topology.synapse_params(),
            regions: topology.regions().map(|r| r.layout()).collect(),
            neurons: topology
                .neurons()
                .slots()
                .map(|(n, valid)| NeuronRecord::capture(n, valid))
                .collect(),
            synapses: topology
                .synapses()
                .slots()
                .map(|(s, valid)| SynapseRecord::capture(s, valid))
                .collect(),
            pending_rewards,
        }
    }

    /// Rebuild the topology. Fails without side effects on any inconsistency.
    pub fn to_topology(&self) -> Result<Topology> {
        if self.format != FORMAT_TAG {
            return Err(SnapshotError::Format(self.format.clone()));
        }
        let neurons = self
            .neurons
            .iter()
            .map(|r| (r.restore(&self.neuron_params), r.valid))
            .collect();
        let synapses = self
            .synapses
            .iter()
            .map(|r| (r.restore(&self.synapse_params), r.valid))
            .collect();
        Ok(Topology::from_parts(
            self.neuron_params,
            self.synapse_params,
            neurons,
            synapses,
            self.regions.clone(),
        )?)
    }
}
