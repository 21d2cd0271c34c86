// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Structural plasticity: pruning and synaptogenesis

use hypergraph_config::StructuralConfig;
use hypergraph_npu_neural::{NeuronId, SynapseId};
use hypergraph_npu_runtime::Topology;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::gate::derive_seed;

const GROWTH_STREAM: u64 = 0x6772_6f77;

/// Synapses to remove: weight strictly below the threshold, flagged by
/// learning, or with an endpoint that no longer exists
pub fn prune_candidates(topology: &Topology, threshold: f32) -> Vec<SynapseId> {
    let neurons = topology.neurons();
    topology
        .synapses()
        .iter_valid()
        .filter(|s| {
            s.weight() < threshold
                || s.is_flagged()
                || !neurons.is_valid(s.source)
                || !neurons.is_valid(s.target)
        })
        .map(|s| s.id)
        .collect()
}

pub fn prune(topology: &mut Topology, threshold: f32) -> usize {
    let candidates = prune_candidates(topology, threshold);
    topology.prune_synapses(&candidates)
}

/// Outcome of one growth pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrowthOutcome {
    pub grown: usize,
    pub rejected: usize,
}

/// Connect unconnected co-active pairs within each region.
///
/// A neuron is co-active if it fired within `coactivity_window` steps of
/// `step`. Pairs are visited in region-id then membership order; each is
/// connected with `growth_probability`, up to `max_new_per_pass` in total.
pub fn grow(topology: &mut Topology, config: &StructuralConfig, seed: u64, step: u64) -> GrowthOutcome {
    let mut outcome = GrowthOutcome::default();
    if config.max_new_per_pass == 0 || config.growth_probability <= 0.0 {
        return outcome;
    }
    let mut rng = StdRng::seed_from_u64(derive_seed(seed, step, GROWTH_STREAM));
    let probability = config.growth_probability.min(1.0) as f64;

    let mut candidates: Vec<(NeuronId, NeuronId)> = Vec::new();
    for region in topology.regions() {
        if !region.plasticity_enabled {
            continue;
        }
        let active: Vec<NeuronId> = region
            .neurons()
            .iter()
            .copied()
            .filter(|&id| {
                topology
                    .neuron(id)
                    .and_then(|n| n.last_fire_time())
                    .is_some_and(|t| step.saturating_sub(t) <= config.coactivity_window)
            })
            .collect();
        'pairs: for &pre in &active {
            for &post in &active {
                if pre == post || topology.synapses().contains_pair(pre, post) {
                    continue;
                }
                if rng.gen_bool(probability) {
                    candidates.push((pre, post));
                    if candidates.len() >= config.max_new_per_pass {
                        break 'pairs;
                    }
                }
            }
        }
        if candidates.len() >= config.max_new_per_pass {
            break;
        }
    }

    for (pre, post) in candidates {
        match topology.create_synapse(pre, post, config.initial_weight, config.growth_rule, None) {
            Ok(_) => outcome.grown += 1,
            Err(e) => {
                debug!("Synaptogenesis skipped {} -> {}: {}", pre, post, e);
                outcome.rejected += 1;
            }
        }
    }
    outcome
}
