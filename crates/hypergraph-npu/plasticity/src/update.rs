// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Per-region rule application
//!
//! One pass over a region's afferent synapses, in cached order:
//!
//! ```text
//! resolve pre/post   missing neuron -> flag synapse for pruning, skip
//! reward rule        e <- λe + pre·post (every pass, before the sparse gate)
//! sparse gate        seeded Bernoulli(update_fraction)
//! attention          gate = compose([rule gate, post attention, pre attention])
//! Hebbian / STDP     collected, evaluated in one backend batch each
//! BCM / Oja          evaluated inline
//! BCM threshold      slid once per post-synaptic neuron after the pass
//! rewards            Δw = κ·r·e·gate for reward-modulated synapses
//! ```

use hypergraph_config::LearningConfig;
use hypergraph_npu_accelerator::OffloadPath;
use hypergraph_npu_neural::plasticity::{bcm_delta, bcm_theta_step, oja_delta, reward_delta};
use hypergraph_npu_neural::{NeuronId, PlasticityRule, RegionId};
use hypergraph_npu_runtime::Topology;
use serde::Serialize;

use crate::gate::{compose_attention, SparseGate};

/// Synapse list a region learns over, for one topology version
#[derive(Debug, Default)]
pub struct LearningView {
    pub version: u64,
    pub synapses: Vec<usize>,
    /// Distinct targets of BCM synapses, in first-seen order
    pub bcm_posts: Vec<NeuronId>,
}

impl LearningView {
    pub fn build(topology: &Topology, region: RegionId) -> Self {
        let mut view = LearningView {
            version: topology.version(),
            ..Default::default()
        };
        let Some(region) = topology.region(region) else {
            return view;
        };
        let synapses = topology.synapses();
        view.synapses = region.views(topology).afferent.clone();
        let mut seen = ahash::AHashSet::new();
        for &slot in &view.synapses {
            if let Some(synapse) = synapses.get_index(slot) {
                if synapse.rule == PlasticityRule::Bcm && seen.insert(synapse.target) {
                    view.bcm_posts.push(synapse.target);
                }
            }
        }
        view
    }
}

/// Counters from one region pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UpdateCounts {
    /// Weight updates applied (any rule)
    pub updated: usize,
    /// Synapses skipped by the sparse gate
    pub gated: usize,
    /// Synapses with a missing endpoint, now flagged for pruning
    pub dangling: usize,
    /// Eligibility traces advanced
    pub traces: usize,
    /// Reward-driven weight updates
    pub rewarded: usize,
}

impl UpdateCounts {
    pub fn merge(mut self, other: UpdateCounts) -> Self {
        self.updated += other.updated;
        self.gated += other.gated;
        self.dangling += other.dangling;
        self.traces += other.traces;
        self.rewarded += other.rewarded;
        self
    }
}

/// Apply every rule to one region's afferent synapses
#[allow(clippy::too_many_arguments)]
pub fn update_region(
    topology: &Topology,
    region: RegionId,
    view: &LearningView,
    config: &LearningConfig,
    step: u64,
    dt: f32,
    reward: f32,
    backend: &OffloadPath,
) -> UpdateCounts {
    let neurons = topology.neurons();
    let synapses = topology.synapses();
    let bounds = topology.weight_bounds();
    let composition = config.attention.composition;
    let rule_gates = &config.attention.rule_gates;

    let mut counts = UpdateCounts::default();
    let mut gate = SparseGate::new(config.seed, step, region, config.update_fraction);

    let mut hebb_pre = Vec::new();
    let mut hebb_post = Vec::new();
    let mut hebb_meta: Vec<(usize, f32)> = Vec::new();
    let mut stdp_dt = Vec::new();
    let mut stdp_meta: Vec<(usize, f32)> = Vec::new();
    let mut rewarded: Vec<(usize, f32)> = Vec::new();

    for &slot in &view.synapses {
        let Some(synapse) = synapses.get_index(slot) else {
            continue;
        };
        if synapse.rule == PlasticityRule::Static {
            continue;
        }
        let (Some(pre), Some(post)) = (neurons.get(synapse.source), neurons.get(synapse.target))
        else {
            synapse.flag_for_pruning();
            counts.dangling += 1;
            continue;
        };
        let attention = compose_attention(
            composition,
            [rule_gates.gate(synapse.rule), post.attention(), pre.attention()],
        );

        if synapse.rule == PlasticityRule::RewardModulated {
            synapse.update_eligibility(config.reward.trace_decay, pre.output() * post.output());
            counts.traces += 1;
            if reward != 0.0 && attention > 0.0 {
                rewarded.push((slot, attention));
            }
            continue;
        }

        if !gate.admit() {
            counts.gated += 1;
            continue;
        }
        if attention <= 0.0 {
            continue;
        }

        match synapse.rule {
            PlasticityRule::Hebbian => {
                hebb_pre.push(pre.output());
                hebb_post.push(post.output());
                hebb_meta.push((slot, attention));
            }
            PlasticityRule::SpikeTiming => {
                if !(pre.fired_at(step) || post.fired_at(step)) {
                    continue;
                }
                if let (Some(t_pre), Some(t_post)) = (pre.last_fire_time(), post.last_fire_time())
                {
                    stdp_dt.push(t_post as f32 - t_pre as f32);
                    stdp_meta.push((slot, attention));
                }
            }
            PlasticityRule::Bcm => {
                let delta = bcm_delta(
                    pre.output(),
                    post.output(),
                    post.bcm_theta(),
                    config.bcm.learning_rate * attention,
                );
                synapse.apply_delta(delta, bounds);
                counts.updated += 1;
            }
            PlasticityRule::Oja => {
                let delta = oja_delta(
                    pre.output(),
                    post.output(),
                    synapse.weight(),
                    config.oja.learning_rate * attention,
                );
                synapse.apply_delta(delta, bounds);
                counts.updated += 1;
            }
            PlasticityRule::RewardModulated | PlasticityRule::Static => {}
        }
    }

    if !hebb_meta.is_empty() {
        let deltas = backend.hebbian(&hebb_pre, &hebb_post, config.hebbian.learning_rate);
        for (&(slot, attention), delta) in hebb_meta.iter().zip(deltas) {
            if let Some(synapse) = synapses.get_index(slot) {
                synapse.apply_delta(delta * attention, bounds);
                counts.updated += 1;
            }
        }
    }

    if !stdp_meta.is_empty() {
        let deltas = backend.spike_rule(&stdp_dt, &config.stdp);
        for (&(slot, attention), delta) in stdp_meta.iter().zip(deltas) {
            if let Some(synapse) = synapses.get_index(slot) {
                synapse.apply_delta(delta * attention, bounds);
                counts.updated += 1;
            }
        }
    }

    // Thresholds move after every BCM delta of this pass used the old value
    for &post in &view.bcm_posts {
        if let Some(neuron) = neurons.get(post) {
            let theta = bcm_theta_step(neuron.bcm_theta(), neuron.output(), config.bcm.theta_tau, dt);
            neuron.set_bcm_theta(theta);
        }
    }

    for (slot, attention) in rewarded {
        if let Some(synapse) = synapses.get_index(slot) {
            let delta = reward_delta(
                synapse.eligibility(),
                reward,
                config.reward.learning_rate,
                attention,
            );
            synapse.apply_delta(delta, bounds);
            counts.rewarded += 1;
        }
    }

    counts
}
