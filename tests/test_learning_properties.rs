// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Learning behaviour through the full brain.

These tests validate:
- Weights stay inside the configured bounds under every rule
- Homeostatic scaling moves afferent weights toward the target rate
- Eligibility traces decay geometrically without co-activation
- Repeated co-activation strengthens exactly the co-active edges
- Structural pruning removes exactly the weak synapses
*/

use hypergraph::prelude::*;
use hypergraph::runtime::RegionLayout;

fn plain_region(brain: &HypergraphBrain, name: &str, neurons: usize) -> RegionId {
    brain
        .add_region(RegionSpec::new(name, RegionType::Custom, neurons))
        .expect("Failed to add region")
}

fn mean_afferent_weight(brain: &HypergraphBrain, region: &RegionLayout) -> f32 {
    brain.with_topology(|t| {
        let weights: Vec<f32> = t
            .synapses()
            .iter_valid()
            .filter(|s| region.neurons.contains(&s.target))
            .map(|s| s.weight())
            .collect();
        weights.iter().sum::<f32>() / weights.len() as f32
    })
}

/// Deterministic input pattern in [0, 1)
fn pattern(step: u64, index: usize) -> f32 {
    ((index as u64 * 7919 + step * 104_729) % 100) as f32 / 100.0
}

#[test]
fn test_weights_bounded_for_every_rule() {
    let mut config = HypergraphConfig::default();
    config.synapse.weight_min = 0.05;
    config.synapse.weight_max = 0.8;
    config.learning.structural.initial_weight = 0.1;
    config.learning.homeostasis.interval = 10;
    config.learning.hebbian.learning_rate = 0.5;
    config.learning.oja.learning_rate = 0.5;
    config.learning.bcm.learning_rate = 0.5;
    config.learning.reward.learning_rate = 2.0;
    let bounds = (config.synapse.weight_min, config.synapse.weight_max);

    let brain = HypergraphBrain::new(config).unwrap();
    let mut plan = ConnectivityPlan::new().with_seed(11);
    let mut regions = Vec::new();
    for rule in PlasticityRule::ALL {
        let region = plain_region(&brain, &format!("{:?}", rule), 20);
        plan = plan.rule(
            ConnectionRule::new(region, region, ConnectivityType::Lateral)
                .with_probability(0.3)
                .with_rule(rule)
                .with_weight(0.5, 0.5),
        );
        regions.push(region);
    }
    assert!(brain.connect(&plan).unwrap().created > 0);
    brain.start().unwrap();

    for step in 0..300u64 {
        for (r, &region) in regions.iter().enumerate() {
            let input: Vec<f32> = (0..20).map(|i| pattern(step, i + r) * 2.0).collect();
            brain.inject_input(region, &input).unwrap();
            let reward = if step % 2 == 0 { 50.0 } else { -50.0 };
            brain.deliver_reward(region, reward).unwrap();
        }
        brain.process_step(1.0).unwrap();

        if step % 25 == 0 || step == 299 {
            brain.with_topology(|t| {
                for synapse in t.synapses().iter_valid() {
                    let w = synapse.weight();
                    assert!(
                        w >= bounds.0 && w <= bounds.1,
                        "{:?} synapse {} left bounds: {}",
                        synapse.rule,
                        synapse.id,
                        w
                    );
                }
            });
        }
    }
}

fn homeostasis_brain() -> (HypergraphBrain, RegionId, RegionLayout) {
    let mut config = HypergraphConfig::default();
    config.learning.homeostasis.interval = 10;
    config.learning.structural.enabled = false;
    let brain = HypergraphBrain::new(config).unwrap();
    let source = plain_region(&brain, "source", 10);
    let target = plain_region(&brain, "target", 10);
    brain
        .connect(&ConnectivityPlan::new().rule(
            ConnectionRule::new(source, target, ConnectivityType::Dense)
                .with_probability(1.0)
                .with_rule(PlasticityRule::Static)
                .with_weight(0.5, 0.0),
        ))
        .unwrap();
    let layout = brain.region(target).unwrap();
    brain.start().unwrap();
    (brain, target, layout)
}

#[test]
fn test_homeostasis_lowers_weights_above_target() {
    let (brain, target, layout) = homeostasis_brain();
    let mut previous = mean_afferent_weight(&brain, &layout);

    for _cycle in 0..5 {
        for _ in 0..10 {
            // Fires every third step: rate 0.4 against a 0.05 target
            brain.inject_input(target, &[1.0; 10]).unwrap();
            brain.process_step(1.0).unwrap();
        }
        let stats = brain.last_stats().unwrap();
        assert!(stats.consolidation.unwrap().rescaled >= 10);
        let mean = mean_afferent_weight(&brain, &layout);
        assert!(mean < previous, "{} !< {}", mean, previous);
        previous = mean;
    }
}

#[test]
fn test_homeostasis_raises_weights_below_target() {
    let (brain, _target, layout) = homeostasis_brain();
    let mut previous = mean_afferent_weight(&brain, &layout);

    for _cycle in 0..5 {
        assert_eq!(brain.run(10, 1.0).unwrap(), 10);
        let mean = mean_afferent_weight(&brain, &layout);
        assert!(mean > previous, "{} !> {}", mean, previous);
        previous = mean;
    }
}

#[test]
fn test_trace_decays_without_coactivity() {
    let brain = HypergraphBrain::new(HypergraphConfig::default()).unwrap();
    let region = plain_region(&brain, "r", 2);
    brain
        .connect(&ConnectivityPlan::new().rule(
            ConnectionRule::new(region, region, ConnectivityType::Lateral)
                .with_probability(1.0)
                .with_rule(PlasticityRule::RewardModulated),
        ))
        .unwrap();
    let lambda = brain.config().learning.reward.trace_decay;
    brain.with_topology(|t| {
        for synapse in t.synapses().iter_valid() {
            synapse.set_eligibility(1.0);
        }
    });
    brain.start().unwrap();

    let mut expected = 1.0f32;
    for _ in 0..8 {
        brain.process_step(1.0).unwrap();
        expected *= lambda;
        brain.with_topology(|t| {
            for synapse in t.synapses().iter_valid() {
                assert!((synapse.eligibility() - expected).abs() < 1e-6);
            }
        });
    }
}

#[test]
fn test_hebbian_coactivation_strengthens_coactive_edges() {
    let mut config = HypergraphConfig::default();
    config.learning.hebbian.learning_rate = 0.01;
    // Activation is this step's input only, so weak edges cannot build up drive
    config.neuron.decay_rate = 1.0;
    config.learning.homeostasis.enabled = false;
    config.learning.structural.enabled = false;
    let brain = HypergraphBrain::new(config).unwrap();
    let region = plain_region(&brain, "cortex", 1000);
    let report = brain
        .connect(&ConnectivityPlan::new().with_seed(3).rule(
            ConnectionRule::new(region, region, ConnectivityType::Lateral)
                .with_probability(0.01)
                .with_rule(PlasticityRule::Hebbian)
                .with_weight(0.01, 0.0),
        ))
        .unwrap();
    assert!(report.created > 5_000, "created {}", report.created);

    let neurons = brain.region(region).unwrap().neurons;
    let assembly: std::collections::HashSet<NeuronId> = neurons[..100].iter().copied().collect();
    brain.start().unwrap();

    let drive = vec![1.0f32; 100];
    for step in 0..1000u64 {
        if step % 10 == 0 {
            brain.inject_input(region, &drive).unwrap();
        }
        brain.process_step(1.0).unwrap();
    }

    let (inside, outside) = brain.with_topology(|t| {
        let mut inside = Vec::new();
        let mut outside = Vec::new();
        for synapse in t.synapses().iter_valid() {
            if assembly.contains(&synapse.source) && assembly.contains(&synapse.target) {
                inside.push(synapse.weight());
            } else {
                outside.push(synapse.weight());
            }
        }
        (inside, outside)
    });
    let mean = |v: &[f32]| v.iter().sum::<f32>() / v.len() as f32;
    assert!(!inside.is_empty());
    assert!(
        mean(&inside) > 2.0 * mean(&outside),
        "co-active {} vs rest {}",
        mean(&inside),
        mean(&outside)
    );
}

#[test]
fn test_pruning_removes_exactly_weak_synapses() {
    let mut config = HypergraphConfig::default();
    config.learning.homeostasis.enabled = false;
    config.learning.structural.interval = 5;
    config.learning.structural.prune_threshold = 0.1;
    config.learning.structural.growth_probability = 0.0;
    let brain = HypergraphBrain::new(config).unwrap();
    let a = plain_region(&brain, "a", 50);
    let b = plain_region(&brain, "b", 50);
    brain
        .connect(&ConnectivityPlan::new().rule(
            ConnectionRule::new(a, b, ConnectivityType::Dense)
                .with_probability(1.0)
                .with_rule(PlasticityRule::Static)
                .with_weight(0.5, 0.0),
        ))
        .unwrap();
    assert_eq!(brain.synapse_count(), 2500);

    let weak: Vec<SynapseId> = brain.with_topology(|t| {
        let bounds = t.weight_bounds();
        let weak: Vec<SynapseId> = t.synapses().iter_valid().map(|s| s.id).step_by(5).collect();
        for id in &weak {
            t.synapse(*id).unwrap().set_weight(0.05, bounds);
        }
        weak
    });
    assert_eq!(weak.len(), 500);

    brain.start().unwrap();
    brain.run(5, 1.0).unwrap();
    let consolidation = brain.last_stats().unwrap().consolidation.unwrap();
    assert_eq!(consolidation.pruned, 500);
    assert_eq!(consolidation.grown, 0);

    brain.with_topology(|t| {
        assert_eq!(t.synapse_count(), 2000);
        for id in &weak {
            assert!(t.synapse(*id).is_none());
        }
        for synapse in t.synapses().iter_valid() {
            assert_eq!(synapse.weight(), 0.5);
        }
    });
}
