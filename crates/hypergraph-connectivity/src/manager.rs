// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Seeded topology generation.

## Algorithm

```text
for rule in plan (declared order):
    for (pre, post) in eligible pairs (deterministic order):
        draw u ~ U[0,1)                    one draw per pair, always
        u < p(pre, post)  -> sample weight, register through the topology factory
```

All randomness comes from one `StdRng` per build, so a fixed seed gives a
bit-identical edge set and weights. Duplicate pairs and dangling references
are `TopologyError`s: logged at debug level, counted and skipped, then
reported once in aggregate.
*/

use ahash::AHashSet;
use hypergraph_npu_neural::{NeuronId, RegionId};
use hypergraph_npu_runtime::{Topology, TopologyError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::distribution::{connection_probability, distance, sample_weight, Placement};
use crate::types::{ConnectionRule, ConnectivityPlan, ConnectivityType};

/// Outcome of one plan build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub rules: usize,
    /// Pairs that received a Bernoulli draw
    pub candidates: usize,
    pub created: usize,
    /// Synapses created per rule, in plan order
    pub per_rule: Vec<usize>,
    pub duplicates: usize,
    pub dangling: usize,
    pub unknown_regions: usize,
    pub invalid_rules: usize,
}

impl BuildReport {
    pub fn errors(&self) -> usize {
        self.duplicates + self.dangling + self.unknown_regions + self.invalid_rules
    }

    fn record(&mut self, error: &TopologyError) {
        debug!("Connectivity: skipped ({})", error);
        match error {
            TopologyError::DuplicateSynapse { .. } => self.duplicates += 1,
            TopologyError::DanglingNeuron(_) => self.dangling += 1,
            TopologyError::UnknownRegion(_) => self.unknown_regions += 1,
            TopologyError::UnknownSynapse(_) | TopologyError::Invalid(_) => {
                self.invalid_rules += 1
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Member {
    id: NeuronId,
    place: Placement,
}

fn members(topology: &Topology, region: RegionId) -> Result<Vec<Member>, TopologyError> {
    let region = topology
        .region(region)
        .ok_or(TopologyError::UnknownRegion(region))?;
    let ids = region.neurons();
    let count = ids.len();
    Ok(ids
        .iter()
        .enumerate()
        .map(|(index, &id)| Member {
            id,
            place: Placement {
                position: topology.neuron(id).and_then(|n| n.position),
                index,
                count,
            },
        })
        .collect())
}

/// Per-build mutable state
struct Build<'a> {
    topology: &'a mut Topology,
    rng: StdRng,
    seen: AHashSet<(NeuronId, NeuronId)>,
    report: BuildReport,
}

impl Build<'_> {
    fn consider(&mut self, rule: &ConnectionRule, pre: &Member, post: &Member, p: f32) -> bool {
        if pre.id == post.id {
            return false;
        }
        self.report.candidates += 1;
        let draw: f32 = self.rng.gen();
        if draw >= p {
            return false;
        }
        if !self.seen.insert((pre.id, post.id)) {
            self.report.record(&TopologyError::DuplicateSynapse {
                pre: pre.id,
                post: post.id,
            });
            return false;
        }
        let weight = sample_weight(rule.distribution, rule.weight, &mut self.rng);
        match self.topology.create_synapse(
            pre.id,
            post.id,
            weight,
            rule.plasticity_rule,
            rule.delay,
        ) {
            Ok(_) => true,
            Err(e) => {
                self.report.record(&e);
                false
            }
        }
    }

    /// Every source x target pair, probability from the distance profile
    fn all_pairs(&mut self, rule: &ConnectionRule, sources: &[Member], targets: &[Member]) -> usize {
        let mut created = 0;
        for pre in sources {
            for post in targets {
                let d = distance(&pre.place, &post.place);
                let p = connection_probability(rule.distribution, rule.probability, d);
                if self.consider(rule, pre, post, p) {
                    created += 1;
                }
            }
        }
        created
    }

    fn rule(&mut self, rule: &ConnectionRule) -> Result<usize, TopologyError> {
        rule.validate().map_err(TopologyError::Invalid)?;
        let source = members(&*self.topology, rule.source)?;
        let target = members(&*self.topology, rule.target)?;

        let created = match rule.connectivity {
            ConnectivityType::Feedforward => self.all_pairs(rule, &source, &target),
            ConnectivityType::Feedback => self.all_pairs(rule, &target, &source),
            ConnectivityType::Lateral => self.all_pairs(rule, &source, &source),
            ConnectivityType::Reciprocal => {
                self.all_pairs(rule, &source, &target) + self.all_pairs(rule, &target, &source)
            }
            ConnectivityType::Global => {
                let mut union = source;
                if rule.source != rule.target {
                    union.extend(target);
                }
                self.all_pairs(rule, &union, &union)
            }
            ConnectivityType::Sparse { fan_out } => {
                let mut created = 0;
                for pre in &source {
                    let amount = fan_out.min(target.len());
                    let picks = rand::seq::index::sample(&mut self.rng, target.len(), amount);
                    for index in picks.iter() {
                        let post = &target[index];
                        let d = distance(&pre.place, &post.place);
                        let p = connection_probability(rule.distribution, rule.probability, d);
                        if self.consider(rule, pre, post, p) {
                            created += 1;
                        }
                    }
                }
                created
            }
            ConnectivityType::Dense => {
                let mut created = 0;
                for pre in &source {
                    for post in &target {
                        if self.consider(rule, pre, post, rule.probability) {
                            created += 1;
                        }
                    }
                }
                created
            }
            ConnectivityType::Modular {
                modules,
                inter_module_factor,
            } => {
                let module_of = |m: &Member| m.place.index * modules / m.place.count.max(1);
                let mut created = 0;
                for pre in &source {
                    for post in &target {
                        let p = if module_of(pre) == module_of(post) {
                            rule.probability
                        } else {
                            rule.probability * inter_module_factor
                        };
                        if self.consider(rule, pre, post, p) {
                            created += 1;
                        }
                    }
                }
                created
            }
        };
        Ok(created)
    }
}

/// Builds synapses from connection plans
#[derive(Debug, Clone, Copy)]
pub struct ConnectivityManager {
    seed: u64,
}

impl ConnectivityManager {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Apply every rule of `plan` to `topology`.
    ///
    /// Never fails: rules naming unknown regions or carrying invalid
    /// parameters are skipped and counted like per-edge errors.
    pub fn build(&self, topology: &mut Topology, plan: &ConnectivityPlan) -> BuildReport {
        let seed = plan.seed.unwrap_or(self.seed);
        let mut build = Build {
            topology,
            rng: StdRng::seed_from_u64(seed),
            seen: AHashSet::new(),
            report: BuildReport {
                rules: plan.rules.len(),
                ..Default::default()
            },
        };

        for (index, rule) in plan.rules.iter().enumerate() {
            let created = match build.rule(rule) {
                Ok(created) => created,
                Err(e) => {
                    debug!("Connectivity rule {} skipped: {}", index, e);
                    build.report.record(&e);
                    0
                }
            };
            build.report.per_rule.push(created);
            build.report.created += created;
        }

        let report = build.report;
        if report.errors() > 0 {
            warn!(
                "Connectivity build skipped {} items ({} duplicate, {} dangling, {} unknown region, {} invalid rule)",
                report.errors(),
                report.duplicates,
                report.dangling,
                report.unknown_regions,
                report.invalid_rules
            );
        }
        info!(
            "Connectivity build (seed {}): {} synapses from {} rules, {} candidate pairs",
            seed, report.created, report.rules, report.candidates
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Distribution;
    use hypergraph_npu_neural::{NeuronParams, PlasticityRule, SynapseParams};
    use hypergraph_npu_runtime::{RegionSpec, RegionType};

    fn two_regions(a: usize, b: usize) -> (Topology, RegionId, RegionId) {
        let mut topology = Topology::new(NeuronParams::default(), SynapseParams::default());
        let ra = topology
            .add_region(RegionSpec::new("a", RegionType::Cortical, a))
            .unwrap();
        let rb = topology
            .add_region(RegionSpec::new("b", RegionType::Subcortical, b))
            .unwrap();
        (topology, ra, rb)
    }

    fn edges(topology: &Topology) -> Vec<(NeuronId, NeuronId, u32, u32)> {
        topology
            .synapses()
            .iter_valid()
            .map(|s| (s.source, s.target, s.weight().to_bits(), s.delay))
            .collect()
    }

    #[test]
    fn test_build_is_deterministic() {
        let plan = |seed| {
            let (ra, rb) = (RegionId(0), RegionId(1));
            ConnectivityPlan::new()
                .with_seed(seed)
                .rule(
                    ConnectionRule::new(ra, rb, ConnectivityType::Feedforward)
                        .with_distribution(Distribution::Gaussian { sigma: 8.0 })
                        .with_probability(0.4),
                )
                .rule(ConnectionRule::new(ra, ra, ConnectivityType::Sparse { fan_out: 5 }).with_probability(0.7))
        };
        let manager = ConnectivityManager::new(1);

        let (mut first, _, _) = two_regions(40, 30);
        let (mut second, _, _) = two_regions(40, 30);
        let (mut third, _, _) = two_regions(40, 30);
        let r1 = manager.build(&mut first, &plan(9));
        let r2 = manager.build(&mut second, &plan(9));
        manager.build(&mut third, &plan(10));

        assert!(r1.created > 0);
        assert_eq!(r1, r2);
        assert_eq!(edges(&first), edges(&second));
        assert_ne!(edges(&first), edges(&third));
    }

    #[test]
    fn test_directions() {
        let (mut topology, ra, rb) = two_regions(5, 5);
        let plan = ConnectivityPlan::new()
            .rule(ConnectionRule::new(ra, rb, ConnectivityType::Feedback).with_probability(1.0));
        let report = ConnectivityManager::new(3).build(&mut topology, &plan);
        assert_eq!(report.created, 25);
        for synapse in topology.synapses().iter_valid() {
            assert_eq!(topology.region_of(synapse.source), Some(rb));
            assert_eq!(topology.region_of(synapse.target), Some(ra));
        }

        let (mut topology, ra, rb) = two_regions(3, 4);
        let plan = ConnectivityPlan::new()
            .rule(ConnectionRule::new(ra, rb, ConnectivityType::Reciprocal).with_probability(1.0));
        let report = ConnectivityManager::new(3).build(&mut topology, &plan);
        assert_eq!(report.created, 24);
        assert_eq!(report.errors(), 0);
    }

    #[test]
    fn test_lateral_and_global_skip_self_loops() {
        let (mut topology, ra, rb) = two_regions(6, 2);
        let plan = ConnectivityPlan::new()
            .rule(ConnectionRule::new(ra, ra, ConnectivityType::Lateral).with_probability(1.0));
        let report = ConnectivityManager::new(0).build(&mut topology, &plan);
        assert_eq!(report.created, 30);
        assert!(topology.synapses().iter_valid().all(|s| s.source != s.target));

        // Global over 6 + 2 neurons: the 30 lateral pairs already exist
        let plan = ConnectivityPlan::new()
            .rule(ConnectionRule::new(ra, rb, ConnectivityType::Global).with_probability(1.0));
        let report = ConnectivityManager::new(0).build(&mut topology, &plan);
        assert_eq!(report.created, 8 * 7 - 30);
        assert_eq!(report.duplicates, 30);
        assert_eq!(topology.synapse_count(), 56);
    }

    #[test]
    fn test_duplicates_within_a_build_are_counted() {
        let (mut topology, ra, rb) = two_regions(4, 4);
        let rule = ConnectionRule::new(ra, rb, ConnectivityType::Dense).with_probability(1.0);
        let plan = ConnectivityPlan::new().rule(rule.clone()).rule(rule);
        let report = ConnectivityManager::new(0).build(&mut topology, &plan);
        assert_eq!(report.per_rule, vec![16, 0]);
        assert_eq!(report.duplicates, 16);
        assert_eq!(topology.synapse_count(), 16);
    }

    #[test]
    fn test_sparse_fan_out_cap() {
        let (mut topology, ra, rb) = two_regions(10, 20);
        let plan = ConnectivityPlan::new().rule(
            ConnectionRule::new(ra, rb, ConnectivityType::Sparse { fan_out: 3 }).with_probability(1.0),
        );
        let report = ConnectivityManager::new(5).build(&mut topology, &plan);
        assert_eq!(report.created, 30);
        for &id in topology.region(ra).unwrap().neurons() {
            assert_eq!(topology.synapses().outgoing(id).len(), 3);
        }
    }

    #[test]
    fn test_modular_blocks() {
        let (mut topology, ra, rb) = two_regions(8, 8);
        let plan = ConnectivityPlan::new().rule(
            ConnectionRule::new(
                ra,
                rb,
                ConnectivityType::Modular {
                    modules: 2,
                    inter_module_factor: 0.0,
                },
            )
            .with_probability(1.0),
        );
        let report = ConnectivityManager::new(5).build(&mut topology, &plan);
        // Two 4x4 blocks
        assert_eq!(report.created, 32);
        let a = topology.region(ra).unwrap().neurons().to_vec();
        let b = topology.region(rb).unwrap().neurons().to_vec();
        assert!(!topology.synapses().contains_pair(a[0], b[7]));
        assert!(topology.synapses().contains_pair(a[7], b[4]));
    }

    #[test]
    fn test_weights_clamped_and_rule_applied() {
        let (mut topology, ra, rb) = two_regions(4, 4);
        let plan = ConnectivityPlan::new().rule(
            ConnectionRule::new(ra, rb, ConnectivityType::Dense)
                .with_probability(1.0)
                .with_weight(5.0, 0.5)
                .with_rule(PlasticityRule::SpikeTiming)
                .with_delay(3),
        );
        ConnectivityManager::new(0).build(&mut topology, &plan);
        for synapse in topology.synapses().iter_valid() {
            assert_eq!(synapse.weight(), 1.0);
            assert_eq!(synapse.rule, PlasticityRule::SpikeTiming);
            assert_eq!(synapse.delay, 3);
        }
    }

    #[test]
    fn test_bad_rules_are_skipped() {
        let (mut topology, ra, _) = two_regions(4, 4);
        let plan = ConnectivityPlan::new()
            .rule(ConnectionRule::new(ra, RegionId(99), ConnectivityType::Dense))
            .rule(ConnectionRule::new(ra, ra, ConnectivityType::Lateral).with_probability(2.0))
            .rule(ConnectionRule::new(ra, ra, ConnectivityType::Lateral).with_probability(1.0));
        let report = ConnectivityManager::new(0).build(&mut topology, &plan);
        assert_eq!(report.unknown_regions, 1);
        assert_eq!(report.invalid_rules, 1);
        assert_eq!(report.per_rule, vec![0, 0, 12]);
    }
}
