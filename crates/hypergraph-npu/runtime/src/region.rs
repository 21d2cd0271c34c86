// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Regions
//!
//! A region owns a set of neuron ids and advances them once per step:
//!
//! ```text
//! 1. flush      afferent synapses deliver matured signals (cached order)
//! 2. advance    owned neurons integrate per processing mode
//! 3. propagate  fired neurons push a unit spike into efferent synapses
//! 4. stats      mean activation, fired count, memory estimate
//! ```
//!
//! Synapse delays are at least one step, so (1) only sees signals produced
//! by earlier steps and (3) only produces signals for later steps. A region
//! only ever writes to its own neurons, which makes regions independent within
//! a step and the result identical under every scheduling mode.

use std::sync::Arc;
use std::time::Instant;

use ahash::AHashMap;
use hypergraph_npu_accelerator::{LeakyBatch, OffloadPath};
use hypergraph_npu_neural::{oscillation_gain, Neuron, NeuronId, NeuronParams, RegionId};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::topology::Topology;

/// Anatomical tag; only drives topology defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RegionType {
    #[default]
    Cortical,
    Subcortical,
    Brainstem,
    Special,
    Custom,
}

impl RegionType {
    /// Processing mode used when a region spec does not name one
    pub fn default_mode(self) -> ProcessingMode {
        match self {
            RegionType::Cortical => ProcessingMode::Layered,
            RegionType::Subcortical => ProcessingMode::Synchronous,
            RegionType::Brainstem => ProcessingMode::Oscillatory {
                amplitude: 0.5,
                frequency: 0.1,
                phase: 0.0,
            },
            RegionType::Special => ProcessingMode::Competitive {
                k: 1,
                inhibition: 0.5,
            },
            RegionType::Custom => ProcessingMode::Synchronous,
        }
    }

    /// Extra steps added to the configured default delay for synapses leaving
    /// a region of this type
    pub fn delay_offset(self) -> u32 {
        match self {
            RegionType::Subcortical => 1,
            RegionType::Brainstem => 2,
            RegionType::Cortical | RegionType::Special | RegionType::Custom => 0,
        }
    }
}

/// How a region advances its neurons within one step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProcessingMode {
    /// Batch integrate every neuron, commit simultaneously
    Synchronous,

    /// One neuron at a time in a step-seeded permutation
    Asynchronous,

    /// Declared layers in order; each layer commits before the next.
    ///
    /// Each layer is its own backend batch. Spikes only reach other neurons
    /// through synapses with a delay of at least one step, so a layer never
    /// sees an earlier layer's output within the same step and the per-step
    /// result equals `Synchronous`.
    Layered,

    /// Top `k` keep their activation, the rest are scaled by `1 - inhibition`
    /// and cannot fire this step
    Competitive { k: usize, inhibition: f32 },

    /// Input scaled by `1 + amplitude * sin(2π f t dt + phase)`
    Oscillatory {
        amplitude: f32,
        frequency: f32,
        phase: f32,
    },
}

/// Declarative description of a region to create
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSpec {
    pub name: String,
    pub region_type: RegionType,
    pub neuron_count: usize,
    pub processing_mode: Option<ProcessingMode>,
    /// Empty, or one position per neuron
    pub positions: Vec<[f32; 3]>,
    /// Consecutive layer sizes (Layered mode); empty means one layer
    pub layer_sizes: Vec<usize>,
    pub depends_on: Vec<RegionId>,
    pub plasticity_enabled: bool,
    /// Overrides the topology-wide neuron parameters for this region
    pub neuron_params: Option<NeuronParams>,
}

impl RegionSpec {
    pub fn new(name: impl Into<String>, region_type: RegionType, neuron_count: usize) -> Self {
        Self {
            name: name.into(),
            region_type,
            neuron_count,
            processing_mode: None,
            positions: Vec::new(),
            layer_sizes: Vec::new(),
            depends_on: Vec::new(),
            plasticity_enabled: true,
            neuron_params: None,
        }
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.processing_mode = Some(mode);
        self
    }

    pub fn with_positions(mut self, positions: Vec<[f32; 3]>) -> Self {
        self.positions = positions;
        self
    }

    pub fn with_layers(mut self, layer_sizes: Vec<usize>) -> Self {
        self.layer_sizes = layer_sizes;
        self
    }

    pub fn depends_on(mut self, regions: impl IntoIterator<Item = RegionId>) -> Self {
        self.depends_on = regions.into_iter().collect();
        self
    }

    pub fn with_neuron_params(mut self, params: NeuronParams) -> Self {
        self.neuron_params = Some(params);
        self
    }

    pub fn without_plasticity(mut self) -> Self {
        self.plasticity_enabled = false;
        self
    }
}

/// Static description of an existing region (snapshots, introspection)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionLayout {
    pub id: RegionId,
    pub name: String,
    pub region_type: RegionType,
    pub processing_mode: ProcessingMode,
    pub plasticity_enabled: bool,
    pub depends_on: Vec<RegionId>,
    pub neurons: Vec<NeuronId>,
    pub layers: Vec<Vec<NeuronId>>,
}

/// Running statistics, refreshed at the end of every region step
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegionStats {
    pub neuron_count: usize,
    pub fired_count: usize,
    pub mean_activation: f32,
    pub total_activation: f64,
    pub local_synapses: usize,
    pub incoming_boundary: usize,
    pub outgoing_boundary: usize,
    pub estimated_memory_bytes: usize,
    pub last_step: Option<u64>,
    pub last_duration_us: u64,
}

/// What one region step produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionStepReport {
    pub region: RegionId,
    pub fired: usize,
    pub total_activation: f64,
}

/// Synapse views of one region for one topology version
#[derive(Debug, Default)]
pub struct RegionViews {
    pub version: u64,

    /// Neuron slots owned by the region, in membership order
    pub members: Vec<usize>,

    /// Valid synapse slots whose target is owned by the region
    /// (local + incoming boundary), grouped by target in member order
    pub afferent: Vec<usize>,

    /// Member positions per layer
    pub layers: Vec<Vec<usize>>,

    pub local: usize,
    pub incoming_boundary: usize,
    pub outgoing_boundary: usize,

    efferent_offsets: Vec<usize>,
    efferent: Vec<usize>,
}

impl RegionViews {
    fn build(region: &Region, topology: &Topology) -> Self {
        let neurons = topology.neurons();
        let synapses = topology.synapses();
        let owns = |id: NeuronId| neurons.get(id).is_some_and(|n| n.region == region.id);

        let members: Vec<usize> = region
            .neurons
            .iter()
            .filter(|id| neurons.is_valid(**id))
            .map(|id| id.index())
            .collect();

        let mut views = RegionViews {
            version: topology.version(),
            efferent_offsets: Vec::with_capacity(members.len() + 1),
            ..Default::default()
        };

        for &slot in &members {
            let id = NeuronId(slot as u64);
            for &syn_slot in synapses.incoming(id) {
                if let Some(synapse) = synapses.get_index(syn_slot) {
                    views.afferent.push(syn_slot);
                    if owns(synapse.source) {
                        views.local += 1;
                    } else {
                        views.incoming_boundary += 1;
                    }
                }
            }
            views.efferent_offsets.push(views.efferent.len());
            for &syn_slot in synapses.outgoing(id) {
                if let Some(synapse) = synapses.get_index(syn_slot) {
                    views.efferent.push(syn_slot);
                    if !owns(synapse.target) {
                        views.outgoing_boundary += 1;
                    }
                }
            }
        }
        views.efferent_offsets.push(views.efferent.len());

        let position: AHashMap<usize, usize> = members
            .iter()
            .enumerate()
            .map(|(pos, &slot)| (slot, pos))
            .collect();
        let mut covered = vec![false; members.len()];
        for layer in &region.layers {
            let positions: Vec<usize> = layer
                .iter()
                .filter_map(|id| position.get(&id.index()).copied())
                .filter(|&pos| !std::mem::replace(&mut covered[pos], true))
                .collect();
            if !positions.is_empty() {
                views.layers.push(positions);
            }
        }
        // Members outside every declared layer form a trailing layer
        let rest: Vec<usize> = (0..members.len()).filter(|&pos| !covered[pos]).collect();
        if !rest.is_empty() {
            views.layers.push(rest);
        }

        views.members = members;
        views
    }

    /// Efferent synapse slots of the member at `position`
    pub fn efferent_of(&self, position: usize) -> &[usize] {
        match (
            self.efferent_offsets.get(position),
            self.efferent_offsets.get(position + 1),
        ) {
            (Some(&start), Some(&end)) => &self.efferent[start..end],
            _ => &[],
        }
    }

    pub fn efferent_count(&self) -> usize {
        self.efferent.len()
    }

    /// Bytes held by the cached index vectors
    pub fn index_bytes(&self) -> usize {
        let slots = self.members.len()
            + self.afferent.len()
            + self.efferent.len()
            + self.efferent_offsets.len()
            + self.layers.iter().map(Vec::len).sum::<usize>();
        slots * std::mem::size_of::<usize>()
    }
}

/// Named group of neurons advanced together
#[derive(Debug)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub region_type: RegionType,
    pub processing_mode: ProcessingMode,
    pub plasticity_enabled: bool,
    pub depends_on: Vec<RegionId>,

    pub(crate) neurons: Vec<NeuronId>,
    pub(crate) layers: Vec<Vec<NeuronId>>,

    views: RwLock<Option<Arc<RegionViews>>>,
    stats: Mutex<RegionStats>,
}

impl Region {
    pub(crate) fn new(id: RegionId, spec: &RegionSpec) -> Self {
        Self {
            id,
            name: spec.name.clone(),
            region_type: spec.region_type,
            processing_mode: spec
                .processing_mode
                .unwrap_or_else(|| spec.region_type.default_mode()),
            plasticity_enabled: spec.plasticity_enabled,
            depends_on: spec.depends_on.clone(),
            neurons: Vec::with_capacity(spec.neuron_count),
            layers: Vec::new(),
            views: RwLock::new(None),
            stats: Mutex::new(RegionStats::default()),
        }
    }

    pub fn from_layout(layout: RegionLayout) -> Self {
        Self {
            id: layout.id,
            name: layout.name,
            region_type: layout.region_type,
            processing_mode: layout.processing_mode,
            plasticity_enabled: layout.plasticity_enabled,
            depends_on: layout.depends_on,
            neurons: layout.neurons,
            layers: layout.layers,
            views: RwLock::new(None),
            stats: Mutex::new(RegionStats::default()),
        }
    }

    pub fn layout(&self) -> RegionLayout {
        RegionLayout {
            id: self.id,
            name: self.name.clone(),
            region_type: self.region_type,
            processing_mode: self.processing_mode,
            plasticity_enabled: self.plasticity_enabled,
            depends_on: self.depends_on.clone(),
            neurons: self.neurons.clone(),
            layers: self.layers.clone(),
        }
    }

    pub fn neurons(&self) -> &[NeuronId] {
        &self.neurons
    }

    pub fn layers(&self) -> &[Vec<NeuronId>] {
        &self.layers
    }

    pub fn stats(&self) -> RegionStats {
        self.stats.lock().clone()
    }

    /// Cached views for the current topology version, rebuilt if stale
    pub fn views(&self, topology: &Topology) -> Arc<RegionViews> {
        let version = topology.version();
        if let Some(views) = self.views.read().as_ref() {
            if views.version == version {
                return Arc::clone(views);
            }
        }
        let mut guard = self.views.write();
        if let Some(views) = guard.as_ref() {
            if views.version == version {
                return Arc::clone(views);
            }
        }
        let views = Arc::new(RegionViews::build(self, topology));
        *guard = Some(Arc::clone(&views));
        views
    }

    /// Run one step: flush, advance, propagate, stats
    pub fn step(
        &self,
        topology: &Topology,
        step: u64,
        dt: f32,
        backend: &OffloadPath,
    ) -> RegionStepReport {
        let start = Instant::now();
        let views = self.views(topology);
        let neurons = topology.neurons();
        let synapses = topology.synapses();

        // 1. flush
        for &slot in &views.afferent {
            if let Some(synapse) = synapses.get_index(slot) {
                if let Some(signal) = synapse.flush(step) {
                    if let Some(target) = neurons.get(synapse.target) {
                        target.receive_input(signal);
                    }
                }
            }
        }

        // 2. advance
        let mut gain = topology.neuron_params().input_gain;
        if let ProcessingMode::Oscillatory {
            amplitude,
            frequency,
            phase,
        } = self.processing_mode
        {
            gain *= oscillation_gain(step, dt, amplitude, frequency, phase);
        }

        let all: Vec<usize> = (0..views.members.len()).collect();
        let fired = match self.processing_mode {
            ProcessingMode::Synchronous | ProcessingMode::Oscillatory { .. } => {
                self.advance_batch(topology, &views, &all, step, dt, gain, backend)
            }
            ProcessingMode::Layered => {
                let mut fired = Vec::new();
                for layer in &views.layers {
                    fired.extend(self.advance_batch(topology, &views, layer, step, dt, gain, backend));
                }
                fired
            }
            ProcessingMode::Competitive { k, inhibition } => {
                self.advance_competitive(topology, &views, step, dt, gain, k, inhibition, backend)
            }
            ProcessingMode::Asynchronous => self.advance_async(topology, &views, step, dt, gain),
        };

        // 3. propagate (asynchronous regions propagate as they go)
        if self.processing_mode != ProcessingMode::Asynchronous {
            for &position in &fired {
                propagate_from(topology, &views, position, step);
            }
        }

        // 4. stats
        let total_activation: f64 = views
            .members
            .iter()
            .filter_map(|&slot| neurons.get_index(slot))
            .map(|n| n.activation() as f64)
            .sum();
        let count = views.members.len();
        let elapsed = start.elapsed();
        {
            let mut stats = self.stats.lock();
            stats.neuron_count = count;
            stats.fired_count = fired.len();
            stats.total_activation = total_activation;
            stats.mean_activation = if count > 0 {
                (total_activation / count as f64) as f32
            } else {
                0.0
            };
            stats.local_synapses = views.local;
            stats.incoming_boundary = views.incoming_boundary;
            stats.outgoing_boundary = views.outgoing_boundary;
            stats.estimated_memory_bytes = count * std::mem::size_of::<Neuron>()
                + views.afferent.len()
                    * std::mem::size_of::<hypergraph_npu_neural::Synapse>()
                + views.index_bytes();
            stats.last_step = Some(step);
            stats.last_duration_us = elapsed.as_micros() as u64;
        }
        trace!(
            "Region {} step {}: {} fired in {:?}",
            self.name,
            step,
            fired.len(),
            elapsed
        );

        RegionStepReport {
            region: self.id,
            fired: fired.len(),
            total_activation,
        }
    }

    /// Gather the batch, run the leaky kernel, return next activations
    fn integrate_batch<'a>(
        topology: &'a Topology,
        views: &RegionViews,
        positions: &[usize],
        dt: f32,
        gain: f32,
        backend: &OffloadPath,
    ) -> (Vec<(usize, &'a Neuron)>, Vec<f32>) {
        let neurons = topology.neurons();
        let members: Vec<(usize, &Neuron)> = positions
            .iter()
            .filter_map(|&pos| neurons.get_index(views.members[pos]).map(|n| (pos, n)))
            .collect();

        let mut activations = Vec::with_capacity(members.len());
        let mut inputs = Vec::with_capacity(members.len());
        let mut decay_rates = Vec::with_capacity(members.len());
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for (_, neuron) in &members {
            activations.push(neuron.activation());
            inputs.push(neuron.take_input() * gain);
            decay_rates.push(neuron.decay_rate);
            min = min.min(neuron.activation_min);
            max = max.max(neuron.activation_max);
        }
        if members.is_empty() {
            return (members, Vec::new());
        }

        // Outer bounds here; commit() clamps to each neuron's own range
        let next = backend.leaky_integrate(&LeakyBatch {
            activations: &activations,
            inputs: &inputs,
            decay_rates: &decay_rates,
            dt,
            min,
            max,
        });
        (members, next)
    }

    #[allow(clippy::too_many_arguments)]
    fn advance_batch(
        &self,
        topology: &Topology,
        views: &RegionViews,
        positions: &[usize],
        step: u64,
        dt: f32,
        gain: f32,
        backend: &OffloadPath,
    ) -> Vec<usize> {
        let (members, next) = Self::integrate_batch(topology, views, positions, dt, gain, backend);
        members
            .iter()
            .zip(next)
            .filter_map(|(&(pos, neuron), activation)| {
                neuron.commit(step, activation, false).then_some(pos)
            })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn advance_competitive(
        &self,
        topology: &Topology,
        views: &RegionViews,
        step: u64,
        dt: f32,
        gain: f32,
        k: usize,
        inhibition: f32,
        backend: &OffloadPath,
    ) -> Vec<usize> {
        let all: Vec<usize> = (0..views.members.len()).collect();
        let (members, next) = Self::integrate_batch(topology, views, &all, dt, gain, backend);

        // Rank by activation, ties broken by membership order
        let mut ranking: Vec<usize> = (0..members.len()).collect();
        ranking.sort_by(|&a, &b| next[b].total_cmp(&next[a]).then(a.cmp(&b)));
        let mut winner = vec![false; members.len()];
        for &i in ranking.iter().take(k) {
            winner[i] = true;
        }

        let keep = (1.0 - inhibition).clamp(0.0, 1.0);
        let mut fired = Vec::new();
        for (i, &(pos, neuron)) in members.iter().enumerate() {
            if winner[i] {
                if neuron.commit(step, next[i], false) {
                    fired.push(pos);
                }
            } else {
                neuron.commit(step, next[i] * keep, true);
            }
        }
        fired
    }

    fn advance_async(
        &self,
        topology: &Topology,
        views: &RegionViews,
        step: u64,
        dt: f32,
        gain: f32,
    ) -> Vec<usize> {
        let neurons = topology.neurons();
        let mut order: Vec<usize> = (0..views.members.len()).collect();
        let seed = (self.id.0 as u64) << 40 ^ step;
        order.shuffle(&mut StdRng::seed_from_u64(seed));

        let mut fired = Vec::new();
        for pos in order {
            let Some(neuron) = neurons.get_index(views.members[pos]) else {
                continue;
            };
            if neuron.integrate(step, dt, gain) {
                propagate_from(topology, views, pos, step);
                fired.push(pos);
            }
        }
        fired
    }
}

fn propagate_from(topology: &Topology, views: &RegionViews, position: usize, step: u64) {
    let synapses = topology.synapses();
    for &slot in views.efferent_of(position) {
        if let Some(synapse) = synapses.get_index(slot) {
            synapse.propagate(1.0, step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypergraph_npu_accelerator::{BackendResult, ComputeBackend, CpuBackend};
    use hypergraph_npu_neural::{MetabolismParams, NeuronState, PlasticityRule, StdpParams, SynapseParams};

    fn topology_with(mode: ProcessingMode, count: usize) -> (Topology, RegionId) {
        let mut topology = Topology::new(NeuronParams::default(), SynapseParams::default());
        let region = topology
            .add_region(RegionSpec::new("r", RegionType::Custom, count).with_mode(mode))
            .unwrap();
        (topology, region)
    }

    #[test]
    fn test_signal_respects_delay() {
        let (mut topology, region) = topology_with(ProcessingMode::Synchronous, 2);
        let ids = topology.region(region).unwrap().neurons().to_vec();
        topology
            .create_synapse(ids[0], ids[1], 1.0, PlasticityRule::Static, Some(2))
            .unwrap();
        let backend = OffloadPath::cpu_only();

        topology.neuron(ids[0]).unwrap().receive_input(1.0);
        let region = topology.region(region).unwrap();
        let report = region.step(&topology, 0, 1.0, &backend);
        assert_eq!(report.fired, 1);

        // Spike emitted at step 0 with delay 2 arrives at step 2
        region.step(&topology, 1, 1.0, &backend);
        assert_eq!(topology.neuron(ids[1]).unwrap().activation(), 0.0);
        let report = region.step(&topology, 2, 1.0, &backend);
        assert_eq!(report.fired, 1);
        assert_eq!(topology.neuron(ids[1]).unwrap().last_fire_time(), Some(2));
    }

    #[test]
    fn test_competitive_inhibits_losers() {
        let (topology, region) = topology_with(
            ProcessingMode::Competitive {
                k: 1,
                inhibition: 0.5,
            },
            3,
        );
        let region = topology.region(region).unwrap();
        let ids = region.neurons().to_vec();
        topology.neuron(ids[0]).unwrap().receive_input(0.4);
        topology.neuron(ids[1]).unwrap().receive_input(0.9);
        topology.neuron(ids[2]).unwrap().receive_input(0.3);

        let report = region.step(&topology, 0, 1.0, &OffloadPath::cpu_only());
        assert_eq!(report.fired, 1);
        assert_eq!(topology.neuron(ids[1]).unwrap().last_fire_time(), Some(0));
        let loser = topology.neuron(ids[0]).unwrap();
        assert_eq!(loser.state(), NeuronState::Inhibited);
        assert!((loser.activation() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_async_matches_sync_activation() {
        let (sync_topology, sync_region) = topology_with(ProcessingMode::Synchronous, 16);
        let (async_topology, async_region) = topology_with(ProcessingMode::Asynchronous, 16);
        for (topology, region) in [(&sync_topology, sync_region), (&async_topology, async_region)] {
            for (i, id) in topology.region(region).unwrap().neurons().iter().enumerate() {
                topology.neuron(*id).unwrap().receive_input(i as f32 / 16.0);
            }
        }
        let backend = OffloadPath::cpu_only();
        let a = sync_topology
            .region(sync_region)
            .unwrap()
            .step(&sync_topology, 0, 1.0, &backend);
        let b = async_topology
            .region(async_region)
            .unwrap()
            .step(&async_topology, 0, 1.0, &backend);
        assert_eq!(a.fired, b.fired);
        assert_eq!(a.total_activation, b.total_activation);
    }

    #[test]
    fn test_views_rebuild_after_mutation() {
        let (mut topology, region) = topology_with(ProcessingMode::Synchronous, 3);
        let ids = topology.region(region).unwrap().neurons().to_vec();
        let before = topology.region(region).unwrap().views(&topology);
        assert!(before.afferent.is_empty());

        topology
            .create_synapse(ids[0], ids[1], 0.5, PlasticityRule::Hebbian, None)
            .unwrap();
        let after = topology.region(region).unwrap().views(&topology);
        assert_eq!(after.afferent.len(), 1);
        assert_eq!(after.local, 1);
        assert_eq!(after.efferent_of(0).len(), 1);
        assert!(after.version > before.version);
    }

    #[test]
    fn test_layers_cover_all_members() {
        let mut topology = Topology::new(NeuronParams::default(), SynapseParams::default());
        let region = topology
            .add_region(
                RegionSpec::new("cortex", RegionType::Cortical, 5).with_layers(vec![2, 2]),
            )
            .unwrap();
        let views = topology.region(region).unwrap().views(&topology);
        assert_eq!(views.layers, vec![vec![0, 1], vec![2, 3], vec![4]]);
    }

    struct CountingBackend(Arc<std::sync::atomic::AtomicUsize>);

    impl ComputeBackend for CountingBackend {
        fn backend_name(&self) -> &str {
            "counting"
        }
        fn compute_hebbian(&self, pre: &[f32], post: &[f32], rate: f32) -> BackendResult<Vec<f32>> {
            Ok(CpuBackend::hebbian(pre, post, rate))
        }
        fn compute_spike_rule(&self, dt: &[f32], params: &StdpParams) -> BackendResult<Vec<f32>> {
            Ok(CpuBackend::spike_rule(dt, params))
        }
        fn compute_leaky_integrate(&self, batch: &LeakyBatch<'_>) -> BackendResult<Vec<f32>> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            Ok(CpuBackend::leaky(batch))
        }
        fn compute_homeostatic_energy(
            &self,
            energy: &[f32],
            health: &[f32],
            fired: &[u32],
            params: &MetabolismParams,
        ) -> BackendResult<(Vec<f32>, Vec<f32>)> {
            Ok(CpuBackend::energy(energy, health, fired, params))
        }
    }

    #[test]
    fn test_layered_batches_per_layer_and_matches_sync() {
        let mut outcomes = Vec::new();
        for mode in [ProcessingMode::Layered, ProcessingMode::Synchronous] {
            let mut topology = Topology::new(NeuronParams::default(), SynapseParams::default());
            let region = topology
                .add_region(
                    RegionSpec::new("cortex", RegionType::Cortical, 5)
                        .with_layers(vec![2, 2])
                        .with_mode(mode),
                )
                .unwrap();
            let ids = topology.region(region).unwrap().neurons().to_vec();
            // Feed layer 0 into layer 1 with the shortest delay allowed
            topology
                .create_synapse(ids[0], ids[2], 1.0, PlasticityRule::Static, Some(1))
                .unwrap();
            topology.neuron(ids[0]).unwrap().receive_input(1.0);
            topology.neuron(ids[4]).unwrap().receive_input(0.3);

            let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
            let backend = OffloadPath::new(Box::new(CountingBackend(Arc::clone(&calls))));
            let region = topology.region(region).unwrap();
            let first = region.step(&topology, 0, 1.0, &backend);
            let second = region.step(&topology, 1, 1.0, &backend);
            assert_eq!(backend.fallback_count(), 0);
            outcomes.push((
                calls.load(std::sync::atomic::Ordering::Relaxed),
                first,
                second,
                topology.neuron(ids[2]).unwrap().last_fire_time(),
            ));
        }

        let (layered_calls, layered_first, layered_second, layered_fire) = outcomes[0];
        let (sync_calls, sync_first, sync_second, sync_fire) = outcomes[1];
        // Three layers per step against one batch per step
        assert_eq!(layered_calls, 6);
        assert_eq!(sync_calls, 2);
        assert_eq!(layered_first.fired, 1);
        assert_eq!(layered_first.fired, sync_first.fired);
        assert_eq!(layered_first.total_activation, sync_first.total_activation);
        assert_eq!(layered_second.fired, sync_second.fired);
        assert_eq!(layered_second.total_activation, sync_second.total_activation);
        // The layer-1 target only hears layer 0 on the following step
        assert_eq!(layered_fire, Some(1));
        assert_eq!(layered_fire, sync_fire);
    }
}
