// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Topology: neuron/synapse registries, regions, and the synapse factory.
//!
//! Every structural mutation goes through `&mut Topology` and bumps
//! [`Topology::version`], which invalidates the region view caches.

use std::collections::BTreeMap;

use hypergraph_npu_neural::{
    Neuron, NeuronId, NeuronParams, PlasticityRule, RegionId, Synapse, SynapseId, SynapseParams,
    WeightBounds,
};
use tracing::debug;

use crate::error::{TopologyError, TopologyResult};
use crate::neuron_array::NeuronArray;
use crate::region::{ProcessingMode, Region, RegionLayout, RegionSpec};
use crate::synapse_array::SynapseArray;

#[derive(Debug)]
pub struct Topology {
    neuron_params: NeuronParams,
    synapse_params: SynapseParams,
    neurons: NeuronArray,
    synapses: SynapseArray,
    regions: BTreeMap<RegionId, Region>,
    next_region: u32,
    version: u64,
}

impl Topology {
    pub fn new(neuron_params: NeuronParams, synapse_params: SynapseParams) -> Self {
        Self {
            neuron_params,
            synapse_params,
            neurons: NeuronArray::default(),
            synapses: SynapseArray::default(),
            regions: BTreeMap::new(),
            next_region: 0,
            version: 0,
        }
    }

    /// Rebuild from snapshot parts. Slot ids must be dense and in order.
    pub fn from_parts(
        neuron_params: NeuronParams,
        synapse_params: SynapseParams,
        neurons: Vec<(Neuron, bool)>,
        synapses: Vec<(Synapse, bool)>,
        regions: Vec<RegionLayout>,
    ) -> TopologyResult<Self> {
        let mut topology = Self::new(neuron_params, synapse_params);
        topology.neurons = NeuronArray::with_capacity(neurons.len());
        for (neuron, valid) in neurons {
            let id = neuron.id;
            if !topology.neurons.push_restored(neuron, valid) {
                return Err(TopologyError::Invalid(format!("neuron {} out of order", id)));
            }
        }
        topology.synapses = SynapseArray::with_capacity(synapses.len());
        for (synapse, valid) in synapses {
            let id = synapse.id;
            let in_range = synapse.source.index() < topology.neurons.capacity_used()
                && synapse.target.index() < topology.neurons.capacity_used();
            if !in_range || !topology.synapses.insert_slot(synapse, valid) {
                return Err(TopologyError::Invalid(format!(
                    "synapse {} out of order or out of range",
                    id
                )));
            }
        }
        for layout in regions {
            if let Some(missing) = layout
                .neurons
                .iter()
                .find(|id| id.index() >= topology.neurons.capacity_used())
            {
                return Err(TopologyError::DanglingNeuron(*missing));
            }
            topology.next_region = topology.next_region.max(layout.id.0 + 1);
            topology.regions.insert(layout.id, Region::from_layout(layout));
        }
        Ok(topology)
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    fn bump(&mut self) {
        self.version += 1;
    }

    pub fn neuron_params(&self) -> &NeuronParams {
        &self.neuron_params
    }

    pub fn synapse_params(&self) -> &SynapseParams {
        &self.synapse_params
    }

    pub fn weight_bounds(&self) -> WeightBounds {
        self.synapse_params.bounds()
    }

    pub fn neurons(&self) -> &NeuronArray {
        &self.neurons
    }

    pub fn synapses(&self) -> &SynapseArray {
        &self.synapses
    }

    #[inline]
    pub fn neuron(&self, id: NeuronId) -> Option<&Neuron> {
        self.neurons.get(id)
    }

    #[inline]
    pub fn synapse(&self, id: SynapseId) -> Option<&Synapse> {
        self.synapses.get(id)
    }

    pub fn neuron_count(&self) -> usize {
        self.neurons.len()
    }

    pub fn synapse_count(&self) -> usize {
        self.synapses.len()
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(&id)
    }

    /// Regions in id order
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn region_ids(&self) -> Vec<RegionId> {
        self.regions.keys().copied().collect()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn region_of(&self, neuron: NeuronId) -> Option<RegionId> {
        self.neurons.get(neuron).map(|n| n.region)
    }

    /// Create a region and its neurons
    pub fn add_region(&mut self, spec: RegionSpec) -> TopologyResult<RegionId> {
        if !spec.positions.is_empty() && spec.positions.len() != spec.neuron_count {
            return Err(TopologyError::Invalid(format!(
                "region '{}' declares {} positions for {} neurons",
                spec.name,
                spec.positions.len(),
                spec.neuron_count
            )));
        }
        if spec.layer_sizes.iter().sum::<usize>() > spec.neuron_count {
            return Err(TopologyError::Invalid(format!(
                "region '{}' layers exceed its {} neurons",
                spec.name, spec.neuron_count
            )));
        }

        let id = RegionId(self.next_region);
        self.next_region += 1;

        let params = spec.neuron_params.unwrap_or(self.neuron_params);
        let mut region = Region::new(id, &spec);
        for i in 0..spec.neuron_count {
            let position = spec.positions.get(i).copied();
            region.neurons.push(self.neurons.push(id, &params, position));
        }

        let mut start = 0;
        for &size in &spec.layer_sizes {
            region.layers.push(region.neurons[start..start + size].to_vec());
            start += size;
        }

        debug!(
            "Created region {} '{}' ({:?}, {} neurons, {:?})",
            id, spec.name, spec.region_type, spec.neuron_count, region.processing_mode
        );
        self.regions.insert(id, region);
        self.bump();
        Ok(id)
    }

    /// Append one neuron to an existing region (last layer if layered)
    pub fn add_neuron(
        &mut self,
        region: RegionId,
        position: Option<[f32; 3]>,
    ) -> TopologyResult<NeuronId> {
        let region = self
            .regions
            .get_mut(&region)
            .ok_or(TopologyError::UnknownRegion(region))?;
        let id = self.neurons.push(region.id, &self.neuron_params, position);
        region.neurons.push(id);
        if let Some(last) = region.layers.last_mut() {
            last.push(id);
        }
        self.version += 1;
        Ok(id)
    }

    /// Tombstone a neuron and drop it from its region.
    ///
    /// Synapses that reference it are left in place; learning flags them and
    /// the next structural pass prunes them.
    pub fn remove_neuron(&mut self, id: NeuronId) -> TopologyResult<()> {
        let region_id = self.region_of(id).ok_or(TopologyError::DanglingNeuron(id))?;
        self.neurons.remove(id);
        if let Some(region) = self.regions.get_mut(&region_id) {
            region.neurons.retain(|&n| n != id);
            for layer in &mut region.layers {
                layer.retain(|&n| n != id);
            }
        }
        self.bump();
        Ok(())
    }

    /// Synapse factory: assigns the id, checks both endpoints and the pair,
    /// and invalidates view caches.
    ///
    /// `delay` defaults to the configured delay plus the source region type's
    /// offset.
    pub fn create_synapse(
        &mut self,
        source: NeuronId,
        target: NeuronId,
        weight: f32,
        rule: PlasticityRule,
        delay: Option<u32>,
    ) -> TopologyResult<SynapseId> {
        let source_region = self
            .region_of(source)
            .ok_or(TopologyError::DanglingNeuron(source))?;
        if !self.neurons.is_valid(target) {
            return Err(TopologyError::DanglingNeuron(target));
        }
        if self.synapses.contains_pair(source, target) {
            return Err(TopologyError::DuplicateSynapse {
                pre: source,
                post: target,
            });
        }

        let delay = delay.unwrap_or_else(|| {
            let offset = self
                .regions
                .get(&source_region)
                .map_or(0, |r| r.region_type.delay_offset());
            self.synapse_params.default_delay + offset
        });
        let id = self.synapses.next_id();
        let synapse = Synapse::new(id, source, target, weight, rule, delay, self.weight_bounds());
        if !self.synapses.insert(synapse) {
            return Err(TopologyError::DuplicateSynapse {
                pre: source,
                post: target,
            });
        }
        self.bump();
        Ok(id)
    }

    pub fn prune_synapse(&mut self, id: SynapseId) -> TopologyResult<()> {
        if !self.synapses.remove(id) {
            return Err(TopologyError::UnknownSynapse(id));
        }
        self.bump();
        Ok(())
    }

    /// Prune many synapses with a single cache invalidation. Returns how many
    /// were removed.
    pub fn prune_synapses(&mut self, ids: &[SynapseId]) -> usize {
        let removed = ids.iter().filter(|&&id| self.synapses.remove(id)).count();
        if removed > 0 {
            self.bump();
        }
        removed
    }

    fn region_mut(&mut self, id: RegionId) -> TopologyResult<&mut Region> {
        self.regions
            .get_mut(&id)
            .ok_or(TopologyError::UnknownRegion(id))
    }

    pub fn set_processing_mode(&mut self, id: RegionId, mode: ProcessingMode) -> TopologyResult<()> {
        self.region_mut(id)?.processing_mode = mode;
        Ok(())
    }

    pub fn set_plasticity_enabled(&mut self, id: RegionId, enabled: bool) -> TopologyResult<()> {
        self.region_mut(id)?.plasticity_enabled = enabled;
        Ok(())
    }

    pub fn set_depends_on(&mut self, id: RegionId, depends_on: Vec<RegionId>) -> TopologyResult<()> {
        if let Some(unknown) = depends_on.iter().find(|r| !self.regions.contains_key(r)) {
            return Err(TopologyError::UnknownRegion(*unknown));
        }
        self.region_mut(id)?.depends_on = depends_on;
        Ok(())
    }

    /// Replace the declared layers; neurons must belong to the region
    pub fn set_layers(&mut self, id: RegionId, layers: Vec<Vec<NeuronId>>) -> TopologyResult<()> {
        if let Some(foreign) = layers
            .iter()
            .flatten()
            .find(|n| self.region_of(**n) != Some(id))
        {
            return Err(TopologyError::Invalid(format!(
                "neuron {} is not owned by region {}",
                foreign, id
            )));
        }
        self.region_mut(id)?.layers = layers;
        self.bump();
        Ok(())
    }

    /// Registry slots (tombstones included) plus every region's cached
    /// indexes. Queued delay-buffer signals are not counted.
    pub fn estimated_memory_bytes(&self) -> usize {
        let registries = self.neurons.capacity_used() * std::mem::size_of::<Neuron>()
            + self.synapses.capacity_used() * std::mem::size_of::<Synapse>();
        let indexes: usize = self
            .regions
            .values()
            .map(|region| region.views(self).index_bytes())
            .sum();
        registries + indexes
    }

    /// Build every region's views now instead of on the first step
    pub fn warm_views(&self) {
        for region in self.regions.values() {
            region.views(self);
        }
    }

    /// Clear transient dynamics (activations, queued signals, traces);
    /// weights and structure are kept
    pub fn reset_dynamics(&self) {
        for neuron in self.neurons.iter_valid() {
            neuron.reset_dynamics(self.neuron_params.initial_bcm_theta);
        }
        for synapse in self.synapses.iter_valid() {
            synapse.clear_pending();
            synapse.set_eligibility(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RegionType;

    fn two_regions() -> (Topology, RegionId, RegionId) {
        let mut topology = Topology::new(NeuronParams::default(), SynapseParams::default());
        let a = topology
            .add_region(RegionSpec::new("a", RegionType::Cortical, 3))
            .unwrap();
        let b = topology
            .add_region(RegionSpec::new("b", RegionType::Subcortical, 3))
            .unwrap();
        (topology, a, b)
    }

    #[test]
    fn test_duplicate_and_dangling_are_rejected() {
        let (mut topology, a, b) = two_regions();
        let pre = topology.region(a).unwrap().neurons()[0];
        let post = topology.region(b).unwrap().neurons()[0];

        topology
            .create_synapse(pre, post, 0.5, PlasticityRule::Hebbian, None)
            .unwrap();
        assert_eq!(
            topology.create_synapse(pre, post, 0.5, PlasticityRule::Hebbian, None),
            Err(TopologyError::DuplicateSynapse { pre, post })
        );
        assert_eq!(
            topology.create_synapse(pre, NeuronId(999), 0.5, PlasticityRule::Hebbian, None),
            Err(TopologyError::DanglingNeuron(NeuronId(999)))
        );
        assert_eq!(topology.synapse_count(), 1);
    }

    #[test]
    fn test_default_delay_uses_region_type() {
        let (mut topology, a, b) = two_regions();
        let cortical = topology.region(a).unwrap().neurons()[0];
        let subcortical = topology.region(b).unwrap().neurons()[0];
        let s1 = topology
            .create_synapse(cortical, subcortical, 0.5, PlasticityRule::Hebbian, None)
            .unwrap();
        let s2 = topology
            .create_synapse(subcortical, cortical, 0.5, PlasticityRule::Hebbian, None)
            .unwrap();
        let s3 = topology
            .create_synapse(subcortical, cortical, 0.5, PlasticityRule::Hebbian, Some(0))
            .unwrap_err();
        assert_eq!(topology.synapse(s1).unwrap().delay, 1);
        assert_eq!(topology.synapse(s2).unwrap().delay, 2);
        assert!(matches!(s3, TopologyError::DuplicateSynapse { .. }));
    }

    #[test]
    fn test_remove_neuron_updates_region() {
        let (mut topology, a, _) = two_regions();
        let victim = topology.region(a).unwrap().neurons()[1];
        topology.remove_neuron(victim).unwrap();
        assert!(!topology.region(a).unwrap().neurons().contains(&victim));
        assert!(topology.neuron(victim).is_none());
        assert_eq!(topology.neuron_count(), 5);
        assert!(topology.remove_neuron(victim).is_err());
    }

    #[test]
    fn test_unknown_region() {
        let (mut topology, _, _) = two_regions();
        assert_eq!(
            topology.add_neuron(RegionId(42), None),
            Err(TopologyError::UnknownRegion(RegionId(42)))
        );
        assert!(topology.set_depends_on(RegionId(0), vec![RegionId(9)]).is_err());
    }

    #[test]
    fn test_memory_estimate_grows_with_structure() {
        let empty = Topology::new(NeuronParams::default(), SynapseParams::default());
        assert_eq!(empty.estimated_memory_bytes(), 0);

        let (mut topology, a, b) = two_regions();
        let neurons_only = topology.estimated_memory_bytes();
        assert!(neurons_only >= 6 * std::mem::size_of::<Neuron>());

        let pre = topology.region(a).unwrap().neurons()[0];
        let post = topology.region(b).unwrap().neurons()[0];
        topology
            .create_synapse(pre, post, 0.5, PlasticityRule::Hebbian, None)
            .unwrap();
        assert!(topology.estimated_memory_bytes() >= neurons_only + std::mem::size_of::<Synapse>());
    }
}
