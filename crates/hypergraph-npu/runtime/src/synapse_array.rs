// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Dense synapse registry
//!
//! Uses `Vec` for storage and `AHashMap` indexes for fast source/target
//! lookups. Pruned synapses are tombstoned; their slots are not reused.

use ahash::{AHashMap, AHashSet};
use hypergraph_npu_neural::{NeuronId, Synapse, SynapseId};

#[derive(Debug, Default)]
pub struct SynapseArray {
    synapses: Vec<Synapse>,

    /// Valid synapse mask
    valid_mask: Vec<bool>,

    valid_count: usize,

    /// Source index for fast lookup (slot indices, ascending)
    source_index: AHashMap<NeuronId, Vec<usize>>,

    /// Target index for fast lookup (slot indices, ascending)
    target_index: AHashMap<NeuronId, Vec<usize>>,

    /// Live (source, target) pairs
    pairs: AHashSet<(NeuronId, NeuronId)>,
}

impl SynapseArray {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            synapses: Vec::with_capacity(capacity),
            valid_mask: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Next id that `insert` will assign
    pub fn next_id(&self) -> SynapseId {
        SynapseId(self.synapses.len() as u64)
    }

    /// Store a synapse built with `next_id()`. Returns false on a duplicate pair
    /// or an id that is not the next slot.
    pub fn insert(&mut self, synapse: Synapse) -> bool {
        self.insert_slot(synapse, true)
    }

    pub(crate) fn insert_slot(&mut self, synapse: Synapse, valid: bool) -> bool {
        if synapse.id.index() != self.synapses.len() {
            return false;
        }
        let pair = (synapse.source, synapse.target);
        if valid && !self.pairs.insert(pair) {
            return false;
        }
        let slot = self.synapses.len();
        if valid {
            self.source_index.entry(pair.0).or_default().push(slot);
            self.target_index.entry(pair.1).or_default().push(slot);
            self.valid_count += 1;
        }
        self.synapses.push(synapse);
        self.valid_mask.push(valid);
        true
    }

    /// Tombstone a synapse and drop it from the indexes
    pub fn remove(&mut self, id: SynapseId) -> bool {
        let slot = id.index();
        match self.valid_mask.get_mut(slot) {
            Some(valid) if *valid => *valid = false,
            _ => return false,
        }
        let synapse = &self.synapses[slot];
        let (source, target) = (synapse.source, synapse.target);
        synapse.clear_pending();
        self.pairs.remove(&(source, target));
        if let Some(slots) = self.source_index.get_mut(&source) {
            slots.retain(|&s| s != slot);
        }
        if let Some(slots) = self.target_index.get_mut(&target) {
            slots.retain(|&s| s != slot);
        }
        self.valid_count -= 1;
        true
    }

    #[inline]
    pub fn get(&self, id: SynapseId) -> Option<&Synapse> {
        self.get_index(id.index())
    }

    #[inline]
    pub fn get_index(&self, slot: usize) -> Option<&Synapse> {
        match self.valid_mask.get(slot) {
            Some(true) => self.synapses.get(slot),
            _ => None,
        }
    }

    pub fn contains_pair(&self, source: NeuronId, target: NeuronId) -> bool {
        self.pairs.contains(&(source, target))
    }

    /// Slots of valid synapses leaving `neuron`
    pub fn outgoing(&self, neuron: NeuronId) -> &[usize] {
        self.source_index.get(&neuron).map_or(&[], Vec::as_slice)
    }

    /// Slots of valid synapses entering `neuron`
    pub fn incoming(&self, neuron: NeuronId) -> &[usize] {
        self.target_index.get(&neuron).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.valid_count
    }

    pub fn is_empty(&self) -> bool {
        self.valid_count == 0
    }

    /// Number of slots including tombstones
    pub fn capacity_used(&self) -> usize {
        self.synapses.len()
    }

    pub fn iter_valid(&self) -> impl Iterator<Item = &Synapse> {
        self.synapses
            .iter()
            .zip(&self.valid_mask)
            .filter_map(|(s, &valid)| valid.then_some(s))
    }

    /// Every slot with its validity flag, in id order
    pub fn slots(&self) -> impl Iterator<Item = (&Synapse, bool)> {
        self.synapses.iter().zip(self.valid_mask.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypergraph_npu_neural::{PlasticityRule, WeightBounds};

    fn synapse(array: &SynapseArray, pre: u64, post: u64) -> Synapse {
        Synapse::new(
            array.next_id(),
            NeuronId(pre),
            NeuronId(post),
            0.5,
            PlasticityRule::Hebbian,
            1,
            WeightBounds::default(),
        )
    }

    #[test]
    fn test_insert_rejects_duplicate_pair() {
        let mut array = SynapseArray::with_capacity(2);
        let first = synapse(&array, 0, 1);
        assert!(array.insert(first));
        let duplicate = synapse(&array, 0, 1);
        assert!(!array.insert(duplicate));
        assert_eq!(array.len(), 1);
        assert!(array.contains_pair(NeuronId(0), NeuronId(1)));
    }

    #[test]
    fn test_remove_updates_indexes() {
        let mut array = SynapseArray::with_capacity(3);
        let a = synapse(&array, 0, 1);
        array.insert(a);
        let b = synapse(&array, 0, 2);
        array.insert(b);
        assert_eq!(array.outgoing(NeuronId(0)), &[0, 1]);

        assert!(array.remove(SynapseId(0)));
        assert!(!array.remove(SynapseId(0)));
        assert_eq!(array.outgoing(NeuronId(0)), &[1]);
        assert!(array.incoming(NeuronId(1)).is_empty());
        assert!(!array.contains_pair(NeuronId(0), NeuronId(1)));
        assert_eq!(array.next_id(), SynapseId(2));

        // The pair can be re-created under a fresh id
        let again = synapse(&array, 0, 1);
        assert!(array.insert(again));
        assert_eq!(array.len(), 2);
    }
}
