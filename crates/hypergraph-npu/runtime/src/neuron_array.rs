// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Dense neuron registry
//!
//! Slot index == `NeuronId`. Removed neurons stay as tombstones so ids are
//! never reused within a run.

use hypergraph_npu_neural::{Neuron, NeuronId, NeuronParams, RegionId};

#[derive(Debug, Default)]
pub struct NeuronArray {
    neurons: Vec<Neuron>,

    /// Valid neuron mask
    valid_mask: Vec<bool>,

    valid_count: usize,
}

impl NeuronArray {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            neurons: Vec::with_capacity(capacity),
            valid_mask: Vec::with_capacity(capacity),
            valid_count: 0,
        }
    }

    /// Allocate the next id and store a fresh neuron
    pub fn push(
        &mut self,
        region: RegionId,
        params: &NeuronParams,
        position: Option<[f32; 3]>,
    ) -> NeuronId {
        let id = NeuronId(self.neurons.len() as u64);
        let mut neuron = Neuron::new(id, region, params);
        neuron.position = position;
        self.neurons.push(neuron);
        self.valid_mask.push(true);
        self.valid_count += 1;
        id
    }

    /// Append a fully built neuron (snapshot restore). The id must be the next slot.
    pub(crate) fn push_restored(&mut self, neuron: Neuron, valid: bool) -> bool {
        if neuron.id.index() != self.neurons.len() {
            return false;
        }
        self.neurons.push(neuron);
        self.valid_mask.push(valid);
        if valid {
            self.valid_count += 1;
        }
        true
    }

    /// Tombstone a neuron. Returns false if it was already gone.
    pub fn remove(&mut self, id: NeuronId) -> bool {
        match self.valid_mask.get_mut(id.index()) {
            Some(valid) if *valid => {
                *valid = false;
                self.valid_count -= 1;
                true
            }
            _ => false,
        }
    }

    #[inline]
    pub fn get(&self, id: NeuronId) -> Option<&Neuron> {
        self.get_index(id.index())
    }

    #[inline]
    pub fn get_index(&self, index: usize) -> Option<&Neuron> {
        match self.valid_mask.get(index) {
            Some(true) => self.neurons.get(index),
            _ => None,
        }
    }

    #[inline]
    pub fn is_valid(&self, id: NeuronId) -> bool {
        matches!(self.valid_mask.get(id.index()), Some(true))
    }

    /// Number of slots including tombstones
    pub fn capacity_used(&self) -> usize {
        self.neurons.len()
    }

    /// Number of live neurons
    pub fn len(&self) -> usize {
        self.valid_count
    }

    pub fn is_empty(&self) -> bool {
        self.valid_count == 0
    }

    pub fn iter_valid(&self) -> impl Iterator<Item = &Neuron> {
        self.neurons
            .iter()
            .zip(&self.valid_mask)
            .filter_map(|(n, &valid)| valid.then_some(n))
    }

    /// Every slot with its validity flag, in id order
    pub fn slots(&self) -> impl Iterator<Item = (&Neuron, bool)> {
        self.neurons.iter().zip(self.valid_mask.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_dense_and_never_reused() {
        let mut array = NeuronArray::with_capacity(4);
        let params = NeuronParams::default();
        let a = array.push(RegionId(0), &params, None);
        let b = array.push(RegionId(0), &params, Some([1.0, 0.0, 0.0]));
        assert_eq!(a, NeuronId(0));
        assert_eq!(b, NeuronId(1));

        assert!(array.remove(a));
        assert!(!array.remove(a));
        assert!(array.get(a).is_none());
        assert_eq!(array.len(), 1);

        let c = array.push(RegionId(0), &params, None);
        assert_eq!(c, NeuronId(2));
        assert_eq!(array.capacity_used(), 3);
        assert_eq!(array.get(b).and_then(|n| n.position), Some([1.0, 0.0, 0.0]));
    }
}
