// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Topology errors

use hypergraph_npu_neural::{NeuronId, RegionId, SynapseId};

/// Structural error raised while mutating the topology
///
/// These never abort a build: the connectivity manager and structural
/// plasticity count and skip them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("Synapse {pre} -> {post} already exists")]
    DuplicateSynapse { pre: NeuronId, post: NeuronId },

    #[error("Dangling neuron reference: {0}")]
    DanglingNeuron(NeuronId),

    #[error("Unknown region: {0}")]
    UnknownRegion(RegionId),

    #[error("Unknown synapse: {0}")]
    UnknownSynapse(SynapseId),

    #[error("Invalid topology: {0}")]
    Invalid(String),
}

pub type TopologyResult<T> = std::result::Result<T, TopologyError>;
