// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for neural registry operations

use super::ids::{NeuronId, RegionId, SynapseId};

/// Error types for neural registry operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NeuralError {
    #[error("Neuron not found: {0}")]
    NeuronNotFound(NeuronId),

    #[error("Synapse not found: {0}")]
    SynapseNotFound(SynapseId),

    #[error("Region not found: {0}")]
    RegionNotFound(RegionId),

    #[error("Duplicate synapse: {pre} -> {post} already exists")]
    DuplicateSynapse { pre: NeuronId, post: NeuronId },

    #[error("Array size mismatch: expected {expected}, got {actual}")]
    ArraySizeMismatch { expected: usize, actual: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),
}

pub type Result<T> = std::result::Result<T, NeuralError>;
