// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use hypergraph_config::ConfigError;
use hypergraph_npu_neural::{NeuralError, NeuronId, RegionId};
use hypergraph_npu_runtime::TopologyError;
use hypergraph_serialization::SnapshotError;
use thiserror::Error;

use crate::lifecycle::BrainState;

/// Errors returned by brain operations
#[derive(Error, Debug)]
pub enum BrainError {
    #[error("Region not found: {0}")]
    RegionNotFound(RegionId),

    #[error("Neuron not found: {0}")]
    NeuronNotFound(NeuronId),

    #[error("A step is already in progress")]
    Busy,

    #[error("Cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: BrainState,
    },

    #[error("Brain must be paused (currently {0})")]
    NotPaused(BrainState),

    #[error("Circular region dependency: {0:?}")]
    CircularDependency(Vec<RegionId>),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Neural error: {0}")]
    Neural(#[from] NeuralError),
}

pub type BrainResult<T> = std::result::Result<T, BrainError>;
