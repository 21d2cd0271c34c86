// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core type definitions shared by every layer of the engine.

pub mod atomic;
pub mod error;
pub mod ids;

pub use atomic::AtomicF32;
pub use error::{NeuralError, Result};
pub use ids::{NeuronId, RegionId, SynapseId};
