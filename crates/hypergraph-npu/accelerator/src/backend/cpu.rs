// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CPU reference backend
//!
//! Straight loops over the per-element kernels from `hypergraph-npu-neural`.
//! Every other backend is checked against these results.

use hypergraph_npu_neural::plasticity::{hebbian_delta, stdp_delta};
use hypergraph_npu_neural::models::energy_step;
use hypergraph_npu_neural::{leaky_integrate, MetabolismParams, StdpParams};

use super::{check_len, BackendResult, ComputeBackend, LeakyBatch};

/// Always-available scalar backend
#[derive(Debug, Clone, Default)]
pub struct CpuBackend {
    name: String,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self {
            name: format!("CPU ({} threads)", std::thread::available_parallelism().map_or(1, |n| n.get())),
        }
    }

    pub fn hebbian(pre: &[f32], post: &[f32], learning_rate: f32) -> Vec<f32> {
        pre.iter()
            .zip(post)
            .map(|(&a, &b)| hebbian_delta(a, b, learning_rate))
            .collect()
    }

    pub fn spike_rule(dt: &[f32], params: &StdpParams) -> Vec<f32> {
        dt.iter().map(|&d| stdp_delta(d, params)).collect()
    }

    pub fn leaky(batch: &LeakyBatch<'_>) -> Vec<f32> {
        batch
            .activations
            .iter()
            .zip(batch.inputs)
            .zip(batch.decay_rates)
            .map(|((&a, &i), &d)| leaky_integrate(a, i, d, batch.dt, batch.min, batch.max))
            .collect()
    }

    pub fn energy(
        energy: &[f32],
        health: &[f32],
        fired: &[u32],
        params: &MetabolismParams,
    ) -> (Vec<f32>, Vec<f32>) {
        energy
            .iter()
            .zip(health)
            .zip(fired)
            .map(|((&e, &h), &f)| energy_step(e, h, f != 0, params))
            .unzip()
    }
}

impl ComputeBackend for CpuBackend {
    fn backend_name(&self) -> &str {
        if self.name.is_empty() {
            "CPU"
        } else {
            &self.name
        }
    }

    fn compute_hebbian(
        &self,
        pre: &[f32],
        post: &[f32],
        learning_rate: f32,
    ) -> BackendResult<Vec<f32>> {
        check_len(pre.len(), post.len())?;
        Ok(Self::hebbian(pre, post, learning_rate))
    }

    fn compute_spike_rule(&self, dt: &[f32], params: &StdpParams) -> BackendResult<Vec<f32>> {
        Ok(Self::spike_rule(dt, params))
    }

    fn compute_leaky_integrate(&self, batch: &LeakyBatch<'_>) -> BackendResult<Vec<f32>> {
        check_len(batch.activations.len(), batch.inputs.len())?;
        check_len(batch.activations.len(), batch.decay_rates.len())?;
        Ok(Self::leaky(batch))
    }

    fn compute_homeostatic_energy(
        &self,
        energy: &[f32],
        health: &[f32],
        fired: &[u32],
        params: &MetabolismParams,
    ) -> BackendResult<(Vec<f32>, Vec<f32>)> {
        check_len(energy.len(), health.len())?;
        check_len(energy.len(), fired.len())?;
        Ok(Self::energy(energy, health, fired, params))
    }
}
