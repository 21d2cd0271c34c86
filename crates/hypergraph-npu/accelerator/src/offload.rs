// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Offload path with automatic CPU fallback
//!
//! Callers never see a backend error: a failed batch is logged, counted and
//! recomputed with [`CpuBackend`], so results are identical whichever backend
//! ran them. An `Ok` output with the wrong length or a non-finite value counts
//! as a failure too.

use std::sync::atomic::{AtomicU64, Ordering};

use hypergraph_config::AcceleratorConfig;
use hypergraph_npu_neural::{MetabolismParams, StdpParams};
use tracing::warn;

use crate::backend::{
    check_output, create_backend, BackendConfig, BackendError, ComputeBackend, CpuBackend,
    LeakyBatch,
};

pub struct OffloadPath {
    primary: Box<dyn ComputeBackend>,
    fallbacks: AtomicU64,
}

impl std::fmt::Debug for OffloadPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffloadPath")
            .field("primary", &self.primary.backend_name())
            .field("fallbacks", &self.fallback_count())
            .finish()
    }
}

impl Default for OffloadPath {
    fn default() -> Self {
        Self::cpu_only()
    }
}

impl OffloadPath {
    pub fn new(primary: Box<dyn ComputeBackend>) -> Self {
        Self {
            primary,
            fallbacks: AtomicU64::new(0),
        }
    }

    pub fn cpu_only() -> Self {
        Self::new(Box::new(CpuBackend::new()))
    }

    /// Build from the `[accelerator]` section, sized for the current graph
    pub fn from_config(config: &AcceleratorConfig, neurons: usize, synapses: usize) -> Self {
        let (requested, backend_config) = BackendConfig::from_accelerator_config(config);
        Self::new(create_backend(requested, neurons, synapses, &backend_config))
    }

    pub fn backend_name(&self) -> &str {
        self.primary.backend_name()
    }

    /// Batches recomputed on the CPU since construction
    pub fn fallback_count(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    fn fall_back(&self, kernel: &str, error: &BackendError) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
        warn!(
            "{} failed on {} ({}), recomputing on CPU",
            kernel,
            self.primary.backend_name(),
            error
        );
    }

    pub fn hebbian(&self, pre: &[f32], post: &[f32], learning_rate: f32) -> Vec<f32> {
        let expected = pre.len().min(post.len());
        self.primary
            .compute_hebbian(pre, post, learning_rate)
            .and_then(|out| check_output(expected, out))
            .unwrap_or_else(|e| {
                self.fall_back("hebbian", &e);
                CpuBackend::hebbian(pre, post, learning_rate)
            })
    }

    pub fn spike_rule(&self, dt: &[f32], params: &StdpParams) -> Vec<f32> {
        self.primary
            .compute_spike_rule(dt, params)
            .and_then(|out| check_output(dt.len(), out))
            .unwrap_or_else(|e| {
                self.fall_back("spike_rule", &e);
                CpuBackend::spike_rule(dt, params)
            })
    }

    pub fn leaky_integrate(&self, batch: &LeakyBatch<'_>) -> Vec<f32> {
        let expected = batch
            .activations
            .len()
            .min(batch.inputs.len())
            .min(batch.decay_rates.len());
        self.primary
            .compute_leaky_integrate(batch)
            .and_then(|out| check_output(expected, out))
            .unwrap_or_else(|e| {
                self.fall_back("leaky_integrate", &e);
                CpuBackend::leaky(batch)
            })
    }

    pub fn homeostatic_energy(
        &self,
        energy: &[f32],
        health: &[f32],
        fired: &[u32],
        params: &MetabolismParams,
    ) -> (Vec<f32>, Vec<f32>) {
        let expected = energy.len().min(health.len()).min(fired.len());
        self.primary
            .compute_homeostatic_energy(energy, health, fired, params)
            .and_then(|(e, h)| Ok((check_output(expected, e)?, check_output(expected, h)?)))
            .unwrap_or_else(|e| {
                self.fall_back("homeostatic_energy", &e);
                CpuBackend::energy(energy, health, fired, params)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackendResult;

    struct FailingBackend;

    impl ComputeBackend for FailingBackend {
        fn backend_name(&self) -> &str {
            "failing"
        }
        fn compute_hebbian(&self, _: &[f32], _: &[f32], _: f32) -> BackendResult<Vec<f32>> {
            Err(BackendError::Launch("no device".into()))
        }
        fn compute_spike_rule(&self, _: &[f32], _: &StdpParams) -> BackendResult<Vec<f32>> {
            Err(BackendError::Transfer("lost".into()))
        }
        fn compute_leaky_integrate(&self, _: &LeakyBatch<'_>) -> BackendResult<Vec<f32>> {
            Err(BackendError::Launch("no device".into()))
        }
        fn compute_homeostatic_energy(
            &self,
            _: &[f32],
            _: &[f32],
            _: &[u32],
            _: &MetabolismParams,
        ) -> BackendResult<(Vec<f32>, Vec<f32>)> {
            Err(BackendError::Unavailable("gone".into()))
        }
    }

    #[test]
    fn test_fallback_matches_cpu_and_counts() {
        let failing = OffloadPath::new(Box::new(FailingBackend));
        let cpu = OffloadPath::cpu_only();
        let pre = [0.1, 0.5, 0.9];
        let post = [1.0, 0.5, 0.2];

        assert_eq!(failing.hebbian(&pre, &post, 0.2), cpu.hebbian(&pre, &post, 0.2));
        let params = StdpParams::default();
        assert_eq!(
            failing.spike_rule(&[-3.0, 0.0, 4.0], &params),
            cpu.spike_rule(&[-3.0, 0.0, 4.0], &params)
        );
        assert_eq!(failing.fallback_count(), 2);
        assert_eq!(cpu.fallback_count(), 0);
    }

    /// Reports success but returns truncated or corrupt arrays
    struct ShortBackend;

    impl ComputeBackend for ShortBackend {
        fn backend_name(&self) -> &str {
            "short"
        }
        fn compute_hebbian(&self, pre: &[f32], _: &[f32], _: f32) -> BackendResult<Vec<f32>> {
            Ok(vec![0.0; pre.len().saturating_sub(1)])
        }
        fn compute_spike_rule(&self, dt: &[f32], _: &StdpParams) -> BackendResult<Vec<f32>> {
            let mut out = vec![0.0; dt.len()];
            out[0] = f32::NAN;
            Ok(out)
        }
        fn compute_leaky_integrate(&self, _: &LeakyBatch<'_>) -> BackendResult<Vec<f32>> {
            Ok(Vec::new())
        }
        fn compute_homeostatic_energy(
            &self,
            energy: &[f32],
            _: &[f32],
            _: &[u32],
            _: &MetabolismParams,
        ) -> BackendResult<(Vec<f32>, Vec<f32>)> {
            Ok((energy.to_vec(), Vec::new()))
        }
    }

    #[test]
    fn test_malformed_output_falls_back() {
        let short = OffloadPath::new(Box::new(ShortBackend));
        let cpu = OffloadPath::cpu_only();

        let pre = [0.1, 0.5, 0.9];
        let post = [1.0, 0.5, 0.2];
        assert_eq!(short.hebbian(&pre, &post, 0.2), cpu.hebbian(&pre, &post, 0.2));

        let params = StdpParams::default();
        let dt = [-3.0, 0.0, 4.0];
        assert_eq!(short.spike_rule(&dt, &params), cpu.spike_rule(&dt, &params));

        let batch = LeakyBatch {
            activations: &[0.2, 0.4, 0.0, 0.9],
            inputs: &[1.0; 4],
            decay_rates: &[0.1; 4],
            dt: 1.0,
            min: 0.0,
            max: 1.0,
        };
        let next = short.leaky_integrate(&batch);
        assert_eq!(next.len(), 4);
        assert_eq!(next, cpu.leaky_integrate(&batch));

        let metabolism = MetabolismParams::default();
        let (energy, health) = short.homeostatic_energy(&[0.5, 0.5], &[1.0, 1.0], &[1, 0], &metabolism);
        assert_eq!(health.len(), 2);
        assert_eq!(
            (energy, health),
            cpu.homeostatic_energy(&[0.5, 0.5], &[1.0, 1.0], &[1, 0], &metabolism)
        );

        assert_eq!(short.fallback_count(), 4);
        assert_eq!(cpu.fallback_count(), 0);
    }

    #[test]
    fn test_check_output_rejects_bad_arrays() {
        assert_eq!(
            check_output(3, vec![0.0; 2]),
            Err(BackendError::ArraySizeMismatch { expected: 3, actual: 2 })
        );
        assert_eq!(
            check_output(2, vec![0.0, f32::INFINITY]),
            Err(BackendError::NonFinite(1))
        );
        assert_eq!(check_output(1, vec![0.5]), Ok(vec![0.5]));
    }

    #[test]
    fn test_cpu_only_name() {
        assert!(OffloadPath::default().backend_name().starts_with("CPU"));
    }
}
