// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Compute Backend Abstraction
//!
//! Provides a unified interface for the batched update kernels so the region
//! and learning code does not care where the arithmetic runs.

mod cpu;
#[cfg(feature = "gpu")]
mod wgpu_backend;

pub use cpu::CpuBackend;
#[cfg(feature = "gpu")]
pub use wgpu_backend::WgpuBackend;

use hypergraph_config::AcceleratorConfig;
use hypergraph_npu_neural::{MetabolismParams, StdpParams};
use tracing::{info, warn};

/// Accelerator failure (transfer, launch, or capability)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Kernel launch failed: {0}")]
    Launch(String),

    #[error("Array size mismatch: expected {expected}, got {actual}")]
    ArraySizeMismatch { expected: usize, actual: usize },

    #[error("Non-finite result at index {0}")]
    NonFinite(usize),

    #[error("Invalid backend: {0}")]
    InvalidBackend(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Inputs for one batched leaky-integration call
#[derive(Debug, Clone, Copy)]
pub struct LeakyBatch<'a> {
    pub activations: &'a [f32],
    pub inputs: &'a [f32],
    pub decay_rates: &'a [f32],
    pub dt: f32,
    pub min: f32,
    pub max: f32,
}

/// Compute backend trait (CPU, GPU)
///
/// Every method is a pure function of its inputs: outputs are returned, never
/// written in place, so a failed call leaves nothing half-updated and the
/// caller can rerun the same batch elsewhere.
pub trait ComputeBackend: Send + Sync {
    /// Backend name for logging/debugging
    fn backend_name(&self) -> &str;

    /// Δw = η · pre · post, elementwise
    fn compute_hebbian(
        &self,
        pre: &[f32],
        post: &[f32],
        learning_rate: f32,
    ) -> BackendResult<Vec<f32>>;

    /// Spike-timing deltas for firing gaps `dt = t_post - t_pre` (in steps)
    fn compute_spike_rule(&self, dt: &[f32], params: &StdpParams) -> BackendResult<Vec<f32>>;

    /// Next activations after leak + input, clamped to the batch range
    fn compute_leaky_integrate(&self, batch: &LeakyBatch<'_>) -> BackendResult<Vec<f32>>;

    /// Next `(energy, health)` arrays; `fired[i] != 0` marks a spike this step
    fn compute_homeostatic_energy(
        &self,
        energy: &[f32],
        health: &[f32],
        fired: &[u32],
        params: &MetabolismParams,
    ) -> BackendResult<(Vec<f32>, Vec<f32>)>;
}

pub(crate) fn check_len(expected: usize, actual: usize) -> BackendResult<()> {
    if expected != actual {
        return Err(BackendError::ArraySizeMismatch { expected, actual });
    }
    Ok(())
}

/// Accept a kernel output only if it has one finite value per input
pub(crate) fn check_output(expected: usize, output: Vec<f32>) -> BackendResult<Vec<f32>> {
    check_len(expected, output.len())?;
    match output.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(BackendError::NonFinite(index)),
        None => Ok(output),
    }
}

/// Backend type enum for construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendType {
    /// Reference CPU implementation
    Cpu,

    /// GPU via WGPU (Metal/Vulkan/DirectX)
    Wgpu,

    /// Auto-select based on graph size and hardware availability
    #[default]
    Auto,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Cpu => write!(f, "CPU"),
            BackendType::Wgpu => write!(f, "WGPU"),
            BackendType::Auto => write!(f, "Auto"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = BackendError;

    fn from_str(s: &str) -> BackendResult<Self> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(BackendType::Cpu),
            "wgpu" | "gpu" => Ok(BackendType::Wgpu),
            "auto" => Ok(BackendType::Auto),
            _ => Err(BackendError::InvalidBackend(s.to_string())),
        }
    }
}

/// Configuration for backend auto-selection
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    /// Minimum neurons to consider the GPU
    pub gpu_neuron_threshold: usize,

    /// Minimum synapses to consider the GPU
    pub gpu_synapse_threshold: usize,

    /// Force CPU even if the GPU would be beneficial
    pub force_cpu: bool,

    /// Force the GPU even if the CPU would be better (for testing)
    pub force_gpu: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            gpu_neuron_threshold: 500_000,
            gpu_synapse_threshold: 50_000_000,
            force_cpu: false,
            force_gpu: false,
        }
    }
}

impl BackendConfig {
    /// Translate the `[accelerator]` config section into a backend request
    pub fn from_accelerator_config(config: &AcceleratorConfig) -> (BackendType, BackendConfig) {
        let requested = config.backend.parse::<BackendType>().unwrap_or_else(|e| {
            warn!("{}; using CPU backend", e);
            BackendType::Cpu
        });
        let backend_config = BackendConfig {
            gpu_neuron_threshold: config.gpu_neuron_threshold,
            gpu_synapse_threshold: config.gpu_synapse_threshold,
            force_cpu: config.force_cpu,
            force_gpu: config.force_gpu,
        };
        (requested, backend_config)
    }
}

/// Backend selection decision with rationale
#[derive(Debug, Clone, PartialEq)]
pub struct BackendDecision {
    pub backend_type: BackendType,
    pub reason: String,
    pub estimated_speedup: f32,
}

/// Auto-select a backend based on graph size and hardware
///
/// Selection priority:
/// 1. Honor force flags
/// 2. WGPU if compiled in, available, and the graph crosses a threshold
/// 3. CPU (always available)
pub fn select_backend(
    neuron_count: usize,
    synapse_count: usize,
    config: &BackendConfig,
) -> BackendDecision {
    if config.force_cpu {
        return BackendDecision {
            backend_type: BackendType::Cpu,
            reason: "Forced CPU via configuration".to_string(),
            estimated_speedup: 1.0,
        };
    }

    let meets_threshold = neuron_count >= config.gpu_neuron_threshold
        || synapse_count >= config.gpu_synapse_threshold;

    #[cfg(feature = "gpu")]
    {
        if (config.force_gpu || meets_threshold) && wgpu_backend::is_gpu_available() {
            let speedup = estimate_gpu_speedup(neuron_count, synapse_count);
            if config.force_gpu || speedup > 1.5 {
                return BackendDecision {
                    backend_type: BackendType::Wgpu,
                    reason: format!(
                        "WGPU selected: {} neurons, {} synapses{}",
                        neuron_count,
                        synapse_count,
                        if config.force_gpu { " (forced)" } else { "" }
                    ),
                    estimated_speedup: speedup,
                };
            }
        }
    }

    #[cfg(not(feature = "gpu"))]
    if config.force_gpu || meets_threshold {
        warn!("GPU requested but 'gpu' feature not enabled at compile time, falling back to CPU");
    }

    BackendDecision {
        backend_type: BackendType::Cpu,
        reason: format!(
            "CPU selected: {} neurons, {} synapses (below GPU thresholds or GPU not available)",
            neuron_count, synapse_count
        ),
        estimated_speedup: 1.0,
    }
}

/// Rough elementwise-kernel speedup model: fixed launch/transfer overhead
/// against per-element CPU cost.
#[cfg(feature = "gpu")]
fn estimate_gpu_speedup(neuron_count: usize, synapse_count: usize) -> f32 {
    let elements = (neuron_count + synapse_count) as f32;
    // 8 bytes in, 4 bytes out per element over ~25 GB/s, plus ~200μs overhead
    let transfer_us = elements * 12.0 / 25_000.0 + 200.0;
    let cpu_us = elements * 4.0 / 100_000.0 * 10.0;
    let gpu_compute_us = elements * 4.0 / 10_000_000.0 * 10.0;
    (cpu_us / (transfer_us + gpu_compute_us)).clamp(0.1, 100.0)
}

/// Build a backend for the requested type (resolving `Auto` with `select_backend`)
pub fn create_backend(
    requested: BackendType,
    neuron_count: usize,
    synapse_count: usize,
    config: &BackendConfig,
) -> Box<dyn ComputeBackend> {
    let resolved = match requested {
        BackendType::Auto => {
            let decision = select_backend(neuron_count, synapse_count, config);
            info!(
                "Backend auto-selection: {} ({})",
                decision.backend_type, decision.reason
            );
            decision.backend_type
        }
        other => other,
    };

    match resolved {
        #[cfg(feature = "gpu")]
        BackendType::Wgpu => match WgpuBackend::new() {
            Ok(backend) => {
                info!("Using {}", backend.backend_name());
                Box::new(backend)
            }
            Err(e) => {
                warn!("WGPU backend unavailable ({}), using CPU backend", e);
                Box::new(CpuBackend::new())
            }
        },
        #[cfg(not(feature = "gpu"))]
        BackendType::Wgpu => {
            warn!("WGPU requested but 'gpu' feature not enabled at compile time, using CPU backend");
            Box::new(CpuBackend::new())
        }
        BackendType::Cpu | BackendType::Auto => Box::new(CpuBackend::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_parse() {
        assert_eq!("CPU".parse::<BackendType>(), Ok(BackendType::Cpu));
        assert_eq!("gpu".parse::<BackendType>(), Ok(BackendType::Wgpu));
        assert_eq!("auto".parse::<BackendType>(), Ok(BackendType::Auto));
        assert!(matches!(
            "tpu".parse::<BackendType>(),
            Err(BackendError::InvalidBackend(_))
        ));
    }

    #[test]
    fn test_force_cpu_wins() {
        let config = BackendConfig {
            force_cpu: true,
            force_gpu: true,
            ..Default::default()
        };
        let decision = select_backend(10_000_000, 1_000_000_000, &config);
        assert_eq!(decision.backend_type, BackendType::Cpu);
        assert_eq!(decision.estimated_speedup, 1.0);
    }

    #[test]
    fn test_small_graph_selects_cpu() {
        let decision = select_backend(1_000, 10_000, &BackendConfig::default());
        assert_eq!(decision.backend_type, BackendType::Cpu);
    }

    #[test]
    fn test_from_accelerator_config() {
        let config = AcceleratorConfig {
            backend: "auto".to_string(),
            gpu_neuron_threshold: 10,
            gpu_synapse_threshold: 20,
            force_cpu: true,
            force_gpu: false,
        };
        let (requested, backend_config) = BackendConfig::from_accelerator_config(&config);
        assert_eq!(requested, BackendType::Auto);
        assert_eq!(backend_config.gpu_neuron_threshold, 10);
        assert!(backend_config.force_cpu);
    }

    #[test]
    fn test_create_cpu_backend() {
        let backend = create_backend(BackendType::Cpu, 0, 0, &BackendConfig::default());
        assert!(backend.backend_name().starts_with("CPU"));
    }
}
