// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! WGPU backend: cross-platform GPU dispatch of the elementwise kernels.
//!
//! Each call packs its input slices into storage buffers, binds a small
//! uniform parameter block at binding 0, dispatches one 256-wide workgroup
//! per 256 elements and reads the outputs back through staging buffers.
//! Validation and out-of-memory errors are captured with error scopes and
//! surfaced as [`BackendError`] instead of panicking inside wgpu.

use bytemuck::{Pod, Zeroable};
use hypergraph_npu_neural::{MetabolismParams, StdpParams};
use tracing::{debug, info};
use wgpu::util::DeviceExt;

use super::{check_len, BackendError, BackendResult, ComputeBackend, LeakyBatch};

const WORKGROUP_SIZE: u32 = 256;
const MAX_WORKGROUPS: u32 = 65_535;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct HebbianUniform {
    len: u32,
    learning_rate: f32,
    _pad: [u32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct StdpUniform {
    len: u32,
    a_plus: f32,
    a_minus: f32,
    tau_plus: f32,
    tau_minus: f32,
    window: f32,
    _pad: [u32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct LeakyUniform {
    len: u32,
    dt: f32,
    min_activation: f32,
    max_activation: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct EnergyUniform {
    len: u32,
    fire_cost: f32,
    recovery_rate: f32,
    health_rate: f32,
}

/// Probe for a usable adapter without creating a device
pub(crate) fn is_gpu_available() -> bool {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .is_some()
}

/// GPU backend holding one compute pipeline per kernel
pub struct WgpuBackend {
    name: String,
    device: wgpu::Device,
    queue: wgpu::Queue,
    hebbian_pipeline: wgpu::ComputePipeline,
    stdp_pipeline: wgpu::ComputePipeline,
    leaky_pipeline: wgpu::ComputePipeline,
    energy_pipeline: wgpu::ComputePipeline,
}

impl WgpuBackend {
    /// Create a new WGPU backend (adapter + device + pipelines)
    pub fn new() -> BackendResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| BackendError::Unavailable("Failed to find WGPU adapter".to_string()))?;

        let adapter_info = adapter.get_info();
        let name = format!("WGPU ({} - {:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Hypergraph Accelerator Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))
        .map_err(|e| BackendError::Unavailable(format!("Failed to create device: {}", e)))?;

        let hebbian_pipeline = Self::build_pipeline(
            &device,
            "Hebbian",
            include_str!("shaders/hebbian.wgsl"),
        );
        let stdp_pipeline =
            Self::build_pipeline(&device, "Spike Rule", include_str!("shaders/stdp.wgsl"));
        let leaky_pipeline = Self::build_pipeline(
            &device,
            "Leaky Integrate",
            include_str!("shaders/leaky.wgsl"),
        );
        let energy_pipeline = Self::build_pipeline(
            &device,
            "Homeostatic Energy",
            include_str!("shaders/energy.wgsl"),
        );

        info!("{} initialized with 4 compute pipelines", name);

        Ok(Self {
            name,
            device,
            queue,
            hebbian_pipeline,
            stdp_pipeline,
            leaky_pipeline,
            energy_pipeline,
        })
    }

    fn build_pipeline(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ComputePipeline {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: None, // Auto-layout from shader
            module: &module,
            entry_point: "main",
        })
    }

    /// Upload, dispatch and read back one elementwise kernel.
    ///
    /// Binding layout: 0 = uniform params, 1..=inputs.len() = read-only
    /// inputs, then `output_count` read-write f32 outputs of `len` elements.
    fn run_kernel(
        &self,
        pipeline: &wgpu::ComputePipeline,
        params: &[u8],
        inputs: &[&[u8]],
        output_count: usize,
        len: usize,
    ) -> BackendResult<Vec<Vec<f32>>> {
        let workgroups = (len as u64).div_ceil(WORKGROUP_SIZE as u64);
        if workgroups > MAX_WORKGROUPS as u64 {
            return Err(BackendError::Launch(format!(
                "{} elements exceed the single-dispatch limit of {}",
                len,
                MAX_WORKGROUPS as u64 * WORKGROUP_SIZE as u64
            )));
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let output_bytes = (len * std::mem::size_of::<f32>()) as u64;

        let uniform = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Kernel Params"),
                contents: params,
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let input_buffers: Vec<wgpu::Buffer> = inputs
            .iter()
            .map(|bytes| {
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Kernel Input"),
                        contents: bytes,
                        usage: wgpu::BufferUsages::STORAGE,
                    })
            })
            .collect();
        let output_buffers: Vec<wgpu::Buffer> = (0..output_count)
            .map(|_| {
                self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Kernel Output"),
                    size: output_bytes,
                    usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                    mapped_at_creation: false,
                })
            })
            .collect();
        let staging_buffers: Vec<wgpu::Buffer> = (0..output_count)
            .map(|_| {
                self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Kernel Staging"),
                    size: output_bytes,
                    usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        let mut entries = Vec::with_capacity(1 + inputs.len() + output_count);
        entries.push(wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform.as_entire_binding(),
        });
        for buffer in input_buffers.iter().chain(output_buffers.iter()) {
            entries.push(wgpu::BindGroupEntry {
                binding: entries.len() as u32,
                resource: buffer.as_entire_binding(),
            });
        }

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Kernel Bind Group"),
            layout: &pipeline.get_bind_group_layout(0),
            entries: &entries,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Kernel Dispatch"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Kernel Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(workgroups as u32, 1, 1);
        }
        for (output, staging) in output_buffers.iter().zip(&staging_buffers) {
            encoder.copy_buffer_to_buffer(output, 0, staging, 0, output_bytes);
        }
        self.queue.submit(Some(encoder.finish()));

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(error) = validation {
            return Err(BackendError::Launch(error.to_string()));
        }
        if let Some(error) = out_of_memory {
            return Err(BackendError::Transfer(error.to_string()));
        }

        let mut results = Vec::with_capacity(output_count);
        for staging in &staging_buffers {
            results.push(self.read_back(staging)?);
        }
        debug!(
            "Dispatched {} workgroups for {} elements on {}",
            workgroups, len, self.name
        );
        Ok(results)
    }

    fn read_back(&self, staging: &wgpu::Buffer) -> BackendResult<Vec<f32>> {
        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            // Receiver outlives the poll below; a send failure means it was dropped early
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| BackendError::Transfer("Failed to receive buffer map result".to_string()))?
            .map_err(|e| BackendError::Transfer(format!("Failed to map buffer: {:?}", e)))?;

        let data = slice.get_mapped_range();
        let values = bytemuck::cast_slice::<u8, f32>(&data).to_vec();
        drop(data);
        staging.unmap();
        Ok(values)
    }

    fn single(mut outputs: Vec<Vec<f32>>) -> BackendResult<Vec<f32>> {
        outputs
            .pop()
            .ok_or_else(|| BackendError::Transfer("Kernel produced no output".to_string()))
    }
}

impl ComputeBackend for WgpuBackend {
    fn backend_name(&self) -> &str {
        &self.name
    }

    fn compute_hebbian(
        &self,
        pre: &[f32],
        post: &[f32],
        learning_rate: f32,
    ) -> BackendResult<Vec<f32>> {
        check_len(pre.len(), post.len())?;
        if pre.is_empty() {
            return Ok(Vec::new());
        }
        let params = HebbianUniform {
            len: pre.len() as u32,
            learning_rate,
            _pad: [0; 2],
        };
        let outputs = self.run_kernel(
            &self.hebbian_pipeline,
            bytemuck::bytes_of(&params),
            &[bytemuck::cast_slice(pre), bytemuck::cast_slice(post)],
            1,
            pre.len(),
        )?;
        Self::single(outputs)
    }

    fn compute_spike_rule(&self, dt: &[f32], params: &StdpParams) -> BackendResult<Vec<f32>> {
        if dt.is_empty() {
            return Ok(Vec::new());
        }
        let uniform = StdpUniform {
            len: dt.len() as u32,
            a_plus: params.a_plus,
            a_minus: params.a_minus,
            tau_plus: params.tau_plus,
            tau_minus: params.tau_minus,
            window: params.window as f32,
            _pad: [0; 2],
        };
        let outputs = self.run_kernel(
            &self.stdp_pipeline,
            bytemuck::bytes_of(&uniform),
            &[bytemuck::cast_slice(dt)],
            1,
            dt.len(),
        )?;
        Self::single(outputs)
    }

    fn compute_leaky_integrate(&self, batch: &LeakyBatch<'_>) -> BackendResult<Vec<f32>> {
        let len = batch.activations.len();
        check_len(len, batch.inputs.len())?;
        check_len(len, batch.decay_rates.len())?;
        if len == 0 {
            return Ok(Vec::new());
        }
        let uniform = LeakyUniform {
            len: len as u32,
            dt: batch.dt,
            min_activation: batch.min,
            max_activation: batch.max,
        };
        let outputs = self.run_kernel(
            &self.leaky_pipeline,
            bytemuck::bytes_of(&uniform),
            &[
                bytemuck::cast_slice(batch.activations),
                bytemuck::cast_slice(batch.inputs),
                bytemuck::cast_slice(batch.decay_rates),
            ],
            1,
            len,
        )?;
        Self::single(outputs)
    }

    fn compute_homeostatic_energy(
        &self,
        energy: &[f32],
        health: &[f32],
        fired: &[u32],
        params: &MetabolismParams,
    ) -> BackendResult<(Vec<f32>, Vec<f32>)> {
        let len = energy.len();
        check_len(len, health.len())?;
        check_len(len, fired.len())?;
        if len == 0 {
            return Ok((Vec::new(), Vec::new()));
        }
        let uniform = EnergyUniform {
            len: len as u32,
            fire_cost: params.fire_cost,
            recovery_rate: params.recovery_rate,
            health_rate: params.health_rate,
        };
        let mut outputs = self.run_kernel(
            &self.energy_pipeline,
            bytemuck::bytes_of(&uniform),
            &[
                bytemuck::cast_slice(energy),
                bytemuck::cast_slice(health),
                bytemuck::cast_slice(fired),
            ],
            2,
            len,
        )?;
        let health_out = outputs
            .pop()
            .ok_or_else(|| BackendError::Transfer("Kernel produced no health output".to_string()))?;
        let energy_out = Self::single(outputs)?;
        Ok((energy_out, health_out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CpuBackend;

    // Skipped silently on machines without an adapter
    fn backend() -> Option<WgpuBackend> {
        WgpuBackend::new().ok()
    }

    #[test]
    fn test_wgpu_hebbian_matches_cpu() {
        let Some(gpu) = backend() else { return };
        let pre: Vec<f32> = (0..1000).map(|i| (i % 10) as f32 / 10.0).collect();
        let post: Vec<f32> = (0..1000).map(|i| (i % 7) as f32 / 7.0).collect();
        let expected = CpuBackend::hebbian(&pre, &post, 0.05);
        let actual = gpu.compute_hebbian(&pre, &post, 0.05).unwrap();
        for (a, b) in expected.iter().zip(&actual) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_wgpu_energy_matches_cpu() {
        let Some(gpu) = backend() else { return };
        let params = MetabolismParams::default();
        let energy = vec![0.9f32; 300];
        let health = vec![0.8f32; 300];
        let fired: Vec<u32> = (0..300).map(|i| (i % 2) as u32).collect();
        let (e_cpu, h_cpu) = CpuBackend::energy(&energy, &health, &fired, &params);
        let (e_gpu, h_gpu) = gpu
            .compute_homeostatic_energy(&energy, &health, &fired, &params)
            .unwrap();
        for i in 0..300 {
            assert!((e_cpu[i] - e_gpu[i]).abs() < 1e-5);
            assert!((h_cpu[i] - h_gpu[i]).abs() < 1e-5);
        }
    }
}
