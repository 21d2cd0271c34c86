// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Backend Performance Benchmarks
//!
//! Compares the CPU reference kernels with the auto-selected backend across
//! batch sizes to find where offloading starts paying for its transfers.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hypergraph_npu_accelerator::{
    create_backend, BackendConfig, BackendType, ComputeBackend, CpuBackend, LeakyBatch,
};

const SIZES: [usize; 4] = [1_000, 10_000, 100_000, 1_000_000];

fn make_inputs(len: usize) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
    let activations = (0..len).map(|i| (i % 100) as f32 / 100.0).collect();
    let inputs = (0..len).map(|i| (i % 7) as f32 / 70.0).collect();
    let decay = vec![0.1; len];
    (activations, inputs, decay)
}

fn bench_leaky_integrate(c: &mut Criterion) {
    let mut group = c.benchmark_group("leaky_integrate");
    let cpu = CpuBackend::new();
    let forced = BackendConfig {
        force_gpu: true,
        ..Default::default()
    };
    let auto = create_backend(BackendType::Auto, 0, 0, &forced);

    for &size in &SIZES {
        let (activations, inputs, decay) = make_inputs(size);
        let batch = LeakyBatch {
            activations: &activations,
            inputs: &inputs,
            decay_rates: &decay,
            dt: 1.0,
            min: 0.0,
            max: 1.0,
        };
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("cpu", size), &batch, |b, batch| {
            b.iter(|| black_box(cpu.compute_leaky_integrate(batch)))
        });
        group.bench_with_input(
            BenchmarkId::new(auto.backend_name().to_string(), size),
            &batch,
            |b, batch| b.iter(|| black_box(auto.compute_leaky_integrate(batch))),
        );
    }
    group.finish();
}

fn bench_hebbian(c: &mut Criterion) {
    let mut group = c.benchmark_group("hebbian");
    let cpu = CpuBackend::new();

    for &size in &SIZES {
        let (pre, post, _) = make_inputs(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("cpu", size), &size, |b, _| {
            b.iter(|| black_box(cpu.compute_hebbian(&pre, &post, 0.01)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_leaky_integrate, bench_hebbian);
criterion_main!(benches);
