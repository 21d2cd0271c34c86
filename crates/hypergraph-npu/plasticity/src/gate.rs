// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Sparse update gate and attention composition

use hypergraph_config::AttentionComposition;
use hypergraph_npu_neural::RegionId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Mix a base seed with a step and a stream tag (splitmix64 finalizer)
pub fn derive_seed(seed: u64, step: u64, stream: u64) -> u64 {
    let mut z = seed
        ^ step.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ stream.wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Bernoulli filter admitting roughly `fraction` of the synapses it is asked about.
///
/// Seeded per (seed, step, region), so a given step always admits the same
/// subset regardless of thread scheduling.
pub struct SparseGate {
    fraction: f32,
    rng: Option<StdRng>,
}

impl SparseGate {
    pub fn new(seed: u64, step: u64, region: RegionId, fraction: f32) -> Self {
        let fraction = fraction.clamp(0.0, 1.0);
        // No draws when everything passes
        let rng = (fraction < 1.0)
            .then(|| StdRng::seed_from_u64(derive_seed(seed, step, region.0 as u64 + 1)));
        Self { fraction, rng }
    }

    #[inline]
    pub fn admit(&mut self) -> bool {
        match self.rng.as_mut() {
            None => true,
            Some(rng) => rng.gen::<f32>() < self.fraction,
        }
    }
}

/// Combine `[rule gate, post attention, pre attention]` in that order
#[inline]
pub fn compose_attention(composition: AttentionComposition, gates: [f32; 3]) -> f32 {
    let combined = match composition {
        AttentionComposition::Multiplicative => gates.iter().product(),
        AttentionComposition::Min => gates.iter().copied().fold(f32::INFINITY, f32::min),
        AttentionComposition::Max => gates.iter().copied().fold(f32::NEG_INFINITY, f32::max),
    };
    if combined.is_finite() {
        combined.max(0.0)
    } else {
        0.0
    }
}
