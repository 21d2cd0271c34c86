// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Distance profiles and weight samplers.

```text
Uniform      p = base                              w ~ U[mean - spread, mean + spread]
Gaussian     p = base·exp(-d²/2σ²)                 w ~ N(mean, spread)
Exponential  p = base·exp(-d/λ)                    w = mean·Exp(1)
PowerLaw     p = base·(1 + d)^-α                   w = mean·Pareto(α), capped
SmallWorld   p = 1 - β if d ≤ k, else β·base       w ~ U[mean - spread, mean + spread]
```
*/

use rand::Rng;

use crate::types::{Distribution, WeightSpec};

/// Upper cap on a Pareto draw, in multiples of the mean
const PARETO_CAP: f64 = 10.0;

/// Neuron placement used for distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Option<[f32; 3]>,
    /// Index within its region
    pub index: usize,
    /// Size of its region
    pub count: usize,
}

/// Euclidean distance when both neurons have positions, otherwise the
/// relative index distance `|i/n_s - j/n_t|·max(n_s, n_t)`
pub fn distance(pre: &Placement, post: &Placement) -> f32 {
    if let (Some(a), Some(b)) = (pre.position, post.position) {
        let dx = a[0] - b[0];
        let dy = a[1] - b[1];
        let dz = a[2] - b[2];
        return (dx * dx + dy * dy + dz * dz).sqrt();
    }
    let ns = pre.count.max(1) as f32;
    let nt = post.count.max(1) as f32;
    (pre.index as f32 / ns - post.index as f32 / nt).abs() * ns.max(nt)
}

/// Connection probability at distance `d`, in [0, 1]
pub fn connection_probability(distribution: Distribution, base: f32, d: f32) -> f32 {
    let p = match distribution {
        Distribution::Uniform => base,
        Distribution::Gaussian { sigma } => base * (-(d * d) / (2.0 * sigma * sigma)).exp(),
        Distribution::Exponential { lambda } => base * (-d / lambda).exp(),
        Distribution::PowerLaw { alpha } => base * (1.0 + d).powf(-alpha),
        Distribution::SmallWorld { k, beta } => {
            if d <= k {
                1.0 - beta
            } else {
                beta * base
            }
        }
    };
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Uniform draw in (0, 1], safe for logarithms
fn open_unit<R: Rng>(rng: &mut R) -> f64 {
    1.0 - rng.gen::<f64>()
}

/// Draw an initial weight (unclamped)
pub fn sample_weight<R: Rng>(distribution: Distribution, weight: WeightSpec, rng: &mut R) -> f32 {
    let mean = weight.mean as f64;
    let spread = weight.spread as f64;
    let value = match distribution {
        Distribution::Uniform | Distribution::SmallWorld { .. } => {
            mean - spread + 2.0 * spread * rng.gen::<f64>()
        }
        Distribution::Gaussian { .. } => {
            // Box-Muller
            let u1 = open_unit(rng);
            let u2 = rng.gen::<f64>();
            let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
            mean + spread * z
        }
        Distribution::Exponential { .. } => mean * -open_unit(rng).ln(),
        Distribution::PowerLaw { alpha } => {
            let pareto = open_unit(rng).powf(-1.0 / alpha as f64);
            mean * pareto.min(PARETO_CAP)
        }
    };
    value as f32
}
