// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Leaky Integration
//!
//! ```text
//! Activation Update:
//!     leak  = clamp(decay_rate × dt, 0, 1)
//!     a(t+1) = clamp(a(t) - leak × a(t) + I, a_min, a_max)
//!
//!     Where:
//!     - I = input delivered during the previous step (already gain-scaled)
//!     - a_min, a_max = configured activation range
//!
//! Oscillatory Gain:
//!     g(t) = 1 + A × sin(2π × f × t × dt + φ)
//! ```

/// Leaky integrate one activation value
#[inline(always)]
pub fn leaky_integrate(
    activation: f32,
    input: f32,
    decay_rate: f32,
    dt: f32,
    min: f32,
    max: f32,
) -> f32 {
    let leak = (decay_rate * dt).clamp(0.0, 1.0);
    let input = if input.is_finite() { input } else { 0.0 };
    let next = activation - leak * activation + input;
    if next.is_finite() {
        next.clamp(min, max)
    } else {
        activation.clamp(min, max)
    }
}

/// Periodic multiplicative input gain for oscillatory regions
#[inline]
pub fn oscillation_gain(step: u64, dt: f32, amplitude: f32, frequency: f32, phase: f32) -> f32 {
    let t = step as f64 * dt as f64;
    let angle = 2.0 * std::f64::consts::PI * frequency as f64 * t + phase as f64;
    (1.0 + amplitude as f64 * angle.sin()) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leak_without_input() {
        let a = leaky_integrate(1.0, 0.0, 0.1, 1.0, 0.0, 1.0);
        assert!((a - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_input_is_clamped_to_range() {
        assert_eq!(leaky_integrate(0.5, 10.0, 0.1, 1.0, 0.0, 1.0), 1.0);
        assert_eq!(leaky_integrate(0.5, -10.0, 0.1, 1.0, -1.0, 1.0), -1.0);
    }

    #[test]
    fn test_leak_factor_saturates() {
        // decay × dt > 1 must not flip the sign of the activation
        let a = leaky_integrate(0.8, 0.0, 5.0, 1.0, -1.0, 1.0);
        assert_eq!(a, 0.0);
    }

    #[test]
    fn test_non_finite_input_ignored() {
        let a = leaky_integrate(0.5, f32::NAN, 0.0, 1.0, 0.0, 1.0);
        assert_eq!(a, 0.5);
    }

    #[test]
    fn test_oscillation_gain_period() {
        // f = 0.25 per unit time, dt = 1 → quarter period peak at step 1
        let g0 = oscillation_gain(0, 1.0, 0.5, 0.25, 0.0);
        let g1 = oscillation_gain(1, 1.0, 0.5, 0.25, 0.0);
        assert!((g0 - 1.0).abs() < 1e-6);
        assert!((g1 - 1.5).abs() < 1e-6);
    }
}
