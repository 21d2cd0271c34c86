// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Pure rule kernels.
//!
//! Deltas only; clamping to weight bounds happens where the delta is applied.

use super::StdpParams;

/// Hebbian: Δw = η · pre · post
#[inline(always)]
pub fn hebbian_delta(pre: f32, post: f32, learning_rate: f32) -> f32 {
    learning_rate * pre * post
}

/// Spike-timing: `dt = t_post - t_pre` in steps.
///
/// Post after (or with) pre potentiates, post before pre depresses. Pairs
/// further apart than the window contribute nothing.
#[inline(always)]
pub fn stdp_delta(dt: f32, params: &StdpParams) -> f32 {
    if !dt.is_finite() || dt.abs() > params.window as f32 {
        return 0.0;
    }
    if dt >= 0.0 {
        params.a_plus * (-dt / params.tau_plus).exp()
    } else {
        -params.a_minus * (dt / params.tau_minus).exp()
    }
}

/// BCM: Δw = η · post · (post − θ) · pre
#[inline(always)]
pub fn bcm_delta(pre: f32, post: f32, theta: f32, learning_rate: f32) -> f32 {
    learning_rate * post * (post - theta) * pre
}

/// Slide the BCM threshold toward post² with time constant τθ
#[inline(always)]
pub fn bcm_theta_step(theta: f32, post: f32, theta_tau: f32, dt: f32) -> f32 {
    let rate = (dt / theta_tau.max(f32::EPSILON)).clamp(0.0, 1.0);
    theta + (post * post - theta) * rate
}

/// Oja: Δw = η · post · (pre − post · w)
#[inline(always)]
pub fn oja_delta(pre: f32, post: f32, weight: f32, learning_rate: f32) -> f32 {
    learning_rate * post * (pre - post * weight)
}

/// Eligibility trace: e ← λ · e + pre · post
#[inline(always)]
pub fn eligibility_step(trace: f32, pre: f32, post: f32, decay: f32) -> f32 {
    decay * trace + pre * post
}

/// Reward update: Δw = κ · r · e · gate
#[inline(always)]
pub fn reward_delta(trace: f32, reward: f32, learning_rate: f32, gate: f32) -> f32 {
    learning_rate * reward * trace * gate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hebbian() {
        assert!((hebbian_delta(0.5, 0.8, 0.01) - 0.004).abs() < 1e-7);
        assert_eq!(hebbian_delta(0.0, 0.8, 0.01), 0.0);
    }

    #[test]
    fn test_stdp_potentiation_and_depression() {
        let params = StdpParams::default();
        let ltp = stdp_delta(5.0, &params);
        let ltd = stdp_delta(-5.0, &params);
        assert!(ltp > 0.0);
        assert!(ltd < 0.0);
        assert!((ltp - 0.01 * (-0.25f32).exp()).abs() < 1e-7);
        assert!((ltd + 0.012 * (-0.25f32).exp()).abs() < 1e-7);
    }

    #[test]
    fn test_stdp_simultaneous_is_potentiation() {
        let params = StdpParams::default();
        assert!((stdp_delta(0.0, &params) - params.a_plus).abs() < 1e-7);
    }

    #[test]
    fn test_stdp_outside_window() {
        let params = StdpParams::default();
        assert_eq!(stdp_delta(51.0, &params), 0.0);
        assert_eq!(stdp_delta(-51.0, &params), 0.0);
    }

    #[test]
    fn test_stdp_decays_with_distance() {
        let params = StdpParams::default();
        assert!(stdp_delta(1.0, &params) > stdp_delta(10.0, &params));
        assert!(stdp_delta(-1.0, &params) < stdp_delta(-10.0, &params));
    }

    #[test]
    fn test_bcm_sign_follows_threshold() {
        assert!(bcm_delta(1.0, 0.8, 0.5, 0.1) > 0.0);
        assert!(bcm_delta(1.0, 0.3, 0.5, 0.1) < 0.0);
    }

    #[test]
    fn test_bcm_theta_tracks_post_squared() {
        let mut theta = 0.0;
        for _ in 0..2000 {
            theta = bcm_theta_step(theta, 0.5, 100.0, 1.0);
        }
        assert!((theta - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_oja_is_self_normalizing() {
        // At w = pre / post the update vanishes
        assert!(oja_delta(0.5, 1.0, 0.5, 0.1).abs() < 1e-7);
        assert!(oja_delta(0.5, 1.0, 0.9, 0.1) < 0.0);
    }

    #[test]
    fn test_eligibility_decays_geometrically_without_coactivity() {
        let mut trace = 1.0;
        for _ in 0..3 {
            let next = eligibility_step(trace, 0.0, 0.7, 0.9);
            assert!((next - 0.9 * trace).abs() < 1e-7);
            trace = next;
        }
    }
}
