// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Homeostatic energy/health kernel.
//!
//! Firing spends energy, rest recovers it toward 1.0, and health follows
//! energy with a slower time constant. Both stay in `[0, 1]`.

use serde::{Deserialize, Serialize};

/// Metabolic parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetabolismParams {
    /// Run the energy/health update every step
    pub enabled: bool,

    /// Energy spent per spike
    pub fire_cost: f32,

    /// Fraction of the energy deficit recovered per non-firing step
    pub recovery_rate: f32,

    /// Rate at which health tracks energy
    pub health_rate: f32,
}

impl Default for MetabolismParams {
    fn default() -> Self {
        Self {
            enabled: true,
            fire_cost: 0.05,
            recovery_rate: 0.02,
            health_rate: 0.01,
        }
    }
}

/// Advance one neuron's energy and health by one step
#[inline(always)]
pub fn energy_step(energy: f32, health: f32, fired: bool, params: &MetabolismParams) -> (f32, f32) {
    let energy = if fired {
        energy - params.fire_cost
    } else {
        energy + params.recovery_rate * (1.0 - energy)
    }
    .clamp(0.0, 1.0);
    let health = (health + params.health_rate * (energy - health)).clamp(0.0, 1.0);
    (energy, health)
}
