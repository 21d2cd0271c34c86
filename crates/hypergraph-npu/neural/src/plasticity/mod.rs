// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Plasticity rule tags and per-rule parameters.
//!
//! The rule set is closed: every synapse carries a `PlasticityRule` tag and the
//! learning pass dispatches with a single `match`. The pure math lives in
//! [`rules`] so the CPU backend and tests share it.

pub mod rules;

pub use rules::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Plasticity rule carried by each synapse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum PlasticityRule {
    #[default]
    Hebbian = 0,
    SpikeTiming = 1,
    Bcm = 2,
    Oja = 3,
    RewardModulated = 4,
    /// Fixed weight
    Static = 5,
}

impl PlasticityRule {
    pub const ALL: [PlasticityRule; 6] = [
        PlasticityRule::Hebbian,
        PlasticityRule::SpikeTiming,
        PlasticityRule::Bcm,
        PlasticityRule::Oja,
        PlasticityRule::RewardModulated,
        PlasticityRule::Static,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            PlasticityRule::Hebbian => "hebbian",
            PlasticityRule::SpikeTiming => "stdp",
            PlasticityRule::Bcm => "bcm",
            PlasticityRule::Oja => "oja",
            PlasticityRule::RewardModulated => "reward",
            PlasticityRule::Static => "static",
        }
    }
}

impl fmt::Display for PlasticityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlasticityRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hebbian" => Ok(PlasticityRule::Hebbian),
            "stdp" | "spike_timing" | "spiketiming" => Ok(PlasticityRule::SpikeTiming),
            "bcm" => Ok(PlasticityRule::Bcm),
            "oja" => Ok(PlasticityRule::Oja),
            "reward" | "reward_modulated" | "rewardmodulated" => {
                Ok(PlasticityRule::RewardModulated)
            }
            "static" => Ok(PlasticityRule::Static),
            _ => Err(format!("Unknown plasticity rule: {}", s)),
        }
    }
}

/// Hebbian rule parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HebbianParams {
    pub learning_rate: f32,
}

impl Default for HebbianParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
        }
    }
}

/// Spike-timing rule parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StdpParams {
    /// Potentiation amplitude (A+)
    pub a_plus: f32,
    /// Depression amplitude (A-)
    pub a_minus: f32,
    /// Potentiation time constant in steps (τ+)
    pub tau_plus: f32,
    /// Depression time constant in steps (τ-)
    pub tau_minus: f32,
    /// Maximum |Δt| in steps that still produces a change
    pub window: u32,
}

impl Default for StdpParams {
    fn default() -> Self {
        Self {
            a_plus: 0.01,
            a_minus: 0.012,
            tau_plus: 20.0,
            tau_minus: 20.0,
            window: 50,
        }
    }
}

/// BCM rule parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BcmParams {
    pub learning_rate: f32,
    /// Time constant of the sliding threshold, in steps
    pub theta_tau: f32,
}

impl Default for BcmParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.005,
            theta_tau: 100.0,
        }
    }
}

/// Oja rule parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OjaParams {
    pub learning_rate: f32,
}

impl Default for OjaParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.005,
        }
    }
}

/// Reward-modulated (eligibility trace) parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardParams {
    /// Trace decay per step (λ)
    pub trace_decay: f32,
    /// Reward learning rate (κ)
    pub learning_rate: f32,
}

impl Default for RewardParams {
    fn default() -> Self {
        Self {
            trace_decay: 0.9,
            learning_rate: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_tag_roundtrip() {
        for rule in PlasticityRule::ALL {
            assert_eq!(PlasticityRule::from_u8(rule.as_u8()), Some(rule));
            assert_eq!(rule.name().parse::<PlasticityRule>(), Ok(rule));
        }
        assert_eq!(PlasticityRule::from_u8(42), None);
    }

    #[test]
    fn test_unknown_rule_name() {
        assert!("backprop".parse::<PlasticityRule>().is_err());
    }
}
