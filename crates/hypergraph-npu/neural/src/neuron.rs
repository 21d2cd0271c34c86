// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Neuron
//!
//! Single activation unit with bounded dynamics.
//!
//! ## Step Contract
//!
//! ```text
//! receive_input(s)   pending += s            (lock-free add-and-clamp)
//! integrate(t)       a = leak(a) + pending   (pending consumed, a clamped)
//!                    fire if a ≥ θ, not refractory, energy ≥ e_min
//! ```
//!
//! Inputs delivered while step `t` runs are only observed by the integration
//! of a later step, so a neuron never sees a signal generated in its own step.
//!
//! All mutable fields are atomics: the owning region writes dynamics while the
//! learning pass and statistics collectors read them through shared references.

use crate::models::leaky_integrate;
use crate::types::{AtomicF32, NeuronId, RegionId};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};

const NEVER_FIRED: u64 = u64::MAX;

/// Neuron lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum NeuronState {
    #[default]
    Inactive = 0,
    Active = 1,
    Inhibited = 2,
    Refractory = 3,
}

impl NeuronState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => NeuronState::Active,
            2 => NeuronState::Inhibited,
            3 => NeuronState::Refractory,
            _ => NeuronState::Inactive,
        }
    }
}

/// Neuron parameters applied at creation time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuronParams {
    /// Lower activation bound
    pub activation_min: f32,

    /// Upper activation bound
    pub activation_max: f32,

    /// Firing threshold
    pub threshold: f32,

    /// Leak per unit time (0-1 after multiplying by dt)
    pub decay_rate: f32,

    /// Activation after a spike
    pub reset_activation: f32,

    /// Steps after a spike during which the neuron cannot fire again
    pub refractory_steps: u32,

    /// Multiplier applied to delivered input before integration
    pub input_gain: f32,

    /// Minimum energy required to fire (0 disables the gate)
    pub min_fire_energy: f32,

    /// Initial BCM sliding threshold
    pub initial_bcm_theta: f32,
}

impl Default for NeuronParams {
    fn default() -> Self {
        Self {
            activation_min: 0.0,
            activation_max: 1.0,
            threshold: 0.5,
            decay_rate: 0.1,
            reset_activation: 0.0,
            refractory_steps: 2,
            input_gain: 1.0,
            min_fire_energy: 0.0,
            initial_bcm_theta: 0.1,
        }
    }
}

/// Plain copy of a neuron's mutable dynamics (snapshots, diagnostics)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeuronDynamics {
    pub activation: f32,
    pub pending_input: f32,
    pub output: f32,
    pub state: NeuronState,
    pub last_fire_time: Option<u64>,
    pub fire_count: u32,
    pub bcm_theta: f32,
    pub attention: f32,
    pub energy: f32,
    pub health: f32,
}

/// Single activation unit
#[derive(Debug)]
pub struct Neuron {
    pub id: NeuronId,
    pub region: RegionId,
    pub threshold: f32,
    pub decay_rate: f32,
    pub activation_min: f32,
    pub activation_max: f32,
    pub reset_activation: f32,
    pub refractory_steps: u32,
    pub min_fire_energy: f32,
    pub position: Option<[f32; 3]>,

    activation: AtomicF32,
    pending_input: AtomicF32,
    output: AtomicF32,
    state: AtomicU8,
    last_fire_time: AtomicU64,
    fire_count: AtomicU32,
    bcm_theta: AtomicF32,
    attention: AtomicF32,
    energy: AtomicF32,
    health: AtomicF32,
}

impl Neuron {
    pub fn new(id: NeuronId, region: RegionId, params: &NeuronParams) -> Self {
        let resting = 0.0f32.clamp(params.activation_min, params.activation_max);
        Self {
            id,
            region,
            threshold: params.threshold,
            decay_rate: params.decay_rate,
            activation_min: params.activation_min,
            activation_max: params.activation_max,
            reset_activation: params
                .reset_activation
                .clamp(params.activation_min, params.activation_max),
            refractory_steps: params.refractory_steps,
            min_fire_energy: params.min_fire_energy,
            position: None,
            activation: AtomicF32::new(resting),
            pending_input: AtomicF32::new(0.0),
            output: AtomicF32::new(resting),
            state: AtomicU8::new(NeuronState::Inactive as u8),
            last_fire_time: AtomicU64::new(NEVER_FIRED),
            fire_count: AtomicU32::new(0),
            bcm_theta: AtomicF32::new(params.initial_bcm_theta),
            attention: AtomicF32::new(1.0),
            energy: AtomicF32::new(1.0),
            health: AtomicF32::new(1.0),
        }
    }

    pub fn with_position(mut self, position: [f32; 3]) -> Self {
        self.position = Some(position);
        self
    }

    #[inline]
    pub fn activation(&self) -> f32 {
        self.activation.load()
    }

    /// Set activation directly (clamped)
    pub fn set_activation(&self, value: f32) {
        if value.is_finite() {
            self.activation
                .store(value.clamp(self.activation_min, self.activation_max));
        }
    }

    /// Activity level seen by learning rules for the latest step
    #[inline]
    pub fn output(&self) -> f32 {
        self.output.load()
    }

    #[inline]
    pub fn state(&self) -> NeuronState {
        NeuronState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    fn set_state(&self, state: NeuronState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Step index of the most recent spike
    #[inline]
    pub fn last_fire_time(&self) -> Option<u64> {
        match self.last_fire_time.load(Ordering::Acquire) {
            NEVER_FIRED => None,
            t => Some(t),
        }
    }

    #[inline]
    pub fn fired_at(&self, step: u64) -> bool {
        self.last_fire_time.load(Ordering::Acquire) == step
    }

    /// True while the refractory window of the last spike covers `step`
    #[inline]
    pub fn is_refractory(&self, step: u64) -> bool {
        match self.last_fire_time() {
            Some(t) => step <= t.saturating_add(self.refractory_steps as u64),
            None => false,
        }
    }

    /// Accumulate a delivered signal for the next integration.
    ///
    /// Non-finite signals are dropped; the accumulator is clamped to the
    /// activation span so a burst of input cannot overflow it.
    #[inline]
    pub fn receive_input(&self, signal: f32) {
        if !signal.is_finite() {
            return;
        }
        let span = self.activation_max - self.activation_min;
        self.pending_input.add_clamped(signal, -span, span);
    }

    #[inline]
    pub fn pending_input(&self) -> f32 {
        self.pending_input.load()
    }

    /// Consume the accumulated input
    #[inline]
    pub fn take_input(&self) -> f32 {
        self.pending_input.swap(0.0)
    }

    /// Leaky-integrate consumed input and run the fire check. Returns true on a spike.
    pub fn integrate(&self, step: u64, dt: f32, gain: f32) -> bool {
        let input = self.take_input() * gain;
        let next = leaky_integrate(
            self.activation(),
            input,
            self.decay_rate,
            dt,
            self.activation_min,
            self.activation_max,
        );
        self.commit(step, next, false)
    }

    /// Store an integrated activation and decide firing.
    ///
    /// `suppressed` marks the neuron Inhibited for this step (competitive
    /// regions); an inhibited neuron cannot fire.
    pub fn commit(&self, step: u64, activation: f32, suppressed: bool) -> bool {
        let activation = if activation.is_finite() {
            activation.clamp(self.activation_min, self.activation_max)
        } else {
            self.activation()
        };
        let refractory = self.is_refractory(step);
        self.output.store(activation);

        if suppressed {
            self.activation.store(activation);
            self.set_state(NeuronState::Inhibited);
            return false;
        }

        if !refractory && activation >= self.threshold && self.energy() >= self.min_fire_energy {
            self.activation.store(self.reset_activation);
            self.last_fire_time.store(step, Ordering::Release);
            self.fire_count.fetch_add(1, Ordering::AcqRel);
            self.set_state(NeuronState::Refractory);
            return true;
        }

        self.activation.store(activation);
        let state = if refractory {
            NeuronState::Refractory
        } else if activation > 0.0 {
            NeuronState::Active
        } else {
            NeuronState::Inactive
        };
        self.set_state(state);
        false
    }

    #[inline]
    pub fn fire_count(&self) -> u32 {
        self.fire_count.load(Ordering::Acquire)
    }

    /// Read and reset the windowed spike counter
    #[inline]
    pub fn take_fire_count(&self) -> u32 {
        self.fire_count.swap(0, Ordering::AcqRel)
    }

    #[inline]
    pub fn bcm_theta(&self) -> f32 {
        self.bcm_theta.load()
    }

    #[inline]
    pub fn set_bcm_theta(&self, theta: f32) {
        if theta.is_finite() {
            self.bcm_theta.store(theta.max(0.0));
        }
    }

    #[inline]
    pub fn attention(&self) -> f32 {
        self.attention.load()
    }

    /// Per-neuron learning-rate multiplier (negative values clamp to 0)
    pub fn set_attention(&self, multiplier: f32) {
        if multiplier.is_finite() {
            self.attention.store(multiplier.max(0.0));
        }
    }

    #[inline]
    pub fn energy(&self) -> f32 {
        self.energy.load()
    }

    #[inline]
    pub fn health(&self) -> f32 {
        self.health.load()
    }

    pub fn set_metabolic_state(&self, energy: f32, health: f32) {
        if energy.is_finite() {
            self.energy.store(energy.clamp(0.0, 1.0));
        }
        if health.is_finite() {
            self.health.store(health.clamp(0.0, 1.0));
        }
    }

    pub fn dynamics(&self) -> NeuronDynamics {
        NeuronDynamics {
            activation: self.activation(),
            pending_input: self.pending_input(),
            output: self.output(),
            state: self.state(),
            last_fire_time: self.last_fire_time(),
            fire_count: self.fire_count(),
            bcm_theta: self.bcm_theta(),
            attention: self.attention(),
            energy: self.energy(),
            health: self.health(),
        }
    }

    pub fn restore_dynamics(&self, dynamics: &NeuronDynamics) {
        self.activation.store(dynamics.activation);
        self.pending_input.store(dynamics.pending_input);
        self.output.store(dynamics.output);
        self.set_state(dynamics.state);
        self.last_fire_time.store(
            dynamics.last_fire_time.unwrap_or(NEVER_FIRED),
            Ordering::Release,
        );
        self.fire_count.store(dynamics.fire_count, Ordering::Release);
        self.bcm_theta.store(dynamics.bcm_theta);
        self.attention.store(dynamics.attention);
        self.energy.store(dynamics.energy);
        self.health.store(dynamics.health);
    }

    /// Return to the freshly-created state, keeping identity and parameters
    pub fn reset_dynamics(&self, initial_bcm_theta: f32) {
        let resting = 0.0f32.clamp(self.activation_min, self.activation_max);
        self.restore_dynamics(&NeuronDynamics {
            activation: resting,
            pending_input: 0.0,
            output: resting,
            state: NeuronState::Inactive,
            last_fire_time: None,
            fire_count: 0,
            bcm_theta: initial_bcm_theta,
            attention: 1.0,
            energy: 1.0,
            health: 1.0,
        });
    }
}
