// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Synapse
//!
//! Weighted, delayed, plastic directed edge between two neuron ids.
//!
//! ```text
//! propagate(s, t)  → buffer.push((s, t + delay))
//! flush(t)         → Σ s for all entries with arrival ≤ t, × weight
//! ```
//!
//! The delay is at least one step, so a spike produced during step `t` is
//! never delivered during step `t`.

pub mod weight;

pub use weight::{apply_weight_change, scale_weight, WeightBounds};

use crate::plasticity::PlasticityRule;
use crate::types::{AtomicF32, NeuronId, SynapseId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Synapse parameters applied at creation time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynapseParams {
    pub weight_min: f32,
    pub weight_max: f32,
    /// Delay in steps used when a connection rule does not set one
    pub default_delay: u32,
}

impl SynapseParams {
    pub fn bounds(&self) -> WeightBounds {
        WeightBounds::new(self.weight_min, self.weight_max)
    }
}

impl Default for SynapseParams {
    fn default() -> Self {
        Self {
            weight_min: 0.0,
            weight_max: 1.0,
            default_delay: 1,
        }
    }
}

/// Signal waiting in a delay buffer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingSignal {
    pub value: f32,
    pub arrival: u64,
}

/// Directed plastic edge
#[derive(Debug)]
pub struct Synapse {
    pub id: SynapseId,
    pub source: NeuronId,
    pub target: NeuronId,
    pub rule: PlasticityRule,
    pub delay: u32,

    weight: AtomicF32,
    eligibility: AtomicF32,
    update_count: AtomicU64,
    last_delta: AtomicF32,
    prune_flag: AtomicBool,
    buffer: Mutex<VecDeque<PendingSignal>>,
    pending: AtomicUsize,
}

impl Synapse {
    pub fn new(
        id: SynapseId,
        source: NeuronId,
        target: NeuronId,
        weight: f32,
        rule: PlasticityRule,
        delay: u32,
        bounds: WeightBounds,
    ) -> Self {
        Self {
            id,
            source,
            target,
            rule,
            delay: delay.max(1),
            weight: AtomicF32::new(bounds.clamp(weight)),
            eligibility: AtomicF32::new(0.0),
            update_count: AtomicU64::new(0),
            last_delta: AtomicF32::new(0.0),
            prune_flag: AtomicBool::new(false),
            buffer: Mutex::new(VecDeque::new()),
            pending: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn weight(&self) -> f32 {
        self.weight.load()
    }

    /// Overwrite the weight (clamped)
    pub fn set_weight(&self, weight: f32, bounds: WeightBounds) {
        self.weight.store(bounds.clamp(weight));
    }

    /// Apply a plasticity delta, clamped. Returns the applied change.
    pub fn apply_delta(&self, delta: f32, bounds: WeightBounds) -> f32 {
        let applied = apply_weight_change(&self.weight, delta, bounds);
        if delta.is_finite() && delta != 0.0 {
            self.update_count.fetch_add(1, Ordering::AcqRel);
            self.last_delta.store(applied);
        }
        applied
    }

    /// Multiplicative rescale, clamped. Returns the applied change.
    pub fn scale(&self, factor: f32, bounds: WeightBounds) -> f32 {
        let applied = scale_weight(&self.weight, factor, bounds);
        if applied != 0.0 {
            self.update_count.fetch_add(1, Ordering::AcqRel);
            self.last_delta.store(applied);
        }
        applied
    }

    /// Enqueue a signal for delivery `delay` steps after `step`
    pub fn propagate(&self, signal: f32, step: u64) {
        if !signal.is_finite() {
            return;
        }
        let mut buffer = self.buffer.lock();
        buffer.push_back(PendingSignal {
            value: signal,
            arrival: step + self.delay as u64,
        });
        self.pending.fetch_add(1, Ordering::AcqRel);
    }

    /// Pop every matured signal and return their sum scaled by the current weight.
    ///
    /// Returns `None` when nothing matured.
    pub fn flush(&self, step: u64) -> Option<f32> {
        if self.pending.load(Ordering::Acquire) == 0 {
            return None;
        }
        let mut buffer = self.buffer.lock();
        let mut sum = 0.0f32;
        let mut delivered = 0usize;
        while let Some(front) = buffer.front() {
            if front.arrival > step {
                break;
            }
            sum += front.value;
            delivered += 1;
            buffer.pop_front();
        }
        if delivered == 0 {
            return None;
        }
        self.pending.fetch_sub(delivered, Ordering::AcqRel);
        Some(sum * self.weight())
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn pending_signals(&self) -> Vec<PendingSignal> {
        self.buffer.lock().iter().copied().collect()
    }

    pub fn restore_pending(&self, signals: &[PendingSignal]) {
        let mut buffer = self.buffer.lock();
        buffer.clear();
        buffer.extend(signals.iter().copied());
        self.pending.store(buffer.len(), Ordering::Release);
    }

    pub fn clear_pending(&self) {
        self.restore_pending(&[]);
    }

    #[inline]
    pub fn eligibility(&self) -> f32 {
        self.eligibility.load()
    }

    /// Decay the trace and add the current co-activation
    pub fn update_eligibility(&self, decay: f32, coactivity: f32) -> f32 {
        let (_, new) = self
            .eligibility
            .update(|e| crate::plasticity::eligibility_step(e, coactivity, 1.0, decay));
        new
    }

    pub fn set_eligibility(&self, trace: f32) {
        if trace.is_finite() {
            self.eligibility.store(trace);
        }
    }

    #[inline]
    pub fn update_count(&self) -> u64 {
        self.update_count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn last_delta(&self) -> f32 {
        self.last_delta.load()
    }

    pub fn restore_history(&self, update_count: u64, last_delta: f32) {
        self.update_count.store(update_count, Ordering::Release);
        self.last_delta.store(last_delta);
    }

    /// Mark for removal at the next consolidation pass
    pub fn flag_for_pruning(&self) {
        self.prune_flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_flagged(&self) -> bool {
        self.prune_flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synapse(delay: u32) -> Synapse {
        Synapse::new(
            SynapseId(0),
            NeuronId(0),
            NeuronId(1),
            0.5,
            PlasticityRule::Hebbian,
            delay,
            WeightBounds::default(),
        )
    }

    #[test]
    fn test_signal_not_delivered_before_delay() {
        let s = synapse(3);
        s.propagate(1.0, 10);
        assert_eq!(s.flush(10), None);
        assert_eq!(s.flush(12), None);
        assert_eq!(s.flush(13), Some(0.5));
        assert_eq!(s.pending_count(), 0);
    }

    #[test]
    fn test_zero_delay_is_raised_to_one() {
        let s = synapse(0);
        assert_eq!(s.delay, 1);
        s.propagate(1.0, 4);
        assert_eq!(s.flush(4), None);
        assert_eq!(s.flush(5), Some(0.5));
    }

    #[test]
    fn test_flush_sums_all_matured() {
        let s = synapse(1);
        s.propagate(1.0, 0);
        s.propagate(1.0, 1);
        s.propagate(1.0, 2);
        assert_eq!(s.flush(2), Some(1.0));
        assert_eq!(s.pending_count(), 1);
    }

    #[test]
    fn test_weight_clamped_on_creation_and_update() {
        let s = Synapse::new(
            SynapseId(1),
            NeuronId(0),
            NeuronId(1),
            3.0,
            PlasticityRule::Oja,
            1,
            WeightBounds::default(),
        );
        assert_eq!(s.weight(), 1.0);
        let applied = s.apply_delta(-0.25, WeightBounds::default());
        assert!((applied + 0.25).abs() < 1e-7);
        assert_eq!(s.update_count(), 1);
        assert!((s.last_delta() + 0.25).abs() < 1e-7);
    }

    #[test]
    fn test_eligibility_trace_update() {
        let s = synapse(1);
        s.update_eligibility(0.9, 1.0);
        assert!((s.eligibility() - 1.0).abs() < 1e-7);
        s.update_eligibility(0.9, 0.0);
        assert!((s.eligibility() - 0.9).abs() < 1e-7);
    }

    #[test]
    fn test_pending_restore() {
        let s = synapse(2);
        s.propagate(1.0, 0);
        let saved = s.pending_signals();
        let other = synapse(2);
        other.restore_pending(&saved);
        assert_eq!(other.pending_count(), 1);
        assert_eq!(other.flush(2), Some(0.5));
    }
}
