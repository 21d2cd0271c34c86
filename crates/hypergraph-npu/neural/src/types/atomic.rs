// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Lock-free `f32` cell.
//!
//! Weights and activations are mutated concurrently by region workers and the
//! learning pass. Every read-modify-write goes through a compare-and-swap retry
//! loop on the raw bits, so a bound check and the store are one atomic step.

use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Default)]
pub struct AtomicF32 {
    bits: AtomicU32,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    /// Replace the value, returning the previous one
    #[inline]
    pub fn swap(&self, value: f32) -> f32 {
        f32::from_bits(self.bits.swap(value.to_bits(), Ordering::AcqRel))
    }

    /// Apply `f` atomically and return `(old, new)`
    pub fn update<F>(&self, mut f: F) -> (f32, f32)
    where
        F: FnMut(f32) -> f32,
    {
        let mut current = self.bits.load(Ordering::Acquire);
        loop {
            let old = f32::from_bits(current);
            let new = f(old);
            match self.bits.compare_exchange_weak(
                current,
                new.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return (old, new),
                Err(actual) => current = actual,
            }
        }
    }

    /// Add `delta` and clamp the result to `[min, max]`, returning `(old, new)`
    #[inline]
    pub fn add_clamped(&self, delta: f32, min: f32, max: f32) -> (f32, f32) {
        self.update(|v| (v + delta).clamp(min, max))
    }

    /// Multiply by `factor` and clamp the result to `[min, max]`, returning `(old, new)`
    #[inline]
    pub fn scale_clamped(&self, factor: f32, min: f32, max: f32) -> (f32, f32) {
        self.update(|v| (v * factor).clamp(min, max))
    }
}

impl Clone for AtomicF32 {
    fn clone(&self) -> Self {
        Self::new(self.load())
    }
}
