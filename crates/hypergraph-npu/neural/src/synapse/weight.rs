// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Synaptic weight bounds and clamped updates.

use crate::types::AtomicF32;
use serde::{Deserialize, Serialize};

/// Inclusive weight range `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightBounds {
    pub min: f32,
    pub max: f32,
}

impl WeightBounds {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Clamp a weight into range
    ///
    /// # Example
    /// ```
    /// use hypergraph_npu_neural::WeightBounds;
    ///
    /// let bounds = WeightBounds::new(0.0, 1.0);
    /// assert_eq!(bounds.clamp(1.5), 1.0);
    /// assert_eq!(bounds.clamp(-0.5), 0.0);
    /// assert_eq!(bounds.clamp(0.25), 0.25);
    /// ```
    #[inline]
    pub fn clamp(&self, weight: f32) -> f32 {
        if weight.is_nan() {
            return self.min;
        }
        weight.clamp(self.min, self.max)
    }

    #[inline]
    pub fn contains(&self, weight: f32) -> bool {
        weight >= self.min && weight <= self.max
    }
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

/// Apply `delta` to an atomic weight, clamped, returning the change actually applied
#[inline]
pub fn apply_weight_change(weight: &AtomicF32, delta: f32, bounds: WeightBounds) -> f32 {
    if !delta.is_finite() || delta == 0.0 {
        return 0.0;
    }
    let (old, new) = weight.add_clamped(delta, bounds.min, bounds.max);
    new - old
}

/// Multiply an atomic weight by `factor`, clamped, returning the change actually applied
#[inline]
pub fn scale_weight(weight: &AtomicF32, factor: f32, bounds: WeightBounds) -> f32 {
    if !factor.is_finite() || factor < 0.0 {
        return 0.0;
    }
    let (old, new) = weight.scale_clamped(factor, bounds.min, bounds.max);
    new - old
}
