// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Homeostatic synaptic scaling
//!
//! ```text
//! rate   = fires in window / window
//! factor = clamp(1 + gain·(target − rate) / max(target, ε), 1 − max_step, 1 + max_step)
//! ```
//!
//! Applied to every valid afferent weight of a neuron whose rate misses the
//! target by more than the tolerance. Fire counters restart each window.

use hypergraph_config::HomeostasisConfig;
use hypergraph_npu_runtime::Topology;

/// Scaling factor for one neuron, or `None` when within tolerance
pub fn scaling_factor(rate: f32, config: &HomeostasisConfig) -> Option<f32> {
    if (rate - config.target_rate).abs() <= config.tolerance {
        return None;
    }
    let error = (config.target_rate - rate) / config.target_rate.max(f32::EPSILON);
    let max_step = config.max_step.clamp(0.0, 1.0);
    Some((1.0 + config.gain * error).clamp(1.0 - max_step, 1.0 + max_step))
}

/// Rescale afferent weights over a window of `window` steps.
///
/// Returns the number of neurons whose inputs were rescaled.
pub fn apply_homeostasis(topology: &Topology, config: &HomeostasisConfig, window: u64) -> usize {
    let synapses = topology.synapses();
    let bounds = topology.weight_bounds();
    let window = window.max(1) as f32;
    let mut rescaled = 0;

    for neuron in topology.neurons().iter_valid() {
        let rate = neuron.take_fire_count() as f32 / window;
        let Some(factor) = scaling_factor(rate, config) else {
            continue;
        };
        let incoming = synapses.incoming(neuron.id);
        if incoming.is_empty() {
            continue;
        }
        for &slot in incoming {
            if let Some(synapse) = synapses.get_index(slot) {
                synapse.scale(factor, bounds);
            }
        }
        rescaled += 1;
    }
    rescaled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_direction() {
        let config = HomeostasisConfig::default();
        let high = scaling_factor(0.5, &config).unwrap();
        let low = scaling_factor(0.0, &config).unwrap();
        assert!(high < 1.0);
        assert!(low > 1.0);
        assert!(scaling_factor(config.target_rate, &config).is_none());
    }

    #[test]
    fn test_factor_is_bounded() {
        let config = HomeostasisConfig::default();
        assert_eq!(scaling_factor(1.0, &config), Some(1.0 - config.max_step));
        assert_eq!(scaling_factor(0.0, &config), Some(1.0 + config.max_step));
    }
}
