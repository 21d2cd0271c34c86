// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Every check appends to one list so a malformed file reports all of its
//! problems at once. Validation runs before any region exists.

use crate::{ConfigError, ConfigResult, HypergraphConfig};
use std::fmt;

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    NegativeRate { field: String, value: f32 },
    InvertedBounds { field: String, min: f32, max: f32 },
    OutOfRange { field: String, value: f32, min: f32, max: f32 },
    InvalidValue { field: String, reason: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeRate { field, value } => {
                write!(f, "{} = {} must be a finite, non-negative value", field, value)
            }
            Self::InvertedBounds { field, min, max } => {
                write!(f, "{} bounds are inverted: min {} > max {}", field, min, max)
            }
            Self::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(f, "{} = {} is outside [{}, {}]", field, value, min, max),
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation
pub fn validate_config(config: &HypergraphConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_neuron(config, &mut errors);
    validate_synapse(config, &mut errors);
    validate_learning(config, &mut errors);
    validate_metabolism(config, &mut errors);
    validate_accelerator(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn non_negative(field: &str, value: f32, errors: &mut Vec<ConfigValidationError>) {
    if !value.is_finite() || value < 0.0 {
        errors.push(ConfigValidationError::NegativeRate {
            field: field.to_string(),
            value,
        });
    }
}

fn positive(field: &str, value: f32, errors: &mut Vec<ConfigValidationError>) {
    if !value.is_finite() || value <= 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: field.to_string(),
            reason: format!("{} must be a finite value greater than zero", value),
        });
    }
}

fn in_range(field: &str, value: f32, min: f32, max: f32, errors: &mut Vec<ConfigValidationError>) {
    if !value.is_finite() || value < min || value > max {
        errors.push(ConfigValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
}

fn ordered(field: &str, min: f32, max: f32, errors: &mut Vec<ConfigValidationError>) {
    if !min.is_finite() || !max.is_finite() || min > max {
        errors.push(ConfigValidationError::InvertedBounds {
            field: field.to_string(),
            min,
            max,
        });
    }
}

fn validate_neuron(config: &HypergraphConfig, errors: &mut Vec<ConfigValidationError>) {
    let neuron = &config.neuron;
    if neuron.activation_min >= neuron.activation_max {
        errors.push(ConfigValidationError::InvertedBounds {
            field: "neuron.activation".to_string(),
            min: neuron.activation_min,
            max: neuron.activation_max,
        });
    }
    if !neuron.threshold.is_finite() {
        errors.push(ConfigValidationError::InvalidValue {
            field: "neuron.threshold".to_string(),
            reason: "must be finite".to_string(),
        });
    }
    non_negative("neuron.decay_rate", neuron.decay_rate, errors);
    non_negative("neuron.input_gain", neuron.input_gain, errors);
    non_negative("neuron.initial_bcm_theta", neuron.initial_bcm_theta, errors);
    in_range("neuron.min_fire_energy", neuron.min_fire_energy, 0.0, 1.0, errors);
}

fn validate_synapse(config: &HypergraphConfig, errors: &mut Vec<ConfigValidationError>) {
    let synapse = &config.synapse;
    ordered("synapse.weight", synapse.weight_min, synapse.weight_max, errors);
    if synapse.default_delay == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "synapse.default_delay".to_string(),
            reason: "delay must be at least one step".to_string(),
        });
    }
}

fn validate_learning(config: &HypergraphConfig, errors: &mut Vec<ConfigValidationError>) {
    let learning = &config.learning;
    in_range("learning.update_fraction", learning.update_fraction, 0.0, 1.0, errors);

    non_negative("learning.hebbian.learning_rate", learning.hebbian.learning_rate, errors);
    non_negative("learning.stdp.a_plus", learning.stdp.a_plus, errors);
    non_negative("learning.stdp.a_minus", learning.stdp.a_minus, errors);
    positive("learning.stdp.tau_plus", learning.stdp.tau_plus, errors);
    positive("learning.stdp.tau_minus", learning.stdp.tau_minus, errors);
    non_negative("learning.bcm.learning_rate", learning.bcm.learning_rate, errors);
    positive("learning.bcm.theta_tau", learning.bcm.theta_tau, errors);
    non_negative("learning.oja.learning_rate", learning.oja.learning_rate, errors);
    in_range("learning.reward.trace_decay", learning.reward.trace_decay, 0.0, 1.0, errors);
    non_negative("learning.reward.learning_rate", learning.reward.learning_rate, errors);

    let homeostasis = &learning.homeostasis;
    if homeostasis.enabled && homeostasis.interval == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "learning.homeostasis.interval".to_string(),
            reason: "interval must be at least one step".to_string(),
        });
    }
    in_range("learning.homeostasis.target_rate", homeostasis.target_rate, 0.0, 1.0, errors);
    non_negative("learning.homeostasis.tolerance", homeostasis.tolerance, errors);
    non_negative("learning.homeostasis.gain", homeostasis.gain, errors);
    in_range("learning.homeostasis.max_step", homeostasis.max_step, 0.0, 0.99, errors);

    let structural = &learning.structural;
    if structural.enabled && structural.interval == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "learning.structural.interval".to_string(),
            reason: "interval must be at least one step".to_string(),
        });
    }
    if !structural.prune_threshold.is_finite() {
        errors.push(ConfigValidationError::InvalidValue {
            field: "learning.structural.prune_threshold".to_string(),
            reason: "must be finite".to_string(),
        });
    }
    in_range(
        "learning.structural.growth_probability",
        structural.growth_probability,
        0.0,
        1.0,
        errors,
    );
    in_range(
        "learning.structural.initial_weight",
        structural.initial_weight,
        config.synapse.weight_min,
        config.synapse.weight_max,
        errors,
    );

    let gates = &learning.attention.rule_gates;
    non_negative("learning.attention.rule_gates.hebbian", gates.hebbian, errors);
    non_negative("learning.attention.rule_gates.stdp", gates.stdp, errors);
    non_negative("learning.attention.rule_gates.bcm", gates.bcm, errors);
    non_negative("learning.attention.rule_gates.oja", gates.oja, errors);
    non_negative("learning.attention.rule_gates.reward", gates.reward, errors);
}

fn validate_metabolism(config: &HypergraphConfig, errors: &mut Vec<ConfigValidationError>) {
    let metabolism = &config.metabolism;
    non_negative("metabolism.fire_cost", metabolism.fire_cost, errors);
    in_range("metabolism.recovery_rate", metabolism.recovery_rate, 0.0, 1.0, errors);
    in_range("metabolism.health_rate", metabolism.health_rate, 0.0, 1.0, errors);
}

fn validate_accelerator(config: &HypergraphConfig, errors: &mut Vec<ConfigValidationError>) {
    match config.accelerator.backend.to_lowercase().as_str() {
        "cpu" | "wgpu" | "gpu" | "auto" => {}
        other => errors.push(ConfigValidationError::InvalidValue {
            field: "accelerator.backend".to_string(),
            reason: format!("unknown backend '{}' (expected cpu, wgpu or auto)", other),
        }),
    }
    if config.accelerator.force_cpu && config.accelerator.force_gpu {
        errors.push(ConfigValidationError::InvalidValue {
            field: "accelerator".to_string(),
            reason: "force_cpu and force_gpu are mutually exclusive".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &HypergraphConfig) -> String {
        match validate_config(config) {
            Err(ConfigError::ValidationError(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_inverted_weight_bounds() {
        let mut config = HypergraphConfig::default();
        config.synapse.weight_min = 1.0;
        config.synapse.weight_max = 0.5;
        config.learning.structural.initial_weight = 0.75;
        assert!(messages(&config).contains("synapse.weight bounds are inverted"));
    }

    #[test]
    fn test_negative_rates() {
        let mut config = HypergraphConfig::default();
        config.learning.hebbian.learning_rate = -0.1;
        config.learning.oja.learning_rate = f32::NAN;
        let msg = messages(&config);
        assert!(msg.contains("learning.hebbian.learning_rate"));
        assert!(msg.contains("learning.oja.learning_rate"));
    }

    #[test]
    fn test_all_errors_reported_together() {
        let mut config = HypergraphConfig::default();
        config.learning.update_fraction = 1.5;
        config.synapse.default_delay = 0;
        config.accelerator.backend = "tpu".to_string();
        let msg = messages(&config);
        assert_eq!(msg.lines().count(), 4); // header + 3 violations
    }

    #[test]
    fn test_disabled_homeostasis_allows_zero_interval() {
        let mut config = HypergraphConfig::default();
        config.learning.homeostasis.enabled = false;
        config.learning.homeostasis.interval = 0;
        assert!(validate_config(&config).is_ok());
    }
}
