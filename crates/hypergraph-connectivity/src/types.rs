// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Declarative connection plans.

A plan is a list of rules; each rule names a source and target region, which
pairs are eligible (`ConnectivityType`), how distance maps to a connection
probability and how initial weights are drawn (`Distribution`).
*/

use hypergraph_npu_neural::{PlasticityRule, RegionId};
use serde::{Deserialize, Serialize};

/// Eligible pair set of a rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityType {
    /// source -> target
    Feedforward,
    /// target -> source
    Feedback,
    /// Within the source region
    Lateral,
    /// source -> target and target -> source
    Reciprocal,
    /// All ordered pairs over both regions
    Global,
    /// At most `fan_out` sampled targets per source neuron
    Sparse { fan_out: usize },
    /// All source x target pairs at the base probability
    Dense,
    /// Block structure by relative index
    Modular {
        modules: usize,
        inter_module_factor: f32,
    },
}

/// Distance-to-probability profile and initial weight sampler
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    #[default]
    Uniform,
    Gaussian { sigma: f32 },
    Exponential { lambda: f32 },
    PowerLaw { alpha: f32 },
    /// Dense within distance `k`, sparse `beta` rewiring beyond it
    SmallWorld { k: f32, beta: f32 },
}

/// Initial weight parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightSpec {
    pub mean: f32,
    pub spread: f32,
}

impl Default for WeightSpec {
    fn default() -> Self {
        Self {
            mean: 0.5,
            spread: 0.1,
        }
    }
}

/// One connection rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRule {
    pub source: RegionId,
    pub target: RegionId,
    pub connectivity: ConnectivityType,
    #[serde(default)]
    pub distribution: Distribution,
    /// Base connection probability in [0, 1]
    #[serde(default = "default_probability")]
    pub probability: f32,
    #[serde(default)]
    pub plasticity_rule: PlasticityRule,
    /// Delay in steps; the region-type default when absent
    #[serde(default)]
    pub delay: Option<u32>,
    #[serde(default)]
    pub weight: WeightSpec,
}

fn default_probability() -> f32 {
    0.1
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

impl ConnectionRule {
    pub fn new(source: RegionId, target: RegionId, connectivity: ConnectivityType) -> Self {
        Self {
            source,
            target,
            connectivity,
            distribution: Distribution::Uniform,
            probability: default_probability(),
            plasticity_rule: PlasticityRule::Hebbian,
            delay: None,
            weight: WeightSpec::default(),
        }
    }

    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn with_probability(mut self, probability: f32) -> Self {
        self.probability = probability;
        self
    }

    pub fn with_rule(mut self, rule: PlasticityRule) -> Self {
        self.plasticity_rule = rule;
        self
    }

    pub fn with_delay(mut self, delay: u32) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_weight(mut self, mean: f32, spread: f32) -> Self {
        self.weight = WeightSpec { mean, spread };
        self
    }

    /// Check parameters that would make sampling meaningless
    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();
        if !(0.0..=1.0).contains(&self.probability) {
            errors.push(format!("probability {} outside [0, 1]", self.probability));
        }
        if !self.weight.mean.is_finite() || !self.weight.spread.is_finite() || self.weight.spread < 0.0
        {
            errors.push(format!(
                "weight mean {} / spread {} invalid",
                self.weight.mean, self.weight.spread
            ));
        }
        if self.delay == Some(0) {
            errors.push("delay must be at least 1 step".to_string());
        }
        match self.connectivity {
            ConnectivityType::Sparse { fan_out: 0 } => errors.push("fan_out must be > 0".to_string()),
            ConnectivityType::Modular {
                modules,
                inter_module_factor,
            } => {
                if modules == 0 {
                    errors.push("modules must be > 0".to_string());
                }
                if !(0.0..=1.0).contains(&inter_module_factor) {
                    errors.push(format!(
                        "inter_module_factor {} outside [0, 1]",
                        inter_module_factor
                    ));
                }
            }
            _ => {}
        }
        match self.distribution {
            Distribution::Gaussian { sigma } if !positive(sigma) => {
                errors.push(format!("gaussian sigma {} must be > 0", sigma))
            }
            Distribution::Exponential { lambda } if !positive(lambda) => {
                errors.push(format!("exponential lambda {} must be > 0", lambda))
            }
            Distribution::PowerLaw { alpha } if !positive(alpha) => {
                errors.push(format!("power-law alpha {} must be > 0", alpha))
            }
            Distribution::SmallWorld { k, beta } if !(k.is_finite() && k >= 0.0) || !(0.0..=1.0).contains(&beta) => {
                errors.push(format!("small-world k {} / beta {} invalid", k, beta))
            }
            _ => {}
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("; "))
        }
    }
}

/// Ordered list of rules plus an optional seed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityPlan {
    /// Overrides the manager's seed
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub rules: Vec<ConnectionRule>,
}

impl ConnectivityPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn rule(mut self, rule: ConnectionRule) -> Self {
        self.rules.push(rule);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_validation() {
        let rule = ConnectionRule::new(RegionId(0), RegionId(1), ConnectivityType::Feedforward);
        assert!(rule.validate().is_ok());

        let bad = rule
            .clone()
            .with_probability(1.5)
            .with_distribution(Distribution::Gaussian { sigma: 0.0 });
        let message = bad.validate().unwrap_err();
        assert!(message.contains("probability"));
        assert!(message.contains("sigma"));

        let sparse = ConnectionRule::new(RegionId(0), RegionId(1), ConnectivityType::Sparse { fan_out: 0 });
        assert!(sparse.validate().is_err());
    }

    #[test]
    fn test_plan_from_json() {
        let json = r#"{
            "seed": 7,
            "rules": [
                {"source": 0, "target": 1, "connectivity": "feedforward"},
                {"source": 1, "target": 1, "connectivity": {"sparse": {"fan_out": 4}},
                 "distribution": {"gaussian": {"sigma": 2.0}}, "probability": 0.5,
                 "plasticity_rule": "Oja"}
            ]
        }"#;
        let plan: ConnectivityPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.seed, Some(7));
        assert_eq!(plan.rules.len(), 2);
        assert_eq!(plan.rules[0].probability, 0.1);
        assert_eq!(plan.rules[1].connectivity, ConnectivityType::Sparse { fan_out: 4 });
        assert_eq!(plan.rules[1].plasticity_rule, PlasticityRule::Oja);
    }
}
