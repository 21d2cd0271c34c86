// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-step statistics

use hypergraph_npu_neural::RegionId;
use hypergraph_npu_plasticity::{ConsolidationReport, LearningReport};
use hypergraph_npu_runtime::RegionStepReport;
use serde::Serialize;

/// One region's contribution to a step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionActivity {
    pub region: RegionId,
    pub fired: usize,
    pub total_activation: f64,
}

impl From<&RegionStepReport> for RegionActivity {
    fn from(report: &RegionStepReport) -> Self {
        Self {
            region: report.region,
            fired: report.fired,
            total_activation: report.total_activation,
        }
    }
}

/// Distribution of live synapse weights. All zeros when there are none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WeightSummary {
    pub count: usize,
    pub mean: f64,
    pub min: f32,
    pub max: f32,
    pub std_dev: f64,
}

impl WeightSummary {
    /// Population statistics, accumulated in f64 in iteration order
    pub fn from_weights(weights: impl IntoIterator<Item = f32>) -> Self {
        let mut count = 0usize;
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for w in weights {
            count += 1;
            sum += f64::from(w);
            sum_sq += f64::from(w) * f64::from(w);
            min = min.min(w);
            max = max.max(w);
        }
        if count == 0 {
            return Self::default();
        }
        let mean = sum / count as f64;
        let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
        Self {
            count,
            mean,
            min,
            max,
            std_dev: variance.sqrt(),
        }
    }
}

/// Aggregated result of one `process_step`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepStats {
    /// Step index (0-based)
    pub step: u64,
    pub dt: f32,
    pub regions_processed: usize,
    pub neurons_fired: usize,
    /// Sum of member activations, accumulated in region-id order
    pub total_activation: f64,
    pub mean_activation: f64,
    pub neuron_count: usize,
    pub synapse_count: usize,
    /// Taken after consolidation, like the counts above
    pub weights: WeightSummary,
    /// Registries and cached region indexes, in bytes
    pub estimated_memory_bytes: usize,
    /// Mean metabolic energy over live neurons
    pub mean_energy: f32,
    pub learning: LearningReport,
    /// Present only on steps where a consolidation pass ran
    pub consolidation: Option<ConsolidationReport>,
    /// Accelerator batches rerun on the CPU during this step
    pub backend_fallbacks: u64,
    pub duration_us: u64,
    /// Sorted by region id
    pub per_region: Vec<RegionActivity>,
}

impl StepStats {
    /// Fold region reports in region-id order so the float sum does not
    /// depend on execution order
    pub(crate) fn aggregate_regions(&mut self, reports: &[RegionStepReport]) {
        let mut activity: Vec<RegionActivity> = reports.iter().map(RegionActivity::from).collect();
        activity.sort_by_key(|a| a.region);

        self.regions_processed = activity.len();
        self.neurons_fired = activity.iter().map(|a| a.fired).sum();
        self.total_activation = activity.iter().map(|a| a.total_activation).sum();
        self.per_region = activity;
    }

    pub fn region(&self, id: RegionId) -> Option<&RegionActivity> {
        self.per_region.iter().find(|a| a.region == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_is_order_independent() {
        let reports = vec![
            RegionStepReport {
                region: RegionId(2),
                fired: 3,
                total_activation: 0.1,
            },
            RegionStepReport {
                region: RegionId(0),
                fired: 1,
                total_activation: 0.2,
            },
            RegionStepReport {
                region: RegionId(1),
                fired: 0,
                total_activation: 0.3,
            },
        ];
        let mut reversed = reports.clone();
        reversed.reverse();

        let mut a = StepStats::default();
        a.aggregate_regions(&reports);
        let mut b = StepStats::default();
        b.aggregate_regions(&reversed);

        assert_eq!(a, b);
        assert_eq!(a.neurons_fired, 4);
        assert_eq!(a.regions_processed, 3);
        assert_eq!(a.per_region[0].region, RegionId(0));
        assert_eq!(a.region(RegionId(2)).unwrap().fired, 3);
    }

    #[test]
    fn test_stats_serialize() {
        let json = serde_json::to_value(StepStats::default()).unwrap();
        assert_eq!(json["step"], 0);
        assert!(json["consolidation"].is_null());
        assert_eq!(json["weights"]["count"], 0);
        assert_eq!(json["estimated_memory_bytes"], 0);
    }

    #[test]
    fn test_weight_summary() {
        assert_eq!(WeightSummary::from_weights(Vec::new()), WeightSummary::default());

        let summary = WeightSummary::from_weights([0.2, 0.4, 0.6]);
        assert_eq!(summary.count, 3);
        assert!((summary.mean - 0.4).abs() < 1e-6);
        assert_eq!(summary.min, 0.2);
        assert_eq!(summary.max, 0.6);
        // population deviation of {0.2, 0.4, 0.6}
        assert!((summary.std_dev - (0.08f64 / 3.0).sqrt()).abs() < 1e-6);

        let flat = WeightSummary::from_weights([0.5; 10]);
        assert_eq!(flat.mean, 0.5);
        assert_eq!(flat.std_dev, 0.0);
    }
}
