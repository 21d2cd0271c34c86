// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Learning system - orchestrates rule updates, rewards and consolidation
//!
//! The system never holds a reference to the brain or the topology; both are
//! passed in on every call. Per-step updates need only `&Topology` (weights
//! are atomics); consolidation changes structure and takes `&mut Topology`.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use hypergraph_config::LearningConfig;
use hypergraph_npu_accelerator::OffloadPath;
use hypergraph_npu_neural::RegionId;
use hypergraph_npu_runtime::{Region, Topology};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::homeostasis::apply_homeostasis;
use crate::structural::{grow, prune};
use crate::update::{update_region, LearningView, UpdateCounts};

/// Learning process state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum LearningState {
    Idle = 0,
    Updating = 1,
    Consolidating = 2,
}

impl LearningState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LearningState::Updating,
            2 => LearningState::Consolidating,
            _ => LearningState::Idle,
        }
    }
}

/// Aggregate of one `update` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LearningReport {
    pub regions: usize,
    pub counts: UpdateCounts,
    pub rewards_delivered: usize,
}

/// Structural and homeostatic changes from one consolidation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationReport {
    pub pruned: usize,
    pub grown: usize,
    pub growth_rejected: usize,
    pub rescaled: usize,
}

/// Which consolidation passes are due at a step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsolidationDue {
    pub homeostasis: bool,
    pub structural: bool,
}

impl ConsolidationDue {
    pub fn any(&self) -> bool {
        self.homeostasis || self.structural
    }
}

/// Where the per-region passes of one update run
#[derive(Debug, Clone, Copy, Default)]
pub enum Execution<'a> {
    /// On the calling thread, in region-id order
    #[default]
    Serial,
    /// Fork/join over regions, on the given pool or rayon's global one
    Parallel(Option<&'a rayon::ThreadPool>),
}

pub struct LearningSystem {
    config: LearningConfig,
    state: AtomicU8,
    rewards: Mutex<Vec<(RegionId, f32)>>,
    views: Mutex<AHashMap<RegionId, Arc<LearningView>>>,
}

impl std::fmt::Debug for LearningSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearningSystem")
            .field("state", &self.state())
            .field("pending_rewards", &self.rewards.lock().len())
            .finish()
    }
}

impl LearningSystem {
    pub fn new(config: LearningConfig) -> Self {
        Self {
            config,
            state: AtomicU8::new(LearningState::Idle as u8),
            rewards: Mutex::new(Vec::new()),
            views: Mutex::new(AHashMap::new()),
        }
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    pub fn state(&self) -> LearningState {
        LearningState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: LearningState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Queue a reward for the region's reward-modulated synapses.
    ///
    /// Applied during the next update. Non-finite rewards are ignored.
    pub fn deliver_reward(&self, region: RegionId, reward: f32) {
        if reward.is_finite() {
            self.rewards.lock().push((region, reward));
        }
    }

    pub fn pending_rewards(&self) -> Vec<(RegionId, f32)> {
        self.rewards.lock().clone()
    }

    pub fn restore_rewards(&self, rewards: Vec<(RegionId, f32)>) {
        *self.rewards.lock() = rewards;
    }

    /// Cached learning view, rebuilt when the topology version moved
    fn view(&self, topology: &Topology, region: RegionId) -> Arc<LearningView> {
        let version = topology.version();
        if let Some(view) = self.views.lock().get(&region) {
            if view.version == version {
                return Arc::clone(view);
            }
        }
        let view = Arc::new(LearningView::build(topology, region));
        self.views.lock().insert(region, Arc::clone(&view));
        view
    }

    /// Apply every plasticity rule and any queued rewards
    pub fn update(
        &self,
        topology: &Topology,
        step: u64,
        dt: f32,
        backend: &OffloadPath,
        execution: Execution<'_>,
    ) -> LearningReport {
        let rewards = std::mem::take(&mut *self.rewards.lock());
        if !self.config.enabled {
            return LearningReport::default();
        }
        self.set_state(LearningState::Updating);

        let mut reward_by_region: AHashMap<RegionId, f32> = AHashMap::new();
        for &(region, reward) in &rewards {
            *reward_by_region.entry(region).or_insert(0.0) += reward;
        }

        let regions: Vec<&Region> = topology.regions().filter(|r| r.plasticity_enabled).collect();
        let work: Vec<(RegionId, Arc<LearningView>, f32)> = regions
            .iter()
            .map(|r| {
                let reward = reward_by_region.get(&r.id).copied().unwrap_or(0.0);
                (r.id, self.view(topology, r.id), reward)
            })
            .collect();

        let learn = |(region, view, reward): &(RegionId, Arc<LearningView>, f32)| {
            update_region(topology, *region, view, &self.config, step, dt, *reward, backend)
        };
        let counts = match execution {
            Execution::Serial => work
                .iter()
                .map(learn)
                .fold(UpdateCounts::default(), UpdateCounts::merge),
            Execution::Parallel(pool) => {
                // Regions learn over disjoint synapse sets
                let run = || {
                    work.par_iter()
                        .map(learn)
                        .reduce(UpdateCounts::default, UpdateCounts::merge)
                };
                match pool {
                    Some(pool) => pool.install(run),
                    None => run(),
                }
            }
        };

        self.set_state(LearningState::Idle);
        LearningReport {
            regions: work.len(),
            counts,
            rewards_delivered: rewards.len(),
        }
    }

    /// Which passes run after `step` (0-based; a pass with interval N runs
    /// after steps N-1, 2N-1, ...)
    pub fn consolidation_due(&self, step: u64) -> ConsolidationDue {
        let due = |enabled: bool, interval: u64| {
            self.config.enabled && enabled && interval > 0 && (step + 1) % interval == 0
        };
        ConsolidationDue {
            homeostasis: due(self.config.homeostasis.enabled, self.config.homeostasis.interval),
            structural: due(self.config.structural.enabled, self.config.structural.interval),
        }
    }

    /// Run the due passes: homeostatic scaling, then pruning, then growth
    pub fn consolidate(
        &self,
        topology: &mut Topology,
        step: u64,
        due: ConsolidationDue,
    ) -> ConsolidationReport {
        let mut report = ConsolidationReport::default();
        if !due.any() {
            return report;
        }
        self.set_state(LearningState::Consolidating);

        if due.homeostasis {
            report.rescaled = apply_homeostasis(
                topology,
                &self.config.homeostasis,
                self.config.homeostasis.interval,
            );
        }
        if due.structural {
            let structural = &self.config.structural;
            report.pruned = prune(topology, structural.prune_threshold);
            let growth = grow(topology, structural, self.config.seed, step);
            report.grown = growth.grown;
            report.growth_rejected = growth.rejected;
        }

        debug!(
            "Consolidation at step {}: pruned {}, grown {}, rescaled {}",
            step, report.pruned, report.grown, report.rescaled
        );
        self.set_state(LearningState::Idle);
        report
    }

    /// Drop cached views (after the topology is replaced wholesale)
    pub fn invalidate(&self) {
        self.views.lock().clear();
    }
}
