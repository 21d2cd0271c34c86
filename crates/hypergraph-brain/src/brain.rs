// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! The top-level orchestrator
//!
//! One step, in order:
//! 1. pre-step hooks
//! 2. queued inputs delivered
//! 3. regions processed (sequential, parallel, hierarchical or custom order)
//! 4. metabolic energy/health update
//! 5. learning update, then consolidation when due
//! 6. statistics aggregated, published to the sink, post-step hooks
//!
//! Per-step work holds the topology read lock; only consolidation and
//! structural calls take the write lock. Structural calls also take the step
//! lock, so they land between steps and never between the phases of one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use hypergraph_config::{validate_config, HypergraphConfig};
use hypergraph_connectivity::{BuildReport, ConnectivityManager, ConnectivityPlan};
use hypergraph_npu_accelerator::{ComputeBackend, OffloadPath};
use hypergraph_npu_neural::{NeuralError, Neuron, NeuronId, RegionId};
use hypergraph_npu_plasticity::{Execution, LearningState, LearningSystem};
use hypergraph_npu_runtime::{
    ProcessingMode, RegionLayout, RegionSpec, RegionStats, RegionStepReport, Topology, TopologyError,
};
use hypergraph_serialization::{decode, encode, BrainSnapshot};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use tracing::{debug, info, trace, warn};

use crate::error::{BrainError, BrainResult};
use crate::lifecycle::{BrainState, Lifecycle};
use crate::schedule::{dependency_order, normalize_order, Scheduling};
use crate::stats::{StepStats, WeightSummary};

type StepHook = Box<dyn Fn(u64) + Send + Sync>;
type StatsHook = Box<dyn Fn(&StepStats) + Send + Sync>;

/// States in which the topology can be exported or replaced
const QUIESCENT: [BrainState; 2] = [BrainState::Paused, BrainState::Initializing];

pub struct HypergraphBrain {
    config: HypergraphConfig,
    lifecycle: Lifecycle,

    /// Held for the whole of a step; a second caller gets `Busy`
    step_lock: Mutex<()>,
    topology: RwLock<Topology>,
    learning: LearningSystem,

    backend: RwLock<OffloadPath>,
    /// Set when the caller chose the backend; `start` then keeps it
    backend_pinned: AtomicBool,

    scheduling: RwLock<Scheduling>,
    pool: Option<rayon::ThreadPool>,

    step_counter: AtomicU64,
    last_stats: RwLock<Option<StepStats>>,
    pending_inputs: Mutex<Vec<(RegionId, Vec<f32>)>>,

    pre_step_hooks: RwLock<Vec<StepHook>>,
    post_step_hooks: RwLock<Vec<StatsHook>>,
    stats_sink: RwLock<Option<StatsHook>>,
}

impl std::fmt::Debug for HypergraphBrain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HypergraphBrain")
            .field("state", &self.state())
            .field("step", &self.current_step())
            .field("scheduling", &*self.scheduling.read())
            .field("backend", &self.backend_name())
            .finish()
    }
}

impl HypergraphBrain {
    /// Validate the configuration and create an empty, uninitialized brain
    pub fn new(config: HypergraphConfig) -> BrainResult<Self> {
        validate_config(&config)?;

        let topology = Topology::new(config.neuron, config.synapse);
        let pool = build_pool(config.scheduling.worker_threads);
        let scheduling = Scheduling::from(config.scheduling.mode);
        let learning = LearningSystem::new(config.learning.clone());

        info!(
            "Created hypergraph brain (scheduling: {}, learning: {}, backend: {})",
            scheduling.name(),
            if config.learning.enabled { "on" } else { "off" },
            config.accelerator.backend
        );

        Ok(Self {
            config,
            lifecycle: Lifecycle::new(BrainState::Uninitialized),
            step_lock: Mutex::new(()),
            topology: RwLock::new(topology),
            learning,
            backend: RwLock::new(OffloadPath::cpu_only()),
            backend_pinned: AtomicBool::new(false),
            scheduling: RwLock::new(scheduling),
            pool,
            step_counter: AtomicU64::new(0),
            last_stats: RwLock::new(None),
            pending_inputs: Mutex::new(Vec::new()),
            pre_step_hooks: RwLock::new(Vec::new()),
            post_step_hooks: RwLock::new(Vec::new()),
            stats_sink: RwLock::new(None),
        })
    }

    /// Rebuild a brain from an exported blob. The result is Paused.
    pub fn import(blob: &[u8], config: HypergraphConfig) -> BrainResult<Self> {
        let brain = Self::new(config)?;
        brain.lifecycle.force(BrainState::Paused);
        brain.restore(blob)?;
        Ok(brain)
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    pub fn state(&self) -> BrainState {
        self.lifecycle.get()
    }

    /// Enter Initializing (regions may be added until `start`)
    pub fn initialize(&self) -> BrainResult<()> {
        self.lifecycle.transition(
            "initialize",
            &[BrainState::Uninitialized, BrainState::Initializing],
            BrainState::Initializing,
        )?;
        Ok(())
    }

    /// Finish construction and begin accepting steps
    pub fn start(&self) -> BrainResult<()> {
        let state = self.state();
        if !state.is_building() {
            return Err(BrainError::InvalidTransition {
                operation: "start",
                state,
            });
        }
        if matches!(*self.scheduling.read(), Scheduling::Hierarchical) {
            self.check_dependencies(None)?;
        }

        {
            let topology = self.topology.read();
            topology.warm_views();
            if !self.backend_pinned.load(Ordering::Acquire) {
                *self.backend.write() = OffloadPath::from_config(
                    &self.config.accelerator,
                    topology.neuron_count(),
                    topology.synapse_count(),
                );
            }
            info!(
                "Starting brain: {} regions, {} neurons, {} synapses, backend {}",
                topology.region_count(),
                topology.neuron_count(),
                topology.synapse_count(),
                self.backend_name()
            );
        }

        self.lifecycle.transition(
            "start",
            &[BrainState::Uninitialized, BrainState::Initializing],
            BrainState::Running,
        )?;
        Ok(())
    }

    /// Stop after the in-flight step, if any.
    ///
    /// Blocks until that step finishes; from inside a hook use
    /// [`request_pause`](Self::request_pause) instead.
    pub fn pause(&self) -> BrainResult<()> {
        let _step = self.step_lock.lock();
        self.lifecycle
            .transition("pause", &[BrainState::Running], BrainState::Paused)?;
        info!("Brain paused at step {}", self.current_step());
        Ok(())
    }

    /// Ask for a pause without waiting; the next step boundary observes it
    pub fn request_pause(&self) -> BrainResult<()> {
        self.lifecycle
            .transition("pause", &[BrainState::Running], BrainState::Paused)?;
        Ok(())
    }

    pub fn resume(&self) -> BrainResult<()> {
        let _step = self.step_lock.lock();
        self.lifecycle
            .transition("resume", &[BrainState::Paused], BrainState::Running)?;
        info!("Brain resumed at step {}", self.current_step());
        Ok(())
    }

    /// Clear transient dynamics and the step counter; weights and structure
    /// are kept. The brain ends up Paused.
    pub fn reset(&self) -> BrainResult<()> {
        let _step = self.step_lock.lock();
        self.lifecycle.transition(
            "reset",
            &[BrainState::Running, BrainState::Paused],
            BrainState::Resetting,
        )?;

        self.topology.read().reset_dynamics();
        self.step_counter.store(0, Ordering::Release);
        self.pending_inputs.lock().clear();
        self.learning.restore_rewards(Vec::new());
        *self.last_stats.write() = None;

        self.lifecycle.force(BrainState::Paused);
        info!("Brain reset");
        Ok(())
    }

    /// Terminal. Waits for the in-flight step.
    pub fn shutdown(&self) {
        let _step = self.step_lock.lock();
        if self.state() != BrainState::Shutdown {
            self.lifecycle.force(BrainState::Shutdown);
            info!("Brain shut down after {} steps", self.current_step());
        }
    }

    // ---------------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------------

    fn enter_building(&self, operation: &'static str) -> BrainResult<()> {
        self.lifecycle.transition(
            operation,
            &[BrainState::Uninitialized, BrainState::Initializing],
            BrainState::Initializing,
        )?;
        Ok(())
    }

    /// Create a region. Only while the brain is being built.
    pub fn add_region(&self, spec: RegionSpec) -> BrainResult<RegionId> {
        self.enter_building("add region")?;
        let id = self.topology.write().add_region(spec).map_err(not_found)?;
        Ok(id)
    }

    /// Generate synapses from a declarative plan
    pub fn connect(&self, plan: &ConnectivityPlan) -> BrainResult<BuildReport> {
        let _step = self.step_lock.lock();
        if self.state() != BrainState::Paused {
            self.enter_building("connect")?;
        }
        let manager = ConnectivityManager::new(self.config.connectivity.seed);
        let mut topology = self.topology.write();
        Ok(manager.build(&mut topology, plan))
    }

    // Structural calls below wait for an in-flight step to finish. Like
    // `pause`, they must not be called from a step hook.

    pub fn add_neuron(&self, region: RegionId, position: Option<[f32; 3]>) -> BrainResult<NeuronId> {
        let _step = self.step_lock.lock();
        self.topology
            .write()
            .add_neuron(region, position)
            .map_err(not_found)
    }

    /// Tombstone a neuron; its synapses are pruned by the next structural pass
    pub fn remove_neuron(&self, id: NeuronId) -> BrainResult<()> {
        let _step = self.step_lock.lock();
        self.topology.write().remove_neuron(id).map_err(not_found)
    }

    pub fn set_processing_mode(&self, region: RegionId, mode: ProcessingMode) -> BrainResult<()> {
        let _step = self.step_lock.lock();
        self.topology
            .write()
            .set_processing_mode(region, mode)
            .map_err(not_found)
    }

    pub fn set_plasticity(&self, region: RegionId, enabled: bool) -> BrainResult<()> {
        let _step = self.step_lock.lock();
        self.topology
            .write()
            .set_plasticity_enabled(region, enabled)
            .map_err(not_found)
    }

    /// Declare which regions must run before `region` in hierarchical mode.
    ///
    /// Under hierarchical scheduling a cycle is rejected and nothing changes.
    pub fn set_region_dependencies(&self, region: RegionId, depends_on: Vec<RegionId>) -> BrainResult<()> {
        let _step = self.step_lock.lock();
        if matches!(*self.scheduling.read(), Scheduling::Hierarchical) {
            self.check_dependencies(Some((region, &depends_on)))?;
        }
        self.topology
            .write()
            .set_depends_on(region, depends_on)
            .map_err(not_found)
    }

    /// Switch scheduling; effective from the next step
    pub fn set_scheduling(&self, scheduling: Scheduling) -> BrainResult<()> {
        let _step = self.step_lock.lock();
        if matches!(scheduling, Scheduling::Hierarchical) {
            self.check_dependencies(None)?;
        }
        debug!("Scheduling set to {}", scheduling.name());
        *self.scheduling.write() = scheduling;
        Ok(())
    }

    /// Use this backend from now on instead of the configured selection
    pub fn set_backend(&self, backend: Box<dyn ComputeBackend>) {
        let path = OffloadPath::new(backend);
        info!("Compute backend set to {}", path.backend_name());
        *self.backend.write() = path;
        self.backend_pinned.store(true, Ordering::Release);
    }

    /// Verify the dependency graph, optionally with one region's list replaced
    fn check_dependencies(&self, replace: Option<(RegionId, &[RegionId])>) -> BrainResult<()> {
        let topology = self.topology.read();
        if let Some((region, _)) = replace {
            if topology.region(region).is_none() {
                return Err(BrainError::RegionNotFound(region));
            }
        }
        let graph: Vec<(RegionId, Vec<RegionId>)> = topology
            .regions()
            .map(|r| match replace {
                Some((id, deps)) if id == r.id => (r.id, deps.to_vec()),
                _ => (r.id, r.depends_on.clone()),
            })
            .collect();
        dependency_order(&graph)
            .map(|_| ())
            .map_err(BrainError::CircularDependency)
    }

    // ---------------------------------------------------------------------
    // Inputs
    // ---------------------------------------------------------------------

    /// Queue external input for the next step. Element `i` goes to the
    /// region's `i`-th neuron; extra elements are ignored.
    pub fn inject_input(&self, region: RegionId, values: &[f32]) -> BrainResult<()> {
        if self.topology.read().region(region).is_none() {
            return Err(BrainError::RegionNotFound(region));
        }
        self.pending_inputs.lock().push((region, values.to_vec()));
        Ok(())
    }

    /// Queue a reward for the region's reward-modulated synapses
    pub fn deliver_reward(&self, region: RegionId, reward: f32) -> BrainResult<()> {
        if !reward.is_finite() {
            return Err(NeuralError::InvalidParameter(format!("reward {}", reward)).into());
        }
        if self.topology.read().region(region).is_none() {
            return Err(BrainError::RegionNotFound(region));
        }
        self.learning.deliver_reward(region, reward);
        Ok(())
    }

    /// Scale a neuron's plasticity by `multiplier` (negative values clamp to 0)
    pub fn set_attention(&self, neuron: NeuronId, multiplier: f32) -> BrainResult<()> {
        if !multiplier.is_finite() {
            return Err(NeuralError::InvalidParameter(format!("attention {}", multiplier)).into());
        }
        let topology = self.topology.read();
        let neuron = topology
            .neuron(neuron)
            .ok_or(BrainError::NeuronNotFound(neuron))?;
        neuron.set_attention(multiplier);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Hooks
    // ---------------------------------------------------------------------

    /// Run before each step with the step index
    pub fn add_pre_step_hook<F>(&self, hook: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.pre_step_hooks.write().push(Box::new(hook));
    }

    /// Run after each step, after the stats sink
    pub fn add_post_step_hook<F>(&self, hook: F)
    where
        F: Fn(&StepStats) + Send + Sync + 'static,
    {
        self.post_step_hooks.write().push(Box::new(hook));
    }

    pub fn set_stats_sink<F>(&self, sink: F)
    where
        F: Fn(&StepStats) + Send + Sync + 'static,
    {
        *self.stats_sink.write() = Some(Box::new(sink));
    }

    pub fn clear_stats_sink(&self) {
        *self.stats_sink.write() = None;
    }

    // ---------------------------------------------------------------------
    // Processing
    // ---------------------------------------------------------------------

    /// Advance the whole brain by one step of `dt`.
    ///
    /// Returns `Busy` while another step or a structural call holds the step
    /// lock.
    pub fn process_step(&self, dt: f32) -> BrainResult<StepStats> {
        let state = self.state();
        if state != BrainState::Running {
            return Err(BrainError::InvalidTransition {
                operation: "process step",
                state,
            });
        }
        let _step = self.step_lock.try_lock().ok_or(BrainError::Busy)?;
        // A pause may have landed while we waited on the check above
        let state = self.state();
        if state != BrainState::Running {
            return Err(BrainError::InvalidTransition {
                operation: "process step",
                state,
            });
        }

        let start = Instant::now();
        let step = self.step_counter.load(Ordering::Acquire);

        for hook in self.pre_step_hooks.read().iter() {
            hook(step);
        }

        let mut stats = StepStats {
            step,
            dt,
            ..StepStats::default()
        };

        let scheduling = self.scheduling.read().clone();
        let parallel = matches!(scheduling, Scheduling::Parallel);

        let due = {
            let topology = self.topology.read();
            let backend = self.backend.read();
            let fallbacks_before = backend.fallback_count();

            let order = self.region_order(&topology, &scheduling)?;
            self.apply_inputs(&topology);

            let reports = self.step_regions(&topology, &order, step, dt, &backend, parallel);
            stats.aggregate_regions(&reports);
            let members: usize = order
                .iter()
                .filter_map(|id| topology.region(*id))
                .map(|r| r.neurons().len())
                .sum();
            if members > 0 {
                stats.mean_activation = stats.total_activation / members as f64;
            }

            stats.mean_energy = self.update_metabolism(&topology, &backend, step);
            let execution = if parallel {
                Execution::Parallel(self.pool.as_ref())
            } else {
                Execution::Serial
            };
            stats.learning = self.learning.update(&topology, step, dt, &backend, execution);
            stats.backend_fallbacks = backend.fallback_count().saturating_sub(fallbacks_before);
            self.learning.consolidation_due(step)
        };

        if due.any() {
            let mut topology = self.topology.write();
            stats.consolidation = Some(self.learning.consolidate(&mut topology, step, due));
        }

        {
            let topology = self.topology.read();
            stats.neuron_count = topology.neuron_count();
            stats.synapse_count = topology.synapse_count();
            stats.weights =
                WeightSummary::from_weights(topology.synapses().iter_valid().map(|s| s.weight()));
            stats.estimated_memory_bytes = topology.estimated_memory_bytes();
        }
        stats.duration_us = start.elapsed().as_micros() as u64;
        self.step_counter.store(step + 1, Ordering::Release);

        trace!(
            "Step {}: {} fired, total activation {:.4}, {}us",
            step,
            stats.neurons_fired,
            stats.total_activation,
            stats.duration_us
        );
        if stats.backend_fallbacks > 0 {
            warn!(
                "Step {}: {} accelerator batches fell back to CPU",
                step, stats.backend_fallbacks
            );
        }

        *self.last_stats.write() = Some(stats.clone());
        if let Some(sink) = self.stats_sink.read().as_ref() {
            sink(&stats);
        }
        for hook in self.post_step_hooks.read().iter() {
            hook(&stats);
        }
        Ok(stats)
    }

    /// Step until `steps` have run or the brain leaves Running. Returns the
    /// number of steps processed.
    pub fn run(&self, steps: u64, dt: f32) -> BrainResult<u64> {
        let mut done = 0;
        while done < steps {
            if self.state() != BrainState::Running {
                break;
            }
            match self.process_step(dt) {
                Ok(_) => done += 1,
                Err(BrainError::InvalidTransition { .. }) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(done)
    }

    fn region_order(&self, topology: &Topology, scheduling: &Scheduling) -> BrainResult<Vec<RegionId>> {
        let ids = topology.region_ids();
        let order = match scheduling {
            Scheduling::Sequential | Scheduling::Parallel => ids,
            Scheduling::Hierarchical => {
                let graph: Vec<(RegionId, Vec<RegionId>)> = topology
                    .regions()
                    .map(|r| (r.id, r.depends_on.clone()))
                    .collect();
                dependency_order(&graph).map_err(BrainError::CircularDependency)?
            }
            Scheduling::Custom(order) => normalize_order(order(&ids), &ids),
        };
        trace!("Region order: {:?}", order);
        Ok(order)
    }

    fn apply_inputs(&self, topology: &Topology) {
        let inputs = std::mem::take(&mut *self.pending_inputs.lock());
        for (region, values) in inputs {
            let Some(region) = topology.region(region) else {
                continue;
            };
            for (&id, &value) in region.neurons().iter().zip(&values) {
                if !value.is_finite() {
                    continue;
                }
                if let Some(neuron) = topology.neuron(id) {
                    neuron.receive_input(value);
                }
            }
        }
    }

    fn step_regions(
        &self,
        topology: &Topology,
        order: &[RegionId],
        step: u64,
        dt: f32,
        backend: &OffloadPath,
        parallel: bool,
    ) -> Vec<RegionStepReport> {
        if !parallel {
            return order
                .iter()
                .filter_map(|id| topology.region(*id))
                .map(|region| region.step(topology, step, dt, backend))
                .collect();
        }

        // Regions only write their own neurons; tasks join before learning
        let run = || {
            order
                .par_iter()
                .filter_map(|id| topology.region(*id))
                .map(|region| region.step(topology, step, dt, backend))
                .collect::<Vec<_>>()
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    /// Energy/health update over live neurons; returns mean energy
    fn update_metabolism(&self, topology: &Topology, backend: &OffloadPath, step: u64) -> f32 {
        let live: Vec<&Neuron> = topology.neurons().iter_valid().collect();
        if live.is_empty() {
            return 0.0;
        }

        let params = &self.config.metabolism;
        if params.enabled {
            let energy: Vec<f32> = live.iter().map(|n| n.energy()).collect();
            let health: Vec<f32> = live.iter().map(|n| n.health()).collect();
            let fired: Vec<u32> = live.iter().map(|n| u32::from(n.fired_at(step))).collect();
            let (energy, health) = backend.homeostatic_energy(&energy, &health, &fired, params);
            for ((neuron, e), h) in live.iter().zip(energy).zip(health) {
                neuron.set_metabolic_state(e, h);
            }
        }
        live.iter().map(|n| n.energy()).sum::<f32>() / live.len() as f32
    }

    // ---------------------------------------------------------------------
    // Snapshots
    // ---------------------------------------------------------------------

    /// Encode the complete state. Requires Paused (or Initializing).
    pub fn export(&self) -> BrainResult<Vec<u8>> {
        let _step = self.step_lock.lock();
        let state = self.state();
        if !QUIESCENT.contains(&state) {
            return Err(BrainError::NotPaused(state));
        }
        let topology = self.topology.read();
        let snapshot = BrainSnapshot::capture(
            &topology,
            self.current_step(),
            self.learning.pending_rewards(),
        );
        Ok(encode(&snapshot, self.config.snapshot.compress)?)
    }

    /// Replace the whole state with a decoded blob. The current state is
    /// left untouched unless the blob decodes completely.
    pub fn restore(&self, blob: &[u8]) -> BrainResult<()> {
        let _step = self.step_lock.lock();
        let state = self.state();
        if !QUIESCENT.contains(&state) {
            return Err(BrainError::NotPaused(state));
        }

        let snapshot = decode(blob)?;
        let topology = snapshot.to_topology()?;

        if !self.backend_pinned.load(Ordering::Acquire) {
            *self.backend.write() = OffloadPath::from_config(
                &self.config.accelerator,
                topology.neuron_count(),
                topology.synapse_count(),
            );
        }
        info!(
            "Restored snapshot at step {}: {} regions, {} neurons, {} synapses",
            snapshot.step,
            topology.region_count(),
            topology.neuron_count(),
            topology.synapse_count()
        );

        *self.topology.write() = topology;
        self.learning.invalidate();
        self.learning.restore_rewards(snapshot.pending_rewards);
        self.step_counter.store(snapshot.step, Ordering::Release);
        self.pending_inputs.lock().clear();
        *self.last_stats.write() = None;
        self.lifecycle.force(BrainState::Paused);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    pub fn config(&self) -> &HypergraphConfig {
        &self.config
    }

    /// Steps processed since creation, reset or restore
    pub fn current_step(&self) -> u64 {
        self.step_counter.load(Ordering::Acquire)
    }

    pub fn last_stats(&self) -> Option<StepStats> {
        self.last_stats.read().clone()
    }

    pub fn region(&self, id: RegionId) -> BrainResult<RegionLayout> {
        self.topology
            .read()
            .region(id)
            .map(|r| r.layout())
            .ok_or(BrainError::RegionNotFound(id))
    }

    pub fn region_stats(&self, id: RegionId) -> BrainResult<RegionStats> {
        self.topology
            .read()
            .region(id)
            .map(|r| r.stats())
            .ok_or(BrainError::RegionNotFound(id))
    }

    pub fn region_ids(&self) -> Vec<RegionId> {
        self.topology.read().region_ids()
    }

    pub fn neuron_count(&self) -> usize {
        self.topology.read().neuron_count()
    }

    pub fn synapse_count(&self) -> usize {
        self.topology.read().synapse_count()
    }

    /// Read-only access to the topology
    pub fn with_topology<R>(&self, f: impl FnOnce(&Topology) -> R) -> R {
        f(&self.topology.read())
    }

    pub fn backend_name(&self) -> String {
        self.backend.read().backend_name().to_string()
    }

    pub fn learning_state(&self) -> LearningState {
        self.learning.state()
    }

    pub fn pending_rewards(&self) -> Vec<(RegionId, f32)> {
        self.learning.pending_rewards()
    }
}

fn build_pool(worker_threads: usize) -> Option<rayon::ThreadPool> {
    if worker_threads == 0 {
        return None;
    }
    match rayon::ThreadPoolBuilder::new()
        .num_threads(worker_threads)
        .thread_name(|i| format!("hypergraph-worker-{}", i))
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            warn!("Failed to build {}-thread worker pool, using the global pool: {}", worker_threads, e);
            None
        }
    }
}

/// Unknown ids surface as NotFound; everything else stays a topology error
fn not_found(err: TopologyError) -> BrainError {
    match err {
        TopologyError::UnknownRegion(id) => BrainError::RegionNotFound(id),
        TopologyError::DanglingNeuron(id) => BrainError::NeuronNotFound(id),
        other => BrainError::Topology(other),
    }
}
