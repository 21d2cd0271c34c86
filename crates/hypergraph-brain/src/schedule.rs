// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Region ordering for one step

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use ahash::AHashSet;
use hypergraph_config::SchedulingMode;
use hypergraph_npu_neural::RegionId;

/// Caller-supplied region order. Receives the region ids in id order.
pub type OrderFn = dyn Fn(&[RegionId]) -> Vec<RegionId> + Send + Sync;

/// How regions are ordered and executed within a step
#[derive(Clone)]
pub enum Scheduling {
    Sequential,
    Parallel,
    Hierarchical,
    Custom(Arc<OrderFn>),
}

impl Scheduling {
    pub fn custom<F>(order: F) -> Self
    where
        F: Fn(&[RegionId]) -> Vec<RegionId> + Send + Sync + 'static,
    {
        Scheduling::Custom(Arc::new(order))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scheduling::Sequential => "sequential",
            Scheduling::Parallel => "parallel",
            Scheduling::Hierarchical => "hierarchical",
            Scheduling::Custom(_) => "custom",
        }
    }
}

impl From<SchedulingMode> for Scheduling {
    fn from(mode: SchedulingMode) -> Self {
        match mode {
            SchedulingMode::Sequential => Scheduling::Sequential,
            SchedulingMode::Parallel => Scheduling::Parallel,
            SchedulingMode::Hierarchical => Scheduling::Hierarchical,
        }
    }
}

impl fmt::Debug for Scheduling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Topological order of `regions` (id, depends_on) with id order as the
/// tiebreak. Dependencies on unknown regions are ignored.
///
/// On a cycle, returns the ids that could not be ordered.
pub fn dependency_order(regions: &[(RegionId, Vec<RegionId>)]) -> Result<Vec<RegionId>, Vec<RegionId>> {
    let known: BTreeSet<RegionId> = regions.iter().map(|(id, _)| *id).collect();
    let mut remaining: BTreeMap<RegionId, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<RegionId, Vec<RegionId>> = BTreeMap::new();

    for (id, depends_on) in regions {
        let deps: BTreeSet<RegionId> = depends_on
            .iter()
            .copied()
            .filter(|d| known.contains(d) && d != id)
            .collect();
        remaining.insert(*id, deps.len());
        for dep in deps {
            dependents.entry(dep).or_default().push(*id);
        }
        // Self-dependency is a one-node cycle
        if depends_on.contains(id) {
            remaining.insert(*id, usize::MAX);
        }
    }

    let mut ready: BTreeSet<RegionId> = remaining
        .iter()
        .filter(|(_, &n)| n == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(regions.len());

    while let Some(next) = ready.pop_first() {
        order.push(next);
        remaining.remove(&next);
        for dependent in dependents.get(&next).into_iter().flatten() {
            if let Some(count) = remaining.get_mut(dependent) {
                if *count != usize::MAX {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }
    }

    if remaining.is_empty() {
        Ok(order)
    } else {
        Err(remaining.into_keys().collect())
    }
}

/// Make a caller order usable: unknown ids dropped, repeats dropped,
/// regions the caller left out appended in id order
pub fn normalize_order(requested: Vec<RegionId>, known: &[RegionId]) -> Vec<RegionId> {
    let valid: AHashSet<RegionId> = known.iter().copied().collect();
    let mut seen = AHashSet::with_capacity(known.len());
    let mut order: Vec<RegionId> = requested
        .into_iter()
        .filter(|id| valid.contains(id) && seen.insert(*id))
        .collect();
    order.extend(known.iter().copied().filter(|id| !seen.contains(id)));
    order
}
