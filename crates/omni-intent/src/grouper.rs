//! Dependency grouping.
//!
//! [`group`] partitions a step sequence into execution waves by greedy
//! layering: each pass collects every remaining step whose dependencies were
//! all placed in earlier waves.  A pass that finds nothing eligible (a cycle,
//! a self reference, or an index past the end) force-places the first
//! remaining step so grouping always terminates.
//!
//! Dependencies are expected to point backwards.  A forward reference is
//! logged before grouping; the step still waits for its dependency.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::step::{self, StepSpec};

/// Indices of mutually independent steps that may run together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionWave {
    /// Step indices, ordered by `(priority, index)`.
    pub steps: Vec<usize>,
    /// Whether this wave exists only because of the deadlock guard.
    #[serde(default)]
    pub forced: bool,
}

impl ExecutionWave {
    /// Number of steps in the wave.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the wave is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Partition `steps` into waves.
pub fn group(steps: &[StepSpec]) -> Vec<ExecutionWave> {
    if let Some(i) = step::first_forward_reference(steps) {
        warn!(
            step = i,
            action = %steps[i].action,
            dependencies = ?steps[i].dependencies,
            "step depends on itself or a later step"
        );
    }

    let mut remaining: Vec<usize> = (0..steps.len()).collect();
    let mut placed: BTreeSet<usize> = BTreeSet::new();
    let mut waves = Vec::new();

    while !remaining.is_empty() {
        let (mut eligible, blocked): (Vec<usize>, Vec<usize>) = remaining
            .iter()
            .partition(|&&i| steps[i].dependencies.iter().all(|d| placed.contains(d)));

        let forced = eligible.is_empty();
        if forced {
            let first = remaining[0];
            warn!(
                step = first,
                action = %steps[first].action,
                dependencies = ?steps[first].dependencies,
                "unsatisfiable dependencies, forcing step into its own wave"
            );
            eligible.push(first);
            remaining.remove(0);
        } else {
            remaining = blocked;
        }

        eligible.sort_by_key(|&i| (steps[i].priority, i));
        placed.extend(eligible.iter().copied());
        waves.push(ExecutionWave {
            steps: eligible,
            forced,
        });
    }

    waves
}

/// Wave number each step landed in, indexed by step.
pub fn wave_index(waves: &[ExecutionWave], step_count: usize) -> Vec<Option<usize>> {
    let mut index = vec![None; step_count];
    for (w, wave) in waves.iter().enumerate() {
        for &step in &wave.steps {
            if let Some(slot) = index.get_mut(step) {
                *slot = Some(w);
            }
        }
    }
    index
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
