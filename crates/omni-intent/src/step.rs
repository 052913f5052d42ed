//! Step data model.
//!
//! A [`StepSpec`] is one unit of work produced by extraction: an action, its
//! routing category, parameters, and the indices of earlier steps it waits
//! for.  A command's steps form an ordered sequence; every dependency index
//! must point at an earlier position in that sequence.

use std::collections::BTreeSet;
use std::fmt;

use omni_kernel::{ActionRequest, Params};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How complex a command is.  Computed once per command; selects the
/// extraction routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    /// One action.
    Simple,
    /// Several actions joined by conjunctions.
    Compound,
    /// Bulk, nested, or multi-stage work.
    Workflow,
    /// Actions guarded by an `if`/`when` clause.
    Conditional,
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Simple => "simple",
            Self::Compound => "compound",
            Self::Workflow => "workflow",
            Self::Conditional => "conditional",
        };
        f.write_str(label)
    }
}

/// Which extraction path produced a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSource {
    /// Matched a grammar rule.
    Grammar,
    /// Nothing matched; best-guess placeholder.
    Fallback,
    /// Replaced by the enrichment oracle.
    Oracle,
}

/// A typed, parameterized unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    /// Canonical verb identifier (e.g. `create_folder`).
    pub action: String,
    /// Routing category (e.g. `filesystem`).
    pub category: String,
    /// Action-specific arguments.
    #[serde(default)]
    pub params: Params,
    /// Indices of earlier steps that must complete first.
    #[serde(default)]
    pub dependencies: BTreeSet<usize>,
    /// Guard expressions, handed to the executor with the call.
    #[serde(default)]
    pub conditions: Vec<String>,
    /// Tie-break ordering hint within a wave; lower runs first.
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Optional steps may fail without aborting the workflow.
    #[serde(default)]
    pub optional: bool,
    /// Extraction confidence in `[0.0, 1.0]`.
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    /// Which path produced this step.
    #[serde(default = "default_source")]
    pub source: StepSource,
}

fn default_priority() -> u32 {
    1
}

fn default_confidence() -> f32 {
    1.0
}

fn default_source() -> StepSource {
    StepSource::Grammar
}

impl StepSpec {
    /// Create a required, unconditional step with no params.
    pub fn new(action: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            category: category.into(),
            params: Params::new(),
            dependencies: BTreeSet::new(),
            conditions: Vec::new(),
            priority: default_priority(),
            optional: false,
            confidence: default_confidence(),
            source: StepSource::Grammar,
        }
    }

    /// The placeholder emitted when no grammar matched.  Carries the raw text
    /// so an executor or the oracle can still make sense of it.
    pub fn unknown(raw_command: impl Into<String>) -> Self {
        let mut step = Self::new("unknown", "unknown")
            .with_param("raw_command", raw_command.into())
            .with_confidence(0.0);
        step.source = StepSource::Fallback;
        step
    }

    /// Set a param.  `None`-like values are stored as JSON `null`.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a dependency on an earlier step.
    pub fn depends_on(mut self, index: usize) -> Self {
        self.dependencies.insert(index);
        self
    }

    /// Append a guard condition.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the extraction confidence.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Mark the step optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Whether this is the no-match placeholder.
    pub fn is_unknown(&self) -> bool {
        self.action == "unknown"
    }

    /// Build the executor request for this step.
    pub fn to_request(&self) -> ActionRequest {
        ActionRequest::new(&self.action, &self.category)
            .with_params(self.params.clone())
            .with_conditions(self.conditions.clone())
    }
}

/// Check that every dependency points strictly backwards.  Returns the index
/// of the first offending step.
pub fn first_forward_reference(steps: &[StepSpec]) -> Option<usize> {
    steps
        .iter()
        .enumerate()
        .find(|(i, step)| step.dependencies.iter().any(|dep| dep >= i))
        .map(|(i, _)| i)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
