//! Action execution seams.
//!
//! The pipeline never touches the operating system directly.  Every step is
//! handed to an [`ActionExecutor`] as an [`ActionRequest`], and the executor
//! answers with an [`ActionOutcome`].  Executor calls are **blocking**: the
//! workflow engine moves them onto a blocking worker before invoking them.
//!
//! Individual capabilities implement [`Executable`] and are collected in the
//! [`ActionRegistry`](crate::registry::ActionRegistry), which is itself an
//! executor.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{KernelError, Result};

/// Action parameters, keyed by parameter name.
pub type Params = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Request / outcome
// ---------------------------------------------------------------------------

/// A single call into an executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Canonical action identifier (e.g. `create_folder`).
    pub action: String,
    /// Routing category (e.g. `filesystem`).
    pub category: String,
    /// Action-specific arguments.
    #[serde(default)]
    pub params: Params,
    /// Guard expressions attached to the originating step.
    #[serde(default)]
    pub conditions: Vec<String>,
}

impl ActionRequest {
    /// Create a request with no params and no guards.
    pub fn new(action: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            category: category.into(),
            params: Params::new(),
            conditions: Vec::new(),
        }
    }

    /// Set the params for this request.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Set a single param.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set the guard conditions for this request.
    pub fn with_conditions(mut self, conditions: Vec<String>) -> Self {
        self.conditions = conditions;
        self
    }
}

/// What an executor reports back for one call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Whether the action achieved its goal.
    pub success: bool,
    /// Action-specific result payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Human-readable failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Paths or identifiers of resources the action created.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created_resources: Vec<String>,
    /// Whether a failed call may be retried.  Ignored on success.
    #[serde(default = "default_retryable")]
    pub retryable: bool,
}

fn default_retryable() -> bool {
    true
}

impl ActionOutcome {
    /// A successful outcome carrying `result`.
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            created_resources: Vec::new(),
            retryable: true,
        }
    }

    /// A failed outcome that the caller may retry.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
            created_resources: Vec::new(),
            retryable: true,
        }
    }

    /// A failed outcome that must not be retried.
    pub fn terminal(error: impl Into<String>) -> Self {
        Self {
            retryable: false,
            ..Self::failed(error)
        }
    }

    /// Attach the list of created resources.
    pub fn with_resources(mut self, resources: Vec<String>) -> Self {
        self.created_resources = resources;
        self
    }
}

impl From<KernelError> for ActionOutcome {
    fn from(err: KernelError) -> Self {
        if err.is_retryable() {
            Self::failed(err.to_string())
        } else {
            Self::terminal(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Runs a single step against the outside world.
///
/// Implementations may block on filesystem, subprocess, or network I/O and
/// must impose their own timeouts on it.
pub trait ActionExecutor: Send + Sync {
    /// Execute one request and report the outcome.  Must not panic for
    /// ordinary failures; report them through [`ActionOutcome::failed`].
    fn execute(&self, request: &ActionRequest) -> ActionOutcome;
}

/// The value produced by a successful [`Executable::run`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutput {
    /// Result payload surfaced to the workflow context.
    pub value: Value,
    /// Paths or identifiers of created resources.
    pub created_resources: Vec<String>,
}

impl ActionOutput {
    /// Wrap a payload with no created resources.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            created_resources: Vec::new(),
        }
    }

    /// Attach created resources.
    pub fn with_resources(mut self, resources: Vec<String>) -> Self {
        self.created_resources = resources;
        self
    }
}

impl From<Value> for ActionOutput {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// One named capability registered in the action registry.
pub trait Executable: Send + Sync {
    /// Run the capability with the given params.
    fn run(&self, params: &Params) -> Result<ActionOutput>;

    /// Short description for listings.
    fn description(&self) -> &str {
        ""
    }
}

// ---------------------------------------------------------------------------
// Param helpers
// ---------------------------------------------------------------------------

/// Extract a required string param.
pub fn require_str<'a>(action: &str, params: &'a Params, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| KernelError::InvalidParams {
            action: action.to_string(),
            reason: format!("missing required string field `{key}`"),
        })
}

/// Extract an optional string param; `null` counts as absent.
pub fn optional_str<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

/// Extract an optional unsigned integer param.
pub fn optional_u64(params: &Params, key: &str) -> Option<u64> {
    params.get(key).and_then(Value::as_u64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcome_from_not_found_is_terminal() {
        let outcome: ActionOutcome = KernelError::ActionNotFound {
            action: "launch_rocket".into(),
        }
        .into();
        assert!(!outcome.success);
        assert!(!outcome.retryable);
        assert!(outcome.error.unwrap().contains("launch_rocket"));
    }

    #[test]
    fn outcome_from_action_failure_is_retryable() {
        let outcome: ActionOutcome = KernelError::ActionFailed {
            action: "copy".into(),
            reason: "disk busy".into(),
        }
        .into();
        assert!(outcome.retryable);
    }

    #[test]
    fn outcome_deserializes_without_retryable_field() {
        let outcome: ActionOutcome =
            serde_json::from_value(json!({"success": false, "error": "boom"})).unwrap();
        assert!(outcome.retryable);
        assert_eq!(outcome.error.as_deref(), Some("boom"));
    }

    #[test]
    fn request_builder() {
        let request = ActionRequest::new("create_folder", "filesystem")
            .with_param("name", "project")
            .with_conditions(vec!["parent_folder_exists".into()]);
        assert_eq!(request.params["name"], "project");
        assert_eq!(request.conditions.len(), 1);
    }

    #[test]
    fn require_str_reports_missing_key() {
        let params = Params::new();
        let err = require_str("copy", &params, "source").unwrap_err();
        assert!(matches!(err, KernelError::InvalidParams { .. }));
        assert!(err.to_string().contains("source"));
    }
}
