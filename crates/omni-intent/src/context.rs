//! Per-run workflow context.
//!
//! After each successful step the engine records
//! `step_<action>_result` and `step_<action>_completed`.  Later steps in the
//! same run can reference a recorded value from a string param with a
//! `{{step_<action>_result}}` placeholder.
//!
//! Concurrent steps in one wave each write only their own keys.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use omni_kernel::Params;
use serde_json::Value;

/// Shared key/value store for one workflow run.  Cloning shares the store.
#[derive(Debug, Clone, Default)]
pub struct WorkflowContext {
    inner: Arc<DashMap<String, Value>>,
}

impl WorkflowContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Key under which a step's result is stored.
    pub fn result_key(action: &str) -> String {
        format!("step_{action}_result")
    }

    /// Key under which a step's completion flag is stored.
    pub fn completed_key(action: &str) -> String {
        format!("step_{action}_completed")
    }

    /// Record a successful step.
    pub fn record_success(&self, action: &str, result: Value) {
        self.inner.insert(Self::result_key(action), result);
        self.inner
            .insert(Self::completed_key(action), Value::Bool(true));
    }

    /// Read a value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.get(key).map(|v| v.value().clone())
    }

    /// Store an arbitrary value.
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.inner.insert(key.into(), value);
    }

    /// Whether a step with `action` has completed in this run.
    pub fn is_completed(&self, action: &str) -> bool {
        self.get(&Self::completed_key(action))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Sorted copy of the whole context.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.inner
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Substitute `{{key}}` placeholders in every string inside `params`.
    ///
    /// A placeholder that is the whole string is replaced by the stored value
    /// as-is; one embedded in other text is replaced by the value's string
    /// form.  Unknown keys are left untouched.
    pub fn resolve_params(&self, params: &Params) -> Params {
        params
            .iter()
            .map(|(k, v)| (k.clone(), self.resolve_value(v)))
            .collect()
    }

    fn resolve_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => self.resolve_str(s),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.resolve_value(v)))
                    .collect(),
            ),
            Value::Array(arr) => Value::Array(arr.iter().map(|v| self.resolve_value(v)).collect()),
            // Numbers, booleans, null pass through unchanged.
            other => other.clone(),
        }
    }

    fn resolve_str(&self, s: &str) -> Value {
        if !s.contains("{{") {
            return Value::String(s.to_string());
        }

        if let Some(key) = s.strip_prefix("{{").and_then(|r| r.strip_suffix("}}"))
            && !key.contains("{{")
            && let Some(found) = self.get(key.trim())
        {
            return found;
        }

        let mut resolved = s.to_string();
        for entry in self.inner.iter() {
            let placeholder = format!("{{{{{}}}}}", entry.key());
            if resolved.contains(&placeholder) {
                let text = match entry.value() {
                    Value::String(v) => v.clone(),
                    other => other.to_string(),
                };
                resolved = resolved.replace(&placeholder, &text);
            }
        }
        Value::String(resolved)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_success_writes_both_keys() {
        let ctx = WorkflowContext::new();
        ctx.record_success("create_folder", json!({"path": "/tmp/x"}));

        assert_eq!(
            ctx.get("step_create_folder_result"),
            Some(json!({"path": "/tmp/x"}))
        );
        assert_eq!(ctx.get("step_create_folder_completed"), Some(json!(true)));
        assert!(ctx.is_completed("create_folder"));
        assert!(!ctx.is_completed("copy"));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn clones_share_storage() {
        let ctx = WorkflowContext::new();
        let other = ctx.clone();
        other.insert("k", json!(1));
        assert_eq!(ctx.get("k"), Some(json!(1)));
    }

    #[test]
    fn whole_string_placeholder_keeps_type() {
        let ctx = WorkflowContext::new();
        ctx.record_success("create_folder", json!({"path": "/tmp/project"}));

        let mut params = Params::new();
        params.insert("parent".into(), json!("{{step_create_folder_result}}"));
        let resolved = ctx.resolve_params(&params);
        assert_eq!(resolved["parent"], json!({"path": "/tmp/project"}));
    }

    #[test]
    fn embedded_placeholder_is_stringified() {
        let ctx = WorkflowContext::new();
        ctx.insert("step_rename_result", json!("final.md"));

        let mut params = Params::new();
        params.insert(
            "message".into(),
            json!(["renamed to {{step_rename_result}}", 3]),
        );
        let resolved = ctx.resolve_params(&params);
        assert_eq!(resolved["message"], json!(["renamed to final.md", 3]));
    }

    #[test]
    fn unknown_placeholder_is_left_alone() {
        let ctx = WorkflowContext::new();
        let mut params = Params::new();
        params.insert("x".into(), json!("{{nothing_here}}"));
        assert_eq!(ctx.resolve_params(&params)["x"], "{{nothing_here}}");
    }
}
