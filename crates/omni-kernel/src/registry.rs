//! Action registry.
//!
//! Maps action names to [`Executable`] capabilities.  Variants are registered
//! at startup and looked up by name at execution time; an unregistered action
//! fails closed with [`KernelError::ActionNotFound`] instead of panicking.
//!
//! Internally the registry is backed by [`DashMap`] which provides lock-free
//! concurrent reads and fine-grained write locking, so concurrent steps within
//! a wave can dispatch through the same registry without a global lock.
//!
//! # Example
//!
//! ```rust
//! # use omni_kernel::action::{ActionExecutor, ActionOutput, ActionRequest, Executable, Params};
//! # use omni_kernel::registry::ActionRegistry;
//! struct Ping;
//!
//! impl Executable for Ping {
//!     fn run(&self, _params: &Params) -> omni_kernel::Result<ActionOutput> {
//!         Ok(serde_json::json!("pong").into())
//!     }
//! }
//!
//! let registry = ActionRegistry::new();
//! registry.register("ping", "system", Ping);
//!
//! let outcome = registry.execute(&ActionRequest::new("ping", "system"));
//! assert!(outcome.success);
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::action::{ActionExecutor, ActionOutcome, ActionRequest, Executable};
use crate::error::{KernelError, Result};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Metadata about a registered action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionInfo {
    /// Action name (e.g. "create_folder").
    pub action: String,
    /// Category the action is routed under (e.g. "filesystem").
    pub category: String,
    /// Human-readable description.
    pub description: String,
    /// When the action was registered.
    pub registered_at: DateTime<Utc>,
}

struct RegisteredAction {
    info: ActionInfo,
    executable: Arc<dyn Executable>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Concurrent action registry backed by [`DashMap`].
///
/// The registry is cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone)]
pub struct ActionRegistry {
    inner: Arc<DashMap<String, RegisteredAction>>,
}

impl ActionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Register an executable under `action`.
    ///
    /// If an action with the same name already exists, it is overwritten.
    pub fn register<E>(&self, action: impl Into<String>, category: impl Into<String>, executable: E)
    where
        E: Executable + 'static,
    {
        self.register_arc(action, category, Arc::new(executable));
    }

    /// Register an already shared executable.
    pub fn register_arc(
        &self,
        action: impl Into<String>,
        category: impl Into<String>,
        executable: Arc<dyn Executable>,
    ) {
        let action = action.into();
        let category = category.into();

        tracing::debug!(action = %action, category = %category, "action registered");

        let info = ActionInfo {
            action: action.clone(),
            category,
            description: executable.description().to_string(),
            registered_at: Utc::now(),
        };
        self.inner
            .insert(action, RegisteredAction { info, executable });
    }

    /// Remove an action from the registry.
    ///
    /// Returns the removed [`ActionInfo`] if it existed.
    pub fn unregister(&self, action: &str) -> Option<ActionInfo> {
        let removed = self.inner.remove(action).map(|(_, entry)| entry.info);
        if removed.is_some() {
            tracing::debug!(action = %action, "action unregistered");
        }
        removed
    }

    /// Look up the executable registered for `action`.
    pub fn get(&self, action: &str) -> Result<Arc<dyn Executable>> {
        self.inner
            .get(action)
            .map(|entry| Arc::clone(&entry.executable))
            .ok_or_else(|| KernelError::ActionNotFound {
                action: action.to_string(),
            })
    }

    /// Retrieve a snapshot of an action's metadata.
    pub fn info(&self, action: &str) -> Result<ActionInfo> {
        self.inner
            .get(action)
            .map(|entry| entry.info.clone())
            .ok_or_else(|| KernelError::ActionNotFound {
                action: action.to_string(),
            })
    }

    /// Whether `action` is registered.
    pub fn contains(&self, action: &str) -> bool {
        self.inner.contains_key(action)
    }

    /// Return metadata for every registered action, sorted by name.
    pub fn list_all(&self) -> Vec<ActionInfo> {
        let mut all: Vec<ActionInfo> = self.inner.iter().map(|e| e.info.clone()).collect();
        all.sort_by(|a, b| a.action.cmp(&b.action));
        all
    }

    /// Return only actions registered under `category`.
    pub fn list_by_category(&self, category: &str) -> Vec<ActionInfo> {
        self.list_all()
            .into_iter()
            .filter(|info| info.category == category)
            .collect()
    }

    /// Return the total number of registered actions.
    pub fn count(&self) -> usize {
        self.inner.len()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionExecutor for ActionRegistry {
    fn execute(&self, request: &ActionRequest) -> ActionOutcome {
        let executable = match self.get(&request.action) {
            Ok(executable) => executable,
            Err(e) => {
                tracing::warn!(action = %request.action, "no executable registered");
                return e.into();
            }
        };

        match executable.run(&request.params) {
            Ok(output) => {
                tracing::debug!(
                    action = %request.action,
                    created = output.created_resources.len(),
                    "action succeeded"
                );
                ActionOutcome::ok(output.value).with_resources(output.created_resources)
            }
            Err(e) => {
                tracing::debug!(action = %request.action, error = %e, "action failed");
                e.into()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
