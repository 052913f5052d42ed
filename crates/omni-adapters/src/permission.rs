//! Rule-based permission gate.
//!
//! [`RulePermissionGate`] sorts each request into an [`AccessKind`] and then
//! applies, in order:
//!
//! 1. explicitly blocked `"category:action"` operations,
//! 2. sandbox mode, which refuses delete-class actions,
//! 3. blocked path prefixes on the `path`, `source`, `destination`,
//!    `location` and `name` params.
//!
//! Actions it cannot classify are allowed with a warning.

use std::collections::HashSet;

use omni_kernel::{ActionRequest, PermissionGate};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Path prefixes no write may touch.
const WRITE_BLOCKED: &[&str] = &["/system", "/windows", "c:\\windows", "/etc"];

/// Extra prefixes no delete may touch.
const DELETE_BLOCKED: &[&str] = &["/usr"];

/// Params that may carry a path.
const PATH_PARAMS: &[&str] = &["path", "source", "destination", "location", "name"];

/// Coarse risk class of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    Read,
    Write,
    Delete,
}

impl AccessKind {
    /// Classify an action name.
    pub fn of(action: &str) -> Option<Self> {
        match action {
            "list" | "list_folders" | "list_files" | "get_info" => Some(Self::Read),
            a if a.starts_with("verify_") => Some(Self::Read),
            "delete" | "delete_file" | "delete_folder" | "delete_folder_tree" => Some(Self::Delete),
            "copy" | "move" | "rename" | "modify_file" => Some(Self::Write),
            a if a.starts_with("create_") => Some(Self::Write),
            _ => None,
        }
    }
}

/// Permission gate driven by static rules plus configuration.
#[derive(Debug, Clone, Default)]
pub struct RulePermissionGate {
    sandbox: bool,
    blocked_operations: HashSet<String>,
    blocked_paths: Vec<String>,
}

impl RulePermissionGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse delete-class actions.
    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Block one `"category:action"` operation.
    pub fn block_operation(mut self, operation: impl Into<String>) -> Self {
        self.blocked_operations.insert(operation.into());
        self
    }

    /// Add a path prefix refused for every access kind.
    pub fn block_path(mut self, prefix: impl AsRef<str>) -> Self {
        self.blocked_paths.push(prefix.as_ref().to_lowercase());
        self
    }

    /// Decide on `request`; `Err` carries the refusal reason.
    pub fn evaluate(&self, request: &ActionRequest) -> Result<(), String> {
        let operation = format!("{}:{}", request.category, request.action);
        if self.blocked_operations.contains(&operation) {
            return Err(format!("operation `{operation}` is blocked"));
        }

        let Some(kind) = AccessKind::of(&request.action) else {
            warn!(operation = %operation, "unclassified action, allowing");
            return Ok(());
        };

        if self.sandbox && kind == AccessKind::Delete {
            return Err(format!("`{operation}` is not allowed in sandbox mode"));
        }

        let write: &[&str] = if kind == AccessKind::Read { &[] } else { WRITE_BLOCKED };
        let delete: &[&str] = if kind == AccessKind::Delete { DELETE_BLOCKED } else { &[] };
        for key in PATH_PARAMS {
            let Some(value) = request.params.get(*key).and_then(|v| v.as_str()) else {
                continue;
            };
            let value = value.trim().to_lowercase();
            let hit = write
                .iter()
                .chain(delete)
                .copied()
                .chain(self.blocked_paths.iter().map(String::as_str))
                .find(|prefix| value.starts_with(prefix));
            if let Some(prefix) = hit {
                return Err(format!("`{key}` points into blocked path `{prefix}`"));
            }
        }
        Ok(())
    }
}

impl PermissionGate for RulePermissionGate {
    fn check(&self, request: &ActionRequest) -> bool {
        match self.evaluate(request) {
            Ok(()) => true,
            Err(reason) => {
                warn!(action = %request.action, reason = %reason, "permission denied");
                false
            }
        }
    }

    fn denial_reason(&self, request: &ActionRequest) -> String {
        self.evaluate(request)
            .err()
            .unwrap_or_else(|| "not permitted".to_string())
    }
}
