//! Adapter error types.
//!
//! Filesystem executables surface errors through [`AdapterError`]; the
//! registry sees them as [`KernelError`]s via the `From` impl below, which
//! decides whether the engine may retry.

use omni_kernel::KernelError;

/// Unified error type for OmniAutomator adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// A path resolved outside the workspace root.
    #[error("`{action}`: path `{path}` escapes the workspace root `{root}`")]
    PathTraversal {
        action: String,
        path: String,
        root: String,
    },

    /// The parameters supplied to an action are invalid.
    #[error("invalid parameters for `{action}`: {reason}")]
    InvalidParams { action: String, reason: String },

    /// A path the action needs does not exist.
    #[error("`{action}`: `{path}` does not exist")]
    NotFound { action: String, path: String },

    /// The action ran but could not do any of its work.
    #[error("`{action}` failed: {reason}")]
    ExecutionFailed { action: String, reason: String },

    /// An I/O operation failed within the adapter.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AdapterError> for KernelError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::PathTraversal { action, path, .. } => KernelError::PermissionDenied {
                reason: format!("path `{path}` escapes the workspace root"),
                action,
            },
            AdapterError::InvalidParams { action, reason } => {
                KernelError::InvalidParams { action, reason }
            }
            AdapterError::NotFound { action, path } => KernelError::InvalidParams {
                reason: format!("`{path}` does not exist"),
                action,
            },
            AdapterError::ExecutionFailed { action, reason } => {
                KernelError::ActionFailed { action, reason }
            }
            AdapterError::Io(e) => KernelError::Io(e),
        }
    }
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_is_terminal() {
        let err: KernelError = AdapterError::PathTraversal {
            action: "delete".into(),
            path: "../x".into(),
            root: "/w".into(),
        }
        .into();
        assert!(matches!(err, KernelError::PermissionDenied { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn io_stays_retryable() {
        let err: KernelError = AdapterError::Io(std::io::Error::other("disk busy")).into();
        assert!(err.is_retryable());
    }
}
