//! Kernel error types.
//!
//! All kernel subsystems surface errors through [`KernelError`], which is the
//! single error type returned by every public API in this crate.  Each variant
//! carries enough context for callers to decide how to handle the failure
//! without inspecting opaque strings.

/// Unified error type for the OmniAutomator kernel.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    // -- Registry errors ----------------------------------------------------
    /// No executable is registered under the requested action name.
    #[error("action not found: {action}")]
    ActionNotFound { action: String },

    /// The executable ran but reported a failure.
    #[error("action `{action}` failed: {reason}")]
    ActionFailed { action: String, reason: String },

    /// The parameters handed to an executable were missing or malformed.
    #[error("invalid params for `{action}`: {reason}")]
    InvalidParams { action: String, reason: String },

    // -- Permission errors --------------------------------------------------
    /// The permission gate refused the action.
    #[error("permission denied for `{action}`: {reason}")]
    PermissionDenied { action: String, reason: String },

    // -- Pattern errors -----------------------------------------------------
    /// A regex pattern supplied to a pattern table is invalid.
    #[error("invalid regex pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Building a phrase automaton failed.
    #[error("phrase set build error: {reason}")]
    PhraseSetBuild { reason: String },

    // -- Upstream -----------------------------------------------------------
    /// A filesystem or process I/O failure bubbled up through an executable.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KernelError {
    /// Whether retrying the same call could plausibly succeed.
    ///
    /// Lookup misses, bad parameters and permission refusals are terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ActionFailed { .. } | Self::Io(_) | Self::Json(_)
        )
    }
}

/// Convenience alias used throughout the kernel crate.
pub type Result<T> = std::result::Result<T, KernelError>;
