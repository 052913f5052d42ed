//! Intent engine error types.
//!
//! All intent subsystems surface errors through [`IntentError`].  Extraction
//! itself never fails for ordinary text; these variants cover construction
//! problems and the optional enrichment oracle.

/// Unified error type for the intent engine.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    // -- Extraction errors ---------------------------------------------------
    /// No grammar rule matched the text.  Extraction degrades to a fallback
    /// step instead of returning this to callers.
    #[error("no grammar matched: {text}")]
    ExtractionAmbiguous { text: String },

    /// A naming-pattern descriptor is malformed.
    #[error("invalid naming pattern: {reason}")]
    InvalidNamingPattern { reason: String },

    // -- Oracle errors -------------------------------------------------------
    /// The enrichment oracle reported a failure.
    #[error("enrichment oracle failed: {reason}")]
    OracleFailed { reason: String },

    /// The enrichment oracle did not answer in time.
    #[error("enrichment oracle timed out after {millis} ms")]
    OracleTimeout { millis: u64 },

    // -- Upstream crate errors -----------------------------------------------
    /// An error propagated from the kernel crate.
    #[error("kernel error: {0}")]
    Kernel(#[from] omni_kernel::KernelError),

    // -- Serialization -------------------------------------------------------
    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the intent crate.
pub type Result<T> = std::result::Result<T, IntentError>;
