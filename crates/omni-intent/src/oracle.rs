//! AI enrichment seam.
//!
//! An [`AiEnrichmentOracle`] may replace a low-confidence step with a better
//! one.  The parser only consults it for steps below the configured
//! threshold and always bounds the call with a timeout, so a slow or broken
//! oracle never blocks extraction.

use async_trait::async_trait;

use crate::error::Result;
use crate::step::StepSpec;

/// Suggests a replacement for a step the grammar could not pin down.
#[async_trait]
pub trait AiEnrichmentOracle: Send + Sync {
    /// Return a replacement for `step`, or `None` to keep it.
    ///
    /// `text` is the normalized command the step was extracted from.
    async fn enhance(&self, text: &str, step: &StepSpec) -> Result<Option<StepSpec>>;
}

/// An oracle that never suggests anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOracle;

#[async_trait]
impl AiEnrichmentOracle for NoOracle {
    async fn enhance(&self, _text: &str, _step: &StepSpec) -> Result<Option<StepSpec>> {
        Ok(None)
    }
}
