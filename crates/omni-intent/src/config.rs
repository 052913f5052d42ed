//! Pipeline configuration.
//!
//! [`EngineConfig`] bounds workflow execution and [`ParserConfig`] tunes the
//! optional enrichment oracle.  Both deserialize from the `[engine]` and
//! `[parser]` tables of the CLI config file; missing fields take the
//! defaults below.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Limits applied by the workflow engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest wave run concurrently.  Bigger waves run one step at a time.
    ///
    /// Default: **3**.
    pub max_parallel: usize,

    /// Retries after the first failed attempt of a step.
    ///
    /// Default: **3**.
    pub max_retries: u32,

    /// Fixed wait between attempts, in milliseconds.
    ///
    /// Default: **2 000 ms**.
    pub retry_delay_ms: u64,

    /// Keep running later waves after a required step fails.
    ///
    /// Default: **false**.
    pub continue_on_error: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parallel: 3,
            max_retries: 3,
            retry_delay_ms: 2000,
            continue_on_error: false,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency cap.  Values below 1 are treated as 1.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Set the retry cap.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the fixed retry delay (in milliseconds).
    pub fn with_retry_delay_ms(mut self, ms: u64) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    /// Enable or disable running past required-step failures.
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// The retry delay as a [`Duration`].
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Settings for the command parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Steps below this confidence are offered to the enrichment oracle.
    ///
    /// Default: **0.5**.
    pub oracle_confidence_threshold: f32,

    /// Upper bound on a single oracle call, in milliseconds.
    ///
    /// Default: **5 000 ms**.
    pub oracle_timeout_ms: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            oracle_confidence_threshold: 0.5,
            oracle_timeout_ms: 5000,
        }
    }
}

impl ParserConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the confidence threshold.
    pub fn with_oracle_confidence_threshold(mut self, threshold: f32) -> Self {
        self.oracle_confidence_threshold = threshold;
        self
    }

    /// Set the oracle timeout (in milliseconds).
    pub fn with_oracle_timeout_ms(mut self, ms: u64) -> Self {
        self.oracle_timeout_ms = ms;
        self
    }

    /// The oracle timeout as a [`Duration`].
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }
}
