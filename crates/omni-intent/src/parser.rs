//! Command parser: raw text to an executable step sequence.
//!
//! [`CommandParser`] chains the pipeline stages:
//!
//! 1. **Normalize** the text (case, whitespace, common aliases).
//! 2. **Classify** it into a [`ComplexityLevel`].
//! 3. **Extract** steps with the grammar for that level.
//! 4. **Enrich** (async only): steps below the confidence threshold are
//!    offered to the optional [`AiEnrichmentOracle`], bounded by a timeout.
//!
//! [`CommandParser::analyze`] stops after step 3 and never touches the
//! oracle; [`CommandParser::parse`] runs all four.

use std::sync::Arc;

use omni_kernel::PhraseSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::ComplexityClassifier;
use crate::config::ParserConfig;
use crate::error::{IntentError, Result};
use crate::extractor::{ExtractionContext, StepExtractor};
use crate::grouper::{self, ExecutionWave};
use crate::normalize::normalize;
use crate::oracle::AiEnrichmentOracle;
use crate::step::{ComplexityLevel, StepSource, StepSpec};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What the parser noticed about the command besides its steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandContext {
    pub programming_languages: Vec<String>,
    pub tools: Vec<String>,
    /// Extensions including the dot, e.g. `".py"`.
    pub file_types: Vec<String>,
    pub locations: Vec<String>,
}

/// A fully parsed command, ready for the workflow engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedCommand {
    /// The text as the user typed it.
    pub original: String,
    /// The text the grammar actually ran on.
    pub normalized: String,
    pub complexity: ComplexityLevel,
    /// Never empty.
    pub steps: Vec<StepSpec>,
    pub context: CommandContext,
    pub estimated_duration_secs: u64,
    /// Confidence of the weakest step.
    pub confidence: f32,
}

impl ParsedCommand {
    /// Group the steps into execution waves.
    pub fn waves(&self) -> Vec<ExecutionWave> {
        grouper::group(&self.steps)
    }

    /// Whether any step is the `unknown` fallback.
    pub fn has_unknown_steps(&self) -> bool {
        self.steps.iter().any(StepSpec::is_unknown)
    }
}

// ---------------------------------------------------------------------------
// Duration estimate
// ---------------------------------------------------------------------------

/// Rough seconds per action; anything unlisted counts as 5.
const DURATION_SECS: &[(&str, u64)] = &[
    ("create_folder", 1),
    ("create_file", 2),
    ("install_packages", 30),
    ("download_file", 60),
    ("backup_folder", 120),
    ("clone_repository", 45),
];

const DEFAULT_DURATION_SECS: u64 = 5;

/// Rough total wall-clock estimate for `steps`, in seconds.
pub fn estimate_duration(steps: &[StepSpec]) -> u64 {
    steps
        .iter()
        .map(|s| {
            DURATION_SECS
                .iter()
                .find(|(action, _)| *action == s.action)
                .map_or(DEFAULT_DURATION_SECS, |(_, secs)| *secs)
        })
        .sum()
}

// ---------------------------------------------------------------------------
// Context detection
// ---------------------------------------------------------------------------

const LANGUAGES: &[&str] = &[
    "python", "javascript", "typescript", "java", "c++", "c#", "php", "ruby", "golang", "rust",
    "swift",
];

const TOOLS: &[&str] = &[
    "vscode", "git", "npm", "pip", "docker", "nodejs", "react", "angular", "vue",
];

const LOCATIONS: &[&str] = &["desktop", "documents", "downloads", "home", "project", "workspace"];

const FILE_TYPE: &str = r"\.(py|js|ts|html|css|json|xml|csv|txt|md)\b";

#[derive(Debug, Clone)]
struct ContextDetector {
    languages: PhraseSet,
    tools: PhraseSet,
    locations: PhraseSet,
    file_type: Regex,
}

impl ContextDetector {
    fn new() -> Result<Self> {
        Ok(Self {
            languages: PhraseSet::new(LANGUAGES)?,
            tools: PhraseSet::new(TOOLS)?,
            locations: PhraseSet::new(LOCATIONS)?,
            file_type: Regex::new(FILE_TYPE).map_err(|e| omni_kernel::KernelError::InvalidPattern {
                pattern: FILE_TYPE.into(),
                reason: e.to_string(),
            })?,
        })
    }

    fn detect(&self, text: &str) -> CommandContext {
        let owned = |v: Vec<&str>| v.into_iter().map(String::from).collect::<Vec<_>>();
        let mut file_types: Vec<String> = Vec::new();
        for caps in self.file_type.captures_iter(text) {
            let ext = format!(".{}", &caps[1]);
            if !file_types.contains(&ext) {
                file_types.push(ext);
            }
        }
        CommandContext {
            programming_languages: owned(self.languages.matched(text)),
            tools: owned(self.tools.matched(text)),
            file_types,
            locations: owned(self.locations.matched(text)),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Turns free text into a [`ParsedCommand`].
///
/// All collaborators are passed in at construction; the parser holds no
/// global state and can be shared across tasks.
pub struct CommandParser {
    classifier: ComplexityClassifier,
    extractor: StepExtractor,
    detector: ContextDetector,
    config: ParserConfig,
    oracle: Option<Arc<dyn AiEnrichmentOracle>>,
}

impl CommandParser {
    /// Create a parser with default settings and no oracle.
    pub fn new() -> Result<Self> {
        Ok(Self {
            classifier: ComplexityClassifier::new()?,
            extractor: StepExtractor::new()?,
            detector: ContextDetector::new()?,
            config: ParserConfig::default(),
            oracle: None,
        })
    }

    /// Replace the parser settings.
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Consult `oracle` for low-confidence steps in [`parse`](Self::parse).
    pub fn with_oracle(mut self, oracle: Arc<dyn AiEnrichmentOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn classifier(&self) -> &ComplexityClassifier {
        &self.classifier
    }

    pub fn extractor(&self) -> &StepExtractor {
        &self.extractor
    }

    /// Parse without enrichment.  Deterministic and synchronous.
    pub fn analyze(&self, command: &str) -> ParsedCommand {
        let normalized = normalize(command);
        let complexity = self.classifier.classify(&normalized);
        let mut ctx = ExtractionContext::default();
        let steps = self.extractor.extract(&normalized, complexity, &mut ctx);
        let context = self.detector.detect(&normalized);

        debug!(
            complexity = %complexity,
            steps = steps.len(),
            "command analyzed"
        );
        self.finish(command, normalized, complexity, steps, context)
    }

    /// Parse and, when an oracle is configured, enrich low-confidence steps.
    pub async fn parse(&self, command: &str) -> ParsedCommand {
        let parsed = self.analyze(command);
        let Some(oracle) = &self.oracle else {
            return parsed;
        };

        let threshold = self.config.oracle_confidence_threshold;
        let mut steps = Vec::with_capacity(parsed.steps.len());
        let mut replaced = 0usize;
        for step in &parsed.steps {
            if step.confidence >= threshold {
                steps.push(step.clone());
                continue;
            }
            match self.enrich(oracle.as_ref(), &parsed.normalized, step).await {
                Ok(Some(mut better)) => {
                    better.dependencies = step.dependencies.clone();
                    better.source = StepSource::Oracle;
                    replaced += 1;
                    steps.push(better);
                }
                Ok(None) => steps.push(step.clone()),
                Err(e) => {
                    warn!(action = %step.action, error = %e, "enrichment failed, keeping step");
                    steps.push(step.clone());
                }
            }
        }

        if replaced > 0 {
            info!(replaced, "steps replaced by enrichment oracle");
        }
        let ParsedCommand {
            original,
            normalized,
            complexity,
            context,
            ..
        } = parsed;
        self.finish(&original, normalized, complexity, steps, context)
    }

    async fn enrich(
        &self,
        oracle: &dyn AiEnrichmentOracle,
        text: &str,
        step: &StepSpec,
    ) -> Result<Option<StepSpec>> {
        let timeout = self.config.oracle_timeout();
        match tokio::time::timeout(timeout, oracle.enhance(text, step)).await {
            Ok(result) => result,
            Err(_) => Err(IntentError::OracleTimeout {
                millis: self.config.oracle_timeout_ms,
            }),
        }
    }

    fn finish(
        &self,
        original: &str,
        normalized: String,
        complexity: ComplexityLevel,
        steps: Vec<StepSpec>,
        context: CommandContext,
    ) -> ParsedCommand {
        let confidence = steps
            .iter()
            .map(|s| s.confidence)
            .fold(1.0_f32, f32::min);
        ParsedCommand {
            original: original.to_string(),
            normalized,
            complexity,
            estimated_duration_secs: estimate_duration(&steps),
            steps,
            context,
            confidence,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
