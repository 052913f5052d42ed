//! Command interpretation and workflow orchestration for OmniAutomator.
//!
//! The pipeline turns free text into an executed workflow:
//!
//! | Stage | Module | Entry point |
//! |-------|--------|-------------|
//! | Normalize | [`normalize`] | [`normalize::normalize`] |
//! | Classify | [`classifier`] | [`ComplexityClassifier::classify`] |
//! | Extract | [`extractor`] | [`StepExtractor::extract`] |
//! | Enrich | [`oracle`] | [`AiEnrichmentOracle::enhance`] |
//! | Group | [`grouper`] | [`grouper::group`] |
//! | Execute | [`workflow`] | [`WorkflowEngine::execute_workflow`] |
//!
//! [`CommandParser`] wires the first four stages together.  The engine talks
//! to the outside world only through the kernel's
//! [`ActionExecutor`](omni_kernel::ActionExecutor) and
//! [`PermissionGate`](omni_kernel::PermissionGate) traits.

pub mod backoff;
pub mod classifier;
pub mod config;
pub mod context;
pub mod error;
pub mod extractor;
pub mod grouper;
pub mod history;
pub mod naming;
pub mod normalize;
pub mod oracle;
pub mod parser;
pub mod step;
pub mod templates;
pub mod workflow;

pub use backoff::{BackoffPolicy, FixedBackoff, NoBackoff};
pub use classifier::{ComplexityClassifier, ComplexitySignals};
pub use config::{EngineConfig, ParserConfig};
pub use context::WorkflowContext;
pub use error::{IntentError, Result};
pub use extractor::{ExtractionContext, StepExtractor};
pub use grouper::ExecutionWave;
pub use history::{ExecutionHistory, HistoryEntry};
pub use naming::{NamingParser, NamingPattern, PatternKind};
pub use oracle::{AiEnrichmentOracle, NoOracle};
pub use parser::{CommandContext, CommandParser, ParsedCommand};
pub use step::{ComplexityLevel, StepSource, StepSpec};
pub use templates::WorkflowTemplates;
pub use workflow::{
    ExecutionSummary, FailureKind, Progress, StatusSnapshot, StepExecution, StepStatus,
    WorkflowEngine, WorkflowResult, WorkflowStatus,
};
