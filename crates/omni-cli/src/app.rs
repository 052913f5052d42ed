//! Runtime wiring shared by every subcommand.
//!
//! [`App`] owns the parser, the workflow engine, the action registry and the
//! execution history, built once from an [`OmniConfig`].

use std::sync::Arc;

use anyhow::{Context, Result};
use omni_adapters::{Workspace, register_filesystem};
use omni_intent::{
    CommandParser, ExecutionHistory, HistoryEntry, ParsedCommand, WorkflowEngine, WorkflowResult,
};
use omni_kernel::{ActionRegistry, ProgressBus, ProgressEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::config::OmniConfig;

const PROGRESS_CAPACITY: usize = 256;

/// Everything needed to turn a command into an executed workflow.
pub struct App {
    parser: CommandParser,
    engine: WorkflowEngine,
    registry: Arc<ActionRegistry>,
    workspace: Arc<Workspace>,
    progress: ProgressBus,
    history: ExecutionHistory,
}

impl App {
    /// Build the runtime.  Creates the workspace root if it is missing.
    pub fn new(config: &OmniConfig) -> Result<Self> {
        let root = &config.filesystem.root;
        std::fs::create_dir_all(root)
            .with_context(|| format!("failed to create workspace root {}", root.display()))?;
        let workspace = Arc::new(Workspace::new(root));

        let registry = Arc::new(ActionRegistry::new());
        register_filesystem(&registry, Arc::clone(&workspace));

        let parser = CommandParser::new()
            .context("failed to compile command grammar")?
            .with_config(config.parser.clone());

        let progress = ProgressBus::new(PROGRESS_CAPACITY);
        let engine = WorkflowEngine::new(registry.clone())
            .with_config(config.engine.clone())
            .with_gate(Arc::new(config.permission_gate()))
            .with_progress(progress.clone());

        info!(
            root = %workspace.root().display(),
            actions = registry.count(),
            sandbox = config.filesystem.sandbox,
            "runtime ready"
        );

        Ok(Self {
            parser,
            engine,
            registry,
            workspace,
            progress,
            history: ExecutionHistory::new(config.history.capacity),
        })
    }

    /// Parse without executing.
    pub async fn analyze(&self, command: &str) -> ParsedCommand {
        self.parser.parse(command).await
    }

    /// Parse, execute and record `command`.
    pub async fn execute(&mut self, command: &str) -> (ParsedCommand, WorkflowResult) {
        let parsed = self.parser.parse(command).await;
        if parsed.has_unknown_steps() {
            warn!(command = %command, "command contains unrecognized parts");
        }
        let result = self
            .engine
            .execute_workflow(&parsed.steps, parsed.complexity)
            .await;
        self.history.record(HistoryEntry::from_result(command, &result));
        (parsed, result)
    }

    /// Log every progress event at debug level until the bus closes.
    pub fn spawn_progress_logger(&self) -> tokio::task::JoinHandle<()> {
        let mut rx = self.progress.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => log_event(&event),
                    Err(RecvError::Lagged(n)) => debug!(skipped = n, "progress logger lagged"),
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn history(&self) -> &ExecutionHistory {
        &self.history
    }
}

fn log_event(event: &ProgressEvent) {
    match event {
        ProgressEvent::WaveStarted { wave, actions, .. } => {
            debug!(wave, actions = ?actions, "wave started");
        }
        ProgressEvent::StepFinished {
            index,
            action,
            status,
            retries,
            ..
        } => {
            debug!(index, action = %action, status = %status, retries, "step finished");
        }
        other => debug!(event = ?other, "progress"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omni_intent::{ComplexityLevel, StepStatus};

    fn config_in(dir: &std::path::Path) -> OmniConfig {
        let mut config = OmniConfig::default();
        config.filesystem.root = dir.to_path_buf();
        config.engine = config.engine.with_retry_delay_ms(0);
        config
    }

    #[tokio::test]
    async fn executes_and_records_history() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::new(&config_in(dir.path())).unwrap();

        let (parsed, result) = app.execute("create a folder named reports").await;
        assert_eq!(parsed.complexity, ComplexityLevel::Simple);
        assert!(result.success, "{result:?}");
        assert!(app.workspace().root().join("reports").is_dir());
        assert_eq!(app.history().len(), 1);
        assert!(app.history().recent(1)[0].success);
    }

    #[tokio::test]
    async fn sandbox_config_blocks_delete() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.txt"), "x").unwrap();
        let mut config = config_in(dir.path());
        config.filesystem.sandbox = true;
        let mut app = App::new(&config).unwrap();

        let (_, result) = app.execute("delete old.txt").await;
        assert!(!result.success);
        assert_eq!(result.steps[0].status, StepStatus::Failed);
        assert!(dir.path().join("old.txt").exists());
    }

    #[tokio::test]
    async fn analyze_does_not_touch_disk() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::new(&config_in(dir.path())).unwrap();

        let parsed = app.analyze("create a folder named drafts").await;
        assert_eq!(parsed.steps[0].action, "create_folder");
        assert!(!dir.path().join("drafts").exists());
        assert!(app.history().is_empty());
    }

    #[test]
    fn registers_filesystem_actions() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::new(&config_in(dir.path())).unwrap();
        assert_eq!(app.registry().list_by_category("filesystem").len(), 8);
    }
}
