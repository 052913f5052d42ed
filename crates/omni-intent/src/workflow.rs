//! Workflow engine.
//!
//! [`WorkflowEngine`] runs an ordered step sequence wave by wave.  Waves are
//! strictly sequential; the steps inside one wave are independent and run
//! concurrently when the wave fits under `max_parallel`, otherwise one at a
//! time.  Every step passes the permission gate once, then gets up to
//! `max_retries` retries with the delay chosen by the injected
//! [`BackoffPolicy`].
//!
//! The engine never returns an error: every outcome, including executor
//! panics, is captured per step in the [`WorkflowResult`].
//!
//! | Wave size            | Execution                                  |
//! |----------------------|--------------------------------------------|
//! | 1                    | the single step, directly                  |
//! | 2 ..= `max_parallel` | concurrent, bounded by a semaphore         |
//! | > `max_parallel`     | sequential, in `(priority, index)` order   |

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use omni_kernel::{
    ActionExecutor, ActionOutcome, ActionRequest, PermissionGate, ProgressBus, ProgressEvent,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backoff::{BackoffPolicy, FixedBackoff};
use crate::config::EngineConfig;
use crate::context::WorkflowContext;
use crate::grouper::{self, ExecutionWave};
use crate::step::{ComplexityLevel, StepSpec};

// ---------------------------------------------------------------------------
// Step execution records
// ---------------------------------------------------------------------------

/// Lifecycle of one step inside a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    /// Whether the step will not change any more.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Why a step ended in [`StepStatus::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The permission gate refused the step.  Never retried.
    PermissionDenied,
    /// The executor failed (or panicked) on every allowed attempt.
    ActionExecutionFailed,
    /// The executor reported a failure that must not be retried, such as an
    /// unregistered action or malformed params.
    ActionRejected,
}

/// Engine-owned record of one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecution {
    /// Position in the original step sequence.
    pub index: usize,
    pub spec: StepSpec,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Retries performed after the first attempt.
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created_resources: Vec<String>,
}

impl StepExecution {
    fn pending(index: usize, spec: StepSpec) -> Self {
        Self {
            index,
            spec,
            status: StepStatus::Pending,
            result: None,
            error: None,
            failure: None,
            retry_count: 0,
            started_at: None,
            ended_at: None,
            created_resources: Vec::new(),
        }
    }

    fn skip(&mut self, reason: impl Into<String>) {
        self.status = StepStatus::Skipped;
        self.error = Some(reason.into());
    }

    fn fail(&mut self, kind: FailureKind, error: String) {
        self.status = StepStatus::Failed;
        self.failure = Some(kind);
        self.error = Some(error);
        self.ended_at = Some(Utc::now());
    }

    /// Wall-clock time the step spent between its first attempt and its end.
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.ended_at? - self.started_at?)
    }
}

// ---------------------------------------------------------------------------
// Workflow result
// ---------------------------------------------------------------------------

/// Aggregate outcome of one [`WorkflowEngine::execute_workflow`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub workflow_id: Uuid,
    pub complexity: ComplexityLevel,
    pub success: bool,
    pub completed_steps: usize,
    pub total_steps: usize,
    /// One record per input step, in input order.
    pub steps: Vec<StepExecution>,
    /// Sum of wave wall-clock durations.
    pub total_execution_time: Duration,
    /// Action of the first required step that failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step_action: Option<String>,
    /// Final state of the workflow context.
    pub context: BTreeMap<String, Value>,
}

impl WorkflowResult {
    /// Count steps per status and collect failure details.
    pub fn summary(&self) -> ExecutionSummary {
        let mut by_status = BTreeMap::new();
        for step in &self.steps {
            *by_status.entry(step.status).or_insert(0) += 1;
        }
        let success_rate = if self.total_steps == 0 {
            0.0
        } else {
            self.completed_steps as f64 / self.total_steps as f64
        };
        ExecutionSummary {
            by_status,
            success_rate,
            total_retries: self.steps.iter().map(|s| s.retry_count).sum(),
            failed_actions: self
                .steps
                .iter()
                .filter(|s| s.status == StepStatus::Failed)
                .map(|s| s.spec.action.clone())
                .collect(),
        }
    }

    /// Every resource created by completed steps, in step order.
    pub fn created_resources(&self) -> Vec<String> {
        self.steps
            .iter()
            .flat_map(|s| s.created_resources.iter().cloned())
            .collect()
    }
}

/// Condensed statistics over a [`WorkflowResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub by_status: BTreeMap<StepStatus, usize>,
    /// Completed steps over total steps, in `0.0..=1.0`.
    pub success_rate: f64,
    pub total_retries: u32,
    pub failed_actions: Vec<String>,
}

impl ExecutionSummary {
    /// Number of steps that ended in `status`.
    pub fn count(&self, status: StepStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Status snapshot
// ---------------------------------------------------------------------------

/// Coarse state of the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

/// Completed / total counters for the current or last run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percent: f64,
}

impl Progress {
    fn new(completed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0.0
        } else {
            completed as f64 * 100.0 / total as f64
        };
        Self {
            completed,
            total,
            percent,
        }
    }
}

/// Read-only view returned by [`WorkflowEngine::status`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: WorkflowStatus,
    /// Action of the step most recently started.
    pub current_step_action: Option<String>,
    pub progress: Progress,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct EngineInner {
    executor: Arc<dyn ActionExecutor>,
    gate: Option<Arc<dyn PermissionGate>>,
    backoff: Arc<dyn BackoffPolicy>,
    config: EngineConfig,
    progress: Option<ProgressBus>,
    status: RwLock<StatusSnapshot>,
}

impl EngineInner {
    fn publish(&self, event: ProgressEvent) {
        if let Some(bus) = &self.progress {
            bus.publish(event);
        }
    }

    fn update_status(&self, f: impl FnOnce(&mut StatusSnapshot)) {
        let mut guard = self.status.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }
}

/// Runs step sequences against an [`ActionExecutor`].
///
/// Cloning is cheap and clones share the status snapshot.
#[derive(Clone)]
pub struct WorkflowEngine {
    inner: Arc<EngineInner>,
}

impl WorkflowEngine {
    /// Create an engine with default limits, a 2 s fixed backoff and no
    /// permission gate.
    pub fn new(executor: Arc<dyn ActionExecutor>) -> Self {
        Self::from_parts(
            executor,
            None,
            Arc::new(FixedBackoff::default()),
            EngineConfig::default(),
            None,
        )
    }

    fn from_parts(
        executor: Arc<dyn ActionExecutor>,
        gate: Option<Arc<dyn PermissionGate>>,
        backoff: Arc<dyn BackoffPolicy>,
        config: EngineConfig,
        progress: Option<ProgressBus>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                executor,
                gate,
                backoff,
                config,
                progress,
                status: RwLock::new(StatusSnapshot::default()),
            }),
        }
    }

    fn rebuild(self, f: impl FnOnce(&mut Parts)) -> Self {
        let inner = &self.inner;
        let mut parts = Parts {
            executor: Arc::clone(&inner.executor),
            gate: inner.gate.clone(),
            backoff: Arc::clone(&inner.backoff),
            config: inner.config.clone(),
            progress: inner.progress.clone(),
        };
        f(&mut parts);
        Self::from_parts(
            parts.executor,
            parts.gate,
            parts.backoff,
            parts.config,
            parts.progress,
        )
    }

    /// Consult `gate` once per step before executing it.
    pub fn with_gate(self, gate: Arc<dyn PermissionGate>) -> Self {
        self.rebuild(|p| p.gate = Some(gate))
    }

    /// Replace the retry delay policy.
    pub fn with_backoff(self, backoff: Arc<dyn BackoffPolicy>) -> Self {
        self.rebuild(|p| p.backoff = backoff)
    }

    /// Replace the limits.  The backoff is reset to a fixed delay of
    /// `config.retry_delay()`; call [`with_backoff`](Self::with_backoff)
    /// afterwards to override it.
    pub fn with_config(self, config: EngineConfig) -> Self {
        self.rebuild(|p| {
            p.backoff = Arc::new(FixedBackoff::new(config.retry_delay()));
            p.config = config;
        })
    }

    /// Publish progress events on `bus`.
    pub fn with_progress(self, bus: ProgressBus) -> Self {
        self.rebuild(|p| p.progress = Some(bus))
    }

    /// The limits in effect.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Snapshot of the current (or last) run.  Safe to call while a run is
    /// in flight.
    pub fn status(&self) -> StatusSnapshot {
        self.inner
            .status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Execute `steps` and aggregate the outcome.
    ///
    /// `level` only selects the success rule: a conditional workflow succeeds
    /// when any step completed, every other level needs all steps completed.
    pub async fn execute_workflow(
        &self,
        steps: &[StepSpec],
        level: ComplexityLevel,
    ) -> WorkflowResult {
        let workflow_id = Uuid::now_v7();
        let waves = grouper::group(steps);
        let total = steps.len();
        let context = WorkflowContext::new();
        let continue_on_error = self.inner.config.continue_on_error;

        info!(
            workflow_id = %workflow_id,
            complexity = %level,
            steps = total,
            waves = waves.len(),
            "starting workflow execution"
        );
        self.inner.update_status(|s| {
            *s = StatusSnapshot {
                status: WorkflowStatus::Running,
                current_step_action: None,
                progress: Progress::new(0, total),
            };
        });
        self.inner.publish(ProgressEvent::WorkflowStarted {
            workflow_id,
            total_steps: total,
            waves: waves.len(),
            timestamp: Utc::now(),
        });

        let mut records: Vec<StepExecution> = steps
            .iter()
            .enumerate()
            .map(|(i, s)| StepExecution::pending(i, s.clone()))
            .collect();
        let mut total_execution_time = Duration::ZERO;
        let mut failed_step_action: Option<String> = None;

        for (wave_no, wave) in waves.iter().enumerate() {
            if failed_step_action.is_some() && !continue_on_error {
                break;
            }

            self.inner.publish(ProgressEvent::WaveStarted {
                workflow_id,
                wave: wave_no,
                actions: wave.steps.iter().map(|&i| steps[i].action.clone()).collect(),
            });

            let runnable = self.filter_unmet(wave, &mut records, workflow_id);
            let started = Instant::now();
            let halted = self
                .run_wave(workflow_id, wave_no, &runnable, steps, &context, &mut records)
                .await;
            total_execution_time += started.elapsed();

            if let Some(action) = halted
                && failed_step_action.is_none()
            {
                failed_step_action = Some(action);
            }
        }

        for record in records.iter_mut().filter(|r| r.status == StepStatus::Pending) {
            record.skip("not started: an earlier required step failed");
            self.publish_finished(workflow_id, record);
        }

        let completed_steps = records
            .iter()
            .filter(|r| r.status == StepStatus::Completed)
            .count();
        let success = match level {
            ComplexityLevel::Conditional => completed_steps > 0,
            _ => completed_steps == total,
        };

        self.inner.update_status(|s| {
            s.status = if success {
                WorkflowStatus::Completed
            } else {
                WorkflowStatus::Failed
            };
            s.progress = Progress::new(completed_steps, total);
        });
        self.inner.publish(ProgressEvent::WorkflowFinished {
            workflow_id,
            success,
            completed: completed_steps,
            total,
            timestamp: Utc::now(),
        });
        info!(
            workflow_id = %workflow_id,
            success,
            completed = completed_steps,
            total,
            elapsed_ms = total_execution_time.as_millis() as u64,
            "workflow execution complete"
        );

        WorkflowResult {
            workflow_id,
            complexity: level,
            success,
            completed_steps,
            total_steps: total,
            steps: records,
            total_execution_time,
            failed_step_action,
            context: context.snapshot(),
        }
    }

    /// Mark steps whose dependencies ran but did not complete as skipped and
    /// return the rest of the wave.
    fn filter_unmet(
        &self,
        wave: &ExecutionWave,
        records: &mut [StepExecution],
        workflow_id: Uuid,
    ) -> Vec<usize> {
        let mut runnable = Vec::with_capacity(wave.len());
        for &index in &wave.steps {
            let blocker = records[index].spec.dependencies.iter().copied().find(|&d| {
                records
                    .get(d)
                    .is_some_and(|r| matches!(r.status, StepStatus::Failed | StepStatus::Skipped))
            });
            match blocker {
                Some(dep) => {
                    debug!(step = index, dependency = dep, "dependency did not complete, skipping");
                    records[index].skip(format!("dependency step {dep} did not complete"));
                    self.publish_finished(workflow_id, &records[index]);
                }
                None => runnable.push(index),
            }
        }
        runnable
    }

    /// Run one wave and store each record at its original index.  Returns the
    /// action of the first required step that failed, if any.
    async fn run_wave(
        &self,
        workflow_id: Uuid,
        wave_no: usize,
        runnable: &[usize],
        steps: &[StepSpec],
        context: &WorkflowContext,
        records: &mut [StepExecution],
    ) -> Option<String> {
        let max_parallel = self.inner.config.max_parallel.max(1);

        if runnable.len() >= 2 && runnable.len() <= max_parallel {
            debug!(wave = wave_no, steps = runnable.len(), "running wave concurrently");
            let semaphore = Arc::new(Semaphore::new(runnable.len().min(max_parallel)));
            let mut set = JoinSet::new();
            for &index in runnable {
                let inner = Arc::clone(&self.inner);
                let context = context.clone();
                let spec = steps[index].clone();
                let semaphore = Arc::clone(&semaphore);
                set.spawn(async move {
                    let _permit = semaphore.acquire_owned().await;
                    run_step(inner, context, index, spec, workflow_id).await
                });
            }

            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(record) => {
                        let index = record.index;
                        records[index] = record;
                    }
                    Err(e) => warn!(wave = wave_no, error = %e, "step task did not finish"),
                }
            }
            for &index in runnable {
                if records[index].status == StepStatus::Pending {
                    records[index].fail(
                        FailureKind::ActionExecutionFailed,
                        "step task aborted before reporting".into(),
                    );
                }
            }
            self.count_progress(records);
            return first_required_failure(runnable, records);
        }

        if runnable.len() > max_parallel {
            debug!(
                wave = wave_no,
                steps = runnable.len(),
                max_parallel,
                "wave exceeds parallel limit, running sequentially"
            );
        }
        let mut failed = None;
        for &index in runnable {
            if failed.is_some() && !self.inner.config.continue_on_error {
                break;
            }
            let record = run_step(
                Arc::clone(&self.inner),
                context.clone(),
                index,
                steps[index].clone(),
                workflow_id,
            )
            .await;
            records[index] = record;
            self.count_progress(records);
            if failed.is_none() {
                failed = first_required_failure(&[index], records);
            }
        }
        failed
    }

    fn count_progress(&self, records: &[StepExecution]) {
        let completed = records
            .iter()
            .filter(|r| r.status == StepStatus::Completed)
            .count();
        self.inner
            .update_status(|s| s.progress = Progress::new(completed, records.len()));
    }

    fn publish_finished(&self, workflow_id: Uuid, record: &StepExecution) {
        publish_finished(&self.inner, workflow_id, record);
    }
}

struct Parts {
    executor: Arc<dyn ActionExecutor>,
    gate: Option<Arc<dyn PermissionGate>>,
    backoff: Arc<dyn BackoffPolicy>,
    config: EngineConfig,
    progress: Option<ProgressBus>,
}

fn first_required_failure(indices: &[usize], records: &[StepExecution]) -> Option<String> {
    indices
        .iter()
        .map(|&i| &records[i])
        .find(|r| r.status == StepStatus::Failed && !r.spec.optional)
        .map(|r| r.spec.action.clone())
}

fn publish_finished(inner: &EngineInner, workflow_id: Uuid, record: &StepExecution) {
    inner.publish(ProgressEvent::StepFinished {
        workflow_id,
        index: record.index,
        action: record.spec.action.clone(),
        status: record.status.to_string(),
        retries: record.retry_count,
        timestamp: Utc::now(),
    });
}

// ---------------------------------------------------------------------------
// Single step
// ---------------------------------------------------------------------------

/// Gate, then execute with retries.  Always returns a terminal record.
async fn run_step(
    inner: Arc<EngineInner>,
    context: WorkflowContext,
    index: usize,
    spec: StepSpec,
    workflow_id: Uuid,
) -> StepExecution {
    let mut record = StepExecution::pending(index, spec);
    record.status = StepStatus::Running;
    record.started_at = Some(Utc::now());
    inner.update_status(|s| s.current_step_action = Some(record.spec.action.clone()));

    if let Some(gate) = &inner.gate {
        let request = record.spec.to_request();
        if !gate.check(&request) {
            let reason = gate.denial_reason(&request);
            warn!(step = index, action = %record.spec.action, reason = %reason, "permission denied");
            record.fail(FailureKind::PermissionDenied, reason);
            publish_finished(&inner, workflow_id, &record);
            return record;
        }
    }

    loop {
        let request = ActionRequest::new(&record.spec.action, &record.spec.category)
            .with_params(context.resolve_params(&record.spec.params))
            .with_conditions(record.spec.conditions.clone());

        debug!(
            step = index,
            action = %request.action,
            attempt = record.retry_count + 1,
            "executing step"
        );
        let outcome = call_executor(Arc::clone(&inner.executor), request).await;

        if outcome.success {
            let result = outcome.result.unwrap_or(Value::Null);
            context.record_success(&record.spec.action, result.clone());
            record.status = StepStatus::Completed;
            record.result = Some(result);
            record.created_resources = outcome.created_resources;
            record.ended_at = Some(Utc::now());
            info!(step = index, action = %record.spec.action, retries = record.retry_count, "step completed");
            break;
        }

        let error = outcome
            .error
            .unwrap_or_else(|| format!("action `{}` failed", record.spec.action));

        if !outcome.retryable {
            warn!(step = index, action = %record.spec.action, error = %error, "step rejected, not retrying");
            record.fail(FailureKind::ActionRejected, error);
            break;
        }

        if record.retry_count >= inner.config.max_retries {
            warn!(
                step = index,
                action = %record.spec.action,
                retries = record.retry_count,
                error = %error,
                "step failed after exhausting retries"
            );
            record.fail(FailureKind::ActionExecutionFailed, error);
            break;
        }

        record.retry_count += 1;
        let delay = inner.backoff.delay(record.retry_count);
        warn!(
            step = index,
            action = %record.spec.action,
            attempt = record.retry_count,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "step failed, retrying"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    publish_finished(&inner, workflow_id, &record);
    record
}

/// Run the blocking executor off the async workers.  A panic inside the
/// executor becomes a retryable failure.
async fn call_executor(executor: Arc<dyn ActionExecutor>, request: ActionRequest) -> ActionOutcome {
    let action = request.action.clone();
    match tokio::task::spawn_blocking(move || executor.execute(&request)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(action = %action, error = %e, "executor panicked");
            ActionOutcome::failed(format!("executor panicked while running `{action}`: {e}"))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
