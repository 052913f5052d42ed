//! Integration tests for the omni-intent crate.
//!
//! These drive the full pipeline (parse, group, execute) against in-memory
//! executors so that the engine's ordering, retry and concurrency rules can
//! be observed without touching the filesystem.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use omni_intent::{
    CommandParser, ComplexityLevel, EngineConfig, ExecutionHistory, HistoryEntry, NoBackoff,
    StepSpec, StepStatus, WorkflowEngine, WorkflowStatus,
};
use omni_kernel::{ActionExecutor, ActionOutcome, ActionRequest};
use serde_json::json;

/// Records every call and fails the configured actions.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<ActionRequest>>,
    failing: Vec<&'static str>,
}

impl Recorder {
    fn failing(actions: &[&'static str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: actions.to_vec(),
        }
    }

    fn actions(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.action.clone())
            .collect()
    }
}

impl ActionExecutor for Recorder {
    fn execute(&self, request: &ActionRequest) -> ActionOutcome {
        self.calls.lock().unwrap().push(request.clone());
        if self.failing.contains(&request.action.as_str()) {
            return ActionOutcome::failed(format!("{} exploded", request.action));
        }
        ActionOutcome::ok(json!({ "done": request.action }))
            .with_resources(vec![format!("/tmp/{}", request.action)])
    }
}

/// Tracks how many calls are in flight at once.
#[derive(Default)]
struct Gauge {
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ActionExecutor for Gauge {
    fn execute(&self, _request: &ActionRequest) -> ActionOutcome {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(40));
        self.running.fetch_sub(1, Ordering::SeqCst);
        ActionOutcome::ok(json!(null))
    }
}

fn fast_engine(executor: Arc<dyn ActionExecutor>) -> WorkflowEngine {
    WorkflowEngine::new(executor).with_backoff(Arc::new(NoBackoff))
}

// ═══════════════════════════════════════════════════════════════════════
//  Parse → group → execute
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn nested_folder_command_runs_as_three_waves() {
    let parser = CommandParser::new().unwrap();
    let parsed = parser
        .parse(
            "create a folder named project and create 3 folders naming from mod1 to mod3 \
             and among those create 2 folders naming from sub1 to sub2",
        )
        .await;

    assert_eq!(parsed.complexity, ComplexityLevel::Workflow);
    assert_eq!(parsed.steps.len(), 3);
    let waves = parsed.waves();
    assert_eq!(waves.len(), 3);
    assert!(waves.iter().all(|w| w.len() == 1));

    let recorder = Arc::new(Recorder::default());
    let result = fast_engine(recorder.clone())
        .execute_workflow(&parsed.steps, parsed.complexity)
        .await;

    assert!(result.success);
    assert_eq!(result.completed_steps, 3);
    assert_eq!(
        recorder.actions(),
        vec!["create_folder", "create_bulk_folders", "create_nested_folders"]
    );
    assert_eq!(result.created_resources().len(), 3);
    assert_eq!(
        result.context["step_create_bulk_folders_result"],
        json!({ "done": "create_bulk_folders" })
    );

    let calls = recorder.calls.lock().unwrap();
    assert_eq!(calls[2].conditions, vec!["bulk_folders_created"]);
    assert_eq!(calls[2].params["parent_prefix"], "mod");
}

#[tokio::test]
async fn simple_copy_is_one_step() {
    let parser = CommandParser::new().unwrap();
    let parsed = parser.analyze("Copy notes.txt to backup.txt");
    assert_eq!(parsed.complexity, ComplexityLevel::Simple);
    assert_eq!(parsed.steps.len(), 1);
    assert_eq!(parsed.steps[0].action, "copy");
}

// ═══════════════════════════════════════════════════════════════════════
//  Failure aggregation
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn required_failure_halts_the_chain() {
    let steps = vec![
        StepSpec::new("first", "test"),
        StepSpec::new("second", "test").depends_on(0),
        StepSpec::new("third", "test").depends_on(1),
    ];
    let recorder = Arc::new(Recorder::failing(&["second"]));
    let engine = fast_engine(recorder.clone());
    let result = engine
        .execute_workflow(&steps, ComplexityLevel::Compound)
        .await;

    assert!(!result.success);
    assert_eq!(result.completed_steps, 1);
    assert_eq!(result.total_steps, 3);
    assert_eq!(result.steps[1].status, StepStatus::Failed);
    assert_eq!(result.steps[1].retry_count, 3);
    assert_eq!(result.steps[2].status, StepStatus::Skipped);
    assert_eq!(result.failed_step_action.as_deref(), Some("second"));
    assert!(!recorder.actions().contains(&"third".to_string()));

    let summary = result.summary();
    assert_eq!(summary.count(StepStatus::Completed), 1);
    assert_eq!(summary.count(StepStatus::Skipped), 1);
    assert_eq!(summary.failed_actions, vec!["second"]);
    assert_eq!(engine.status().status, WorkflowStatus::Failed);
}

#[tokio::test]
async fn halt_leaves_rest_of_large_wave_unstarted() {
    let steps: Vec<StepSpec> = ["a", "b", "c", "d"]
        .iter()
        .map(|a| StepSpec::new(*a, "test"))
        .collect();
    let recorder = Arc::new(Recorder::failing(&["b"]));
    let result = fast_engine(recorder.clone())
        .with_config(EngineConfig::new().with_max_parallel(2))
        .with_backoff(Arc::new(NoBackoff))
        .execute_workflow(&steps, ComplexityLevel::Workflow)
        .await;

    let statuses: Vec<StepStatus> = result.steps.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![
            StepStatus::Completed,
            StepStatus::Failed,
            StepStatus::Skipped,
            StepStatus::Skipped,
        ]
    );
}

// ═══════════════════════════════════════════════════════════════════════
//  Concurrency
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn wave_within_cap_runs_in_parallel_up_to_it() {
    let gauge = Arc::new(Gauge::default());
    let steps: Vec<StepSpec> = (0..3).map(|i| StepSpec::new(format!("s{i}"), "test")).collect();
    let result = fast_engine(gauge.clone())
        .execute_workflow(&steps, ComplexityLevel::Workflow)
        .await;

    assert!(result.success);
    let peak = gauge.peak.load(Ordering::SeqCst);
    assert!(peak >= 2, "wave ran serially (peak {peak})");
    assert!(peak <= 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn wave_over_cap_runs_sequentially() {
    let gauge = Arc::new(Gauge::default());
    let steps: Vec<StepSpec> = (0..5).map(|i| StepSpec::new(format!("s{i}"), "test")).collect();
    let result = fast_engine(gauge.clone())
        .execute_workflow(&steps, ComplexityLevel::Workflow)
        .await;

    assert!(result.success);
    assert_eq!(result.completed_steps, 5);
    assert_eq!(gauge.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn results_keep_input_order() {
    let steps = vec![
        StepSpec::new("late", "test").with_priority(5),
        StepSpec::new("early", "test").with_priority(1),
    ];
    let result = fast_engine(Arc::new(Recorder::default()))
        .execute_workflow(&steps, ComplexityLevel::Compound)
        .await;
    let actions: Vec<&str> = result.steps.iter().map(|s| s.spec.action.as_str()).collect();
    assert_eq!(actions, vec!["late", "early"]);
}

// ═══════════════════════════════════════════════════════════════════════
//  History
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn history_records_runs() {
    let mut history = ExecutionHistory::new(10);
    let engine = fast_engine(Arc::new(Recorder::failing(&["bad"])));

    for action in ["good", "bad"] {
        let steps = vec![StepSpec::new(action, "test")];
        let result = engine.execute_workflow(&steps, ComplexityLevel::Simple).await;
        history.record(HistoryEntry::from_result(action, &result));
    }

    assert_eq!(history.len(), 2);
    assert_eq!(history.success_rate(), 0.5);
    assert!(!history.recent(1)[0].success);
}
