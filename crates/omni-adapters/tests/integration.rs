//! Integration tests for the omni-adapters crate.
//!
//! These run parsed commands through the real workflow engine against a
//! temporary workspace, so every step touches the filesystem.

use std::sync::Arc;

use omni_adapters::{RulePermissionGate, Workspace, register_filesystem};
use omni_intent::{
    CommandParser, ComplexityLevel, ExtractionContext, FailureKind, NoBackoff, StepSpec,
    StepStatus, WorkflowEngine,
};
use omni_kernel::{ActionExecutor, ActionRegistry, ActionRequest};

fn setup() -> (tempfile::TempDir, Arc<Workspace>, Arc<ActionRegistry>) {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Arc::new(Workspace::new(dir.path()));
    let registry = ActionRegistry::new();
    register_filesystem(&registry, Arc::clone(&workspace));
    (dir, workspace, Arc::new(registry))
}

fn engine(registry: Arc<ActionRegistry>) -> WorkflowEngine {
    WorkflowEngine::new(registry).with_backoff(Arc::new(NoBackoff))
}

// ═══════════════════════════════════════════════════════════════════════
//  Commands end to end
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn nested_folder_tree_is_built() {
    let (_dir, ws, registry) = setup();
    let parser = CommandParser::new().unwrap();
    let parsed = parser
        .parse(
            "create a folder named project and create 3 folders naming from mod1 to mod3 \
             and among those create 2 folders naming from sub1 to sub2",
        )
        .await;

    let result = engine(registry)
        .execute_workflow(&parsed.steps, parsed.complexity)
        .await;

    assert!(result.success, "{:?}", result.steps);
    for m in 1..=3 {
        for s in 1..=2 {
            assert!(ws.root().join(format!("project/mod{m}/sub{s}")).is_dir());
        }
    }
    // 1 container + 3 bulk + 6 nested.
    assert_eq!(result.created_resources().len(), 10);
}

#[tokio::test]
async fn decimal_bulk_folders_on_desktop() {
    let (_dir, ws, registry) = setup();
    let parsed = CommandParser::new()
        .unwrap()
        .analyze("create 15 folders naming as 1.1 to 1.15 on the desktop");

    let result = engine(registry)
        .execute_workflow(&parsed.steps, parsed.complexity)
        .await;

    assert!(result.success, "{:?}", result.steps);
    assert!(ws.root().join("Desktop/1.1").is_dir());
    assert!(ws.root().join("Desktop/1.15").is_dir());
    assert!(!ws.root().join("Desktop/1.16").exists());
}

#[tokio::test]
async fn compound_create_then_copy() {
    let (_dir, ws, registry) = setup();
    let parser = CommandParser::new().unwrap();
    let text = "create file notes.txt with content hello then copy notes.txt to backup.txt";
    // A simple verb short-circuits classification to one step.
    assert_eq!(parser.analyze(text).complexity, ComplexityLevel::Simple);

    let steps = parser
        .extractor()
        .extract_compound(text, &mut ExtractionContext::default());
    assert_eq!(steps.len(), 2);

    let result = engine(registry)
        .execute_workflow(&steps, ComplexityLevel::Compound)
        .await;

    assert!(result.success, "{:?}", result.steps);
    assert_eq!(
        std::fs::read_to_string(ws.root().join("backup.txt")).unwrap(),
        "hello"
    );
}

// ═══════════════════════════════════════════════════════════════════════
//  Failure paths
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn unregistered_action_fails_closed() {
    let (_dir, _ws, registry) = setup();
    let outcome = registry.execute(&ActionRequest::new("launch_rocket", "space"));
    assert!(!outcome.success);
    assert!(!outcome.retryable);

    let result = engine(registry)
        .execute_workflow(&[StepSpec::new("launch_rocket", "space")], ComplexityLevel::Simple)
        .await;
    assert_eq!(result.steps[0].failure, Some(FailureKind::ActionRejected));
    assert_eq!(result.steps[0].retry_count, 0);
}

#[tokio::test]
async fn sandbox_gate_blocks_delete() {
    let (_dir, ws, registry) = setup();
    std::fs::write(ws.root().join("keep.txt"), "x").unwrap();

    let steps = vec![StepSpec::new("delete", "filesystem").with_param("path", "keep.txt")];
    let result = engine(registry)
        .with_gate(Arc::new(RulePermissionGate::new().with_sandbox(true)))
        .execute_workflow(&steps, ComplexityLevel::Simple)
        .await;

    assert_eq!(result.steps[0].status, StepStatus::Failed);
    assert_eq!(result.steps[0].failure, Some(FailureKind::PermissionDenied));
    assert!(ws.root().join("keep.txt").exists());
}

#[tokio::test]
async fn escaping_path_is_not_retried() {
    let (_dir, _ws, registry) = setup();
    let steps = vec![StepSpec::new("create_file", "filesystem").with_param("name", "../../evil.txt")];
    let result = engine(registry)
        .execute_workflow(&steps, ComplexityLevel::Simple)
        .await;

    assert_eq!(result.steps[0].status, StepStatus::Failed);
    assert_eq!(result.steps[0].retry_count, 0);
}
