//! Human-readable and JSON output.

use anyhow::Result;
use omni_intent::{ParsedCommand, StepStatus, WorkflowResult};
use serde::Serialize;

use crate::cli::OutputFormat;

/// Print `value` as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the outcome of one executed command.
pub fn print_result(result: &WorkflowResult, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(result);
    }

    let mark = if result.success { "ok" } else { "FAILED" };
    println!(
        "  [{mark}] {} ({}/{} steps, {:.2}s)",
        result.complexity,
        result.completed_steps,
        result.total_steps,
        result.total_execution_time.as_secs_f64()
    );
    for step in &result.steps {
        let retries = if step.retry_count > 0 {
            format!(" after {} retries", step.retry_count)
        } else {
            String::new()
        };
        println!(
            "    {:>2}. {:<22} {}{retries}",
            step.index + 1,
            step.spec.action,
            step.status
        );
        if step.status != StepStatus::Completed
            && let Some(error) = &step.error
        {
            println!("        {error}");
        }
    }

    let created = result.created_resources();
    if !created.is_empty() {
        println!("  Created {} item(s).", created.len());
    }
    if let Some(action) = &result.failed_step_action {
        println!("  First required failure: {action}");
    }
    Ok(())
}

/// Print a dry-run analysis.
pub fn print_analysis(parsed: &ParsedCommand, format: OutputFormat) -> Result<()> {
    let waves = parsed.waves();
    if format == OutputFormat::Json {
        #[derive(Serialize)]
        struct Analysis<'a> {
            #[serde(flatten)]
            parsed: &'a ParsedCommand,
            waves: Vec<Vec<usize>>,
        }
        return print_json(&Analysis {
            parsed,
            waves: waves.into_iter().map(|w| w.steps).collect(),
        });
    }

    println!("  Command:    {}", parsed.original);
    println!("  Complexity: {}", parsed.complexity);
    println!("  Confidence: {:.2}", parsed.confidence);
    println!("  Estimate:   ~{}s", parsed.estimated_duration_secs);
    println!();
    println!("  Steps:");
    for (i, step) in parsed.steps.iter().enumerate() {
        let deps = if step.dependencies.is_empty() {
            String::new()
        } else {
            let list: Vec<String> = step.dependencies.iter().map(|d| (d + 1).to_string()).collect();
            format!("  after {}", list.join(", "))
        };
        println!("    {:>2}. {}{deps}", i + 1, step.action);
        if !step.params.is_empty() {
            println!("        {}", serde_json::Value::Object(step.params.clone()));
        }
    }
    println!();
    println!("  Waves:");
    for (i, wave) in waves.iter().enumerate() {
        let members: Vec<String> = wave.steps.iter().map(|s| (s + 1).to_string()).collect();
        let note = if wave.forced { "  (forced)" } else { "" };
        println!("    {}: [{}]{note}", i + 1, members.join(", "));
    }

    let ctx = &parsed.context;
    for (label, values) in [
        ("Languages", &ctx.programming_languages),
        ("Tools", &ctx.tools),
        ("File types", &ctx.file_types),
        ("Locations", &ctx.locations),
    ] {
        if !values.is_empty() {
            println!("  {label}: {}", values.join(", "));
        }
    }
    Ok(())
}
