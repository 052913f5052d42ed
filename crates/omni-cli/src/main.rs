//! CLI entry point for OmniAutomator.
//!
//! This binary provides the `omni` command with subcommands for executing a
//! single command, running a batch file, dry-run analysis, and inspecting
//! the runtime.

mod app;
mod cli;
mod config;
mod render;
mod repl;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use omni_intent::StepStatus;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::cli::{Cli, Commands, OutputFormat};
use crate::config::OmniConfig;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(if cli.verbose { "debug" } else { "warn" }, cli.log_json);

    let mut config = OmniConfig::load(cli.config.as_deref())?;
    config.filesystem.sandbox |= cli.sandbox;

    let ok = match cli.command {
        Commands::Run {
            command,
            continue_on_error,
            output,
        } => {
            config.engine.continue_on_error |= continue_on_error;
            cmd_run(&config, &command, output).await?
        }
        Commands::Batch {
            file,
            continue_on_error,
        } => {
            config.engine.continue_on_error |= continue_on_error;
            cmd_batch(&config, &file).await?
        }
        Commands::Analyze { command, output } => cmd_analyze(&config, &command, output).await?,
        Commands::Status => cmd_status(&config)?,
        Commands::Capabilities => cmd_capabilities(&config)?,
        Commands::Interactive => repl::cmd_interactive(&config).await?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

// ---------------------------------------------------------------------------
// Subcommand: run
// ---------------------------------------------------------------------------

async fn cmd_run(config: &OmniConfig, command: &str, output: OutputFormat) -> Result<bool> {
    let mut app = App::new(config)?;
    let logger = app.spawn_progress_logger();

    let (_, result) = app.execute(command).await;
    render::print_result(&result, output)?;

    logger.abort();
    Ok(result.success)
}

// ---------------------------------------------------------------------------
// Subcommand: batch
// ---------------------------------------------------------------------------

/// Non-empty lines of a batch file that are not `#` comments.
fn batch_commands(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}

async fn cmd_batch(config: &OmniConfig, file: &Path) -> Result<bool> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read batch file {}", file.display()))?;
    let commands = batch_commands(&content);
    if commands.is_empty() {
        println!("  No commands found in {}", file.display());
        return Ok(true);
    }

    let continue_on_error = config.engine.continue_on_error;
    let mut app = App::new(config)?;
    let logger = app.spawn_progress_logger();
    info!(commands = commands.len(), continue_on_error, "running batch");

    let mut all_ok = true;
    for (i, command) in commands.iter().enumerate() {
        let (_, result) = app.execute(command).await;
        let mark = if result.success { "ok" } else { "FAILED" };
        println!(
            "  [{mark}] {}: {command} ({}/{})",
            i + 1,
            result.completed_steps,
            result.total_steps
        );
        if !result.success {
            all_ok = false;
            let failure = result
                .steps
                .iter()
                .filter(|s| s.status == StepStatus::Failed)
                .find_map(|s| Some((&s.spec.action, s.error.as_deref()?)));
            if let Some((action, error)) = failure {
                println!("        {action}: {error}");
            }
            if !continue_on_error {
                error!(line = i + 1, command = %command, "batch stopped at failed command");
                break;
            }
        }
    }

    let history = app.history();
    println!(
        "  {} command(s) run, {:.0}% succeeded",
        history.len(),
        history.success_rate() * 100.0
    );
    logger.abort();
    Ok(all_ok)
}

// ---------------------------------------------------------------------------
// Subcommand: analyze
// ---------------------------------------------------------------------------

async fn cmd_analyze(config: &OmniConfig, command: &str, output: OutputFormat) -> Result<bool> {
    let app = App::new(config)?;
    let parsed = app.analyze(command).await;
    render::print_analysis(&parsed, output)?;
    Ok(!parsed.has_unknown_steps())
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

fn cmd_status(config: &OmniConfig) -> Result<bool> {
    let app = App::new(config)?;
    let engine = app.engine().config();
    let status = app.engine().status();

    println!();
    println!("  OmniAutomator Status");
    println!("  ====================");
    println!();
    println!("  Workspace root:   {}", app.workspace().root().display());
    println!(
        "  Sandbox:          {}",
        if config.filesystem.sandbox { "on" } else { "off" }
    );
    println!("  Actions:          {}", app.registry().count());
    println!("  Max parallel:     {}", engine.max_parallel);
    println!(
        "  Retries:          {} x {}ms",
        engine.max_retries, engine.retry_delay_ms
    );
    println!("  Continue on err:  {}", engine.continue_on_error);
    println!("  History capacity: {}", app.history().capacity());
    println!("  Engine:           {:?}", status.status);
    println!();
    Ok(true)
}

// ---------------------------------------------------------------------------
// Subcommand: capabilities
// ---------------------------------------------------------------------------

fn cmd_capabilities(config: &OmniConfig) -> Result<bool> {
    let app = App::new(config)?;
    let mut current = None;
    let mut actions = app.registry().list_all();
    actions.sort_by(|a, b| (&a.category, &a.action).cmp(&(&b.category, &b.action)));
    for info in actions {
        if current.as_deref() != Some(info.category.as_str()) {
            println!();
            println!("  {}:", info.category);
            current = Some(info.category.clone());
        }
        println!("    {:<22} {}", info.action, info.description);
    }
    println!();
    Ok(true)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber.  `RUST_LOG` overrides `default_level`.
fn init_tracing(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}
