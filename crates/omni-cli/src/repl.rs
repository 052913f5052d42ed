//! Subcommand: `omni interactive` -- line-oriented REPL.
//!
//! Each input line is executed as a command.  A few words are handled by the
//! REPL itself:
//!
//! | Input | Effect |
//! |-------|--------|
//! | `help` | list the built-in words |
//! | `history` | show the ten most recent commands |
//! | `status` | show the engine snapshot |
//! | `analyze <command>` | dry-run a command |
//! | `quit` / `exit` | leave |

use std::io::{self, BufRead, Write as _};

use anyhow::{Context, Result};
use tracing::info;

use crate::app::App;
use crate::cli::OutputFormat;
use crate::config::OmniConfig;
use crate::render;

const HISTORY_SHOWN: usize = 10;

/// What a REPL line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Quit,
    Help,
    History,
    Status,
    Analyze(&'a str),
    Execute(&'a str),
}

fn classify(line: &str) -> Input<'_> {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" => Input::Empty,
        "quit" | "exit" => Input::Quit,
        "help" | "?" => Input::Help,
        "history" => Input::History,
        "status" => Input::Status,
        _ => match line.strip_prefix("analyze ") {
            Some(rest) if !rest.trim().is_empty() => Input::Analyze(rest.trim()),
            _ => Input::Execute(line),
        },
    }
}

/// Run the REPL on stdin.  Returns whether the last executed command
/// succeeded.
pub async fn cmd_interactive(config: &OmniConfig) -> Result<bool> {
    let mut app = App::new(config)?;
    let logger = app.spawn_progress_logger();
    info!("interactive session started");

    println!();
    println!("  OmniAutomator v{}", env!("CARGO_PKG_VERSION"));
    println!("  Type a command, 'help' for more, or 'quit' to exit.");
    println!();

    let mut last_ok = true;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("omni> ");
        io::stdout().flush().context("failed to flush stdout")?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read input")?;

        match classify(&line) {
            Input::Empty => continue,
            Input::Quit => break,
            Input::Help => print_help(),
            Input::History => print_history(&app),
            Input::Status => render::print_json(&app.engine().status())?,
            Input::Analyze(command) => {
                let parsed = app.analyze(command).await;
                render::print_analysis(&parsed, OutputFormat::Text)?;
            }
            Input::Execute(command) => {
                let (_, result) = app.execute(command).await;
                render::print_result(&result, OutputFormat::Text)?;
                last_ok = result.success;
            }
        }
    }

    info!(commands = app.history().len(), "interactive session ended");
    logger.abort();
    Ok(last_ok)
}

fn print_help() {
    println!();
    println!("  Examples:");
    println!("    create a folder named reports on the desktop");
    println!("    create 10 folders naming from 1.1 to 1.10 in documents");
    println!("    set up a data analysis project called sales");
    println!();
    println!("  Built-in words:");
    println!("    analyze <command>  - parse without executing");
    println!("    history            - recent commands");
    println!("    status             - engine snapshot");
    println!("    quit / exit        - leave");
    println!();
}

fn print_history(app: &App) {
    let history = app.history();
    if history.is_empty() {
        println!("  No commands yet.");
        return;
    }
    for entry in history.recent(HISTORY_SHOWN) {
        let mark = if entry.success { "ok" } else { "FAILED" };
        println!(
            "  {} [{mark}] {} ({}/{}, {})",
            entry.at.format("%H:%M:%S"),
            entry.command,
            entry.completed,
            entry.total,
            entry.complexity
        );
    }
    println!(
        "  Success rate: {:.0}% over {} command(s)",
        history.success_rate() * 100.0,
        history.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_words() {
        assert_eq!(classify("  "), Input::Empty);
        assert_eq!(classify("QUIT"), Input::Quit);
        assert_eq!(classify("history"), Input::History);
        assert_eq!(classify("analyze copy a to b"), Input::Analyze("copy a to b"));
    }

    #[test]
    fn everything_else_executes() {
        assert_eq!(
            classify(" create a folder named x "),
            Input::Execute("create a folder named x")
        );
        assert_eq!(classify("analyze "), Input::Execute("analyze"));
    }
}
