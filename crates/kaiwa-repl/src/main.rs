//! kaiwa CLI entry point.
//!
//! Usage:
//!   kaiwa                      # Interactive REPL
//!   kaiwa -c <input>           # Evaluate one input and exit

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kaiwa_repl::{LineResult, Repl};

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        None => {
            run_interactive()?;
            Ok(ExitCode::SUCCESS)
        }
        Some("--help" | "-h") => {
            print_help();
            Ok(ExitCode::SUCCESS)
        }
        Some("--version" | "-V") => {
            println!("kaiwa {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
        Some("-c") => {
            let input = args.get(2).context("-c requires an input argument")?;
            run_once(input)
        }
        Some(unknown) => {
            eprintln!("Unknown option: {unknown}");
            eprintln!("Run 'kaiwa --help' for usage.");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_help() {
    println!(
        r#"会話 — kaiwa v{}

Usage:
  kaiwa                        Interactive REPL
  kaiwa -c <input>             Evaluate one input and exit

Options:
  -c <input>                   Evaluate an input string and exit
  -h, --help                   Show this help
  -V, --version                Show version

Examples:
  kaiwa                        # Start interactive REPL
  kaiwa -c '= 4 * 20'          # Evaluate an expression
  kaiwa -c 'x = 5; print(x);'  # Statements
"#,
        env!("CARGO_PKG_VERSION")
    );
}

/// Evaluate a single input and exit.
fn run_once(input: &str) -> Result<ExitCode> {
    let mut repl = Repl::new();
    match repl.process_line(input) {
        LineResult::Done(Some(text)) | LineResult::Edit { output: text, .. } => {
            println!("{text}");
        }
        LineResult::Continue => {
            eprintln!("input is incomplete");
            return Ok(ExitCode::FAILURE);
        }
        LineResult::Done(None) | LineResult::Exit => {}
    }
    let failed = repl
        .session()
        .history()
        .last()
        .map(|entry| {
            entry
                .children()
                .iter()
                .any(|c| c.kind == kaiwa_engine::LogEntryKind::Error)
        })
        .unwrap_or(false);
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Run the interactive REPL loop.
fn run_interactive() -> Result<()> {
    println!("会話 — kaiwa v{}", env!("CARGO_PKG_VERSION"));
    println!("Type /help for commands, /quit to exit.\n");

    let mut repl = Repl::new();
    let mut rl: Editor<(), DefaultHistory> = Editor::new()?;

    let history_path = history_path();
    if let Some(path) = &history_path {
        if path.exists() {
            if let Err(e) = rl.load_history(path) {
                tracing::warn!("Failed to load history: {}", e);
            }
        }
    }

    // Text handed back after a diagnostic, pre-filled into the next prompt.
    let mut restore: Option<String> = None;

    loop {
        let prompt = if repl.is_continuing() {
            "  ...> "
        } else {
            "kaiwa> "
        };
        let line = match restore.take() {
            Some(initial) => rl.readline_with_initial(prompt, (&initial, "")),
            None => rl.readline(prompt),
        };

        match line {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(e) = rl.add_history_entry(&line) {
                        tracing::warn!("Failed to add history entry: {}", e);
                    }
                }
                match repl.process_line(&line) {
                    LineResult::Done(Some(text)) => println!("{text}"),
                    LineResult::Done(None) | LineResult::Continue => {}
                    LineResult::Edit { output, text } => {
                        if !output.is_empty() {
                            println!("{output}");
                        }
                        restore = Some(text);
                    }
                    LineResult::Exit => break,
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C clears any pending continuation.
                repl.abandon_pending();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Read error: {e}");
                break;
            }
        }
    }

    save_history(&mut rl, &history_path);
    Ok(())
}

fn history_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "kaiwa")
        .map(|dirs| dirs.data_dir().join("history.txt"))
}

/// Save REPL history to disk.
fn save_history(rl: &mut Editor<(), DefaultHistory>, history_path: &Option<PathBuf>) {
    if let Some(path) = history_path {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Failed to create history directory: {}", e);
            }
        }
        if let Err(e) = rl.save_history(path) {
            tracing::warn!("Failed to save history: {}", e);
        }
    }
}
