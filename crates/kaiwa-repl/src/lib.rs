//! kaiwa REPL — terminal front-end for the evaluation-session engine.
//!
//! This crate is the "presentation layer" the engine treats as a
//! caller: it owns the continuation buffer across incomplete inputs,
//! handles meta-commands (`/help`, `/vars`, `/clear`, `/quit`), renders
//! the history tree with colors, and persists readline history.

pub mod calc;

use owo_colors::OwoColorize;

use kaiwa_engine::{
    ConsoleMessage, HostEnvironment, LogEntry, LogEntryKind, ModuleHandle, Session, SessionConfig,
    Severity,
};
use kaiwa_types::{EngineError, Value};

use crate::calc::CalcCompiler;

/// Host shim for a plain terminal: never reloading, no modules, and
/// mirrored console messages go to the tracing log.
#[derive(Debug, Default)]
pub struct TerminalHost;

impl HostEnvironment for TerminalHost {
    fn is_reloading(&self) -> bool {
        false
    }

    fn loaded_modules(&self) -> Vec<ModuleHandle> {
        Vec::new()
    }

    fn begin_evaluation(&self) {}

    fn end_evaluation(&self) {}

    fn mirror_console(&self, message: &ConsoleMessage) {
        tracing::debug!(severity = ?message.severity, "console: {}", message.text);
    }
}

/// What the caller should do after processing one line.
#[derive(Debug, PartialEq)]
pub enum LineResult {
    /// Finished; print the output if there is one.
    Done(Option<String>),
    /// Input incomplete; read another line with the continuation prompt.
    Continue,
    /// Diagnostics: print the output, then offer `text` back for editing.
    Edit { output: String, text: String },
    /// Exit the REPL.
    Exit,
}

/// REPL state: the session plus the caller-held continuation buffer.
pub struct Repl {
    session: Session<CalcCompiler, TerminalHost>,
    pending: String,
}

impl Repl {
    pub fn new() -> Self {
        let config = SessionConfig::named("terminal");
        Self {
            session: Session::new(CalcCompiler::new(), TerminalHost, config),
            pending: String::new(),
        }
    }

    /// True while a multi-line input is being accumulated.
    pub fn is_continuing(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drop any accumulated continuation input (Ctrl-C).
    pub fn abandon_pending(&mut self) {
        self.pending.clear();
    }

    pub fn session(&self) -> &Session<CalcCompiler, TerminalHost> {
        &self.session
    }

    /// Process one line of input.
    pub fn process_line(&mut self, line: &str) -> LineResult {
        let trimmed = line.trim();

        // Meta-commands only apply at the start of an input, not in the
        // middle of a continuation.
        if self.pending.is_empty() {
            if trimmed.is_empty() {
                return LineResult::Done(None);
            }
            if trimmed.starts_with('/') {
                return self.handle_meta_command(trimmed);
            }
        }

        if !self.pending.is_empty() {
            self.pending.push('\n');
        }
        self.pending.push_str(line);

        let input = self.pending.clone();
        match self.session.evaluate(&input) {
            Err(EngineError::HostNotReady) => {
                // Keep the buffer; the caller can resubmit.
                LineResult::Done(Some("(host busy; try again)".to_string()))
            }
            Ok(eval) => {
                if eval.outcome.is_incomplete() {
                    return LineResult::Continue;
                }
                let rendered = self
                    .session
                    .history()
                    .last()
                    .map(render_entry)
                    .unwrap_or_default();
                let output = (!rendered.is_empty()).then_some(rendered);
                if eval.outcome.reset_input() {
                    self.pending.clear();
                    LineResult::Done(output)
                } else {
                    // Diagnostics preserve the input for editing.
                    let text = std::mem::take(&mut self.pending);
                    LineResult::Edit {
                        output: output.unwrap_or_default(),
                        text,
                    }
                }
            }
        }
    }

    fn handle_meta_command(&mut self, cmd: &str) -> LineResult {
        let command = cmd.split_whitespace().next().unwrap_or("");
        match command {
            "/quit" | "/q" | "/exit" => LineResult::Exit,
            "/help" | "/h" | "/?" => {
                // Help is a raw message: the formatter passes it through
                // without quoting, same as the /vars report.
                let help = Value::Raw(HELP_TEXT.to_string());
                LineResult::Done(Some(kaiwa_engine::format_value(&help)))
            }
            "/vars" | "/scope" => {
                let report = self.session.bindings_report();
                let text = match report {
                    Value::Raw(text) if text.is_empty() => "(no variables set)".to_string(),
                    Value::Raw(text) => text.trim_end().to_string(),
                    other => kaiwa_engine::format_value(&other),
                };
                LineResult::Done(Some(text))
            }
            "/clear" => {
                self.session.clear_history();
                LineResult::Done(Some("History cleared.".to_string()))
            }
            "/history" => {
                let entries = self.session.history().entries();
                if entries.is_empty() {
                    return LineResult::Done(Some("(no history)".to_string()));
                }
                let rendered: Vec<String> = entries.iter().map(render_entry).collect();
                LineResult::Done(Some(rendered.join("\n")))
            }
            _ => LineResult::Done(Some(format!(
                "Unknown command: {command}\nType /help for available commands."
            ))),
        }
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

/// Render one Command entry and its children for the terminal.
fn render_entry(entry: &LogEntry) -> String {
    let mut lines = Vec::new();
    for child in entry.children() {
        match child.kind {
            LogEntryKind::Output => lines.push(colorize(&child.text, Color::Value)),
            LogEntryKind::Error => {
                lines.push(colorize(&child.text, Color::Error));
                if let Some(trace) = child.filtered_trace() {
                    if !trace.is_empty() {
                        lines.push(colorize(trace, Color::Trace));
                    }
                }
            }
            LogEntryKind::ConsoleMessage => {
                let color = match child.severity {
                    Some(Severity::Error) => Color::Error,
                    Some(Severity::Warning) => Color::Warning,
                    _ => Color::Console,
                };
                lines.push(colorize(&child.text, color));
            }
            LogEntryKind::Command | LogEntryKind::Meta => {}
        }
    }
    lines.join("\n")
}

enum Color {
    Value,
    Error,
    Warning,
    Console,
    Trace,
}

fn colorize(text: &str, color: Color) -> String {
    if std::env::var("NO_COLOR").is_ok()
        || std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false)
    {
        return text.to_string();
    }
    match color {
        Color::Value => text.green().to_string(),
        Color::Error => text.red().to_string(),
        Color::Warning => text.yellow().to_string(),
        Color::Console => text.cyan().to_string(),
        Color::Trace => text.dimmed().to_string(),
    }
}

const HELP_TEXT: &str = r#"会話 — kaiwa REPL

Meta Commands:
  /help, /h, /?     Show this help
  /quit, /q, /exit  Exit the REPL
  /vars, /scope     Show session variables and their values
  /history          Show the execution log
  /clear            Clear the execution log

Language (demo calculator):
  x = 5;            Assign a variable (persists across inputs)
  = 4 * 20          Evaluate an expression and print its value
  (1 + 2) * x;      Statements end with ';'
  print("hi", x);   Write to the output stream
  log("note");      Emit a console message
  fail("boom");     Raise a runtime fault

Multi-line input:
  Input with unbalanced parentheses or a missing ';' continues on
  the next line. A runtime fault always resets the input buffer.
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn done_text(result: LineResult) -> String {
        match result {
            LineResult::Done(Some(text)) => text,
            other => panic!("expected Done(Some(..)), got {other:?}"),
        }
    }

    #[test]
    fn expression_prints_value() {
        std::env::set_var("NO_COLOR", "1");
        let mut repl = Repl::new();
        let text = done_text(repl.process_line("= 4 * 20"));
        assert_eq!(text, "80");
    }

    #[test]
    fn continuation_accumulates_until_complete() {
        std::env::set_var("NO_COLOR", "1");
        let mut repl = Repl::new();
        assert_eq!(repl.process_line("x = (1 +"), LineResult::Continue);
        assert!(repl.is_continuing());
        assert_eq!(repl.process_line("2);"), LineResult::Done(None));
        assert!(!repl.is_continuing());

        let text = done_text(repl.process_line("= x"));
        assert_eq!(text, "3");
    }

    #[test]
    fn fault_resets_continuation_buffer() {
        std::env::set_var("NO_COLOR", "1");
        let mut repl = Repl::new();
        let result = repl.process_line("fail(\"boom\");");
        match result {
            LineResult::Done(Some(text)) => assert!(text.contains("boom")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!repl.is_continuing());
    }

    #[test]
    fn parse_error_offers_text_back_for_editing() {
        std::env::set_var("NO_COLOR", "1");
        let mut repl = Repl::new();
        match repl.process_line("1 + * 2;") {
            LineResult::Edit { output, text } => {
                assert!(output.contains("calc:"));
                assert_eq!(text, "1 + * 2;");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!repl.is_continuing());
    }

    #[test]
    fn stray_close_paren_is_not_a_continuation() {
        std::env::set_var("NO_COLOR", "1");
        let mut repl = Repl::new();
        match repl.process_line("x = 1);") {
            LineResult::Edit { output, text } => {
                assert!(output.contains("calc:"));
                assert_eq!(text, "x = 1);");
            }
            other => panic!("unexpected {other:?}"),
        }
        // The buffer is free again; the next input evaluates normally.
        assert!(!repl.is_continuing());
        let text = done_text(repl.process_line("= 2 + 2"));
        assert_eq!(text, "4");
    }

    #[test]
    fn vars_lists_bindings() {
        std::env::set_var("NO_COLOR", "1");
        let mut repl = Repl::new();
        repl.process_line("x = 5;");
        repl.process_line("name = \"kaiwa\";");
        let text = done_text(repl.process_line("/vars"));
        assert_eq!(text, "string name = \"kaiwa\";\nint x = 5;");
    }

    #[test]
    fn help_is_an_unquoted_raw_message() {
        let mut repl = Repl::new();
        let text = done_text(repl.process_line("/help"));
        assert!(text.contains("/vars"));
        // Raw passthrough: no string quoting from the formatter.
        assert!(!text.starts_with('"'));
        assert_eq!(text, HELP_TEXT);
    }

    #[test]
    fn quit_exits() {
        let mut repl = Repl::new();
        assert_eq!(repl.process_line("/quit"), LineResult::Exit);
    }

    #[test]
    fn unknown_meta_command_suggests_help() {
        let mut repl = Repl::new();
        let text = done_text(repl.process_line("/bogus"));
        assert!(text.contains("/help"));
    }

    #[test]
    fn clear_empties_history() {
        std::env::set_var("NO_COLOR", "1");
        let mut repl = Repl::new();
        repl.process_line("x = 1;");
        done_text(repl.process_line("/clear"));
        assert!(repl.session().history().is_empty());
    }
}
