//! The execution-log model.
//!
//! Every completed evaluation is recorded as a tree of log entries: a
//! Command entry whose children are the console messages, outputs, and
//! errors produced while executing it. Entries are append-only; after
//! creation only the expand/collapse flag changes, plus lazy derived
//! fields (summary line, filtered stack trace) computed on first access
//! and cached.

use std::cell::OnceCell;

use serde::{Deserialize, Serialize};

use crate::capture::Severity;

/// What a log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogEntryKind {
    /// A submitted snippet. The only kind that may have children.
    Command,
    /// A formatted result value.
    Output,
    /// A runtime fault or compiler diagnostic.
    Error,
    /// A console message captured during execution.
    ConsoleMessage,
    /// Engine-side notes (meta-command responses and the like).
    Meta,
}

/// One node of the execution-log tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogEntryKind,
    pub text: String,
    pub stack_trace: Option<String>,
    pub severity: Option<Severity>,
    pub expanded: bool,
    children: Vec<LogEntry>,
    #[serde(skip)]
    short: OnceCell<String>,
    #[serde(skip)]
    filtered: OnceCell<String>,
}

// Equality is over the recorded fields only; the lazily computed
// caches are derived state and must not distinguish entries.
impl PartialEq for LogEntry {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.text == other.text
            && self.stack_trace == other.stack_trace
            && self.severity == other.severity
            && self.expanded == other.expanded
            && self.children == other.children
    }
}

impl LogEntry {
    fn new(kind: LogEntryKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            stack_trace: None,
            severity: None,
            expanded: true,
            children: Vec::new(),
            short: OnceCell::new(),
            filtered: OnceCell::new(),
        }
    }

    pub fn command(text: impl Into<String>) -> Self {
        Self::new(LogEntryKind::Command, text)
    }

    pub fn output(text: impl Into<String>) -> Self {
        Self::new(LogEntryKind::Output, text)
    }

    pub fn error(text: impl Into<String>, stack_trace: impl Into<String>) -> Self {
        let mut entry = Self::new(LogEntryKind::Error, text);
        let trace = stack_trace.into();
        entry.stack_trace = (!trace.is_empty()).then_some(trace);
        entry
    }

    pub fn console(severity: Severity, text: impl Into<String>, stack_trace: impl Into<String>) -> Self {
        let mut entry = Self::new(LogEntryKind::ConsoleMessage, text);
        let trace = stack_trace.into();
        entry.stack_trace = (!trace.is_empty()).then_some(trace);
        entry.severity = Some(severity);
        entry
    }

    pub fn meta(text: impl Into<String>) -> Self {
        Self::new(LogEntryKind::Meta, text)
    }

    /// Attach a child. Only Command entries hold children, and commands
    /// never nest; anything else is dropped.
    pub fn add_child(&mut self, child: LogEntry) {
        if self.kind != LogEntryKind::Command || child.kind == LogEntryKind::Command {
            return;
        }
        self.children.push(child);
    }

    pub fn children(&self) -> &[LogEntry] {
        &self.children
    }

    /// Mutable child access, for toggling `expanded` on nested entries.
    pub fn children_mut(&mut self) -> &mut [LogEntry] {
        &mut self.children
    }

    /// The one-line summary form: everything before the first newline.
    pub fn short_form(&self) -> &str {
        self.short.get_or_init(|| {
            self.text
                .split_once('\n')
                .map(|(first, _)| first.to_string())
                .unwrap_or_else(|| self.text.clone())
        })
    }

    /// Text shown for the current expand/collapse state.
    pub fn display_text(&self) -> &str {
        if self.expanded {
            &self.text
        } else {
            self.short_form()
        }
    }

    /// Whether collapsing changes anything: the summary differs from
    /// the full text, or there are children to hide.
    pub fn is_expandable(&self) -> bool {
        self.short_form() != self.text || !self.children.is_empty()
    }

    /// The stack trace with uninformative internal frames elided,
    /// computed once and cached.
    pub fn filtered_trace(&self) -> Option<&str> {
        let trace = self.stack_trace.as_deref()?;
        Some(self.filtered.get_or_init(|| filter_trace(trace)))
    }
}

/// Frames elided from stack traces when they carry no source position:
/// the host's console dispatch, the engine's own invocation of user
/// code, and the host's per-frame update pump.
const INTERNAL_FRAMES: &[(&str, &str)] = &[
    ("HostConsole", "dispatch(Message)"),
    ("Evaluator", "invoke(String, Value&)"),
    ("EditorLoop", "update()"),
];

/// Drop uninformative internal frames from a newline-delimited trace.
///
/// A line is dropped only when its signature (text before the `") ("`
/// delimiter, split as `Class:method(args)`) matches the denylist AND
/// its position portion is empty. Frames with a real source location
/// are always kept, even when the signature matches. Idempotent.
pub fn filter_trace(trace: &str) -> String {
    let kept: Vec<&str> = trace
        .lines()
        .filter(|line| {
            let (signature, position) = match line.find(") (") {
                Some(i) => (&line[..i + 1], &line[i + 2..]),
                None => (*line, ""),
            };
            let Some((class, method)) = signature.split_once(':') else {
                return true;
            };
            let internal = INTERNAL_FRAMES
                .iter()
                .any(|(c, m)| class == *c && method == *m);
            !(internal && position.is_empty())
        })
        .collect();
    kept.join("\n")
}

/// The append-only execution history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    entries: Vec<LogEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Mutable entry access, for toggling `expanded`.
    pub fn entries_mut(&mut self) -> &mut [LogEntry] {
        &mut self.entries
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Destroy the whole tree. The only way entries are ever removed.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
