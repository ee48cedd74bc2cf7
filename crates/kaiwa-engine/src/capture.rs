//! Scoped output/diagnostic capture.
//!
//! For the duration of one evaluation the compiler service's output and
//! diagnostic sinks point at a private `CaptureSink` instead of the
//! host's global console. The sink is an explicit object threaded
//! through the call chain, not ambient global state; installation and
//! restoration are bracketed by [`with_capture`], which restores the
//! previous sink on every exit path, panics included.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::compiler::CompilerService;

/// Severity of a console message routed through the capture sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A structured console message emitted while user code runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    pub text: String,
    pub stack_trace: String,
    pub severity: Severity,
}

impl ConsoleMessage {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stack_trace: String::new(),
            severity,
        }
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = trace.into();
        self
    }
}

#[derive(Debug, Default)]
struct SinkState {
    out: String,
    err: String,
    console: Vec<ConsoleMessage>,
}

/// Everything one capture scope collected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Captured {
    pub out: String,
    pub err: String,
    pub console: Vec<ConsoleMessage>,
}

/// A cloneable handle to the session's private capture buffers.
///
/// Clones share the same underlying buffers, so the handle installed
/// into the compiler service and the handle the session drains are one
/// and the same storage.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink(Arc<Mutex<SinkState>>);

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the captured output stream.
    pub fn write_out(&self, text: &str) {
        self.lock().out.push_str(text);
    }

    /// Append to the captured error/diagnostic stream.
    pub fn write_err(&self, text: &str) {
        self.lock().err.push_str(text);
    }

    /// Record a structured console message.
    pub fn log(&self, message: ConsoleMessage) {
        self.lock().console.push(message);
    }

    /// Clear the buffers in place. The storage is reused, never
    /// replaced, so stale handles held by a reloaded host keep pointing
    /// at live buffers.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.out.clear();
        state.err.clear();
        state.console.clear();
    }

    /// Drain the buffers, returning their contents.
    pub fn take(&self) -> Captured {
        let mut state = self.lock();
        Captured {
            out: std::mem::take(&mut state.out),
            err: std::mem::take(&mut state.err),
            console: std::mem::take(&mut state.console),
        }
    }

    /// Whether two handles share the same buffers.
    pub fn ptr_eq(&self, other: &CaptureSink) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SinkState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Run `f` with `sink` installed as the compiler service's diagnostic
/// sink, restoring the previously installed sink afterwards.
///
/// Re-entrancy defense: if the currently installed sink already shares
/// our buffers (a survivor of an uncontrolled host reload), it is
/// adopted as-is rather than stacked, so no orphaned buffer swallows
/// diagnostics. Buffers are cleared on entry either way.
pub fn with_capture<C, R>(
    compiler: &mut C,
    sink: &CaptureSink,
    f: impl FnOnce(&mut C) -> R,
) -> (Captured, R)
where
    C: CompilerService + ?Sized,
{
    sink.clear();
    let previous = match compiler.sink() {
        Some(existing) if existing.ptr_eq(sink) => None,
        other => {
            compiler.set_sink(Some(sink.clone()));
            Some(other)
        }
    };

    let mut guard = RestoreGuard { compiler, previous };
    let result = f(&mut *guard.compiler);
    let captured = sink.take();
    drop(guard);
    (captured, result)
}

struct RestoreGuard<'a, C: CompilerService + ?Sized> {
    compiler: &'a mut C,
    /// `None` means we adopted an already-installed sink and leave it be.
    previous: Option<Option<CaptureSink>>,
}

impl<C: CompilerService + ?Sized> Drop for RestoreGuard<'_, C> {
    fn drop(&mut self) {
        if let Some(prev) = self.previous.take() {
            self.compiler.set_sink(prev);
        }
    }
}
