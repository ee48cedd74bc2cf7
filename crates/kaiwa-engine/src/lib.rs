//! kaiwa-engine (会話): the evaluation-session engine.
//!
//! This crate provides:
//!
//! - **Snippet**: input preprocessing and expression-mode rewriting
//! - **Capture**: scoped redirection of output/diagnostic sinks
//! - **CompilerService / HostEnvironment**: the external collaborator contracts
//! - **Session**: the persistent session, reload guard, and the
//!   incomplete/complete/error/exception classification pipeline
//! - **Formatter**: deterministic textual rendering of runtime values
//! - **History**: the append-only execution-log tree

pub mod capture;
pub mod compiler;
pub mod format;
pub mod history;
pub mod host;
pub mod session;
pub mod snippet;
pub mod testing;

pub use capture::{with_capture, CaptureSink, Captured, ConsoleMessage, Severity};
pub use compiler::{Binding, Compiled, CompilerService, ModuleHandle, RunReply, RuntimeFault};
pub use format::format_value;
pub use history::{filter_trace, History, LogEntry, LogEntryKind};
pub use host::{HostEnvironment, ReloadGuard};
pub use session::{Evaluation, Session, SessionConfig};
pub use snippet::Snippet;
