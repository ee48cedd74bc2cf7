//! Error taxonomy for the evaluation engine.
//!
//! Most "errors" in this system are first-class outcomes, not `Err`
//! values: incomplete input, compile diagnostics, and runtime faults
//! all come back inside an `Outcome` so the caller can re-prompt or
//! display them. The only condition surfaced as an error from
//! `evaluate` is the host not being ready.

use thiserror::Error;

/// Errors surfaced by the session engine itself.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// The host is reloading its compilation environment. Expected and
    /// retriable: no log entry is written, no state changes.
    #[error("host environment is reloading; evaluation skipped")]
    HostNotReady,
}

/// A failure of the compiler service itself (not of user code).
///
/// The pipeline folds this into a diagnostics outcome; it never
/// propagates past the evaluation boundary.
#[derive(Debug, Error, PartialEq)]
#[error("compiler service failure: {0}")]
pub struct CompilerError(pub String);

impl CompilerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
