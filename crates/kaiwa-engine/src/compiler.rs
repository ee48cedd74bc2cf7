//! The compiler-service contract.
//!
//! The engine delegates all parsing, compilation, and execution to an
//! external incremental compiler behind this trait. The trait also
//! carries the two seams the session needs from that service: a
//! first-class binding-table accessor (the binding storage is part of
//! the service's public contract, not something the engine pries out by
//! reflection) and the diagnostic-sink installation point used by the
//! capture scope.

use kaiwa_types::{CompilerError, Value};

use crate::capture::CaptureSink;

/// Handle to an executable module the host has loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHandle {
    pub name: String,
}

impl ModuleHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One entry of the persistent binding table.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub type_name: String,
    pub value: Value,
}

/// Result of an incremental compile: either the input was a complete
/// compilable unit, or more text is needed.
#[derive(Debug)]
pub enum Compiled<U> {
    /// The input is syntactically incomplete; `remainder` is the text
    /// the compiler could not yet consume.
    Incomplete { remainder: String },
    /// Ready to run.
    Ready(U),
}

/// An exception raised by user code during execution.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeFault {
    pub message: String,
    pub stack_trace: String,
}

impl RuntimeFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack_trace: String::new(),
        }
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = trace.into();
        self
    }
}

/// Result of running a compiled unit.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReply {
    pub value: Value,
    pub has_value: bool,
    pub fault: Option<RuntimeFault>,
}

impl RunReply {
    /// Executed to completion with a value.
    pub fn value(value: Value) -> Self {
        Self {
            value,
            has_value: true,
            fault: None,
        }
    }

    /// Executed to completion, nothing to report.
    pub fn no_value() -> Self {
        Self {
            value: Value::Null,
            has_value: false,
            fault: None,
        }
    }

    /// User code threw.
    pub fn fault(fault: RuntimeFault) -> Self {
        Self {
            value: Value::Null,
            has_value: false,
            fault: Some(fault),
        }
    }
}

/// The external incremental compile-and-run service.
///
/// Executions are synchronous and assumed bounded; cancellation of
/// runaway user code is the host's concern, and an abort shows up here
/// as a `RuntimeFault`.
pub trait CompilerService {
    /// Opaque compiled unit handed from `compile` to `run`.
    type Unit;

    /// Incrementally compile `source`. Diagnostics go to the installed
    /// sink; `Err` means the service itself failed, not the user code.
    fn compile(&mut self, source: &str) -> Result<Compiled<Self::Unit>, CompilerError>;

    /// Execute a compiled unit against the persistent binding table.
    fn run(&mut self, unit: Self::Unit) -> RunReply;

    /// Make a host module's contents visible to compiled snippets.
    fn reference_module(&mut self, module: &ModuleHandle) -> Result<(), CompilerError>;

    /// Issue baseline import directives (run once at session init).
    fn load_baseline(&mut self, directives: &[String]) -> Result<(), CompilerError>;

    /// Read-only snapshot of the persistent binding table.
    fn bindings(&self) -> Vec<Binding>;

    /// Install (or remove) the diagnostic/output sink.
    fn set_sink(&mut self, sink: Option<CaptureSink>);

    /// The currently installed sink, if any.
    fn sink(&self) -> Option<CaptureSink>;
}
