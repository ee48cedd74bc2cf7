//! The evaluation session.
//!
//! A `Session` is created once per host lifetime. It owns the compiler
//! service handle, the capture sink, and the execution history, and it
//! drives the pipeline: preprocess, guard, capture, compile/run,
//! classify, format, record.
//!
//! Classification is the delicate part. The compiler's raw signals
//! (remainder, has-value, exception, captured text) are not
//! independent, and naive combinations produce "sticky" states where
//! the caller is left waiting for more input after a runtime fault.
//! The rules, in the order applied:
//!
//! - non-null remainder → Incomplete; input preserved; nothing logged
//! - runtime exception → terminal, input reset, never incomplete
//! - compiler-service failure → diagnostics outcome, input reset
//!   (partial compilation state must not be offered for continuation)
//! - captured diagnostic text → failure even if a value was produced;
//!   input preserved so the user can fix the snippet
//! - value shown only for expression-mode snippets (or raw messages)
//!   that actually succeeded

use kaiwa_types::{CompilerError, EngineError, Facet, Outcome};

use crate::capture::{with_capture, CaptureSink, Severity};
use crate::compiler::{Binding, Compiled, CompilerService, RunReply};
use crate::format::format_value;
use crate::history::{History, LogEntry};
use crate::host::{HostEnvironment, ReloadGuard};
use crate::snippet::Snippet;

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of this session (for identification).
    pub name: String,
    /// Import directives issued once at init.
    pub baseline_directives: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            baseline_directives: Vec::new(),
        }
    }
}

impl SessionConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_baseline(mut self, directives: Vec<String>) -> Self {
        self.baseline_directives = directives;
        self
    }
}

/// What one call to [`Session::evaluate`] produced.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub outcome: Outcome,
    /// Index of the Command entry appended to history, when one was.
    /// Incomplete evaluations log nothing.
    pub entry_index: Option<usize>,
}

/// The long-lived evaluation session.
pub struct Session<C: CompilerService, H: HostEnvironment> {
    compiler: C,
    host: H,
    config: SessionConfig,
    sink: CaptureSink,
    history: History,
    initialized: bool,
}

enum CompileStep {
    Incomplete(String),
    Ran(RunReply),
    ServiceFailed(String),
}

impl<C: CompilerService, H: HostEnvironment> Session<C, H> {
    pub fn new(compiler: C, host: H, config: SessionConfig) -> Self {
        Self {
            compiler,
            host,
            config,
            sink: CaptureSink::new(),
            history: History::new(),
            initialized: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Prepare the compilation environment. Returns `false` (and does
    /// nothing) while the host is reloading; otherwise references the
    /// host's loaded modules into the compiler and issues the baseline
    /// directives, once. Setup that produces diagnostic noise is
    /// treated as transient: the flag stays unset and the next call
    /// retries.
    pub fn init(&mut self) -> bool {
        if self.host.is_reloading() {
            return false;
        }
        if self.initialized {
            return true;
        }

        let modules = self.host.loaded_modules();
        let directives = self.config.baseline_directives.clone();
        let (captured, setup) = with_capture(&mut self.compiler, &self.sink, |compiler| {
            for module in &modules {
                compiler.reference_module(module)?;
            }
            compiler.load_baseline(&directives)?;
            Ok::<(), CompilerError>(())
        });

        match setup {
            Ok(()) if captured.err.trim().is_empty() => {
                tracing::debug!(session = %self.config.name, modules = modules.len(), "session initialized");
                self.initialized = true;
                true
            }
            Ok(()) => {
                tracing::warn!(noise = %captured.err.trim(), "transient noise during session init; will retry");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "compiler setup failed; will retry");
                false
            }
        }
    }

    /// The host tore down and rebuilt the compilation environment;
    /// bindings from before the reload are gone and the next `init`
    /// must redo setup.
    pub fn mark_stale(&mut self) {
        self.initialized = false;
    }

    /// Evaluate one snippet against the persistent binding environment.
    ///
    /// Runs with the reload guard held and capture active for the whole
    /// call. `Err(HostNotReady)` is the only error: expected, frequent,
    /// retriable, and side-effect free.
    #[tracing::instrument(level = "debug", skip(self, raw), fields(session = %self.config.name, len = raw.len()))]
    pub fn evaluate(&mut self, raw: &str) -> Result<Evaluation, EngineError> {
        if !self.init() {
            return Err(EngineError::HostNotReady);
        }

        let snippet = Snippet::prepare(raw);
        let _reload = ReloadGuard::enter(&self.host);

        let (captured, step) = with_capture(&mut self.compiler, &self.sink, |compiler| {
            match compiler.compile(snippet.compilable()) {
                Ok(Compiled::Incomplete { remainder }) => CompileStep::Incomplete(remainder),
                Ok(Compiled::Ready(unit)) => CompileStep::Ran(compiler.run(unit)),
                Err(e) => CompileStep::ServiceFailed(e.to_string()),
            }
        });

        let mut outcome = Outcome::new();

        if let CompileStep::Incomplete(remainder) = step {
            tracing::debug!("input incomplete; awaiting continuation");
            outcome.push(Facet::Incomplete { remainder });
            outcome.set_reset_input(false);
            return Ok(Evaluation {
                outcome,
                entry_index: None,
            });
        }

        let mut entry = LogEntry::command(snippet.raw());

        for message in &captured.console {
            self.host.mirror_console(message);
            entry.add_child(LogEntry::console(
                message.severity,
                message.text.clone(),
                message.stack_trace.clone(),
            ));
        }

        let mut shown_value = None;
        let mut service_failed = false;
        match step {
            CompileStep::Ran(reply) => {
                if let Some(fault) = reply.fault {
                    tracing::debug!(fault = %fault.message, "runtime exception");
                    outcome.push(Facet::RuntimeException(fault.message.clone()));
                    entry.add_child(LogEntry::error(fault.message, fault.stack_trace));
                } else if reply.has_value {
                    outcome.push(Facet::CompletedWithValue(reply.value.clone()));
                    shown_value = Some(reply.value);
                } else {
                    outcome.push(Facet::CompletedNoValue);
                }
            }
            CompileStep::ServiceFailed(description) => {
                tracing::warn!(error = %description, "compiler service failed");
                service_failed = true;
                outcome.push(Facet::CompileDiagnostics(description.clone()));
                entry.add_child(LogEntry::error(description, String::new()));
            }
            CompileStep::Incomplete(_) => unreachable!("handled above"),
        }

        let diagnostics = captured.err.trim();
        if !diagnostics.is_empty() {
            outcome.push(Facet::CompileDiagnostics(diagnostics.to_string()));
            entry.add_child(LogEntry::error(diagnostics, String::new()));
            // Diagnostics the user will want to edit against preserve
            // the input. A fault or service failure already decided the
            // input cannot be continued.
            if outcome.exception().is_none() && !service_failed {
                outcome.set_reset_input(false);
            }
        }

        let noise = captured.out.trim();
        if !noise.is_empty() {
            outcome.push(Facet::StreamNoise(noise.to_string()));
            entry.add_child(LogEntry::console(Severity::Info, noise, String::new()));
        }

        if let Some(value) = shown_value {
            if outcome.succeeded() && (snippet.is_expression() || value.is_raw()) {
                entry.add_child(LogEntry::output(format_value(&value)));
            }
        }

        let entry_index = self.history.len();
        self.history.push(entry);
        Ok(Evaluation {
            outcome,
            entry_index: Some(entry_index),
        })
    }

    /// Read-only snapshot of the persistent binding table.
    pub fn bindings(&self) -> Vec<Binding> {
        self.compiler.bindings()
    }

    /// The binding table rendered as `type name = value;` lines,
    /// sorted by name, as a raw message suitable for direct display.
    pub fn bindings_report(&self) -> kaiwa_types::Value {
        let mut bindings = self.bindings();
        bindings.sort_by(|a, b| a.name.cmp(&b.name));
        let mut report = String::new();
        for binding in &bindings {
            report.push_str(&format!(
                "{} {} = {};\n",
                binding.type_name,
                binding.name,
                format_value(&binding.value)
            ));
        }
        kaiwa_types::Value::Raw(report)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}
