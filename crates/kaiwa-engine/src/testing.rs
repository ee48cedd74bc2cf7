//! Test doubles for the session engine.
//!
//! `ScriptedCompiler` plays back a fixed sequence of compile/run
//! results, with optional diagnostics, console messages, and stream
//! noise, so classification tests can hit every row of the truth table
//! without a real language behind them. `TestHost` counts the
//! begin/end evaluation hooks and records mirrored console messages.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use kaiwa_types::{CompilerError, Value};

use crate::capture::{CaptureSink, ConsoleMessage};
use crate::compiler::{
    Binding, Compiled, CompilerService, ModuleHandle, RunReply, RuntimeFault,
};
use crate::host::HostEnvironment;

enum Reply {
    Incomplete { remainder: String },
    Run(RunReply),
    ServiceFailure(String),
}

/// One scripted compile/run exchange.
pub struct ScriptItem {
    reply: Reply,
    diagnostics: Option<String>,
    console: Vec<ConsoleMessage>,
    noise: Option<String>,
}

impl ScriptItem {
    pub fn incomplete(remainder: impl Into<String>) -> Self {
        Self::with_reply(Reply::Incomplete {
            remainder: remainder.into(),
        })
    }

    pub fn value(value: Value) -> Self {
        Self::with_reply(Reply::Run(RunReply::value(value)))
    }

    pub fn no_value() -> Self {
        Self::with_reply(Reply::Run(RunReply::no_value()))
    }

    pub fn fault(fault: RuntimeFault) -> Self {
        Self::with_reply(Reply::Run(RunReply::fault(fault)))
    }

    pub fn service_failure(message: impl Into<String>) -> Self {
        Self::with_reply(Reply::ServiceFailure(message.into()))
    }

    /// Diagnostic text written to the sink during compile.
    pub fn diagnostics(mut self, text: impl Into<String>) -> Self {
        self.diagnostics = Some(text.into());
        self
    }

    /// A console message emitted while the unit runs.
    pub fn console(mut self, message: ConsoleMessage) -> Self {
        self.console.push(message);
        self
    }

    /// Stray output-stream text written while the unit runs.
    pub fn noise(mut self, text: impl Into<String>) -> Self {
        self.noise = Some(text.into());
        self
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            diagnostics: None,
            console: Vec::new(),
            noise: None,
        }
    }
}

/// A compiler service that replays a script.
#[derive(Default)]
pub struct ScriptedCompiler {
    script: VecDeque<ScriptItem>,
    sink: Option<CaptureSink>,
    bindings: Vec<Binding>,
    init_noise: Option<String>,
    /// Sources handed to `compile`, in order.
    pub compiled_sources: Vec<String>,
    /// Modules referenced at init.
    pub referenced: Vec<ModuleHandle>,
    /// Baseline directives received at init.
    pub baseline: Vec<String>,
}

impl ScriptedCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: ScriptItem) {
        self.script.push_back(item);
    }

    /// Seed a persistent binding, as if a snippet had declared it.
    pub fn set_binding(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        let type_name = value.type_name().to_string();
        self.bindings.retain(|b| b.name != name);
        self.bindings.push(Binding {
            name,
            type_name,
            value,
        });
    }

    /// Diagnostic noise written once during the next `load_baseline`,
    /// to simulate a transient init failure.
    pub fn set_init_noise(&mut self, text: impl Into<String>) {
        self.init_noise = Some(text.into());
    }

    fn sink_ref(&self) -> Option<&CaptureSink> {
        self.sink.as_ref()
    }
}

impl CompilerService for ScriptedCompiler {
    type Unit = ScriptItem;

    fn compile(&mut self, source: &str) -> Result<Compiled<ScriptItem>, CompilerError> {
        self.compiled_sources.push(source.to_string());
        let item = self
            .script
            .pop_front()
            .expect("ScriptedCompiler: compile called with empty script");
        if let (Some(diag), Some(sink)) = (&item.diagnostics, self.sink_ref()) {
            sink.write_err(diag);
        }
        match item.reply {
            Reply::Incomplete { ref remainder } => Ok(Compiled::Incomplete {
                remainder: remainder.clone(),
            }),
            Reply::ServiceFailure(ref message) => Err(CompilerError::new(message.clone())),
            Reply::Run(_) => Ok(Compiled::Ready(item)),
        }
    }

    fn run(&mut self, unit: ScriptItem) -> RunReply {
        if let Some(sink) = self.sink_ref() {
            for message in &unit.console {
                sink.log(message.clone());
            }
            if let Some(noise) = &unit.noise {
                sink.write_out(noise);
            }
        }
        match unit.reply {
            Reply::Run(reply) => reply,
            _ => unreachable!("only Run items reach run()"),
        }
    }

    fn reference_module(&mut self, module: &ModuleHandle) -> Result<(), CompilerError> {
        self.referenced.push(module.clone());
        Ok(())
    }

    fn load_baseline(&mut self, directives: &[String]) -> Result<(), CompilerError> {
        self.baseline.extend(directives.iter().cloned());
        if let (Some(noise), Some(sink)) = (self.init_noise.take(), self.sink_ref()) {
            sink.write_err(&noise);
        }
        Ok(())
    }

    fn bindings(&self) -> Vec<Binding> {
        self.bindings.clone()
    }

    fn set_sink(&mut self, sink: Option<CaptureSink>) {
        self.sink = sink;
    }

    fn sink(&self) -> Option<CaptureSink> {
        self.sink.clone()
    }
}

/// A host double with a switchable reloading flag and hook counters.
#[derive(Default)]
pub struct TestHost {
    reloading: AtomicBool,
    active: AtomicUsize,
    total: AtomicUsize,
    modules: Vec<ModuleHandle>,
    mirrored: Mutex<Vec<ConsoleMessage>>,
}

impl TestHost {
    /// A host that is stable and ready to evaluate.
    pub fn ready() -> Self {
        Self::default()
    }

    /// A host currently reloading its compilation environment.
    pub fn reloading() -> Self {
        let host = Self::default();
        host.reloading.store(true, Ordering::SeqCst);
        host
    }

    pub fn with_modules(mut self, modules: Vec<ModuleHandle>) -> Self {
        self.modules = modules;
        self
    }

    pub fn set_reloading(&self, reloading: bool) {
        self.reloading.store(reloading, Ordering::SeqCst);
    }

    /// Evaluations currently inside the begin/end bracket.
    pub fn active_evaluations(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Total begin hooks observed.
    pub fn total_evaluations(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Console messages mirrored to the host.
    pub fn mirrored(&self) -> Vec<ConsoleMessage> {
        self.mirrored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl HostEnvironment for TestHost {
    fn is_reloading(&self) -> bool {
        self.reloading.load(Ordering::SeqCst)
    }

    fn loaded_modules(&self) -> Vec<ModuleHandle> {
        self.modules.clone()
    }

    fn begin_evaluation(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    fn end_evaluation(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    fn mirror_console(&self, message: &ConsoleMessage) {
        self.mirrored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
    }
}
