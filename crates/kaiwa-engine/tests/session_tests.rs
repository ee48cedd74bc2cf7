//! Integration tests for the evaluation session: the classification
//! truth table, guard behavior, capture, history recording, and init.

use kaiwa_engine::testing::{ScriptedCompiler, ScriptItem, TestHost};
use kaiwa_engine::{
    ConsoleMessage, LogEntryKind, ModuleHandle, RuntimeFault, Session, SessionConfig, Severity,
};
use kaiwa_types::{EngineError, Value};

fn session(compiler: ScriptedCompiler) -> Session<ScriptedCompiler, TestHost> {
    Session::new(compiler, TestHost::ready(), SessionConfig::default())
}

#[test]
fn expression_snippet_produces_formatted_value() {
    let mut compiler = ScriptedCompiler::new();
    compiler.push(ScriptItem::value(Value::Int(80)));
    let mut session = session(compiler);

    let eval = session.evaluate("= 4 * 20").unwrap();
    assert!(eval.outcome.succeeded());
    assert_eq!(eval.outcome.value(), Some(&Value::Int(80)));
    assert!(eval.outcome.reset_input());

    // The rewritten form reached the compiler.
    assert_eq!(session.compiler().compiled_sources, vec!["( 4 * 20);"]);

    // One Command entry with one Output child, "80".
    let entry = session.history().last().unwrap();
    assert_eq!(entry.kind, LogEntryKind::Command);
    assert_eq!(entry.text, "= 4 * 20");
    assert_eq!(entry.children().len(), 1);
    assert_eq!(entry.children()[0].kind, LogEntryKind::Output);
    assert_eq!(entry.children()[0].text, "80");
}

#[test]
fn incomplete_input_preserves_buffer_and_logs_nothing() {
    let mut compiler = ScriptedCompiler::new();
    compiler.push(ScriptItem::incomplete("if (true) {"));
    let mut session = session(compiler);

    let eval = session.evaluate("if (true) {").unwrap();
    assert!(eval.outcome.is_incomplete());
    assert_eq!(eval.outcome.remainder(), Some("if (true) {"));
    assert!(!eval.outcome.reset_input());
    assert!(eval.entry_index.is_none());
    assert!(session.history().is_empty());
}

#[test]
fn incomplete_wins_regardless_of_captured_text() {
    // Remainder non-null must mean Incomplete even when the compiler
    // also wrote diagnostic noise.
    let mut compiler = ScriptedCompiler::new();
    compiler.push(ScriptItem::incomplete("for (").diagnostics("partial parse note"));
    let mut session = session(compiler);

    let eval = session.evaluate("for (").unwrap();
    assert!(eval.outcome.is_incomplete());
    assert!(eval.outcome.diagnostics().is_none());
    assert!(session.history().is_empty());
}

#[test]
fn runtime_exception_is_terminal_and_resets_input() {
    let mut compiler = ScriptedCompiler::new();
    compiler.push(ScriptItem::fault(
        RuntimeFault::new("Exception: x").with_trace("EditorLoop:update()"),
    ));
    let mut session = session(compiler);

    let eval = session.evaluate("throw new Exception(\"x\");").unwrap();
    assert!(!eval.outcome.succeeded());
    assert!(!eval.outcome.is_incomplete());
    assert_eq!(eval.outcome.exception(), Some("Exception: x"));
    // Never leave the user stuck mid-edit after a fault.
    assert!(eval.outcome.reset_input());

    let entry = session.history().last().unwrap();
    assert_eq!(entry.children().len(), 1);
    assert_eq!(entry.children()[0].kind, LogEntryKind::Error);
    assert_eq!(entry.children()[0].text, "Exception: x");
}

#[test]
fn completed_without_value() {
    let mut compiler = ScriptedCompiler::new();
    compiler.push(ScriptItem::no_value());
    let mut session = session(compiler);

    let eval = session.evaluate("x = 5;").unwrap();
    assert!(eval.outcome.succeeded());
    assert_eq!(eval.outcome.value(), None);
    assert!(eval.outcome.reset_input());
    assert_eq!(session.history().len(), 1);
}

#[test]
fn diagnostics_force_failure_and_preserve_input() {
    let mut compiler = ScriptedCompiler::new();
    compiler.push(ScriptItem::no_value().diagnostics("error CS1002: ; expected"));
    let mut session = session(compiler);

    let eval = session.evaluate("x = ").unwrap();
    assert!(!eval.outcome.succeeded());
    assert!(!eval.outcome.is_incomplete());
    assert_eq!(
        eval.outcome.diagnostics().as_deref(),
        Some("error CS1002: ; expected")
    );
    // Syntax errors leave the text in place for the user to fix.
    assert!(!eval.outcome.reset_input());

    let entry = session.history().last().unwrap();
    assert_eq!(entry.children()[0].kind, LogEntryKind::Error);
}

#[test]
fn diagnostics_override_apparent_success() {
    let mut compiler = ScriptedCompiler::new();
    compiler.push(ScriptItem::value(Value::Int(1)).diagnostics("warning: binding redeclared"));
    let mut session = session(compiler);

    let eval = session.evaluate("= x").unwrap();
    assert!(!eval.outcome.succeeded());
    // The value facet is still recorded, but no Output child is shown.
    assert_eq!(eval.outcome.value(), Some(&Value::Int(1)));
    let entry = session.history().last().unwrap();
    assert!(entry
        .children()
        .iter()
        .all(|c| c.kind != LogEntryKind::Output));
}

#[test]
fn stream_noise_co_occurs_with_success() {
    let mut compiler = ScriptedCompiler::new();
    compiler.push(ScriptItem::value(Value::Int(7)).noise("stray print\n"));
    let mut session = session(compiler);

    let eval = session.evaluate("= f()").unwrap();
    assert!(eval.outcome.succeeded());
    assert_eq!(eval.outcome.value(), Some(&Value::Int(7)));

    let entry = session.history().last().unwrap();
    let kinds: Vec<_> = entry.children().iter().map(|c| c.kind).collect();
    assert!(kinds.contains(&LogEntryKind::ConsoleMessage));
    assert!(kinds.contains(&LogEntryKind::Output));
}

#[test]
fn service_failure_becomes_diagnostics_and_resets_input() {
    let mut compiler = ScriptedCompiler::new();
    compiler.push(ScriptItem::service_failure("internal state corrupt"));
    let mut session = session(compiler);

    let eval = session.evaluate("anything;").unwrap();
    assert!(!eval.outcome.succeeded());
    assert!(!eval.outcome.is_incomplete());
    assert!(eval
        .outcome
        .diagnostics()
        .unwrap()
        .contains("internal state corrupt"));
    // Partial compilation state must not be offered back for continuation.
    assert!(eval.outcome.reset_input());
}

#[test]
fn declaration_value_is_not_displayed() {
    // has_value without expression mode: the value facet is recorded
    // but nothing is pretty-printed.
    let mut compiler = ScriptedCompiler::new();
    compiler.push(ScriptItem::value(Value::Int(5)));
    let mut session = session(compiler);

    let eval = session.evaluate("x = 5;").unwrap();
    assert!(eval.outcome.succeeded());
    assert_eq!(eval.outcome.value(), Some(&Value::Int(5)));
    let entry = session.history().last().unwrap();
    assert!(entry.children().is_empty());
}

#[test]
fn raw_message_is_displayed_even_for_statements() {
    let mut compiler = ScriptedCompiler::new();
    compiler.push(ScriptItem::value(Value::Raw("help: things".into())));
    let mut session = session(compiler);

    session.evaluate("help;").unwrap();
    let entry = session.history().last().unwrap();
    assert_eq!(entry.children()[0].kind, LogEntryKind::Output);
    assert_eq!(entry.children()[0].text, "help: things");
}

#[test]
fn console_messages_become_children_and_mirror_to_host() {
    let mut compiler = ScriptedCompiler::new();
    compiler.push(
        ScriptItem::no_value()
            .console(ConsoleMessage::new(Severity::Warning, "careful"))
            .console(ConsoleMessage::new(Severity::Info, "note")),
    );
    let mut session = session(compiler);

    session.evaluate("noisy();").unwrap();
    let entry = session.history().last().unwrap();
    assert_eq!(entry.children().len(), 2);
    assert!(entry
        .children()
        .iter()
        .all(|c| c.kind == LogEntryKind::ConsoleMessage));
    assert_eq!(entry.children()[0].severity, Some(Severity::Warning));

    let mirrored = session.host().mirrored();
    assert_eq!(mirrored.len(), 2);
    assert_eq!(mirrored[0].text, "careful");
}

#[test]
fn reloading_host_skips_evaluation_entirely() {
    let mut compiler = ScriptedCompiler::new();
    compiler.push(ScriptItem::value(Value::Int(1)));
    let host = TestHost::reloading();
    let mut session = Session::new(compiler, host, SessionConfig::default());

    let err = session.evaluate("= 1").unwrap_err();
    assert_eq!(err, EngineError::HostNotReady);
    assert!(session.history().is_empty());
    assert!(session.compiler().compiled_sources.is_empty());
    assert_eq!(session.host().total_evaluations(), 0);
}

#[test]
fn evaluation_is_bracketed_by_host_hooks() {
    let mut compiler = ScriptedCompiler::new();
    compiler.push(ScriptItem::no_value());
    let mut session = session(compiler);

    session.evaluate("x = 1;").unwrap();
    assert_eq!(session.host().total_evaluations(), 1);
    assert_eq!(session.host().active_evaluations(), 0);
}

#[test]
fn init_references_modules_and_issues_baseline() {
    let compiler = ScriptedCompiler::new();
    let host = TestHost::ready().with_modules(vec![
        ModuleHandle::new("app-core"),
        ModuleHandle::new("app-plugins"),
    ]);
    let config =
        SessionConfig::named("editor").with_baseline(vec!["use std;".into(), "use app;".into()]);
    let mut session = Session::new(compiler, host, config);

    assert!(session.init());
    assert_eq!(session.compiler().referenced.len(), 2);
    assert_eq!(session.compiler().baseline, vec!["use std;", "use app;"]);

    // Second init is a no-op.
    assert!(session.init());
    assert_eq!(session.compiler().baseline.len(), 2);
}

#[test]
fn init_noise_is_transient_and_retried() {
    let mut compiler = ScriptedCompiler::new();
    compiler.set_init_noise("transient static while loading");
    let mut session = session(compiler);

    assert!(!session.init());
    // The noise was consumed; the retry succeeds.
    assert!(session.init());
}

#[test]
fn mark_stale_forces_reinit() {
    let compiler = ScriptedCompiler::new();
    let host = TestHost::ready().with_modules(vec![ModuleHandle::new("app-core")]);
    let mut session = Session::new(compiler, host, SessionConfig::default());

    assert!(session.init());
    session.mark_stale();
    assert!(session.init());
    // Modules were referenced again after the reload.
    assert_eq!(session.compiler().referenced.len(), 2);
}

#[test]
fn bindings_report_is_sorted_and_raw() {
    let mut compiler = ScriptedCompiler::new();
    compiler.set_binding("zeta", Value::Int(26));
    compiler.set_binding("alpha", Value::Str("first".into()));
    let session = session(compiler);

    let report = session.bindings_report();
    match report {
        Value::Raw(text) => {
            assert_eq!(text, "string alpha = \"first\";\nint zeta = 26;\n");
        }
        other => panic!("expected raw message, got {other:?}"),
    }
}

#[test]
fn clear_history_destroys_the_tree() {
    let mut compiler = ScriptedCompiler::new();
    compiler.push(ScriptItem::no_value());
    let mut session = session(compiler);

    session.evaluate("x = 1;").unwrap();
    assert_eq!(session.history().len(), 1);
    session.clear_history();
    assert!(session.history().is_empty());
}
