//! Outcome — the classified result of one evaluation attempt.
//!
//! A single evaluation can have more than one facet: a value plus stray
//! console output, or a runtime exception plus diagnostics. `Outcome`
//! therefore records a set of facets rather than a single tag, with
//! accessors answering the questions callers actually ask.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One facet of an evaluation's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Facet {
    /// The input was syntactically incomplete; `remainder` is the text
    /// the compiler could not yet consume. A continuation request, not
    /// an error.
    Incomplete { remainder: String },
    /// Compiled and executed, nothing to show.
    CompletedNoValue,
    /// Compiled and executed, producing a value.
    CompletedWithValue(Value),
    /// Diagnostic text surfaced by the compiler (syntax/semantic
    /// errors, or the compiler service's own failure).
    CompileDiagnostics(String),
    /// User code threw during execution.
    RuntimeException(String),
    /// Stray text captured from the output stream during execution.
    StreamNoise(String),
}

/// The classified result of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    facets: Vec<Facet>,
    reset_input: bool,
}

impl Default for Outcome {
    fn default() -> Self {
        Self::new()
    }
}

impl Outcome {
    pub fn new() -> Self {
        Self {
            facets: Vec::new(),
            // Completed evaluations clear the input by default; the
            // pipeline flips this off for continuations and for
            // diagnostics the user will want to edit against.
            reset_input: true,
        }
    }

    pub fn push(&mut self, facet: Facet) {
        self.facets.push(facet);
    }

    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    /// Whether the caller should clear its input buffer.
    pub fn reset_input(&self) -> bool {
        self.reset_input
    }

    pub fn set_reset_input(&mut self, reset: bool) {
        self.reset_input = reset;
    }

    /// True iff the compiler reported a non-null remainder.
    pub fn is_incomplete(&self) -> bool {
        self.facets
            .iter()
            .any(|f| matches!(f, Facet::Incomplete { .. }))
    }

    /// The unconsumed remainder, when incomplete.
    pub fn remainder(&self) -> Option<&str> {
        self.facets.iter().find_map(|f| match f {
            Facet::Incomplete { remainder } => Some(remainder.as_str()),
            _ => None,
        })
    }

    /// True when execution finished without exception and without any
    /// diagnostic text. Stream noise alone does not spoil success.
    pub fn succeeded(&self) -> bool {
        !self.is_incomplete()
            && !self.facets.iter().any(|f| {
                matches!(
                    f,
                    Facet::CompileDiagnostics(_) | Facet::RuntimeException(_)
                )
            })
    }

    /// The produced value, if any.
    pub fn value(&self) -> Option<&Value> {
        self.facets.iter().find_map(|f| match f {
            Facet::CompletedWithValue(v) => Some(v),
            _ => None,
        })
    }

    /// The runtime exception text, if any.
    pub fn exception(&self) -> Option<&str> {
        self.facets.iter().find_map(|f| match f {
            Facet::RuntimeException(e) => Some(e.as_str()),
            _ => None,
        })
    }

    /// Concatenated diagnostic text, if any was captured.
    pub fn diagnostics(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .facets
            .iter()
            .filter_map(|f| match f {
                Facet::CompileDiagnostics(d) => Some(d.as_str()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}
