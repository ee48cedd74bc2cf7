//! Snippet preprocessing.
//!
//! Raw user input becomes a `Snippet` before it reaches the compiler.
//! The only rewrite is expression mode: input starting with `=` is
//! wrapped as a parenthesized expression statement, because the
//! underlying grammar is ambiguous for bare expressions (`a * b` has no
//! unique parse outside a declaration context) while `(a * b);` does,
//! and still lets the result be captured as a value.

/// One evaluation request, immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    raw: String,
    compilable: String,
    is_expression: bool,
}

impl Snippet {
    /// Normalize raw input into a compilable snippet. Total: never fails.
    pub fn prepare(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(rest) = trimmed.strip_prefix('=') {
            Self {
                raw: trimmed.to_string(),
                compilable: format!("({});", rest),
                is_expression: true,
            }
        } else {
            Self {
                raw: trimmed.to_string(),
                compilable: trimmed.to_string(),
                is_expression: false,
            }
        }
    }

    /// The trimmed input as the user wrote it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The text handed to the compiler service.
    pub fn compilable(&self) -> &str {
        &self.compilable
    }

    /// True when the input used the `=` expression shorthand.
    pub fn is_expression(&self) -> bool {
        self.is_expression
    }
}
