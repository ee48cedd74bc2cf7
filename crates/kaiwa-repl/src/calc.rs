//! A small calculator language implementing `CompilerService`.
//!
//! This is the demo backing for the terminal front-end: integers,
//! floats, strings, booleans, variables, arithmetic, and three builtin
//! calls (`print`, `log`, `fail`). Statements end with `;`; input with
//! unbalanced delimiters or a missing terminator is reported as
//! incomplete so multi-line continuation works end to end.
//!
//! Supports:
//! - `name = expr;` assignment into the persistent binding table
//! - `expr;` expression statements (the last one's value is reported)
//! - `+`, `-`, `*`, `/`, `%`, unary minus, parentheses
//! - `print(args...)` to the output stream, `log(msg)` to the console
//!   sink, `fail(msg)` to raise a runtime fault

use std::collections::BTreeMap;

use kaiwa_engine::{
    Binding, CaptureSink, Compiled, CompilerService, ConsoleMessage, ModuleHandle, RunReply,
    RuntimeFault, Severity,
};
use kaiwa_types::{CompilerError, Value};

/// Synthetic trace appended to faults and console messages. The first
/// frame carries a position and survives filtering; the rest are the
/// internal frames the history model elides.
const SYNTHETIC_TRACE: &str = "\
CalcProgram:raise(String) (at snippet:1)
Evaluator:invoke(String, Value&)
EditorLoop:update()";

#[derive(Debug, Clone)]
enum Expr {
    Lit(Value),
    Var(String),
    Neg(Box<Expr>),
    Binary(char, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone)]
enum Stmt {
    Assign(String, Expr),
    Expr(Expr),
}

/// A compiled calc program.
#[derive(Debug, Default)]
pub struct CalcUnit {
    stmts: Vec<Stmt>,
}

/// The demo compiler service.
#[derive(Debug, Default)]
pub struct CalcCompiler {
    bindings: BTreeMap<String, Value>,
    sink: Option<CaptureSink>,
    referenced: Vec<ModuleHandle>,
    baseline: Vec<String>,
}

impl CalcCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    fn diag(&self, text: &str) {
        if let Some(sink) = &self.sink {
            sink.write_err(text);
        }
    }
}

impl CompilerService for CalcCompiler {
    type Unit = CalcUnit;

    fn compile(&mut self, source: &str) -> Result<Compiled<CalcUnit>, CompilerError> {
        if let Some(remainder) = incomplete_remainder(source) {
            return Ok(Compiled::Incomplete {
                remainder: remainder.to_string(),
            });
        }
        match Parser::new(source).parse_program() {
            Ok(stmts) => Ok(Compiled::Ready(CalcUnit { stmts })),
            Err(message) => {
                // Parse errors surface through the diagnostic sink, as
                // an incremental compiler would report them.
                self.diag(&format!("calc: {message}\n"));
                Ok(Compiled::Ready(CalcUnit::default()))
            }
        }
    }

    fn run(&mut self, unit: CalcUnit) -> RunReply {
        let mut last: Option<Option<Value>> = None;
        let stmt_count = unit.stmts.len();
        for (i, stmt) in unit.stmts.into_iter().enumerate() {
            let is_last = i + 1 == stmt_count;
            match stmt {
                Stmt::Assign(name, expr) => {
                    match self.eval(&expr) {
                        Ok(Some(value)) => {
                            self.bindings.insert(name, value);
                        }
                        Ok(None) => {
                            return RunReply::fault(raise("cannot assign a void result"));
                        }
                        Err(fault) => return RunReply::fault(fault),
                    }
                    if is_last {
                        last = None;
                    }
                }
                Stmt::Expr(expr) => match self.eval(&expr) {
                    Ok(value) => {
                        if is_last {
                            last = Some(value);
                        }
                    }
                    Err(fault) => return RunReply::fault(fault),
                },
            }
        }
        match last {
            Some(Some(value)) => RunReply::value(value),
            _ => RunReply::no_value(),
        }
    }

    fn reference_module(&mut self, module: &ModuleHandle) -> Result<(), CompilerError> {
        self.referenced.push(module.clone());
        Ok(())
    }

    fn load_baseline(&mut self, directives: &[String]) -> Result<(), CompilerError> {
        self.baseline.extend(directives.iter().cloned());
        Ok(())
    }

    fn bindings(&self) -> Vec<Binding> {
        self.bindings
            .iter()
            .map(|(name, value)| Binding {
                name: name.clone(),
                type_name: value.type_name().to_string(),
                value: value.clone(),
            })
            .collect()
    }

    fn set_sink(&mut self, sink: Option<CaptureSink>) {
        self.sink = sink;
    }

    fn sink(&self) -> Option<CaptureSink> {
        self.sink.clone()
    }
}

impl CalcCompiler {
    /// Evaluate an expression. `Ok(None)` is a void result (from
    /// `print`/`log`), which has nothing to show or assign.
    fn eval(&self, expr: &Expr) -> Result<Option<Value>, RuntimeFault> {
        match expr {
            Expr::Lit(value) => Ok(Some(value.clone())),
            Expr::Var(name) => self
                .bindings
                .get(name)
                .cloned()
                .map(Some)
                .ok_or_else(|| raise(&format!("name '{name}' is not defined"))),
            Expr::Neg(inner) => match self.want_value(inner)? {
                Value::Int(i) => Ok(Some(Value::Int(-i))),
                Value::Float(f) => Ok(Some(Value::Float(-f))),
                other => Err(raise(&format!("cannot negate {}", other.type_name()))),
            },
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.want_value(lhs)?;
                let rhs = self.want_value(rhs)?;
                binary(*op, lhs, rhs).map(Some)
            }
            Expr::Call(name, args) => self.call(name, args),
        }
    }

    fn want_value(&self, expr: &Expr) -> Result<Value, RuntimeFault> {
        self.eval(expr)?
            .ok_or_else(|| raise("void result used as a value"))
    }

    fn call(&self, name: &str, args: &[Expr]) -> Result<Option<Value>, RuntimeFault> {
        match name {
            "print" => {
                let mut parts = Vec::new();
                for arg in args {
                    parts.push(display(&self.want_value(arg)?));
                }
                if let Some(sink) = &self.sink {
                    sink.write_out(&format!("{}\n", parts.join(" ")));
                }
                Ok(None)
            }
            "log" => {
                let text = match args {
                    [only] => display(&self.want_value(only)?),
                    _ => return Err(raise("log takes exactly one argument")),
                };
                if let Some(sink) = &self.sink {
                    sink.log(
                        ConsoleMessage::new(Severity::Info, text).with_trace(SYNTHETIC_TRACE),
                    );
                }
                Ok(None)
            }
            "fail" => {
                let message = match args {
                    [only] => display(&self.want_value(only)?),
                    _ => "failure requested".to_string(),
                };
                Err(raise(&message))
            }
            other => Err(raise(&format!("unknown function '{other}'"))),
        }
    }
}

fn raise(message: &str) -> RuntimeFault {
    RuntimeFault::new(message).with_trace(SYNTHETIC_TRACE)
}

/// Unquoted display form, for `print` and `fail` arguments.
fn display(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        other => kaiwa_engine::format_value(other),
    }
}

fn binary(op: char, lhs: Value, rhs: Value) -> Result<Value, RuntimeFault> {
    use Value::{Float, Int, Str};
    match (op, lhs, rhs) {
        ('+', Str(a), Str(b)) => Ok(Str(a + &b)),
        ('+', Int(a), Int(b)) => a
            .checked_add(b)
            .map(Int)
            .ok_or_else(|| raise("integer overflow in addition")),
        ('-', Int(a), Int(b)) => a
            .checked_sub(b)
            .map(Int)
            .ok_or_else(|| raise("integer overflow in subtraction")),
        ('*', Int(a), Int(b)) => a
            .checked_mul(b)
            .map(Int)
            .ok_or_else(|| raise("integer overflow in multiplication")),
        ('/', Int(_), Int(0)) => Err(raise("division by zero")),
        ('/', Int(a), Int(b)) => a
            .checked_div(b)
            .map(Int)
            .ok_or_else(|| raise("integer overflow in division")),
        ('%', Int(_), Int(0)) => Err(raise("modulo by zero")),
        ('%', Int(a), Int(b)) => a
            .checked_rem(b)
            .map(Int)
            .ok_or_else(|| raise("integer overflow in modulo")),
        (op, lhs, rhs) => {
            let (a, b) = match (as_float(&lhs), as_float(&rhs)) {
                (Some(a), Some(b)) => (a, b),
                _ => {
                    return Err(raise(&format!(
                        "cannot apply '{op}' to {} and {}",
                        lhs.type_name(),
                        rhs.type_name()
                    )))
                }
            };
            match op {
                '+' => Ok(Float(a + b)),
                '-' => Ok(Float(a - b)),
                '*' => Ok(Float(a * b)),
                '/' if b == 0.0 => Err(raise("division by zero")),
                '/' => Ok(Float(a / b)),
                '%' if b == 0.0 => Err(raise("modulo by zero")),
                '%' => Ok(Float(a % b)),
                other => Err(raise(&format!("unknown operator '{other}'"))),
            }
        }
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// Decide whether `source` is a complete compilable unit. Returns the
/// unconsumed tail when it is not: unbalanced parentheses, an open
/// string literal, or text after the last statement terminator.
///
/// A stray `)` (negative depth) is complete, not incomplete: no amount
/// of further input can balance it, so it must reach the parser and
/// come back as a diagnostic rather than park the caller on the
/// continuation prompt forever.
fn incomplete_remainder(source: &str) -> Option<&str> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut last_semi = None;
    for (i, c) in source.char_indices() {
        if in_string {
            if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => depth -= 1,
            ';' if depth <= 0 => last_semi = Some(i),
            _ => {}
        }
    }
    if in_string || depth > 0 {
        return Some(source);
    }
    if depth < 0 {
        return None;
    }
    let tail_start = last_semi.map(|i| i + 1).unwrap_or(0);
    let tail = &source[tail_start..];
    if tail.trim().is_empty() {
        None
    } else {
        Some(tail)
    }
}

/// Recursive descent parser over a complete source string.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_program(&mut self) -> Result<Vec<Stmt>, String> {
        let mut stmts = Vec::new();
        while self.peek().is_some() {
            stmts.push(self.parse_stmt()?);
            match self.advance() {
                Some(';') => {}
                other => return Err(format!("expected ';', found {other:?}")),
            }
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, String> {
        // Lookahead for `ident =` (but not `==`).
        let start = self.pos;
        if let Some(name) = self.try_ident() {
            if self.peek() == Some('=') {
                self.advance();
                let expr = self.parse_expr()?;
                return Ok(Stmt::Assign(name, expr));
            }
            self.pos = start;
        }
        Ok(Stmt::Expr(self.parse_expr()?))
    }

    /// Additive level: `+` and `-`.
    fn parse_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// Multiplicative level: `*`, `/`, `%`.
    fn parse_term(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;
        while let Some(op @ ('*' | '/' | '%')) = self.peek() {
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some('-') => {
                self.advance();
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            Some('+') => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some('(') => {
                self.advance();
                let expr = self.parse_expr()?;
                match self.advance() {
                    Some(')') => Ok(expr),
                    other => Err(format!("expected ')', found {other:?}")),
                }
            }
            Some('"') => self.parse_string(),
            Some(c) if c.is_ascii_digit() => self.parse_number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let name = self.try_ident().expect("checked alphabetic start");
                match name.as_str() {
                    "true" => Ok(Expr::Lit(Value::Bool(true))),
                    "false" => Ok(Expr::Lit(Value::Bool(false))),
                    "null" => Ok(Expr::Lit(Value::Null)),
                    _ => {
                        if self.peek() == Some('(') {
                            self.advance();
                            let args = self.parse_args()?;
                            Ok(Expr::Call(name, args))
                        } else {
                            Ok(Expr::Var(name))
                        }
                    }
                }
            }
            other => Err(format!("unexpected input at {other:?}")),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        if self.peek() == Some(')') {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            match self.advance() {
                Some(',') => {}
                Some(')') => return Ok(args),
                other => return Err(format!("expected ',' or ')', found {other:?}")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<Expr, String> {
        self.advance(); // opening quote
        let start = self.pos;
        while let Some(c) = self.input[self.pos..].chars().next() {
            if c == '"' {
                let text = self.input[start..self.pos].to_string();
                self.pos += 1;
                return Ok(Expr::Lit(Value::Str(text)));
            }
            self.pos += c.len_utf8();
        }
        Err("unterminated string literal".to_string())
    }

    fn parse_number(&mut self) -> Result<Expr, String> {
        self.skip_whitespace();
        let start = self.pos;
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let mut is_float = false;
        if self.pos + 1 < bytes.len()
            && bytes[self.pos] == b'.'
            && bytes[self.pos + 1].is_ascii_digit()
        {
            is_float = true;
            self.pos += 1;
            while self.pos < bytes.len() && bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
        }
        let text = &self.input[start..self.pos];
        if is_float {
            text.parse::<f64>()
                .map(|f| Expr::Lit(Value::Float(f)))
                .map_err(|e| format!("bad float literal {text:?}: {e}"))
        } else {
            text.parse::<i64>()
                .map(|i| Expr::Lit(Value::Int(i)))
                .map_err(|e| format!("bad integer literal {text:?}: {e}"))
        }
    }

    fn try_ident(&mut self) -> Option<String> {
        self.skip_whitespace();
        let start = self.pos;
        let bytes = self.input.as_bytes();
        if self.pos >= bytes.len() {
            return None;
        }
        let first = bytes[self.pos] as char;
        if !(first.is_ascii_alphabetic() || first == '_') {
            return None;
        }
        while self.pos < bytes.len() {
            let c = bytes[self.pos] as char;
            if c.is_ascii_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        Some(self.input[start..self.pos].to_string())
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.input[self.pos..].chars().next() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        self.skip_whitespace();
        let c = self.input[self.pos..].chars().next()?;
        self.pos += c.len_utf8();
        Some(c)
    }
}
