//! The error kernel. Two distinct things live here:
//!
//! - [`ErrorCode`] and the `Value::Error` constructors/accessors used
//!   throughout evaluation — errors as ordinary values, never unwound.
//! - [`ParseError`], the one kind of failure the core is allowed to *raise*,
//!   wired into `miette::Diagnostic` so a host can render it richly.
//!   `parse_and_eval` (`host.rs`) is the only place that catches one and
//!   folds it into a `Value::Error(GenericError)`.

use miette::Diagnostic;
use thiserror::Error;

use crate::ast::Span;
use crate::value::{ErrorValue, Value};

/// The closed set of error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    TypeError,
    ArityError,
    NameError,
    DivisionByZero,
    KeyError,
    IndexError,
    AssertionError,
    FileError,
    ValueError,
    GenericError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::TypeError => "TypeError",
            ErrorCode::ArityError => "ArityError",
            ErrorCode::NameError => "NameError",
            ErrorCode::DivisionByZero => "DivisionByZero",
            ErrorCode::KeyError => "KeyError",
            ErrorCode::IndexError => "IndexError",
            ErrorCode::AssertionError => "AssertionError",
            ErrorCode::FileError => "FileError",
            ErrorCode::ValueError => "ValueError",
            ErrorCode::GenericError => "GenericError",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn make(code: ErrorCode, message: String, span: Option<Span>) -> Value {
    Value::Error(Box::new(ErrorValue {
        code,
        message,
        context: Vec::new(),
        span,
    }))
}

fn make_with_context(
    code: ErrorCode,
    message: String,
    context: Vec<(String, Value)>,
    span: Option<Span>,
) -> Value {
    Value::Error(Box::new(ErrorValue {
        code,
        message,
        context,
        span,
    }))
}

pub fn type_error(message: String, span: Span) -> Value {
    make(ErrorCode::TypeError, message, Some(span))
}

pub fn arity_error(message: String, span: Span) -> Value {
    make(ErrorCode::ArityError, message, Some(span))
}

pub fn name_error(message: String, span: Option<Span>) -> Value {
    make(ErrorCode::NameError, message, span)
}

/// Builds a `NameError` for an unresolved name, attaching a "Did you mean"
/// suggestion when one clears the threshold.
pub fn name_error_unresolved(name: &str, candidates: &[String], span: Option<Span>) -> Value {
    let mut message = format!("Unbound name '{name}'.");
    if let Some(suggestion) = did_you_mean(name, candidates) {
        message.push_str(&format!(" Did you mean '{suggestion}'?"));
    }
    make(ErrorCode::NameError, message, span)
}

pub fn division_by_zero(span: Span) -> Value {
    make(
        ErrorCode::DivisionByZero,
        "division by zero".to_string(),
        Some(span),
    )
}

pub fn key_error(message: String, span: Option<Span>) -> Value {
    make(ErrorCode::KeyError, message, span)
}

pub fn index_error(message: String, span: Option<Span>) -> Value {
    make(ErrorCode::IndexError, message, span)
}

pub fn assertion_error(message: String, span: Option<Span>) -> Value {
    make(ErrorCode::AssertionError, message, span)
}

pub fn file_error(message: String) -> Value {
    make(ErrorCode::FileError, message, None)
}

pub fn value_error(message: String, span: Option<Span>) -> Value {
    make(ErrorCode::ValueError, message, span)
}

/// A `ValueError` naming the pipeline node at fault and carrying the
/// rendered inner error as context.
pub fn pipeline_node_error(node: &str, inner: &Value, span: Option<Span>) -> Value {
    make_with_context(
        ErrorCode::ValueError,
        format!("error in pipeline node '{node}': {inner}"),
        vec![
            ("node".to_string(), Value::Str(node.to_string())),
            ("inner".to_string(), inner.clone()),
        ],
        span,
    )
}

pub fn pipeline_cycle_error(node: &str, span: Option<Span>) -> Value {
    make(
        ErrorCode::ValueError,
        format!("cycle detected in pipeline at node '{node}'"),
        span,
    )
}

pub fn generic_error(message: String, span: Option<Span>) -> Value {
    make(ErrorCode::GenericError, message, span)
}

pub fn is_error(value: &Value) -> bool {
    value.is_error()
}

pub fn code_of(value: &Value) -> Option<ErrorCode> {
    match value {
        Value::Error(e) => Some(e.code),
        _ => None,
    }
}

pub fn message_of(value: &Value) -> Option<&str> {
    match value {
        Value::Error(e) => Some(e.message.as_str()),
        _ => None,
    }
}

pub fn context_of(value: &Value) -> Option<&[(String, Value)]> {
    match value {
        Value::Error(e) => Some(e.context.as_slice()),
        _ => None,
    }
}

/// Bounded DP Levenshtein distance, early-terminating once every entry in
/// the current row exceeds `threshold`. Returns `None` once it's clear no completion of the
/// comparison can land within the threshold.
fn bounded_levenshtein(a: &str, b: &str, threshold: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > threshold {
        return None;
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, &ca) in a.iter().enumerate() {
        let mut cur = vec![0usize; b.len() + 1];
        cur[0] = i + 1;
        let mut row_min = cur[0];
        for (j, &cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
            row_min = row_min.min(cur[j + 1]);
        }
        if row_min > threshold {
            return None;
        }
        prev = cur;
    }
    let dist = prev[b.len()];
    (dist <= threshold).then_some(dist)
}

/// "Did you mean '<best>'?". Threshold is
/// `max(1, floor(len(s) / 3))`; the closest candidate within that distance
/// wins, ties broken by first occurrence in `candidates`.
pub fn did_you_mean(name: &str, candidates: &[String]) -> Option<String> {
    let threshold = (name.chars().count() / 3).max(1);
    let mut best: Option<(usize, &String)> = None;
    for candidate in candidates {
        if candidate == name {
            continue;
        }
        if let Some(dist) = bounded_levenshtein(name, candidate, threshold) {
            if best.as_ref().map(|(d, _)| dist < *d).unwrap_or(true) {
                best = Some((dist, candidate));
            }
        }
    }
    best.map(|(_, c)| c.clone())
}

/// The sole raise point in the core: lexer/parser failures.
/// Wired into `miette::Diagnostic` so a host can print a span-carrying
/// report.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    #[label("here")]
    pub span: Option<(usize, usize)>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        ParseError {
            message: message.into(),
            span: Some((span.start, span.end - span.start)),
        }
    }

    /// Converts a raised `ParseError` into the `GenericError`-coded value
    /// the parser returns, rather than an exception.
    pub fn into_value(self) -> Value {
        generic_error(self.message, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn did_you_mean_finds_close_name() {
        let candidates = vec!["length".to_string(), "head".to_string(), "tail".to_string()];
        assert_eq!(did_you_mean("lenght", &candidates), Some("length".to_string()));
    }

    #[test]
    fn did_you_mean_none_when_too_far() {
        let candidates = vec!["length".to_string()];
        assert_eq!(did_you_mean("xyz", &candidates), None);
    }

    #[test]
    fn name_error_unresolved_includes_suggestion() {
        let candidates = vec!["length".to_string()];
        let v = name_error_unresolved("lenght", &candidates, None);
        assert!(message_of(&v).unwrap().contains("length"));
        assert_eq!(code_of(&v), Some(ErrorCode::NameError));
    }
}
