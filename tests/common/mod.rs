#![allow(dead_code)]
//! Shared helpers for the integration suite: evaluate a script against a
//! fresh environment/registry and assert on the resulting value.

use wrangle::diagnostics::{NullSink, VecSink};
use wrangle::env::Env;
use wrangle::error::ErrorCode;
use wrangle::eval::{eval_program, EvalCtx};
use wrangle::host::{self, Mode};
use wrangle::registry::BuiltinRegistry;
use wrangle::value::Value;

pub fn registry_with_base() -> BuiltinRegistry {
    let mut registry = BuiltinRegistry::new();
    wrangle::prelude::register_base(&mut registry);
    registry
}

/// Parses and evaluates `src` in repl mode (no strict validation) against a
/// fresh environment and the base registry.
pub fn eval(src: &str) -> Value {
    let registry = registry_with_base();
    let mut sink = NullSink;
    let (value, _) = host::parse_and_eval(Mode::Repl, Env::new(), src, &registry, &mut sink);
    value
}

/// Like [`eval`] but also returns the warnings a `:=` overwrite emitted.
pub fn eval_with_warnings(src: &str) -> (Value, Vec<String>) {
    let registry = registry_with_base();
    let mut sink = VecSink::new();
    let (value, _) = host::parse_and_eval(Mode::Repl, Env::new(), src, &registry, &mut sink);
    (value, sink.warnings)
}

/// Parses and evaluates a program directly via [`eval_program`], returning
/// the final environment alongside the last value -- for assertions about
/// bindings rather than just the result.
pub fn eval_full(src: &str) -> (Value, Env) {
    let program = wrangle::parser::parse(src).unwrap();
    let registry = registry_with_base();
    let mut sink = NullSink;
    let mut ctx = EvalCtx::new(&registry, &mut sink);
    eval_program(&program, Env::new(), &mut ctx)
}

pub fn error_code(value: &Value) -> Option<ErrorCode> {
    wrangle::error::code_of(value)
}

pub fn assert_error_code(value: &Value, expected: ErrorCode) {
    assert_eq!(
        error_code(value),
        Some(expected),
        "expected {:?}, got {:?}",
        expected,
        value
    );
}
