//! The host contract: exactly the two functions a CLI, a
//! REPL, or any other embedder needs, and nothing else. This is the one
//! place `ParseError` is caught and folded into a `Value::Error` -- the
//! core itself never unwinds past this boundary.

use crate::diagnostics::DiagnosticSink;
use crate::env::Env;
use crate::error;
use crate::eval::{eval_program, EvalCtx};
use crate::registry::BuiltinRegistry;
use crate::strict;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Repl,
    Strict,
}

/// Parses `source`, runs strict-mode validation when `mode == Strict`,
/// and evaluates the program. Always returns a value and the resulting
/// environment; a parse or validation failure surfaces as a `Value::Error`
/// rather than propagating as a Rust error.
pub fn parse_and_eval(
    mode: Mode,
    env: Env,
    source: &str,
    registry: &BuiltinRegistry,
    diagnostics: &mut dyn DiagnosticSink,
) -> (Value, Env) {
    let program = match crate::parser::parse(source) {
        Ok(program) => program,
        Err(parse_err) => return (parse_err.into_value(), env),
    };

    if mode == Mode::Strict {
        if let Err(e) = strict::validate(&program) {
            return (e, env);
        }
    }

    let mut ctx = EvalCtx::new(registry, diagnostics);
    eval_program(&program, env, &mut ctx)
}

/// Parses and strict-validates `source` without evaluating it. Used by a host that wants to check a script before
/// running it (e.g. `wrangle-cli run`'s default strict gate).
pub fn validate(mode: Mode, source: &str) -> Result<(), Value> {
    let program = crate::parser::parse(source).map_err(|e| e.into_value())?;
    if mode == Mode::Strict {
        strict::validate(&program)?;
    }
    Ok(())
}

pub fn is_error(value: &Value) -> bool {
    error::is_error(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullSink;

    #[test]
    fn parse_failure_becomes_generic_error_value() {
        let registry = BuiltinRegistry::new();
        let mut sink = NullSink;
        let (value, _) = parse_and_eval(Mode::Repl, Env::new(), "x = ", &registry, &mut sink);
        assert!(value.is_error());
    }

    #[test]
    fn strict_mode_rejects_unannotated_lambda_before_evaluating() {
        let registry = BuiltinRegistry::new();
        let mut sink = NullSink;
        let (value, _) = parse_and_eval(Mode::Strict, Env::new(), "f = \\(x) x", &registry, &mut sink);
        assert!(value.is_error());
    }

    #[test]
    fn repl_mode_skips_strict_validation() {
        let registry = BuiltinRegistry::new();
        let mut sink = NullSink;
        let (value, _) = parse_and_eval(Mode::Repl, Env::new(), "f = \\(x) x\nf(5)", &registry, &mut sink);
        assert_eq!(value, Value::Int(5));
    }

    #[test]
    fn validate_without_evaluating_does_not_bind_names() {
        assert!(validate(Mode::Strict, "f = \\(x: Int) -> Int x").is_ok());
        assert!(validate(Mode::Strict, "f = \\(x) x").is_err());
    }
}
