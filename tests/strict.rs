//! Integration coverage for the strict-mode validator driven through
//! `host::validate`/`host::parse_and_eval`, across multi-statement
//! programs (unit tests in `src/strict.rs` cover `validate` directly on
//! single-lambda programs).

mod common;

use wrangle::error::ErrorCode;
use wrangle::host::{self, Mode};

#[test]
fn repl_mode_skips_validation_entirely() {
    // An unannotated lambda would fail strict validation, but repl mode
    // never runs it -- evaluating it just succeeds.
    assert!(host::validate(Mode::Repl, "f = \\(x) x + 1").is_ok());
}

#[test]
fn strict_mode_rejects_the_first_offending_lambda_in_a_longer_program() {
    let src = "good = \\(x: Int) -> Int x + 1\nbad = \\(y) -> Int y * 2\n1";
    let err = host::validate(Mode::Strict, src).unwrap_err();
    assert_eq!(common::error_code(&err), Some(ErrorCode::ValueError));
}

#[test]
fn strict_mode_accepts_a_program_with_only_fully_annotated_lambdas() {
    let src = "inc = \\(x: Int) -> Int x + 1\ndouble = \\<T>(x: T) -> T x\n1";
    assert!(host::validate(Mode::Strict, src).is_ok());
}

#[test]
fn non_lambda_bindings_never_trip_strict_validation() {
    let src = "a = 1\nb = \"hello\"\nc = [1, 2, 3]";
    assert!(host::validate(Mode::Strict, src).is_ok());
}

#[test]
fn parse_and_eval_in_strict_mode_surfaces_the_validation_error_as_the_result() {
    let registry = common::registry_with_base();
    let mut sink = wrangle::diagnostics::NullSink;
    let (value, _) = host::parse_and_eval(
        Mode::Strict,
        wrangle::env::Env::new(),
        "f = \\(x) x",
        &registry,
        &mut sink,
    );
    assert_eq!(common::error_code(&value), Some(ErrorCode::ValueError));
}

#[test]
fn nested_generic_used_only_in_return_type_must_still_be_declared() {
    let src = "f = \\(x: Int) -> T x";
    let err = host::validate(Mode::Strict, src).unwrap_err();
    assert_eq!(common::error_code(&err), Some(ErrorCode::ValueError));
}

#[test]
fn multiple_declared_generics_all_satisfy_validation() {
    let src = "pair = \\<T, U>(a: T, b: U) -> T a";
    assert!(host::validate(Mode::Strict, src).is_ok());
}
