//! Runs each `tests/scripts/*.wrg` fixture end-to-end and asserts on the
//! resulting `Value`, built directly against this crate's `host` module.

mod common;

use wrangle::error::ErrorCode;
use wrangle::value::Value;

fn run_script(path: &str) -> Value {
    let src = std::fs::read_to_string(format!("tests/scripts/{path}"))
        .unwrap_or_else(|e| panic!("failed to read fixture {path}: {e}"));
    common::eval(&src)
}

#[test]
fn pipeline_basic_resolves_node_declared_after_its_dependent() {
    assert_eq!(run_script("pipeline_basic.wrg"), Value::Int(3));
}

#[test]
fn closure_snapshot_captures_its_defining_environment() {
    assert_eq!(run_script("closure_snapshot.wrg"), Value::Int(11));
}

#[test]
fn na_poison_yields_a_type_error_not_a_crash() {
    let v = run_script("na_poison.wrg");
    assert_eq!(wrangle::error::code_of(&v), Some(ErrorCode::TypeError));
}

#[test]
fn nse_filter_desugars_column_references_inside_map() {
    let v = run_script("nse_filter.wrg");
    match v {
        Value::List(items) => {
            let bools: Vec<Value> = items.into_iter().map(|(_, v)| v).collect();
            assert_eq!(bools, vec![Value::Bool(true), Value::Bool(false)]);
        }
        other => panic!("expected list, got {other:?}"),
    }
}
