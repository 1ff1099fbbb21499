//! Exercises the `wrangle-cli` binary end-to-end: a parse failure should
//! surface as a non-zero exit with a rendered error on standard error, and
//! the `test` subcommand should discover and run the YAML manifests under
//! `tests/suites`.

use std::fs;

use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn run_reports_failure_exit_code_on_parse_error() {
    let bad_file = "tests/bad_script.wrg";
    fs::write(bad_file, "x = (1 + ").unwrap();

    let mut cmd = Command::cargo_bin("wrangle-cli").unwrap();
    cmd.arg("run").arg(bad_file);
    cmd.assert().failure().stderr(contains("Error("));

    let _ = fs::remove_file(bad_file);
}

#[test]
fn run_rejects_an_unannotated_top_level_lambda_by_default() {
    let file = "tests/unannotated_lambda.wrg";
    fs::write(file, "f = \\(x) x").unwrap();

    let mut cmd = Command::cargo_bin("wrangle-cli").unwrap();
    cmd.arg("run").arg(file);
    cmd.assert().failure();

    let _ = fs::remove_file(file);
}

#[test]
fn run_unsafe_bypasses_the_strict_mode_gate() {
    let file = "tests/unannotated_lambda_unsafe.wrg";
    fs::write(file, "f = \\(x) x").unwrap();

    let mut cmd = Command::cargo_bin("wrangle-cli").unwrap();
    cmd.arg("run").arg(file).arg("--unsafe");
    cmd.assert().success();

    let _ = fs::remove_file(file);
}

#[test]
fn explain_json_prints_structured_output() {
    let mut cmd = Command::cargo_bin("wrangle-cli").unwrap();
    cmd.arg("explain").arg("1 + 1").arg("--json");
    cmd.assert().success().stdout(contains("\"type_name\""));
}

#[test]
fn test_subcommand_runs_the_basics_manifest() {
    let mut cmd = Command::cargo_bin("wrangle-cli").unwrap();
    cmd.arg("test").arg("tests/suites");
    cmd.assert().success().stdout(contains("passed"));
}

#[test]
fn test_subcommand_filter_narrows_to_matching_case_names() {
    let mut cmd = Command::cargo_bin("wrangle-cli").unwrap();
    cmd.arg("test").arg("tests/suites").arg("--filter").arg("division");
    cmd.assert().success().stdout(contains("division by zero"));
}
