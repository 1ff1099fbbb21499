//! YAML-manifest test runner, driving the `wrangle-cli test` subcommand.
//! Discovers `*.yaml`/`*.yml` files under a root directory, each holding a
//! list of test cases, runs each through [`crate::host::parse_and_eval`],
//! and reports pass/fail/skip with a colorized diff on mismatch.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::env::Env;
use crate::error;
use crate::host::{self, Mode};
use crate::registry::BuiltinRegistry;
use crate::value::Value;

/// One entry in a YAML test-suite manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub input: String,
    pub expected: Option<String>,
    pub expect_error: Option<String>,
    pub expect_error_code: Option<String>,
    #[serde(default)]
    pub skip: bool,
}

#[derive(Debug)]
pub enum Outcome {
    Pass,
    Fail { reason: String },
    Skipped,
}

pub struct TestConfig {
    pub use_colors: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stdout),
        }
    }
}

const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

impl TestConfig {
    fn colorize(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

/// Recursively finds every `.yaml`/`.yml` file under `root`.
pub fn discover_yaml_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file()
                && e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect()
}

/// Parses one manifest file into its list of cases. A file that fails to
/// read or parse reports to stderr and contributes no cases, rather than
/// aborting the whole run.
pub fn load_test_cases(path: &Path) -> Vec<TestCase> {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Vec<TestCase>>(&content) {
            Ok(cases) => cases,
            Err(e) => {
                eprintln!("could not parse {}: {e}", path.display());
                Vec::new()
            }
        },
        Err(e) => {
            eprintln!("could not read {}: {e}", path.display());
            Vec::new()
        }
    }
}

/// Runs one case against a fresh environment. `Mode::Repl` is used
/// throughout: manifest cases are expression snippets, not scripts with
/// top-level function declarations subject to strict-mode annotation
/// checks.
fn run_case(case: &TestCase, registry: &BuiltinRegistry) -> Outcome {
    if case.skip {
        return Outcome::Skipped;
    }
    let mut sink = crate::diagnostics::NullSink;
    let (value, _) = host::parse_and_eval(Mode::Repl, Env::new(), &case.input, registry, &mut sink);

    if let Some(code) = &case.expect_error_code {
        return match error::code_of(&value) {
            Some(actual) if actual.as_str() == code => Outcome::Pass,
            Some(actual) => Outcome::Fail {
                reason: format!("expected error code '{code}', got '{actual}'"),
            },
            None => Outcome::Fail {
                reason: format!("expected error code '{code}', got non-error value {value}"),
            },
        };
    }
    if let Some(substring) = &case.expect_error {
        return match error::message_of(&value) {
            Some(msg) if msg.contains(substring.as_str()) => Outcome::Pass,
            Some(msg) => Outcome::Fail {
                reason: format!("expected error containing '{substring}', got '{msg}'"),
            },
            None => Outcome::Fail {
                reason: format!("expected an error containing '{substring}', got {value}"),
            },
        };
    }
    if let Some(expected) = &case.expected {
        let actual = value.to_string();
        return if &actual == expected {
            Outcome::Pass
        } else {
            Outcome::Fail {
                reason: render_diff(expected, &actual),
            }
        };
    }
    Outcome::Fail {
        reason: "manifest case declares none of expected/expect_error/expect_error_code".to_string(),
    }
}

fn render_diff(expected: &str, actual: &str) -> String {
    use difference::{Changeset, Difference};
    let changeset = Changeset::new(expected, actual, "\n");
    let mut out = String::from("diff (expected vs actual):\n");
    for part in &changeset.diffs {
        match part {
            Difference::Same(s) => out.push_str(&format!("  {s}\n")),
            Difference::Add(s) => out.push_str(&format!("+ {s}\n")),
            Difference::Rem(s) => out.push_str(&format!("- {s}\n")),
        }
    }
    out
}

/// Discovers every manifest under `root`, runs every non-skipped case
/// (optionally narrowed by a case-insensitive substring `filter` on the
/// case name), and prints a colorized pass/fail/skip report. Returns
/// `(passed, failed, skipped)`.
pub fn run_suite(root: &Path, filter: Option<&str>, registry: &BuiltinRegistry) -> (usize, usize, usize) {
    let config = TestConfig::default();
    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;

    for manifest in discover_yaml_files(root) {
        for case in load_test_cases(&manifest) {
            if let Some(f) = filter {
                if !case.name.to_lowercase().contains(&f.to_lowercase()) {
                    continue;
                }
            }
            match run_case(&case, registry) {
                Outcome::Pass => {
                    println!("{} {}", config.colorize("PASS", GREEN), case.name);
                    passed += 1;
                }
                Outcome::Fail { reason } => {
                    println!("{} {}", config.colorize("FAIL", RED), case.name);
                    println!("{reason}");
                    failed += 1;
                }
                Outcome::Skipped => {
                    println!("{} {}", config.colorize("SKIP", YELLOW), case.name);
                    skipped += 1;
                }
            }
        }
    }

    println!("\n{passed} passed, {failed} failed, {skipped} skipped");
    (passed, failed, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::register_base;

    fn registry() -> BuiltinRegistry {
        let mut registry = BuiltinRegistry::new();
        register_base(&mut registry);
        registry
    }

    #[test]
    fn expected_value_case_passes() {
        let case = TestCase {
            name: "add".to_string(),
            input: "1 + 2".to_string(),
            expected: Some("3".to_string()),
            expect_error: None,
            expect_error_code: None,
            skip: false,
        };
        assert!(matches!(run_case(&case, &registry()), Outcome::Pass));
    }

    #[test]
    fn mismatched_expected_value_fails_with_diff() {
        let case = TestCase {
            name: "add".to_string(),
            input: "1 + 2".to_string(),
            expected: Some("4".to_string()),
            expect_error: None,
            expect_error_code: None,
            skip: false,
        };
        match run_case(&case, &registry()) {
            Outcome::Fail { reason } => assert!(reason.contains("diff")),
            other => panic!("expected Fail, got {other:?}"),
        }
    }

    #[test]
    fn expect_error_code_matches_division_by_zero() {
        let case = TestCase {
            name: "div-zero".to_string(),
            input: "1 / 0".to_string(),
            expected: None,
            expect_error: None,
            expect_error_code: Some("DivisionByZero".to_string()),
            skip: false,
        };
        assert!(matches!(run_case(&case, &registry()), Outcome::Pass));
    }

    #[test]
    fn expect_error_substring_matches_message() {
        let case = TestCase {
            name: "unbound".to_string(),
            input: "nope()".to_string(),
            expected: None,
            expect_error: Some("Unbound name".to_string()),
            expect_error_code: None,
            skip: false,
        };
        assert!(matches!(run_case(&case, &registry()), Outcome::Pass));
    }

    #[test]
    fn skipped_case_does_not_execute() {
        let case = TestCase {
            name: "skip-me".to_string(),
            input: "this is not valid wrangle syntax )))".to_string(),
            expected: Some("irrelevant".to_string()),
            expect_error: None,
            expect_error_code: None,
            skip: true,
        };
        assert!(matches!(run_case(&case, &registry()), Outcome::Skipped));
    }
}
