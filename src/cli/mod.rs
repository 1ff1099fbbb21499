//! The CLI entry point, wired thin over [`crate::host`]: this module is
//! a demonstration host, not part of the language core itself.

pub mod args;
pub mod output;

use std::path::Path;

use clap::Parser;

use crate::env::Env;
use crate::host::{self, Mode};
use crate::registry::BuiltinRegistry;

use args::{Command, WrangleArgs};
use output::StdoutSink;

pub fn run() {
    let args = WrangleArgs::parse();
    let mut registry = BuiltinRegistry::new();
    crate::prelude::register_base(&mut registry);

    match args.command.unwrap_or(Command::Repl) {
        Command::Repl => crate::repl::run_repl(&registry),
        Command::Run { file } => run_file(&file, &registry, args.mode.map(Into::into), args.r#unsafe),
        Command::Explain { expr, json } => explain(&expr, &registry, json),
        Command::Test { root, filter } => run_tests(&root, filter.as_deref(), &registry),
    }
}

fn run_tests(root: &Path, filter: Option<&str>, registry: &BuiltinRegistry) {
    let (_, failed, _) = crate::test_harness::run_suite(root, filter, registry);
    if failed > 0 {
        std::process::exit(1);
    }
}

fn run_file(path: &Path, registry: &BuiltinRegistry, mode: Option<Mode>, unsafe_mode: bool) {
    let mode = if unsafe_mode {
        Mode::Repl
    } else {
        mode.unwrap_or(Mode::Strict)
    };
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read {}: {e}", path.display());
            std::process::exit(1);
        }
    };

    let mut sink = StdoutSink::new();
    let (value, _) = host::parse_and_eval(mode, Env::new(), &source, registry, &mut sink);
    if value.is_error() {
        eprintln!("{value}");
        std::process::exit(1);
    }
    output::print_value(&value);
}

fn explain(expr: &str, registry: &BuiltinRegistry, json: bool) {
    let mut sink = crate::diagnostics::NullSink;
    let (value, _) = host::parse_and_eval(Mode::Repl, Env::new(), expr, registry, &mut sink);
    if json {
        if let Err(e) = output::print_explanation_json(&value) {
            eprintln!("error: could not serialize explanation: {e}");
            std::process::exit(1);
        }
    } else {
        output::print_explanation_text(&value);
    }
}
