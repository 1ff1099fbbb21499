//! Command-line arguments, `clap`-derived, covering the subcommands a
//! demonstration host wires over the evaluator: `repl`, `run`, `explain`,
//! and `test`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "wrangle",
    version,
    about = "An R/dplyr-flavored expression language interpreter core."
)]
pub struct WrangleArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// repl (interactive, skips strict validation) or strict (the default
    /// for `run`).
    #[arg(long, value_enum, global = true)]
    pub mode: Option<ModeArg>,

    /// Bypasses `run`'s default strict-mode validation gate, as if `--mode
    /// repl` had been passed. Has no effect on `repl`/`explain`/`test`,
    /// which never strict-validate.
    #[arg(long, global = true)]
    pub r#unsafe: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Repl,
    Strict,
}

impl From<ModeArg> for crate::host::Mode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Repl => crate::host::Mode::Repl,
            ModeArg::Strict => crate::host::Mode::Strict,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive line reader (the default when no subcommand is given).
    Repl,
    /// Execute a file. Scripts default to strict mode.
    Run {
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Evaluate an expression and show its structured explanation.
    Explain {
        expr: String,
        #[arg(long)]
        json: bool,
    },
    /// Run YAML test-suite manifests under a directory.
    Test {
        #[arg(default_value = "tests/suites")]
        root: PathBuf,
        /// Case-insensitive substring filter on test case names.
        #[arg(long)]
        filter: Option<String>,
    },
}
