//! User-facing output for the CLI, centralizing `termcolor` rendering
//! (colorized diagnostics and results; `difference`-based diffing lives in
//! [`crate::test_harness`], where mismatched expectations need it).

use std::io::Write as _;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::ast::Span;
use crate::diagnostics::DiagnosticSink;
use crate::value::Value;

/// Writes `:=` overwrite warnings to stdout in yellow.
pub struct StdoutSink {
    stream: StandardStream,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            stream: StandardStream::stdout(ColorChoice::Auto),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticSink for StdoutSink {
    fn warn(&mut self, message: &str, _span: Option<Span>) {
        let _ = self
            .stream
            .set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
        let _ = writeln!(self.stream, "warning: {message}");
        let _ = self.stream.reset();
    }
}

/// Prints a value the way a REPL or `run` would show its final result:
/// errors in red, everything else in the default color.
pub fn print_value(value: &Value) {
    let mut stream = StandardStream::stdout(ColorChoice::Auto);
    if value.is_error() {
        let _ = stream.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
    }
    let _ = writeln!(stream, "{value}");
    let _ = stream.reset();
}

/// `explain --json`: the value's structured explanation,
/// serialized with `serde_json`.
pub fn print_explanation_json(value: &Value) -> Result<(), serde_json::Error> {
    let explanation = value.explain();
    println!("{}", serde_json::to_string_pretty(&explanation)?);
    Ok(())
}

pub fn print_explanation_text(value: &Value) {
    let explanation = value.explain();
    println!("type: {}", explanation.type_name);
    println!("value: {}", explanation.rendered);
    if let Some(code) = &explanation.error_code {
        println!("error_code: {code}");
    }
    for (k, v) in &explanation.context {
        println!("  {k}: {v}");
    }
}
