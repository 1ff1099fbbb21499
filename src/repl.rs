//! The REPL loop: prompt `T> `, continuation prompt `.. `
//! when the last input has unbalanced delimiters or a trailing
//! `|>`/`?|>`. Strict-mode validation is skipped entirely in this mode.
//! A read/accumulate/eval loop with a plain continuation-detection rule.

use std::io::{self, Write};

use crate::cli::output::{print_value, StdoutSink};
use crate::env::Env;
use crate::host::{self, Mode};
use crate::registry::BuiltinRegistry;

pub fn run_repl(registry: &BuiltinRegistry) {
    println!("wrangle REPL");
    println!("Ctrl+D to exit.");

    let mut env = Env::new();
    let mut sink = StdoutSink::new();
    let mut buffer = String::new();

    loop {
        print!("{}", if buffer.is_empty() { "T> " } else { ".. " });
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(line.trim_end_matches('\n'));

                if needs_continuation(&buffer) {
                    continue;
                }

                let (value, next_env) = host::parse_and_eval(Mode::Repl, env, &buffer, registry, &mut sink);
                env = next_env;
                print_value(&value);
                buffer.clear();
            }
            Err(e) => {
                eprintln!("error reading input: {e}");
                break;
            }
        }
    }
}

/// Heuristic continuation check: unbalanced
/// `()`/`[]`/`{}`, or a line ending in `|>`/`?|>` inviting the next line
/// to continue the pipe.
fn needs_continuation(buffer: &str) -> bool {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut chars = buffer.chars().peekable();
    while let Some(c) = chars.next() {
        if in_string {
            match c {
                '\\' => {
                    chars.next();
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
    }
    if depth > 0 || in_string {
        return true;
    }
    let trimmed = buffer.trim_end();
    trimmed.ends_with("|>") || trimmed.ends_with("?|>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbalanced_paren_requires_continuation() {
        assert!(needs_continuation("f(1, 2"));
    }

    #[test]
    fn balanced_expression_does_not_require_continuation() {
        assert!(!needs_continuation("f(1, 2)"));
    }

    #[test]
    fn trailing_pipe_requires_continuation() {
        assert!(needs_continuation("x |>"));
        assert!(needs_continuation("x ?|>"));
    }

    #[test]
    fn open_string_requires_continuation() {
        assert!(needs_continuation("\"unterminated"));
    }
}
