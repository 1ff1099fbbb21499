//! The dataframe extension point. The core never
//! constructs a dataframe — it only stores the handle, forwards it to
//! verbs registered through [`crate::registry::BuiltinRegistry`], and
//! dot-accesses it. A concrete tabular backend lives entirely outside this
//! crate and implements [`DataFrameHandle`].

use crate::value::Value;

pub trait DataFrameHandle: std::fmt::Debug {
    /// A column as a vector-shaped `Value` (typically `Value::List`), or
    /// `None` if `name` isn't a column of this frame.
    fn column(&self, name: &str) -> Option<Value>;

    fn columns(&self) -> Vec<String>;

    /// The compound-prefix lookup used by partial-prefix dot access:
    /// does any column begin with `prefix + "."`?
    fn has_compound_prefix(&self, prefix: &str) -> bool {
        self.columns().iter().any(|c| c.starts_with(&format!("{prefix}.")))
    }
}

/// A zero-column test double, used by the core's own tests so `eval.rs`
/// and `frame.rs` have something concrete to dot-access without pulling in
/// a real tabular backend.
#[derive(Debug, Default)]
pub struct NullFrame;

impl DataFrameHandle for NullFrame {
    fn column(&self, _name: &str) -> Option<Value> {
        None
    }

    fn columns(&self) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_frame_has_no_columns() {
        let frame = NullFrame;
        assert_eq!(frame.columns(), Vec::<String>::new());
        assert_eq!(frame.column("x"), None);
        assert!(!frame.has_compound_prefix("x"));
    }
}
