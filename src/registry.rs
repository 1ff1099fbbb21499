//! The builtin registry: a `HashMap<String, Builtin>` with
//! overwrite-on-duplicate registration, carrying arity and variadicity
//! alongside the native function.

use std::collections::HashMap;
use std::rc::Rc;

use crate::eval::BuiltinCtx;
use crate::value::Value;

/// `(named args, mutable env handle) → value`. The "mutable
/// env handle" is [`BuiltinCtx`], which also exposes the evaluator
/// callback higher-order builtins (`map`, `filter`, `summarize`, ...) need
/// to invoke a callable argument.
pub type BuiltinFn = fn(args: Vec<(Option<String>, Value)>, ctx: &mut BuiltinCtx) -> Result<Value, Value>;

#[derive(Clone)]
pub struct Builtin {
    pub name: String,
    pub arity: usize,
    pub variadic: bool,
    pub func: BuiltinFn,
}

impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("variadic", &self.variadic)
            .finish()
    }
}

/// Table of name → native function, populated at startup by each package
/// module. Duplicate names overwrite earlier ones.
#[derive(Default)]
pub struct BuiltinRegistry {
    builtins: HashMap<String, Rc<Builtin>>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, arity: usize, variadic: bool, func: BuiltinFn) {
        self.builtins.insert(
            name.to_string(),
            Rc::new(Builtin {
                name: name.to_string(),
                arity,
                variadic,
                func,
            }),
        );
    }

    pub fn get(&self, name: &str) -> Option<Rc<Builtin>> {
        self.builtins.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.builtins.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Rc<Builtin>)> {
        self.builtins.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_args: Vec<(Option<String>, Value)>, _ctx: &mut BuiltinCtx) -> Result<Value, Value> {
        Ok(Value::Null)
    }

    #[test]
    fn duplicate_registration_overwrites() {
        let mut reg = BuiltinRegistry::new();
        reg.register("f", 1, false, noop);
        reg.register("f", 2, true, noop);
        let b = reg.get("f").unwrap();
        assert_eq!(b.arity, 2);
        assert!(b.variadic);
        assert_eq!(reg.names().len(), 1);
    }
}
