//! The environment. A persistent, ordered mapping from name to value,
//! built on `im::HashMap` for structural sharing: "mutating" a binding
//! produces a new `Env`; a lambda's captured `Env` is an independent
//! snapshot unaffected by later rebinds in the defining scope.

use im::HashMap;

use crate::error;
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct Env {
    bindings: HashMap<String, Value>,
}

impl Env {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    pub fn find(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Unconditional bind, used internally once first-assign/overwrite
    /// semantics have already been checked by the caller (`eval.rs`), and
    /// for parameter binding on lambda call where shadowing is expected.
    pub fn bind(&self, name: &str, value: Value) -> Env {
        Env {
            bindings: self.bindings.update(name.to_string(), value),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    /// `name = expr`: succeeds only if `name` is unbound.
    pub fn first_assign(&self, name: &str, value: Value) -> Result<Env, Value> {
        if self.is_bound(name) {
            return Err(error::name_error(
                format!(
                    "Cannot reassign immutable variable '{name}'. Use ':=' to overwrite."
                ),
                None,
            ));
        }
        Ok(self.bind(name, value))
    }

    /// `name := expr`: succeeds only if `name` is already
    /// bound. The caller (`eval.rs`) is responsible for emitting the
    /// overwrite warning to the diagnostic stream on success.
    pub fn overwrite(&self, name: &str, value: Value) -> Result<Env, Value> {
        if !self.is_bound(name) {
            return Err(error::name_error(
                format!(
                    "Cannot overwrite '{name}': variable not defined. Use '=' for first assignment."
                ),
                None,
            ));
        }
        Ok(self.bind(name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_assign_then_rebind_fails() {
        let env = Env::new();
        let env = env.first_assign("x", Value::Int(1)).unwrap();
        let err = env.first_assign("x", Value::Int(2)).unwrap_err();
        assert!(err.is_error());
        assert_eq!(env.find("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn overwrite_requires_existing_binding() {
        let env = Env::new();
        assert!(env.overwrite("x", Value::Int(1)).is_err());
        let env = env.first_assign("x", Value::Int(1)).unwrap();
        let env = env.overwrite("x", Value::Int(2)).unwrap();
        assert_eq!(env.find("x"), Some(&Value::Int(2)));
    }

    #[test]
    fn older_env_snapshot_unaffected_by_later_bind() {
        let env1 = Env::new().first_assign("n", Value::Int(10)).unwrap();
        let env2 = env1.overwrite("n", Value::Int(99)).unwrap();
        assert_eq!(env1.find("n"), Some(&Value::Int(10)));
        assert_eq!(env2.find("n"), Some(&Value::Int(99)));
    }
}
