// File: src/interpreter/environment.rs
//
// Lexical scopes of one function activation. Each call gets a fresh
// Environment, so a function only ever sees its own parameters and locals.

use super::value::Value;
use ahash::AHashMap;

/// A stack of scopes searched from the innermost outward
#[derive(Clone, Debug)]
pub struct Environment {
    scopes: Vec<AHashMap<String, Value>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment { scopes: vec![AHashMap::new()] }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(AHashMap::new());
    }

    /// The outermost scope holds the parameters and is never popped
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn define(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    /// Overwrite the nearest binding; false when the name is not bound
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.scopes.iter_mut().rev().find_map(|scope| scope.get_mut(name)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_scopes_shadow_and_unwind() {
        let mut env = Environment::new();
        env.define("x", Value::Int(10));
        env.push_scope();
        env.define("x", Value::Int(20));
        assert_eq!(env.get("x"), Some(&Value::Int(20)));
        assert!(env.set("x", Value::Int(21)));
        env.pop_scope();
        assert_eq!(env.get("x"), Some(&Value::Int(10)));
        assert!(!env.set("y", Value::Int(1)));
        env.pop_scope();
        assert_eq!(env.get("x"), Some(&Value::Int(10)));
    }
}
