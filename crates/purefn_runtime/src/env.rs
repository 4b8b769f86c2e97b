//! Runtime environment chain.
//!
//! One environment per function invocation and per block. The root
//! environment holds exactly the capability binding map, so a callable's
//! free-variable resolution is limited to that map and nothing else.

use crate::error::RuntimeError;
use crate::value::Value;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// A runtime scope: name bindings plus a parent link.
#[derive(Debug)]
pub struct Environment {
    vars: RefCell<FxHashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// The root environment for one callable: the capability bindings.
    pub fn root(bindings: FxHashMap<String, Value>) -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::new(bindings),
            parent: None,
        })
    }

    /// A child environment (function invocation or block entry).
    pub fn child(parent: &Rc<Environment>) -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::new(FxHashMap::default()),
            parent: Some(Rc::clone(parent)),
        })
    }

    /// Declare a name in this environment, shadowing any outer binding.
    pub fn declare(&self, name: &str, value: Value) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }

    /// Look a name up through the chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }

    /// Assign to an existing binding, walking outward to find it.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        if self.vars.borrow().contains_key(name) {
            self.vars.borrow_mut().insert(name.to_string(), value);
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => Err(RuntimeError::Unresolved(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_get() {
        let root = Environment::root(FxHashMap::default());
        root.declare("a", Value::Number(1.0));
        assert!(matches!(root.get("a"), Some(Value::Number(n)) if n == 1.0));
        assert!(root.get("b").is_none());
    }

    #[test]
    fn test_assignment_walks_outward() {
        let root = Environment::root(FxHashMap::default());
        root.declare("x", Value::Number(1.0));
        let inner = Environment::child(&root);
        inner.assign("x", Value::Number(2.0)).unwrap();
        assert!(matches!(root.get("x"), Some(Value::Number(n)) if n == 2.0));
        assert!(inner.assign("missing", Value::Null).is_err());
    }

    #[test]
    fn test_shadowing() {
        let root = Environment::root(FxHashMap::default());
        root.declare("x", Value::Number(1.0));
        let inner = Environment::child(&root);
        inner.declare("x", Value::Number(9.0));
        assert!(matches!(inner.get("x"), Some(Value::Number(n)) if n == 9.0));
        assert!(matches!(root.get("x"), Some(Value::Number(n)) if n == 1.0));
    }
}
