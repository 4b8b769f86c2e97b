//! purefn_runtime: The evaluator collaborator.
//!
//! Turns emitted source text plus a capability binding map into a live
//! callable whose free-variable resolution is limited exactly to that map.
//! This is the pipeline's sole dependency on a scripting runtime and is
//! deliberately replaceable: anything implementing [`Engine`] can stand in.
//!
//! Also home to the capability bindings themselves, including the four
//! property accessors that re-validate keys at call time.

mod capabilities;
mod env;
mod error;
mod interp;
mod program;
mod value;

pub use capabilities::{capability_bindings, Bindings, LIMIT_BINDING_NAME};
pub use error::RuntimeError;
pub use interp::{SandboxedFunction, MAX_CALL_DEPTH};
pub use value::{NativeArity, NativeFunction, Value};

use crate::env::Environment;
use crate::value::Closure;
use bumpalo::Bump;
use purefn_core::intern::StringInterner;
use purefn_parser::Parser;
use std::rc::Rc;

/// Terminal dynamic execution, as a replaceable external capability with the
/// single operation `instantiate(text, bindings) -> callable`.
pub trait Engine {
    fn instantiate(
        &self,
        source: &str,
        bindings: Bindings,
    ) -> Result<SandboxedFunction, RuntimeError>;
}

/// The built-in tree-walking evaluator.
#[derive(Debug, Default)]
pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Self
    }
}

impl Engine for Interpreter {
    fn instantiate(
        &self,
        source: &str,
        bindings: Bindings,
    ) -> Result<SandboxedFunction, RuntimeError> {
        let arena = Bump::new();
        let interner = StringInterner::new();
        let mut parser = Parser::new(&arena, interner, "compiled.js", source);
        let source_file = parser.parse_source_file();
        let diagnostics = parser.take_diagnostics();
        if let Some(error) = diagnostics.first_error() {
            return Err(RuntimeError::Internal(format!(
                "emitted text failed to parse: {}",
                error
            )));
        }

        let lowered = program::lower_function(&source_file)?;
        let globals = Environment::root(bindings);
        let closure = Rc::new(Closure {
            name: lowered.name,
            params: lowered.params,
            body: lowered.body,
            env: globals,
        });
        Ok(SandboxedFunction::new(closure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instantiate(source: &str) -> SandboxedFunction {
        Interpreter::new()
            .instantiate(source, capability_bindings())
            .expect("instantiate")
    }

    #[test]
    fn test_identity_function() {
        let f = instantiate("a => a");
        let result = f.call(&[Value::Number(1.0)]).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 1.0));
        assert_eq!(f.arity(), 1);
    }

    #[test]
    fn test_named_function_recursion() {
        let f = instantiate(
            "function fact(n) { if (n <= 1) { return 1; } return n * fact(n - 1); }",
        );
        let result = f.call(&[Value::Number(5.0)]).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 120.0));
        assert_eq!(f.name(), Some("fact"));
    }

    #[test]
    fn test_destructured_defaults() {
        let f = instantiate(
            "function add({ a, b } = { a: 100, b: 100 }) { return a + b; }",
        );
        let result = f.call(&[]).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 200.0));
    }

    #[test]
    fn test_loops_and_closures() {
        let f = instantiate(
            "function run() {
                let total = 0;
                for (let i = 0; i < 5; i++) { total += i; }
                let bump = () => { total += 90; };
                bump();
                return total;
            }",
        );
        let result = f.call(&[]).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 100.0));
    }

    #[test]
    fn test_for_of_and_for_in() {
        let f = instantiate(
            "function sum(items) {
                let total = 0;
                for (let item of items) { total += item; }
                for (let key in { a: 1, b: 2 }) { total += key.length; }
                return total;
            }",
        );
        let items = Value::new_array(vec![Value::Number(1.0), Value::Number(2.0)]);
        let result = f.call(&[items]).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 5.0));
    }

    #[test]
    fn test_throw_surfaces_as_error() {
        let f = instantiate("function boom() { throw 'nope'; }");
        let err = f.call(&[]).unwrap_err();
        assert!(matches!(err, RuntimeError::Thrown(_)));
    }

    #[test]
    fn test_call_depth_is_bounded() {
        let f = instantiate("function spin() { return spin(); }");
        let err = f.call(&[]).unwrap_err();
        assert!(matches!(err, RuntimeError::CallDepth));
    }

    #[test]
    fn test_missing_arguments_are_undefined() {
        let f = instantiate("(a, b) => a === undefined && b === undefined");
        let result = f.call(&[]).unwrap();
        assert!(matches!(result, Value::Bool(true)));
    }

    #[test]
    fn test_free_variables_limited_to_bindings() {
        let interpreter = Interpreter::new();
        let f = interpreter
            .instantiate("() => now()", Bindings::default())
            .unwrap();
        // `now` exists in the full capability map but not in this one.
        assert!(matches!(f.call(&[]), Err(RuntimeError::Unresolved(_))));
    }
}
