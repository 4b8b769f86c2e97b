//! End-to-end pipeline tests: untrusted source text in, live callable out.

use purefn_compiler::{compile, Error};
use purefn_diagnostics::CompileError;
use purefn_runtime::{RuntimeError, SandboxedFunction, Value};

fn compiled(source: &str) -> SandboxedFunction {
    compile(source).expect("compilation should succeed")
}

fn number(value: Value) -> f64 {
    match value {
        Value::Number(n) => n,
        other => panic!("expected number, got {}", other.type_name()),
    }
}

fn object(pairs: &[(&str, Value)]) -> Value {
    let object = Value::new_object();
    if let Value::Object(ref map) = object {
        for (key, value) in pairs {
            map.borrow_mut().insert(key.to_string(), value.clone());
        }
    }
    object
}

// ============================================================================
// Correctness
// ============================================================================

#[test]
fn test_identity_function() {
    let f = compiled("a => a");
    assert_eq!(number(f.call(&[Value::Number(1.0)]).unwrap()), 1.0);
}

#[test]
fn test_combined_control_flow_is_deterministic() {
    // Destructured parameter with an object-literal default, a while/break
    // loop, a counting for loop, and a nested closure invoked once.
    let f = compiled(
        "function veryComplexFunction({ a, b } = { a: 100, b: 100 }, c) {
            const d = a + b;
            let f;
            while (true) {
                let e = d + a + b;
                f = e;
                break;
            }
            for (let i = 0; i <= 1; i++) {
                f += i;
            }
            c = () => {
                let r = 99;
                f += r;
            };
            c();

            return f;
        }",
    );
    assert_eq!(number(f.call(&[]).unwrap()), (100 * 4 + 1 + 99) as f64);
    // The guard state is per invocation; the result must not drift.
    assert_eq!(number(f.call(&[]).unwrap()), 500.0);
}

#[test]
fn test_callable_mirrors_subject_signature() {
    let f = compiled("function scale(value, factor) { return value * factor; }");
    assert_eq!(f.name(), Some("scale"));
    assert_eq!(f.arity(), 2);
    assert_eq!(
        number(f.call(&[Value::Number(3.0), Value::Number(4.0)]).unwrap()),
        12.0
    );
}

#[test]
fn test_recursion_through_nested_closure() {
    let f = compiled(
        "function run(n) {
            const fact = (k) => {
                if (k <= 1) { return 1; }
                return k * fact(k - 1);
            };
            return fact(n);
        }",
    );
    assert_eq!(number(f.call(&[Value::Number(6.0)]).unwrap()), 720.0);
}

// ============================================================================
// Iteration guard
// ============================================================================

#[test]
fn test_unconditioned_infinite_loop_raises_iteration_limit() {
    let f = compiled("function spin() { while (true) { } }");
    assert!(matches!(f.call(&[]), Err(RuntimeError::IterationLimit)));
}

#[test]
fn test_infinite_recursion_through_closure_raises_iteration_limit() {
    let f = compiled(
        "function run() {
            const again = () => again();
            return again();
        }",
    );
    // Either bound may fire first, but the call must fail, not hang.
    match f.call(&[]) {
        Err(RuntimeError::IterationLimit) | Err(RuntimeError::CallDepth) => {}
        other => panic!("expected a bounded failure, got {:?}", other.map(|v| v.display_string())),
    }
}

#[test]
fn test_ceiling_bounds_the_sum_of_all_loops() {
    // Each loop alone stays under the ceiling; together they exceed it.
    let f = compiled(
        "function churn() {
            let t = 0;
            for (let i = 0; i < 600000; i++) { t += 1; }
            for (let j = 0; j < 600000; j++) { t += 1; }
            return t;
        }",
    );
    assert!(matches!(f.call(&[]), Err(RuntimeError::IterationLimit)));
}

#[test]
fn test_counter_resets_between_invocations() {
    let f = compiled(
        "function walk(n) {
            let t = 0;
            for (let i = 0; i < n; i++) { t += 1; }
            return t;
        }",
    );
    // Three calls, each under the ceiling. A counter shared across calls
    // would trip on the third.
    for _ in 0..3 {
        assert_eq!(number(f.call(&[Value::Number(400_000.0)]).unwrap()), 400_000.0);
    }
}

#[test]
fn test_failed_invocation_does_not_poison_the_callable() {
    let f = compiled(
        "function run(bad) {
            if (bad) { while (true) { } }
            return 7;
        }",
    );
    assert!(matches!(f.call(&[Value::Bool(true)]), Err(RuntimeError::IterationLimit)));
    assert_eq!(number(f.call(&[Value::Bool(false)]).unwrap()), 7.0);
}

// ============================================================================
// Capabilities at run time
// ============================================================================

#[test]
fn test_accessors_reject_runtime_keys() {
    // The key arrives as a parameter, invisible to the static walk.
    let f = compiled("(o, k) => getProp(o, k)");
    let target = object(&[("price", Value::Number(2.0))]);

    let allowed = f
        .call(&[target.clone(), Value::string("price")])
        .unwrap();
    assert_eq!(number(allowed), 2.0);

    for key in ["constructor", "__proto__", "hasOwnProperty", "toString"] {
        let err = f
            .call(&[target.clone(), Value::string(key)])
            .unwrap_err();
        assert!(
            matches!(err, RuntimeError::ForbiddenKey { .. }),
            "key {:?} should be rejected",
            key
        );
    }
}

#[test]
fn test_set_and_delete_accessors_reject_runtime_keys() {
    let setter = compiled("(o, k, v) => setProp(o, k, v)");
    let deleter = compiled("(o, k) => deleteProp(o, k)");
    let target = object(&[]);

    setter
        .call(&[target.clone(), Value::string("total"), Value::Number(5.0)])
        .unwrap();
    assert!(matches!(
        setter.call(&[target.clone(), Value::string("__proto__"), Value::Null]),
        Err(RuntimeError::ForbiddenKey { .. })
    ));
    assert!(matches!(
        deleter.call(&[target.clone(), Value::string("constructor")]),
        Err(RuntimeError::ForbiddenKey { .. })
    ));
    assert!(matches!(
        deleter.call(&[target, Value::string("total")]),
        Ok(Value::Bool(true))
    ));
}

#[test]
fn test_enumeration_returns_only_policy_clean_keys() {
    let f = compiled("o => keysOf(o)");
    let target = object(&[
        ("price", Value::Number(1.0)),
        ("toString", Value::Null),
        ("label", Value::Null),
    ]);
    let keys = f.call(&[target]).unwrap();
    match keys {
        Value::Array(items) => {
            let names: Vec<String> = items.borrow().iter().map(|v| v.display_string()).collect();
            assert_eq!(names, vec!["price", "label"]);
        }
        other => panic!("expected array, got {}", other.type_name()),
    }
}

#[test]
fn test_collections_and_json_capabilities() {
    let f = compiled(
        "function tally(items) {
            const seen = new Set();
            const counts = new Map();
            for (let item of items) {
                seen.add(item);
                counts.set(item, (counts.get(item) ?? 0) + 1);
            }
            return JSON.stringify({ kinds: seen.size(), total: items.length });
        }",
    );
    let items = Value::new_array(vec![
        Value::string("a"),
        Value::string("b"),
        Value::string("a"),
    ]);
    let result = f.call(&[items]).unwrap();
    assert_eq!(result.display_string(), r#"{"kinds":2.0,"total":3.0}"#);
}

#[test]
fn test_clock_capability() {
    let f = compiled("() => now()");
    let value = number(f.call(&[]).unwrap());
    assert!(value > 0.0);
}

#[test]
fn test_subject_throw_is_contained() {
    let f = compiled("v => { if (v < 0) { throw 'negative'; } return v; }");
    assert_eq!(number(f.call(&[Value::Number(2.0)]).unwrap()), 2.0);
    match f.call(&[Value::Number(-1.0)]) {
        Err(RuntimeError::Thrown(value)) => assert_eq!(value.display_string(), "negative"),
        other => panic!("expected thrown value, got {:?}", other.map(|v| v.display_string())),
    }
}

// ============================================================================
// Rejections, end to end
// ============================================================================

fn compile_error(source: &str) -> CompileError {
    match compile(source) {
        Err(Error::Compile(error)) => error,
        Ok(_) => panic!("expected {:?} to be rejected", source),
        Err(other) => panic!("expected compile error for {:?}, got {}", source, other),
    }
}

#[test]
fn test_rejects_free_identifiers() {
    assert!(matches!(
        compile_error("function f() { return process; }"),
        CompileError::Scope(_)
    ));
}

#[test]
fn test_rejects_self_referencing_destructured_default() {
    assert!(matches!(
        compile_error("({ a } = a) => a"),
        CompileError::Scope(_)
    ));
}

#[test]
fn test_rejects_self_reference_keyword() {
    assert!(matches!(
        compile_error("function f() { return this; }"),
        CompileError::Capability(_)
    ));
}

#[test]
fn test_rejects_dynamic_member_access() {
    assert!(matches!(
        compile_error("(o, k) => o[k]"),
        CompileError::Capability(_)
    ));
}

#[test]
fn test_rejects_whitelist_shadow_reaching_for_dynamic_code() {
    let source = "function f() {
        for (let i = 0; i < 1; i++) {
            let RegExp = keysOf;
            RegExp = RegExp[\"constructor\"];
            RegExp(\"while(true){}\")();
        }
        return 0;
    }";
    assert!(matches!(compile_error(source), CompileError::Capability(_)));
}

#[test]
fn test_rejects_multiple_statements() {
    assert!(matches!(
        compile_error("let a = 1; a => a"),
        CompileError::Structure(_)
    ));
}

#[test]
fn test_rejects_unparseable_source() {
    assert!(matches!(
        compile_error("function f( { return"),
        CompileError::Parse(_)
    ));
}
