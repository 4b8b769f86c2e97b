//! Conformance suite: realistic subject programs from fixtures, plus an
//! accept/reject matrix over the subset surface.

use purefn_compiler::{compile, Compiler};
use purefn_runtime::Value;

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
// Fixture programs
// ============================================================================

#[test]
fn test_pricing_fixture() {
    let source = include_str!("../../../tests/fixtures/pricing.js");
    let price = compile(source).expect("pricing fixture should compile");
    assert_eq!(price.name(), Some("price"));

    let order = object(&[(
        "lines",
        Value::new_array(vec![
            object(&[
                ("qty", Value::Number(2.0)),
                ("unit", Value::Number(30.0)),
                ("kind", Value::string("standard")),
            ]),
            object(&[
                ("qty", Value::Number(1.0)),
                ("unit", Value::Number(50.0)),
                ("kind", Value::string("express")),
            ]),
        ]),
    )]);
    let rates = object(&[("express", Value::Number(0.2))]);

    // 2*30 + 1*50*1.2 = 120, over 100 so discounted to 108.
    let result = price.call(&[order, rates]).unwrap();
    match result {
        Value::Number(n) => assert!((n - 108.0).abs() < 1e-9, "got {}", n),
        other => panic!("expected number, got {}", other.type_name()),
    }
}

#[test]
fn test_validation_fixture() {
    let source = include_str!("../../../tests/fixtures/validation.js");
    let validate = compile(source).expect("validation fixture should compile");

    let good = object(&[
        ("name", Value::string("Widget")),
        ("label", Value::string("blue")),
    ]);
    assert!(matches!(validate.call(&[good]).unwrap(), Value::Bool(true)));

    let bad = object(&[("name", Value::string("Widget"))]);
    assert!(matches!(validate.call(&[bad]).unwrap(), Value::Bool(false)));

    let malformed = object(&[
        ("name", Value::string("Widget")),
        ("label", Value::string("blue 42")),
    ]);
    assert!(matches!(
        validate.call(&[malformed]).unwrap(),
        Value::Bool(false)
    ));
}

// ============================================================================
// Accept/reject matrix
// ============================================================================

#[test]
fn test_accepted_surface() {
    let accepted = [
        "a => a",
        "() => null",
        "() => undefined",
        "(a, b) => a % b",
        "function f() { return [1, 2, 3]; }",
        "function f(a) { return a ? 'yes' : 'no'; }",
        "function f(a) { let t = 0; do { t++; } while (t < a); return t; }",
        "function f(o) { const out = []; for (let k in o) { } return out; }",
        "function f() { const o = { nested: { value: 1 } }; return o.nested.value; }",
        "function f(s) { return s.length > 3 && s.length < 10; }",
        "function f(a = 1, b = 2) { return a + b; }",
        "function f([x, y] = [1, 2]) { return x + y; }",
        "function outer() { function inner() { return 1; } return inner(); }",
    ];
    for source in accepted {
        if let Err(error) = compile(source) {
            panic!("expected {:?} to compile, got {}", source, error);
        }
    }
}

#[test]
fn test_rejected_surface() {
    let rejected = [
        // Free identifiers and ambient globals.
        "() => globalThisAlias",
        "function f() { return document; }",
        "function f() { eval('1'); }",
        // Prototype escapes.
        "o => o.constructor",
        "o => o['constructor']",
        "o => o.__defineGetter__",
        "(o, k) => o[k]",
        "o => o[0]",
        // Self reference.
        "() => this",
        // Reserved guard names.
        "() => { let __ops = 0; return __ops; }",
        // Structure.
        "",
        "let x = 1;",
        "function f() { } function g() { }",
        "42",
    ];
    for source in rejected {
        if compile(source).is_ok() {
            panic!("expected {:?} to be rejected", source);
        }
    }
}

#[test]
fn test_emitted_text_is_reparseable() {
    // The emitter must produce text the evaluator's parser accepts; run the
    // text-level pipeline twice to make sure nothing degrades.
    let compiler = Compiler::new();
    let sources = [
        "a => a",
        "function f({ a, b } = { a: 1, b: 2 }) { while (a) { a--; } return b; }",
        "xs => { let t = 0; for (let x of xs) { t += x; } return t; }",
    ];
    for source in sources {
        let text = compiler.compile_to_text(source).unwrap();
        assert!(
            compile(source).is_ok(),
            "pipeline should instantiate {:?}",
            source
        );
        assert!(!text.is_empty());
    }
}
