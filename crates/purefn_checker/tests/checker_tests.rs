//! Validating tree walker tests.
//!
//! The static half of the sandbox contract: every path to an unauthorized
//! binding must be rejected at compile time, while ordinary control flow
//! keeps working.

use bumpalo::Bump;
use purefn_checker::Checker;
use purefn_core::intern::StringInterner;
use purefn_diagnostics::CompileError;
use purefn_parser::Parser;

/// Parse and validate one subject source.
fn check(source: &str) -> Result<(), CompileError> {
    let arena = Bump::new();
    let mut parser = Parser::new(&arena, StringInterner::new(), "subject.js", source);
    let source_file = parser.parse_source_file();
    let diagnostics = parser.take_diagnostics();
    assert!(
        !diagnostics.has_errors(),
        "unexpected parse failure for {:?}: {}",
        source,
        diagnostics.first_error().unwrap()
    );
    Checker::new().check_source_file(&source_file)
}

fn assert_scope_error(source: &str) {
    match check(source) {
        Err(CompileError::Scope(_)) => {}
        other => panic!("expected scope error for {:?}, got {:?}", source, other),
    }
}

fn assert_capability_error(source: &str) {
    match check(source) {
        Err(CompileError::Capability(_)) => {}
        other => panic!("expected capability error for {:?}, got {:?}", source, other),
    }
}

fn assert_structure_error(source: &str) {
    match check(source) {
        Err(CompileError::Structure(_)) => {}
        other => panic!("expected structure error for {:?}, got {:?}", source, other),
    }
}

fn assert_ok(source: &str) {
    if let Err(error) = check(source) {
        panic!("expected {:?} to validate, got {}", source, error);
    }
}

// ============================================================================
// Structural validity
// ============================================================================

#[test]
fn test_rejects_empty_source() {
    assert_structure_error("");
    assert_structure_error(";");
}

#[test]
fn test_rejects_multiple_statements() {
    assert_structure_error("function f() { } function g() { }");
    assert_structure_error("let evil = 1; a => a");
}

#[test]
fn test_rejects_non_function_top_level() {
    assert_structure_error("let x = 1;");
    assert_structure_error("1 + 1");
    assert_structure_error("while (true) { }");
}

#[test]
fn test_accepts_each_function_form() {
    assert_ok("function f(a) { return a; }");
    assert_ok("function (a) { return a; }");
    assert_ok("(function named(a) { return a; })");
    assert_ok("a => a");
    assert_ok("(a, b) => a + b");
    assert_ok("function f() { } ;");
}

// ============================================================================
// Scope resolution
// ============================================================================

#[test]
fn test_rejects_ambient_globals() {
    assert_scope_error("function f() { return window; }");
    assert_scope_error("function f() { return global; }");
    assert_scope_error("function f() { return x; }");
    assert_scope_error("function f() { return Object; }");
    assert_scope_error("function f() { return Array; }");
    assert_scope_error("function f() { return Function; }");
    assert_scope_error("function f() { return Prototype; }");
}

#[test]
fn test_block_scoped_names_do_not_escape() {
    // `x` is declared inside the while block, so the later assignment is a
    // free identifier.
    assert_scope_error(
        "function biff(fizz) { const foo = fizz; while(false){let x = 5;} x = 99; return foo; }",
    );
}

#[test]
fn test_scope_chain_reaches_outward() {
    assert_ok(
        "function biff(fizz) {
            const foo = fizz;
            while (false) {
                let x = 5;
                while (false) { x = 19; }
            }
            biff();
            return foo;
        }",
    );
}

#[test]
fn test_sibling_scopes_are_isolated() {
    assert_scope_error(
        "function f(c) {
            if (c) { let a = 1; } else { a = 2; }
            return 0;
        }",
    );
}

#[test]
fn test_binding_element_cannot_reference_itself() {
    assert_scope_error("function ({ a } = a) { return a }");
    assert_scope_error("({ a } = a) => a");
}

#[test]
fn test_parameter_default_cannot_reference_sibling() {
    assert_scope_error("function (a, b = a) { return b }");
}

#[test]
fn test_object_default_does_not_imply_bindings() {
    // The default object's property names are labels, not declarations.
    assert_scope_error("function (a = { j: 100 }) { return j }");
}

#[test]
fn test_parameter_default_sees_enclosing_declarations() {
    assert_ok(
        "function f() {
            let base = 10;
            const g = (n = base) => n;
            return g();
        }",
    );
}

#[test]
fn test_whitelisted_bindings_resolve() {
    assert_ok("a => JSON.stringify(a)");
    assert_ok("() => now()");
    assert_ok("(o, k) => getProp(o, k)");
    assert_ok("(o, k, v) => setProp(o, k, v)");
    assert_ok("o => keysOf(o)");
    assert_ok("(o, k) => deleteProp(o, k)");
    assert_ok("p => new RegExp(p)");
    assert_ok("() => new Map()");
    assert_ok("() => new Set()");
}

#[test]
fn test_shorthand_object_property_reads_scope() {
    assert_ok("a => ({ a })");
    assert_scope_error("() => ({ missing })");
}

#[test]
fn test_function_declarations_can_recurse() {
    assert_ok("function f(n) { if (n) { return f(n - 1); } return 0; }");
    assert_ok("(function g(n) { return n ? g(n - 1) : 0; })");
}

#[test]
fn test_loop_head_declarations_are_visible_in_body() {
    assert_ok("function f(xs) { let t = 0; for (let i = 0; i < 3; i++) { t += i; } return t; }");
    assert_ok("function f(o) { let t = 0; for (let k in o) { t = t + k; } return t; }");
    assert_ok("function f(xs) { let t = 0; for (let x of xs) { t += x; } return t; }");
}

// ============================================================================
// Capability checks
// ============================================================================

#[test]
fn test_rejects_this_everywhere() {
    assert_capability_error("function f() { return this; }");
    assert_capability_error("() => this");
    assert_capability_error("function f(a) { let o = { v: 1 }; return a ? this : o; }");
}

#[test]
fn test_rejects_structural_property_names() {
    assert_capability_error("o => o.hasOwnProperty");
    assert_capability_error("o => o.toString()");
    assert_capability_error("o => o.valueOf");
    assert_capability_error("o => o.isPrototypeOf");
}

#[test]
fn test_rejects_denied_property_names() {
    assert_capability_error("o => o.constructor");
    assert_capability_error("o => o.prototype");
    assert_capability_error("o => o.eval");
}

#[test]
fn test_rejects_denied_literal_element_keys() {
    assert_capability_error(r#"o => o["constructor"]"#);
    assert_capability_error(r#"o => o["__proto__"]"#);
}

#[test]
fn test_allows_harmless_property_names() {
    assert_ok("o => o.price");
    assert_ok("o => o.length");
    assert_ok(r#"o => o["price"]"#);
    assert_ok("o => o.items.value");
}

#[test]
fn test_rejects_non_static_element_access() {
    assert_capability_error("(o, k) => o[k]");
    assert_capability_error("o => o[0]");
    assert_capability_error(r#"o => o["a" + "b"]"#);
    assert_capability_error("(o, k) => o[k] = 1");
}

#[test]
fn test_computed_property_names_in_literals() {
    assert_ok(r#"v => ({ ["price"]: v })"#);
    assert_capability_error(r#"v => ({ ["constructor"]: v })"#);
    assert_capability_error("(v, k) => ({ [k]: v })");
}

#[test]
fn test_property_assignment_keys_are_labels() {
    // Writing a label is fine; reading it back through member access is what
    // the policy gates.
    assert_ok("v => ({ constructor: v })");
    assert_capability_error("v => ({ constructor: v }).constructor");
}

#[test]
fn test_reserved_names_cannot_be_declared_or_read() {
    assert_capability_error("() => { let __ops = 5; return __ops; }");
    assert_capability_error("() => __guard()");
    assert_capability_error("function f(__x) { return __x; }");
}

#[test]
fn test_shadowing_whitelisted_name_gains_nothing() {
    // Shadowing itself is an ordinary declaration; the policy still blocks
    // every route from the shadow to dynamic code.
    assert_ok("function f() { let JSON = 1; return JSON; }");
    assert_capability_error(
        "function f() {
            for (let i = 0; i < 1; i++) {
                let RegExp = keysOf;
                RegExp = RegExp[\"constructor\"];
                RegExp(\"return 1\")();
            }
            return 0;
        }",
    );
    assert_capability_error(
        "function f(c) {
            if (c) {
                let Map = c;
                return Map.constructor;
            }
            return 0;
        }",
    );
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_diagnostic_carries_span_and_breadcrumb() {
    let error = check("function f() { while (true) { return window; } }").unwrap_err();
    let diagnostic = error.diagnostic();
    assert!(diagnostic.span.is_some());
    assert!(diagnostic.trail.first() == Some(&"SourceFile"));
    assert!(diagnostic.trail.contains(&"WhileStatement"));
    assert!(diagnostic.trail.last() == Some(&"Identifier"));
    let rendered = diagnostic.to_string();
    assert!(rendered.contains("window"));
    assert!(rendered.contains(">"));
}

#[test]
fn test_fail_fast_reports_first_violation() {
    // Both `alpha` and `beta` are free; the walk stops at the first.
    let error = check("function f() { alpha; beta; }").unwrap_err();
    assert!(error.diagnostic().message_text.contains("alpha"));
}
