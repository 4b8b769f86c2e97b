//! Guard injection tests: parse, transform, print, and inspect the emitted
//! text.

use bumpalo::Bump;
use purefn_core::intern::StringInterner;
use purefn_parser::Parser;
use purefn_printer::Printer;
use purefn_transformers::{GuardInjector, CHECK_NAME, COUNTER_NAME, ITERATION_LIMIT};

fn transform(source: &str) -> String {
    let arena = Bump::new();
    let interner = StringInterner::new();
    let mut parser = Parser::new(&arena, interner.clone(), "test.js", source);
    let source_file = parser.parse_source_file();
    let diagnostics = parser.take_diagnostics();
    assert!(
        !diagnostics.has_errors(),
        "parse failed: {}",
        diagnostics.first_error().unwrap()
    );
    let injector = GuardInjector::new(&arena, interner);
    let transformed = injector.transform_source_file(&source_file);
    Printer::new().print_source_file(&transformed)
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[test]
fn test_top_level_body_declares_counter_and_check() {
    let text = transform("function f(a) { return a; }");
    assert!(text.contains(&format!("let {} = 0;", COUNTER_NAME)));
    assert!(text.contains(&format!("const {} = ", CHECK_NAME)));
    assert!(text.contains(&format!("{} > {}", COUNTER_NAME, ITERATION_LIMIT)));
    // The counter lives inside the function body, so each invocation resets.
    let body_start = text.find('{').unwrap();
    let counter_pos = text.find(&format!("let {}", COUNTER_NAME)).unwrap();
    assert!(counter_pos > body_start);
}

#[test]
fn test_counter_is_declared_exactly_once() {
    let text = transform(
        "function f(a) {
            while (a) { a = a - 1; }
            const g = () => { for (let i = 0; i < a; i++) { a += i; } };
            g();
            return a;
        }",
    );
    assert_eq!(count_occurrences(&text, &format!("let {} = 0;", COUNTER_NAME)), 1);
    assert_eq!(count_occurrences(&text, &format!("const {} = ", CHECK_NAME)), 1);
}

#[test]
fn test_every_loop_body_starts_with_the_check() {
    let text = transform(
        "function f(a) {
            while (a) { a = a - 1; }
            do { a = a + 1; } while (a < 0);
            for (let i = 0; i < 3; i++) { a += i; }
            for (let k in a) { a += 1; }
            for (let v of a) { a += v; }
            return a;
        }",
    );
    // One call per loop body, one per function body.
    assert_eq!(count_occurrences(&text, &format!("{}();", CHECK_NAME)), 6);
}

#[test]
fn test_single_statement_loop_body_becomes_a_block() {
    let text = transform("function f(a) { while (a) a = a - 1; return a; }");
    assert!(text.contains(&format!("while (a) {{\n        {}();", CHECK_NAME)));
}

#[test]
fn test_nested_functions_share_the_counter() {
    let text = transform(
        "function f(a) {
            const inner = function (b) { return b; };
            const lambda = (c) => { return c; };
            return inner(a) + lambda(a);
        }",
    );
    // Three guarded bodies, one counter declaration.
    assert_eq!(count_occurrences(&text, &format!("{}();", CHECK_NAME)), 3);
    assert_eq!(count_occurrences(&text, &format!("let {} = 0;", COUNTER_NAME)), 1);
}

#[test]
fn test_arrow_expression_body_produces_value() {
    let text = transform("a => a + 1");
    assert!(text.contains(&format!("{}();", CHECK_NAME)));
    assert!(text.contains("return a + 1;"));
}

#[test]
fn test_nested_arrow_expression_bodies() {
    let text = transform("a => b => a + b");
    // Both the outer and inner arrows become guarded block bodies.
    assert_eq!(count_occurrences(&text, &format!("{}();", CHECK_NAME)), 2);
    assert_eq!(count_occurrences(&text, "return"), 2);
}

#[test]
fn test_parenthesized_function_expression_is_top_level() {
    let text = transform("(function pricer(a) { return a * 2; })");
    assert!(text.contains(&format!("let {} = 0;", COUNTER_NAME)));
    assert!(text.starts_with("(function pricer"));
}

#[test]
fn test_transform_preserves_subject_logic() {
    let text = transform(
        "function f({ a, b } = { a: 1, b: 2 }) { return a < b ? a : b; }",
    );
    assert!(text.contains("{ a, b } = { a: 1, b: 2 }"));
    assert!(text.contains("return a < b ? a : b;"));
}

#[test]
fn test_guard_calls_precede_subject_statements() {
    let text = transform("function f(a) { while (true) { a += 1; } }");
    let guard_in_loop = text
        .find("while (true)")
        .map(|i| text[i..].find(&format!("{}();", CHECK_NAME)).unwrap() + i)
        .unwrap();
    let increment = text.find("a += 1;").unwrap();
    assert!(guard_in_loop < increment);
}

#[test]
fn test_defaults_with_function_values_are_guarded() {
    let text = transform("function f(g = (x) => { return x; }) { return g(1); }");
    // The default's arrow body is a function body like any other.
    assert_eq!(count_occurrences(&text, &format!("{}();", CHECK_NAME)), 2);
}
