//! Printer tests: parse a subject program and check the emitted text.

use bumpalo::Bump;
use purefn_core::intern::StringInterner;
use purefn_parser::Parser;
use purefn_printer::{Printer, PrinterOptions};

fn print_compact(source: &str) -> String {
    let arena = Bump::new();
    let mut parser = Parser::new(&arena, StringInterner::new(), "test.js", source);
    let source_file = parser.parse_source_file();
    assert!(!parser.take_diagnostics().has_errors());
    let options = PrinterOptions {
        indent_str: "  ".to_string(),
        new_line: "\n".to_string(),
        trailing_newline: false,
    };
    Printer::with_options(options).print_source_file(&source_file)
}

fn print(source: &str) -> String {
    let arena = Bump::new();
    let mut parser = Parser::new(&arena, StringInterner::new(), "test.js", source);
    let source_file = parser.parse_source_file();
    let diagnostics = parser.take_diagnostics();
    assert!(
        !diagnostics.has_errors(),
        "parse failed: {}",
        diagnostics.first_error().unwrap()
    );
    Printer::new().print_source_file(&source_file)
}

/// Printing, reparsing, and printing again must be a fixed point.
fn assert_stable(source: &str) {
    let first = print(source);
    let second = print(&first);
    assert_eq!(first, second, "print is not stable for {:?}", source);
}

#[test]
fn test_print_function_declaration() {
    let text = print("function add(a,b){return a+b;}");
    assert_eq!(text, "function add(a, b) {\n    return a + b;\n}\n");
}

#[test]
fn test_printer_options() {
    let text = print_compact("function f() { return 1; }");
    assert_eq!(text, "function f() {\n  return 1;\n}");
}

#[test]
fn test_print_variable_kinds() {
    let text = print("function f() { const a = 1; let b; var c = 2, d; }");
    assert!(text.contains("const a = 1;"));
    assert!(text.contains("let b;"));
    assert!(text.contains("var c = 2, d;"));
}

#[test]
fn test_print_binding_patterns() {
    let text = print("function f({ a, b: { c } = {} }, [d, e = 1]) { return c; }");
    assert!(text.contains("{ a, b: { c } = {} }"));
    assert!(text.contains("[d, e = 1]"));
}

#[test]
fn test_print_loops() {
    let text = print(
        "function f(a){ while(a) { a--; } do { a++; } while (a < 0); for(let i=0;i<3;i++){} for(let k in a){} for(let v of a){} }",
    );
    assert!(text.contains("while (a) {"));
    assert!(text.contains("} while (a < 0);"));
    assert!(text.contains("for (let i = 0; i < 3; i++) {}"));
    assert!(text.contains("for (let k in a) {}"));
    assert!(text.contains("for (let v of a) {}"));
}

#[test]
fn test_print_member_and_calls() {
    let text = print(r#"o => o.a["b"].c(1, "x")"#);
    assert!(text.contains(r#"o.a["b"].c(1, "x")"#));
}

#[test]
fn test_print_object_and_array_literals() {
    let text = print(r#"v => ({ a: 1, "b": v, ["c"]: [1, 2, v] })"#);
    assert!(text.contains(r#"{ a: 1, "b": v, ["c"]: [1, 2, v] }"#));
}

#[test]
fn test_print_keeps_explicit_parentheses() {
    let text = print("(a, b) => (a + b) * 2");
    assert!(text.contains("(a + b) * 2"));
}

#[test]
fn test_print_string_escapes() {
    let text = print("() => 'it\\'s\\n'");
    assert!(text.contains(r"'it\'s\n'"));
}

#[test]
fn test_print_conditional_and_unary() {
    let text = print("a => a > 0 ? -a : !a");
    assert!(text.contains("a > 0 ? -a : !a"));
}

#[test]
fn test_print_new_expression() {
    let text = print("p => new RegExp(p)");
    assert!(text.contains("new RegExp(p)"));
}

#[test]
fn test_printing_is_stable() {
    assert_stable("function f(a, b) { return a + b; }");
    assert_stable("({ a } = { a: 1 }) => a");
    assert_stable(
        "function g(xs) {
            let t = 0;
            for (let x of xs) {
                if (x > 0) { t += x; } else { t -= x; }
            }
            return t;
        }",
    );
    assert_stable("p => new Map()");
}
