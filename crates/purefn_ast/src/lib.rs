//! purefn_ast: Syntax tree definitions for the sandboxed subject language.
//!
//! The subject language is a small, dynamically-typed, C-family scripting
//! subset: functions, arrows, destructuring, loops, literals, member access.
//! Nodes reference child nodes via arena-allocated references and carry their
//! source range so every rejection can point at the offending text.

pub mod node;
pub mod syntax_kind;
pub mod types;

pub use syntax_kind::SyntaxKind;
