//! purefn_parser: Recursive descent parser for the subject language.
//!
//! Parses token streams from the scanner into an arena-allocated AST. This is
//! the Parser collaborator of the sandboxing pipeline: it exposes node
//! category, source position, and ordered child enumeration, and knows
//! nothing about capabilities or scopes.

mod parser;
mod precedence;

pub use parser::Parser;
