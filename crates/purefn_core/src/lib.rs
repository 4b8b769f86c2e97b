//! purefn_core: Core utilities for the purefn sandboxing compiler.
//!
//! Provides text spans, string interning, and the arena that owns all AST
//! allocations for a single compilation.

pub mod arena;
pub mod intern;
pub mod text;

// Re-export commonly used types
pub use arena::CompilerArena;
pub use intern::{InternedString, StringInterner};
pub use text::{TextRange, TextSpan};
