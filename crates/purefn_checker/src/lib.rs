//! purefn_checker: The validating tree walker.
//!
//! Walks the subject's syntax tree once, building lexical scopes as it
//! descends, and classifies every identifier and property occurrence against
//! the scope chain and the capability policy. The traversal is an explicit
//! work stack, not language recursion, so adversarial nesting depth cannot
//! exhaust the native call stack. The first violation aborts the compilation.

mod checker;
mod scopes;

pub use checker::Checker;
pub use scopes::{ScopeArena, ScopeId};
