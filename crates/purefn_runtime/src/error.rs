//! Run-time failure taxonomy.
//!
//! Compile-time failures live in `purefn_diagnostics`; everything here can
//! only surface once a compiled callable executes. Each failure is fatal to
//! that one invocation and leaves the compiler and other callables intact.

use crate::value::Value;

/// An error raised while a sandboxed function executes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    /// The injected guard's ceiling was exceeded. The one error class the
    /// compiler defers to run time, because total iteration count is not
    /// statically decidable.
    #[error("iteration limit exceeded")]
    IterationLimit,

    /// An accessor capability rejected a runtime-supplied key.
    #[error("forbidden key '{key}': {reason}")]
    ForbiddenKey { key: String, reason: &'static str },

    /// The evaluator's cap on native call depth. Direct self-recursion of
    /// the top-level function resets the injected counter by design, so the
    /// evaluator bounds it instead.
    #[error("call depth limit exceeded")]
    CallDepth,

    /// A value was used in a way its type does not support.
    #[error("type error: {0}")]
    Type(String),

    /// A callable was invoked with an argument count its arity rejects.
    #[error("{name} expects {expected} arguments, got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    /// A free identifier had no binding at run time.
    #[error("unresolved identifier '{0}'")]
    Unresolved(String),

    /// The subject program threw a value.
    #[error("uncaught: {}", .0.display_string())]
    Thrown(Value),

    /// The evaluator was handed a program it cannot represent. Emitted text
    /// comes from the printer, so this indicates a pipeline bug, not a
    /// subject-program failure.
    #[error("evaluator internal error: {0}")]
    Internal(String),
}
