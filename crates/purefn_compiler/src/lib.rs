//! purefn_compiler: Pipeline orchestration.
//!
//! The one crate a host embeds. Runs the full gate between untrusted source
//! text and a live callable:
//!
//! ```text
//! text -> tree -> {validate} -> {transform} -> text -> callable
//! ```
//!
//! Data flows strictly forward; no step re-enters an earlier one. Each
//! compilation allocates its own arena, scope state, and guard counter, so
//! concurrent compilations of unrelated sources need no synchronization.
//! Compilation either returns a callable or aborts with the first
//! diagnostic; there is no partial result.

use purefn_checker::Checker;
use purefn_core::arena::CompilerArena;
use purefn_core::intern::StringInterner;
use purefn_diagnostics::CompileError;
use purefn_parser::Parser;
use purefn_printer::Printer;
use purefn_runtime::{capability_bindings, Engine, Interpreter, RuntimeError, SandboxedFunction};
use purefn_transformers::GuardInjector;

/// Any failure on the way from source text to callable.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The subject program was rejected.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// The evaluator could not instantiate the emitted program. With the
    /// built-in engine this indicates a pipeline bug, never a subject bug.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// The sandboxing compiler, parameterized over the evaluator seam.
pub struct Compiler {
    engine: Box<dyn Engine>,
}

impl Compiler {
    /// A compiler backed by the built-in tree-walking evaluator.
    pub fn new() -> Self {
        Self {
            engine: Box::new(Interpreter::new()),
        }
    }

    /// A compiler backed by a custom evaluator.
    pub fn with_engine(engine: Box<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Compile one attacker-supplied function definition into a verified,
    /// resource-bounded callable.
    pub fn compile(&self, source: &str) -> Result<SandboxedFunction, Error> {
        let text = self.compile_to_text(source)?;
        let callable = self.engine.instantiate(&text, capability_bindings())?;
        Ok(callable)
    }

    /// Run the pipeline up to emit: parse, validate, inject guards, print.
    /// Exposed so the transformation can be inspected without a live engine.
    pub fn compile_to_text(&self, source: &str) -> Result<String, CompileError> {
        let arena = CompilerArena::new();
        let interner = StringInterner::new();

        // Parse
        let mut parser = Parser::new(arena.bump(), interner.clone(), "subject.js", source);
        let source_file = parser.parse_source_file();
        let diagnostics = parser.take_diagnostics();
        if let Some(error) = diagnostics.first_error() {
            return Err(CompileError::Parse(error.clone()));
        }

        // Validate
        let mut checker = Checker::new();
        checker.check_source_file(&source_file)?;

        // Inject guards
        let injector = GuardInjector::new(arena.bump(), interner);
        let transformed = injector.transform_source_file(&source_file);

        // Emit
        let mut printer = Printer::new();
        Ok(printer.print_source_file(&transformed))
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile with the default engine.
pub fn compile(source: &str) -> Result<SandboxedFunction, Error> {
    Compiler::new().compile(source)
}
