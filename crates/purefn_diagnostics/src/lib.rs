//! purefn_diagnostics: Diagnostic messages and the fatal error taxonomy.
//!
//! Compilation is fail-fast: the first violation anywhere aborts the whole
//! pipeline with a single diagnostic carrying the offending source span and a
//! breadcrumb of the enclosing syntactic categories. There is no error
//! aggregation and no partial result.

use purefn_core::text::TextSpan;
use std::fmt;

/// Diagnostic category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    Warning,
    Error,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCategory::Warning => write!(f, "warning"),
            DiagnosticCategory::Error => write!(f, "error"),
        }
    }
}

/// A diagnostic message template with a code and category.
#[derive(Debug, Clone)]
pub struct DiagnosticMessage {
    /// The diagnostic error code (e.g., 2304).
    pub code: u32,
    /// The category of this diagnostic.
    pub category: DiagnosticCategory,
    /// The message template string. May contain `{0}`, `{1}`, etc.
    pub message: &'static str,
}

/// A realized diagnostic with location and breadcrumb information.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// The source text span where this diagnostic occurred, if any.
    pub span: Option<TextSpan>,
    /// The resolved message text.
    pub message_text: String,
    /// The diagnostic error code.
    pub code: u32,
    /// The category.
    pub category: DiagnosticCategory,
    /// Names of the enclosing syntactic categories, outermost first.
    pub trail: Vec<&'static str>,
}

impl Diagnostic {
    /// Create a new diagnostic without location info.
    pub fn new(message: &DiagnosticMessage, args: &[&str]) -> Self {
        Self {
            span: None,
            message_text: format_message(message.message, args),
            code: message.code,
            category: message.category,
            trail: Vec::new(),
        }
    }

    /// Create a new diagnostic with span info.
    pub fn with_span(span: TextSpan, message: &DiagnosticMessage, args: &[&str]) -> Self {
        Self {
            span: Some(span),
            message_text: format_message(message.message, args),
            code: message.code,
            category: message.category,
            trail: Vec::new(),
        }
    }

    /// Attach the enclosing syntactic-category breadcrumb, outermost first.
    pub fn with_trail(mut self, trail: Vec<&'static str>) -> Self {
        self.trail = trail;
        self
    }

    /// Whether this is an error diagnostic.
    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = self.span {
            write!(f, "({}): ", span.start)?;
        }
        write!(f, "{} PF{}: {}", self.category, self.code, self.message_text)?;
        if !self.trail.is_empty() {
            write!(f, " at {}", self.trail.join(">"))?;
        }
        Ok(())
    }
}

/// Format a diagnostic message template by replacing `{0}`, `{1}`, etc.
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut result = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{}}}", i), arg);
    }
    result
}

/// A collection of diagnostics accumulated while producing a syntax tree.
///
/// Only the parser aggregates; validation and transformation abort on the
/// first error instead.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollection {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollection {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.diagnostics.iter().find(|d| d.is_error())
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }
}

/// The fatal, non-recoverable compile-time error taxonomy.
///
/// Every variant aborts the compilation that raised it; callers must correct
/// the subject source and resubmit. Iteration-limit failures are not here:
/// total iteration count is not statically decidable, so that single error
/// class is deferred to run time (see `purefn_runtime`).
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    /// The parser could not produce a syntax tree.
    #[error("parse error: {0}")]
    Parse(Diagnostic),
    /// The subject is not exactly one function statement/expression.
    #[error("structure error: {0}")]
    Structure(Diagnostic),
    /// A free identifier resolves to no declared binding and is not in the
    /// capability whitelist.
    #[error("scope error: {0}")]
    Scope(Diagnostic),
    /// Forbidden property name, non-static member access, self-reference
    /// keyword, or reserved name.
    #[error("capability error: {0}")]
    Capability(Diagnostic),
}

impl CompileError {
    /// The underlying diagnostic.
    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            CompileError::Parse(d)
            | CompileError::Structure(d)
            | CompileError::Scope(d)
            | CompileError::Capability(d) => d,
        }
    }
}

// ============================================================================
// Diagnostic messages
// ============================================================================

pub mod messages {
    use super::*;

    macro_rules! diag {
        ($code:expr, Error, $msg:expr) => {
            DiagnosticMessage {
                code: $code,
                category: DiagnosticCategory::Error,
                message: $msg,
            }
        };
    }

    // ========================================================================
    // Structure errors (1000-1099)
    // ========================================================================
    pub const SOURCE_MUST_BE_A_SINGLE_STATEMENT: DiagnosticMessage =
        diag!(1001, Error, "Subject source must contain exactly one statement.");
    pub const SOURCE_MUST_BE_A_FUNCTION: DiagnosticMessage = diag!(
        1002,
        Error,
        "Subject source must be a function declaration or a function-valued expression."
    );

    // ========================================================================
    // Scanner and parser errors (1100-1199)
    // ========================================================================
    pub const UNEXPECTED_TOKEN: DiagnosticMessage = diag!(1101, Error, "Unexpected token.");
    pub const _0_EXPECTED: DiagnosticMessage = diag!(1102, Error, "'{0}' expected.");
    pub const EXPRESSION_EXPECTED: DiagnosticMessage = diag!(1103, Error, "Expression expected.");
    pub const IDENTIFIER_EXPECTED: DiagnosticMessage = diag!(1104, Error, "Identifier expected.");
    pub const UNTERMINATED_STRING_LITERAL: DiagnosticMessage =
        diag!(1105, Error, "Unterminated string literal.");
    pub const INVALID_CHARACTER: DiagnosticMessage = diag!(1106, Error, "Invalid character.");
    pub const STATEMENT_EXPECTED: DiagnosticMessage = diag!(1107, Error, "Statement expected.");
    pub const DIGIT_EXPECTED: DiagnosticMessage = diag!(1108, Error, "Digit expected.");
    pub const PROPERTY_ASSIGNMENT_EXPECTED: DiagnosticMessage =
        diag!(1109, Error, "Property assignment expected.");
    pub const VARIABLE_DECLARATION_EXPECTED: DiagnosticMessage =
        diag!(1110, Error, "Variable declaration expected.");

    // ========================================================================
    // Scope errors (2300-2399)
    // ========================================================================
    pub const IDENTIFIER_NOT_IN_SCOPE_0: DiagnosticMessage =
        diag!(2304, Error, "Identifier not in scope: '{0}'.");

    // ========================================================================
    // Capability errors (3000-3099)
    // ========================================================================
    pub const FORBIDDEN_PROPERTY_0: DiagnosticMessage =
        diag!(3001, Error, "Access to property '{0}' is not allowed: {1}.");
    pub const NON_STATIC_ACCESS: DiagnosticMessage = diag!(
        3002,
        Error,
        "Non-static access: computed keys must be string literals."
    );
    pub const SELF_REFERENCE_NOT_ALLOWED: DiagnosticMessage =
        diag!(3003, Error, "'this' is not allowed in a sandboxed function.");
    pub const RESERVED_NAME_0: DiagnosticMessage = diag!(
        3004,
        Error,
        "Names beginning with '__' are reserved: '{0}'."
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message() {
        assert_eq!(
            format_message("Identifier not in scope: '{0}'.", &["window"]),
            "Identifier not in scope: 'window'."
        );
    }

    #[test]
    fn test_diagnostic_display_with_trail() {
        let diag = Diagnostic::new(&messages::SELF_REFERENCE_NOT_ALLOWED, &[])
            .with_trail(vec!["FunctionDeclaration", "Block", "ReturnStatement"]);
        let text = diag.to_string();
        assert!(text.contains("PF3003"));
        assert!(text.contains("FunctionDeclaration>Block>ReturnStatement"));
    }

    #[test]
    fn test_compile_error_classification() {
        let err = CompileError::Scope(Diagnostic::new(
            &messages::IDENTIFIER_NOT_IN_SCOPE_0,
            &["x"],
        ));
        assert!(err.to_string().contains("scope error"));
        assert_eq!(err.diagnostic().code, 2304);
    }
}
