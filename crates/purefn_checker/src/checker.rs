//! The validating tree walker implementation.
//!
//! One top-down traversal over the subject tree, driven by an explicit work
//! stack. Each pending entry carries the node, the scope it is visited in,
//! and the visit context that disambiguates identical identifier nodes in
//! different syntactic positions. Scope discipline:
//!
//! - blocks, function bodies, and loop heads open child scopes;
//! - a declaration's name sub-node is visited under `Declaration` and adds
//!   to the current scope;
//! - a parameter's default value is visited against the scope *enclosing*
//!   the function, so a destructured parameter can never reference itself or
//!   a sibling in its own default;
//! - property-access names and literal element keys go to the capability
//!   policy instead of the scope chain;
//! - `this` is rejected wherever it appears.
//!
//! The first violation aborts the traversal with a diagnostic carrying the
//! source span and the enclosing syntactic-category breadcrumb.

use crate::scopes::{ScopeArena, ScopeId};
use purefn_ast::node::*;
use purefn_ast::syntax_kind::SyntaxKind;
use purefn_core::text::TextSpan;
use purefn_diagnostics::{messages, CompileError, Diagnostic};
use purefn_policy::{check_name, is_global_binding, is_reserved_name, Decision};

/// The syntactic position an identifier is being visited in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitContext {
    /// An ordinary read or write reference.
    None,
    /// The declared-name sub-node of a declaration.
    Declaration,
    /// The key of a property assignment: a label, not a read.
    PropertyAssignmentTarget,
    /// The name sub-node of a static member access.
    PropertyAccess,
}

/// One pending traversal step.
enum Work<'a> {
    Stmt(&'a Statement<'a>, ScopeId),
    Expr(&'a Expression<'a>, ScopeId, VisitContext),
    Ident(&'a Identifier, ScopeId, VisitContext),
    Binding(&'a BindingName<'a>, ScopeId),
    BindingElem(&'a BindingElement<'a>, ScopeId),
    /// A parameter: name declared into the function scope, default value
    /// resolved against the enclosing scope.
    Param(&'a ParameterDeclaration<'a>, ScopeId, ScopeId),
    VarDecl(&'a VariableDeclaration<'a>, ScopeId),
    PropName(&'a PropertyName<'a>, ScopeId),
    /// The key of a computed member access.
    ElementKey(&'a Expression<'a>, ScopeId),
    /// Leave the syntactic category pushed by the matching node entry.
    PopTrail,
}

/// The validating tree walker.
pub struct Checker {
    scopes: ScopeArena,
    trail: Vec<&'static str>,
}

impl Checker {
    pub fn new() -> Self {
        Self {
            scopes: ScopeArena::new(),
            trail: Vec::new(),
        }
    }

    /// Validate a subject source file: structural validity first, then the
    /// full scope and capability walk. Consumes the checker's scope state;
    /// use a fresh checker per compilation.
    pub fn check_source_file<'a>(&mut self, source_file: &'a SourceFile<'a>) -> Result<(), CompileError> {
        self.check_structure(source_file)?;
        self.trail.push(SyntaxKind::SourceFile.name());

        let root = self.scopes.root();
        let mut stack: Vec<Work<'a>> = Vec::new();
        for stmt in source_file.statements.iter().rev() {
            stack.push(Work::Stmt(stmt, root));
        }

        while let Some(work) = stack.pop() {
            self.process(work, &mut stack)?;
        }
        Ok(())
    }

    // ========================================================================
    // Structural validity
    // ========================================================================

    /// The subject must be exactly one statement: a function declaration, or
    /// an expression statement over a function or arrow expression. Checked
    /// before any scope analysis runs.
    fn check_structure(&self, source_file: &SourceFile<'_>) -> Result<(), CompileError> {
        let mut meaningful = source_file
            .statements
            .iter()
            .filter(|s| !matches!(s, Statement::EmptyStatement(_)));

        let first = match meaningful.next() {
            Some(stmt) => stmt,
            None => {
                return Err(CompileError::Structure(Diagnostic::new(
                    &messages::SOURCE_MUST_BE_A_SINGLE_STATEMENT,
                    &[],
                )));
            }
        };
        if let Some(extra) = meaningful.next() {
            return Err(CompileError::Structure(Diagnostic::with_span(
                extra.data().range.to_span(),
                &messages::SOURCE_MUST_BE_A_SINGLE_STATEMENT,
                &[],
            )));
        }

        match first {
            Statement::FunctionDeclaration(_) => Ok(()),
            Statement::ExpressionStatement(n) => match n.expression.unwrap_parens() {
                Expression::FunctionExpression(_) | Expression::ArrowFunction(_) => Ok(()),
                other => Err(CompileError::Structure(Diagnostic::with_span(
                    other.data().range.to_span(),
                    &messages::SOURCE_MUST_BE_A_FUNCTION,
                    &[],
                ))),
            },
            other => Err(CompileError::Structure(Diagnostic::with_span(
                other.data().range.to_span(),
                &messages::SOURCE_MUST_BE_A_FUNCTION,
                &[],
            ))),
        }
    }

    // ========================================================================
    // Work dispatch
    // ========================================================================

    /// Push a group of child steps so they are processed in source order.
    fn push_children<'a>(stack: &mut Vec<Work<'a>>, children: Vec<Work<'a>>) {
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }

    /// Queue a property key. Identifier keys are labels and are visited
    /// under the property-assignment-target context; literal and computed
    /// keys go through the key rules.
    fn push_property_name<'a>(
        children: &mut Vec<Work<'a>>,
        name: &'a PropertyName<'a>,
        scope: ScopeId,
    ) {
        match name {
            PropertyName::Identifier(id) => {
                children.push(Work::Ident(id, scope, VisitContext::PropertyAssignmentTarget));
            }
            other => children.push(Work::PropName(other, scope)),
        }
    }

    fn process<'a>(&mut self, work: Work<'a>, stack: &mut Vec<Work<'a>>) -> Result<(), CompileError> {
        match work {
            Work::PopTrail => {
                self.trail.pop();
                Ok(())
            }
            Work::Stmt(stmt, scope) => self.process_statement(stmt, scope, stack),
            Work::Expr(expr, scope, ctx) => self.process_expression(expr, scope, ctx, stack),
            Work::Ident(ident, scope, ctx) => self.check_identifier(ident, scope, ctx),
            Work::Binding(name, scope) => {
                match name {
                    BindingName::Identifier(id) => {
                        self.check_identifier(id, scope, VisitContext::Declaration)?;
                    }
                    BindingName::ObjectBindingPattern(pattern) => {
                        let children = pattern
                            .elements
                            .iter()
                            .map(|e| Work::BindingElem(e, scope))
                            .collect();
                        Self::push_children(stack, children);
                    }
                    BindingName::ArrayBindingPattern(pattern) => {
                        let children = pattern
                            .elements
                            .iter()
                            .map(|e| Work::BindingElem(e, scope))
                            .collect();
                        Self::push_children(stack, children);
                    }
                }
                Ok(())
            }
            Work::BindingElem(elem, scope) => {
                self.trail.push(SyntaxKind::BindingElement.name());
                let mut children = Vec::new();
                if let Some(ref prop) = elem.property_name {
                    Self::push_property_name(&mut children, prop, scope);
                }
                children.push(Work::Binding(&elem.name, scope));
                if let Some(init) = elem.initializer {
                    children.push(Work::Expr(init, scope, VisitContext::None));
                }
                children.push(Work::PopTrail);
                Self::push_children(stack, children);
                Ok(())
            }
            Work::Param(param, fn_scope, enclosing) => {
                self.trail.push(SyntaxKind::Parameter.name());
                let mut children = Vec::new();
                children.push(Work::Binding(&param.name, fn_scope));
                if let Some(init) = param.initializer {
                    children.push(Work::Expr(init, enclosing, VisitContext::None));
                }
                children.push(Work::PopTrail);
                Self::push_children(stack, children);
                Ok(())
            }
            Work::VarDecl(decl, scope) => {
                self.trail.push(SyntaxKind::VariableDeclaration.name());
                let mut children = Vec::new();
                children.push(Work::Binding(&decl.name, scope));
                if let Some(init) = decl.initializer {
                    children.push(Work::Expr(init, scope, VisitContext::None));
                }
                children.push(Work::PopTrail);
                Self::push_children(stack, children);
                Ok(())
            }
            Work::PropName(name, scope) => self.check_property_name(name, scope),
            Work::ElementKey(key, _scope) => self.check_element_key(key),
        }
    }

    fn process_statement<'a>(
        &mut self,
        stmt: &'a Statement<'a>,
        scope: ScopeId,
        stack: &mut Vec<Work<'a>>,
    ) -> Result<(), CompileError> {
        match stmt {
            Statement::EmptyStatement(_)
            | Statement::ContinueStatement(_)
            | Statement::BreakStatement(_) => return Ok(()),
            _ => {}
        }

        self.trail.push(stmt.kind().name());
        let mut children: Vec<Work<'a>> = Vec::new();

        match stmt {
            Statement::VariableStatement(n) => {
                for decl in n.declaration_list.declarations.iter() {
                    children.push(Work::VarDecl(decl, scope));
                }
            }
            Statement::FunctionDeclaration(n) => {
                // The function's own name is declared in the enclosing scope
                // so the body can recurse through it.
                if let Some(ref name) = n.name {
                    children.push(Work::Ident(name, scope, VisitContext::Declaration));
                }
                let fn_scope = self.scopes.child(scope);
                for param in n.parameters.iter() {
                    children.push(Work::Param(param, fn_scope, scope));
                }
                let body_scope = self.scopes.child(fn_scope);
                for s in n.body.statements.iter() {
                    children.push(Work::Stmt(s, body_scope));
                }
            }
            Statement::Block(n) => {
                let block_scope = self.scopes.child(scope);
                for s in n.statements.iter() {
                    children.push(Work::Stmt(s, block_scope));
                }
            }
            Statement::ExpressionStatement(n) => {
                children.push(Work::Expr(n.expression, scope, VisitContext::None));
            }
            Statement::IfStatement(n) => {
                children.push(Work::Expr(n.expression, scope, VisitContext::None));
                children.push(Work::Stmt(n.then_statement, scope));
                if let Some(else_stmt) = n.else_statement {
                    children.push(Work::Stmt(else_stmt, scope));
                }
            }
            Statement::DoStatement(n) => {
                children.push(Work::Stmt(n.statement, scope));
                children.push(Work::Expr(n.expression, scope, VisitContext::None));
            }
            Statement::WhileStatement(n) => {
                children.push(Work::Expr(n.expression, scope, VisitContext::None));
                children.push(Work::Stmt(n.statement, scope));
            }
            Statement::ForStatement(n) => {
                let loop_scope = self.scopes.child(scope);
                if let Some(ref init) = n.initializer {
                    match init {
                        ForInitializer::VariableDeclarationList(list) => {
                            for decl in list.declarations.iter() {
                                children.push(Work::VarDecl(decl, loop_scope));
                            }
                        }
                        ForInitializer::Expression(expr) => {
                            children.push(Work::Expr(expr, loop_scope, VisitContext::None));
                        }
                    }
                }
                if let Some(cond) = n.condition {
                    children.push(Work::Expr(cond, loop_scope, VisitContext::None));
                }
                if let Some(incr) = n.incrementor {
                    children.push(Work::Expr(incr, loop_scope, VisitContext::None));
                }
                children.push(Work::Stmt(n.statement, loop_scope));
            }
            Statement::ForInStatement(n) => {
                let loop_scope = self.scopes.child(scope);
                self.push_for_in_of_children(&mut children, &n.initializer, n.expression, n.statement, loop_scope);
            }
            Statement::ForOfStatement(n) => {
                let loop_scope = self.scopes.child(scope);
                self.push_for_in_of_children(&mut children, &n.initializer, n.expression, n.statement, loop_scope);
            }
            Statement::ReturnStatement(n) => {
                if let Some(expr) = n.expression {
                    children.push(Work::Expr(expr, scope, VisitContext::None));
                }
            }
            Statement::ThrowStatement(n) => {
                children.push(Work::Expr(n.expression, scope, VisitContext::None));
            }
            Statement::EmptyStatement(_)
            | Statement::ContinueStatement(_)
            | Statement::BreakStatement(_) => unreachable!(),
        }

        children.push(Work::PopTrail);
        Self::push_children(stack, children);
        Ok(())
    }

    fn push_for_in_of_children<'a>(
        &mut self,
        children: &mut Vec<Work<'a>>,
        initializer: &'a ForInitializer<'a>,
        expression: &'a Expression<'a>,
        statement: &'a Statement<'a>,
        loop_scope: ScopeId,
    ) {
        match initializer {
            ForInitializer::VariableDeclarationList(list) => {
                for decl in list.declarations.iter() {
                    children.push(Work::VarDecl(decl, loop_scope));
                }
            }
            ForInitializer::Expression(expr) => {
                children.push(Work::Expr(expr, loop_scope, VisitContext::None));
            }
        }
        children.push(Work::Expr(expression, loop_scope, VisitContext::None));
        children.push(Work::Stmt(statement, loop_scope));
    }

    fn process_expression<'a>(
        &mut self,
        expr: &'a Expression<'a>,
        scope: ScopeId,
        ctx: VisitContext,
        stack: &mut Vec<Work<'a>>,
    ) -> Result<(), CompileError> {
        // Leaf cases first; they never push children or trail entries.
        match expr {
            Expression::Identifier(id) => return self.check_identifier(id, scope, ctx),
            Expression::ThisKeyword(data) => {
                return Err(self.capability_error(
                    data.range.to_span(),
                    &messages::SELF_REFERENCE_NOT_ALLOWED,
                    &[],
                    SyntaxKind::ThisKeyword,
                ));
            }
            Expression::StringLiteral(_)
            | Expression::NumericLiteral(_)
            | Expression::NullKeyword(_)
            | Expression::UndefinedKeyword(_)
            | Expression::TrueKeyword(_)
            | Expression::FalseKeyword(_) => return Ok(()),
            _ => {}
        }

        self.trail.push(expr.kind().name());
        let mut children: Vec<Work<'a>> = Vec::new();

        match expr {
            Expression::ArrayLiteral(n) => {
                for elem in n.elements.iter() {
                    children.push(Work::Expr(elem, scope, VisitContext::None));
                }
            }
            Expression::ObjectLiteral(n) => {
                for prop in n.properties.iter() {
                    match prop {
                        ObjectLiteralElement::PropertyAssignment(p) => {
                            Self::push_property_name(&mut children, &p.name, scope);
                            children.push(Work::Expr(p.initializer, scope, VisitContext::None));
                        }
                        ObjectLiteralElement::ShorthandPropertyAssignment(p) => {
                            // Shorthand reads the named binding.
                            children.push(Work::Ident(&p.name, scope, VisitContext::None));
                        }
                    }
                }
            }
            Expression::PropertyAccess(n) => {
                children.push(Work::Expr(n.expression, scope, VisitContext::None));
                children.push(Work::Ident(&n.name, scope, VisitContext::PropertyAccess));
            }
            Expression::ElementAccess(n) => {
                children.push(Work::Expr(n.expression, scope, VisitContext::None));
                children.push(Work::ElementKey(n.argument_expression, scope));
            }
            Expression::Call(n) => {
                children.push(Work::Expr(n.expression, scope, VisitContext::None));
                for arg in n.arguments.iter() {
                    children.push(Work::Expr(arg, scope, VisitContext::None));
                }
            }
            Expression::New(n) => {
                children.push(Work::Expr(n.expression, scope, VisitContext::None));
                if let Some(args) = n.arguments {
                    for arg in args.iter() {
                        children.push(Work::Expr(arg, scope, VisitContext::None));
                    }
                }
            }
            Expression::Parenthesized(n) => {
                children.push(Work::Expr(n.expression, scope, ctx));
            }
            Expression::FunctionExpression(n) => {
                let fn_scope = self.scopes.child(scope);
                // A named function expression binds its name inside itself.
                if let Some(ref name) = n.name {
                    children.push(Work::Ident(name, fn_scope, VisitContext::Declaration));
                }
                for param in n.parameters.iter() {
                    children.push(Work::Param(param, fn_scope, scope));
                }
                let body_scope = self.scopes.child(fn_scope);
                for s in n.body.statements.iter() {
                    children.push(Work::Stmt(s, body_scope));
                }
            }
            Expression::ArrowFunction(n) => {
                let fn_scope = self.scopes.child(scope);
                for param in n.parameters.iter() {
                    children.push(Work::Param(param, fn_scope, scope));
                }
                match &n.body {
                    ArrowFunctionBody::Block(block) => {
                        let body_scope = self.scopes.child(fn_scope);
                        for s in block.statements.iter() {
                            children.push(Work::Stmt(s, body_scope));
                        }
                    }
                    ArrowFunctionBody::Expression(e) => {
                        children.push(Work::Expr(e, fn_scope, VisitContext::None));
                    }
                }
            }
            Expression::PrefixUnary(n) => {
                children.push(Work::Expr(n.operand, scope, VisitContext::None));
            }
            Expression::PostfixUnary(n) => {
                children.push(Work::Expr(n.operand, scope, VisitContext::None));
            }
            Expression::Binary(n) => {
                children.push(Work::Expr(n.left, scope, VisitContext::None));
                children.push(Work::Expr(n.right, scope, VisitContext::None));
            }
            Expression::Conditional(n) => {
                children.push(Work::Expr(n.condition, scope, VisitContext::None));
                children.push(Work::Expr(n.when_true, scope, VisitContext::None));
                children.push(Work::Expr(n.when_false, scope, VisitContext::None));
            }
            Expression::Identifier(_)
            | Expression::ThisKeyword(_)
            | Expression::StringLiteral(_)
            | Expression::NumericLiteral(_)
            | Expression::NullKeyword(_)
            | Expression::UndefinedKeyword(_)
            | Expression::TrueKeyword(_)
            | Expression::FalseKeyword(_) => unreachable!(),
        }

        children.push(Work::PopTrail);
        Self::push_children(stack, children);
        Ok(())
    }

    // ========================================================================
    // Identifier and name classification
    // ========================================================================

    fn check_identifier(
        &mut self,
        ident: &Identifier,
        scope: ScopeId,
        ctx: VisitContext,
    ) -> Result<(), CompileError> {
        let span = ident.data.range.to_span();
        match ctx {
            VisitContext::Declaration => {
                if is_reserved_name(&ident.text_name) {
                    return Err(self.capability_error(
                        span,
                        &messages::RESERVED_NAME_0,
                        &[&ident.text_name],
                        SyntaxKind::Identifier,
                    ));
                }
                self.scopes.declare(scope, ident.text);
                Ok(())
            }
            VisitContext::PropertyAssignmentTarget => Ok(()),
            VisitContext::PropertyAccess => match check_name(&ident.text_name) {
                Decision::Allowed => Ok(()),
                Decision::Denied(reason) => Err(self.capability_error(
                    span,
                    &messages::FORBIDDEN_PROPERTY_0,
                    &[&ident.text_name, reason.describe()],
                    SyntaxKind::Identifier,
                )),
            },
            VisitContext::None => {
                if is_reserved_name(&ident.text_name) {
                    return Err(self.capability_error(
                        span,
                        &messages::RESERVED_NAME_0,
                        &[&ident.text_name],
                        SyntaxKind::Identifier,
                    ));
                }
                if self.scopes.resolves(scope, ident.text) || is_global_binding(&ident.text_name) {
                    Ok(())
                } else {
                    Err(CompileError::Scope(
                        Diagnostic::with_span(
                            span,
                            &messages::IDENTIFIER_NOT_IN_SCOPE_0,
                            &[&ident.text_name],
                        )
                        .with_trail(self.trail_with(SyntaxKind::Identifier)),
                    ))
                }
            }
        }
    }

    /// Property-assignment keys are labels and are not identifier reads;
    /// computed keys must be literal strings and go to the policy.
    fn check_property_name(&mut self, name: &PropertyName<'_>, _scope: ScopeId) -> Result<(), CompileError> {
        match name {
            PropertyName::Identifier(_)
            | PropertyName::StringLiteral(_)
            | PropertyName::NumericLiteral(_) => Ok(()),
            PropertyName::Computed(computed) => self.check_element_key(computed.expression),
        }
    }

    /// A computed key is permitted only when it is a literal string constant;
    /// the literal's text then goes through the capability policy exactly
    /// like a static property name. Everything else is non-static access.
    fn check_element_key(&mut self, key: &Expression<'_>) -> Result<(), CompileError> {
        match key {
            Expression::StringLiteral(lit) => match check_name(&lit.text_value) {
                Decision::Allowed => Ok(()),
                Decision::Denied(reason) => Err(self.capability_error(
                    lit.data.range.to_span(),
                    &messages::FORBIDDEN_PROPERTY_0,
                    &[&lit.text_value, reason.describe()],
                    SyntaxKind::StringLiteral,
                )),
            },
            other => Err(self.capability_error(
                other.data().range.to_span(),
                &messages::NON_STATIC_ACCESS,
                &[],
                other.kind(),
            )),
        }
    }

    fn capability_error(
        &self,
        span: TextSpan,
        message: &purefn_diagnostics::DiagnosticMessage,
        args: &[&str],
        at: SyntaxKind,
    ) -> CompileError {
        CompileError::Capability(
            Diagnostic::with_span(span, message, args).with_trail(self.trail_with(at)),
        )
    }

    fn trail_with(&self, at: SyntaxKind) -> Vec<&'static str> {
        let mut trail = self.trail.clone();
        trail.push(at.name());
        trail
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}
