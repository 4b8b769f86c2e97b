//! The guard injection rewrite.
//!
//! `wrap_body` is the single canonical operation: it prepends the guard call
//! to a body's statements and, for the top-level body, the counter and check
//! declarations. Loop bodies become blocks starting with the guard call;
//! arrow functions with expression bodies become block bodies that return
//! the original expression.

use crate::factory::NodeFactory;
use bumpalo::Bump;
use purefn_ast::node::*;
use purefn_ast::syntax_kind::SyntaxKind;
use purefn_core::intern::StringInterner;

/// Name of the injected iteration counter, declared once per top-level body.
pub const COUNTER_NAME: &str = "__ops";

/// Name of the injected check closure.
pub const CHECK_NAME: &str = "__guard";

/// Name of the host binding the check escalates to when the ceiling is
/// exceeded. The evaluator injects it; it raises the fatal iteration-limit
/// error.
pub const LIMIT_BINDING: &str = "__limit";

/// Ceiling on the total number of checks across one top-level invocation.
pub const ITERATION_LIMIT: u64 = 1_000_000;

/// The guard injection transform. Pure: consumes a validated tree and
/// produces a new one in the same arena.
pub struct GuardInjector<'a> {
    factory: NodeFactory<'a>,
    arena: &'a Bump,
}

impl<'a> GuardInjector<'a> {
    pub fn new(arena: &'a Bump, interner: StringInterner) -> Self {
        Self {
            factory: NodeFactory::new(arena, interner),
            arena,
        }
    }

    /// Transform a validated subject file. The single top-level function's
    /// body receives the counter and check declarations; every nested loop
    /// and function body receives the guard call.
    pub fn transform_source_file(&self, source_file: &'a SourceFile<'a>) -> SourceFile<'a> {
        let statements: Vec<Statement<'a>> = source_file
            .statements
            .iter()
            .map(|stmt| self.transform_top_level_statement(stmt))
            .collect();
        SourceFile {
            data: source_file.data.clone(),
            statements: self.factory.alloc_vec(statements),
            file_name: source_file.file_name.clone(),
            text: source_file.text.clone(),
        }
    }

    fn transform_top_level_statement(&self, stmt: &'a Statement<'a>) -> Statement<'a> {
        match stmt {
            Statement::FunctionDeclaration(f) => {
                Statement::FunctionDeclaration(FunctionDeclaration {
                    data: f.data.clone(),
                    name: f.name.clone(),
                    parameters: self.transform_parameters(f.parameters),
                    body: self.wrap_statements_body(f.body.statements, true),
                })
            }
            Statement::ExpressionStatement(n) => {
                Statement::ExpressionStatement(ExpressionStatement {
                    data: n.data.clone(),
                    expression: self.transform_top_level_expression(n.expression),
                })
            }
            other => self.transform_statement(other),
        }
    }

    fn transform_top_level_expression(&self, expr: &'a Expression<'a>) -> &'a Expression<'a> {
        match expr {
            Expression::Parenthesized(n) => {
                self.arena
                    .alloc(Expression::Parenthesized(ParenthesizedExpression {
                        data: n.data.clone(),
                        expression: self.transform_top_level_expression(n.expression),
                    }))
            }
            Expression::FunctionExpression(n) => {
                let body = self.wrap_statements_body(n.body.statements, true);
                self.arena
                    .alloc(Expression::FunctionExpression(FunctionExpression {
                        data: n.data.clone(),
                        name: n.name.clone(),
                        parameters: self.transform_parameters(n.parameters),
                        body: self.arena.alloc(body),
                    }))
            }
            Expression::ArrowFunction(n) => {
                let body = match &n.body {
                    ArrowFunctionBody::Block(block) => {
                        let wrapped = self.wrap_statements_body(block.statements, true);
                        ArrowFunctionBody::Block(self.arena.alloc(wrapped))
                    }
                    ArrowFunctionBody::Expression(e) => {
                        let wrapped = self.wrap_body(Vec::new(), true, Some(self.transform_expression(e)));
                        ArrowFunctionBody::Block(self.arena.alloc(wrapped))
                    }
                };
                self.arena.alloc(Expression::ArrowFunction(ArrowFunction {
                    data: n.data.clone(),
                    parameters: self.transform_parameters(n.parameters),
                    body,
                }))
            }
            other => self.transform_expression(other),
        }
    }

    // ========================================================================
    // The canonical wrap operation
    // ========================================================================

    /// Wrap already-transformed body statements with the guard machinery.
    ///
    /// - Always prepends the guard call, so the check runs before any
    ///   attacker logic in the body.
    /// - `top_level` additionally prepends `let __ops = 0;` and the check
    ///   closure, so the count resets on every external invocation and all
    ///   nested constructs share one counter by lexical closure.
    /// - `produces_value` appends `return <expr>;`, turning an expression
    ///   body into a block body.
    pub fn wrap_body(
        &self,
        body: Vec<Statement<'a>>,
        top_level: bool,
        produces_value: Option<&'a Expression<'a>>,
    ) -> Block<'a> {
        let mut statements = Vec::with_capacity(body.len() + 4);
        if top_level {
            statements.push(self.factory.declaration_statement(
                SyntaxKind::LetKeyword,
                COUNTER_NAME,
                self.factory.number_expr(0),
            ));
            statements.push(self.factory.declaration_statement(
                SyntaxKind::ConstKeyword,
                CHECK_NAME,
                self.check_closure(),
            ));
        }
        statements.push(self.factory.call_statement(CHECK_NAME));
        statements.extend(body);
        if let Some(value) = produces_value {
            statements.push(self.factory.return_statement(value));
        }
        self.factory.block(statements)
    }

    /// `() => { __ops = __ops + 1; if (__ops > LIMIT) { __limit(); } }`
    fn check_closure(&self) -> &'a Expression<'a> {
        let increment = self.factory.assignment_statement(
            COUNTER_NAME,
            self.factory.binary(
                self.factory.identifier_expr(COUNTER_NAME),
                SyntaxKind::PlusToken,
                self.factory.number_expr(1),
            ),
        );
        let over_limit = self.factory.binary(
            self.factory.identifier_expr(COUNTER_NAME),
            SyntaxKind::GreaterThanToken,
            self.factory.number_expr(ITERATION_LIMIT),
        );
        let escalate = self.factory.call_statement(LIMIT_BINDING);
        let raise = self.factory.if_statement(over_limit, vec![escalate]);
        self.factory.arrow_with_block(vec![increment, raise])
    }

    fn wrap_statements_body(&self, statements: &'a [Statement<'a>], top_level: bool) -> Block<'a> {
        let transformed = statements
            .iter()
            .map(|s| self.transform_statement(s))
            .collect();
        self.wrap_body(transformed, top_level, None)
    }

    /// A loop body becomes a block whose first statement is the guard call.
    fn wrap_loop_body(&self, body: &'a Statement<'a>) -> &'a Statement<'a> {
        let mut statements = vec![self.factory.call_statement(CHECK_NAME)];
        match body {
            Statement::Block(block) => {
                for s in block.statements.iter() {
                    statements.push(self.transform_statement(s));
                }
            }
            other => statements.push(self.transform_statement(other)),
        }
        self.arena
            .alloc(Statement::Block(self.factory.block(statements)))
    }

    // ========================================================================
    // Structural walk
    // ========================================================================

    fn transform_statement(&self, stmt: &'a Statement<'a>) -> Statement<'a> {
        match stmt {
            Statement::VariableStatement(n) => Statement::VariableStatement(VariableStatement {
                data: n.data.clone(),
                declaration_list: self.transform_declaration_list(&n.declaration_list),
            }),
            Statement::FunctionDeclaration(f) => {
                Statement::FunctionDeclaration(FunctionDeclaration {
                    data: f.data.clone(),
                    name: f.name.clone(),
                    parameters: self.transform_parameters(f.parameters),
                    body: self.wrap_statements_body(f.body.statements, false),
                })
            }
            Statement::Block(n) => Statement::Block(self.transform_block(n)),
            Statement::EmptyStatement(d) => Statement::EmptyStatement(d.clone()),
            Statement::ExpressionStatement(n) => {
                Statement::ExpressionStatement(ExpressionStatement {
                    data: n.data.clone(),
                    expression: self.transform_expression(n.expression),
                })
            }
            Statement::IfStatement(n) => Statement::IfStatement(IfStatement {
                data: n.data.clone(),
                expression: self.transform_expression(n.expression),
                then_statement: self.transform_statement_ref(n.then_statement),
                else_statement: n.else_statement.map(|s| self.transform_statement_ref(s)),
            }),
            Statement::DoStatement(n) => Statement::DoStatement(DoStatement {
                data: n.data.clone(),
                statement: self.wrap_loop_body(n.statement),
                expression: self.transform_expression(n.expression),
            }),
            Statement::WhileStatement(n) => Statement::WhileStatement(WhileStatement {
                data: n.data.clone(),
                expression: self.transform_expression(n.expression),
                statement: self.wrap_loop_body(n.statement),
            }),
            Statement::ForStatement(n) => Statement::ForStatement(ForStatement {
                data: n.data.clone(),
                initializer: n.initializer.as_ref().map(|i| self.transform_for_initializer(i)),
                condition: n.condition.map(|c| self.transform_expression(c)),
                incrementor: n.incrementor.map(|i| self.transform_expression(i)),
                statement: self.wrap_loop_body(n.statement),
            }),
            Statement::ForInStatement(n) => Statement::ForInStatement(ForInStatement {
                data: n.data.clone(),
                initializer: self.transform_for_initializer(&n.initializer),
                expression: self.transform_expression(n.expression),
                statement: self.wrap_loop_body(n.statement),
            }),
            Statement::ForOfStatement(n) => Statement::ForOfStatement(ForOfStatement {
                data: n.data.clone(),
                initializer: self.transform_for_initializer(&n.initializer),
                expression: self.transform_expression(n.expression),
                statement: self.wrap_loop_body(n.statement),
            }),
            Statement::ContinueStatement(n) => Statement::ContinueStatement(ContinueStatement {
                data: n.data.clone(),
            }),
            Statement::BreakStatement(n) => Statement::BreakStatement(BreakStatement {
                data: n.data.clone(),
            }),
            Statement::ReturnStatement(n) => Statement::ReturnStatement(ReturnStatement {
                data: n.data.clone(),
                expression: n.expression.map(|e| self.transform_expression(e)),
            }),
            Statement::ThrowStatement(n) => Statement::ThrowStatement(ThrowStatement {
                data: n.data.clone(),
                expression: self.transform_expression(n.expression),
            }),
        }
    }

    fn transform_statement_ref(&self, stmt: &'a Statement<'a>) -> &'a Statement<'a> {
        self.arena.alloc(self.transform_statement(stmt))
    }

    fn transform_block(&self, block: &'a Block<'a>) -> Block<'a> {
        let statements = block
            .statements
            .iter()
            .map(|s| self.transform_statement(s))
            .collect();
        Block {
            data: block.data.clone(),
            statements: self.factory.alloc_vec(statements),
        }
    }

    fn transform_declaration_list(
        &self,
        list: &'a VariableDeclarationList<'a>,
    ) -> VariableDeclarationList<'a> {
        let declarations = list
            .declarations
            .iter()
            .map(|decl| VariableDeclaration {
                data: decl.data.clone(),
                name: self.transform_binding_name(&decl.name),
                initializer: decl.initializer.map(|e| self.transform_expression(e)),
            })
            .collect();
        VariableDeclarationList {
            data: list.data.clone(),
            declarations: self.factory.alloc_vec(declarations),
        }
    }

    fn transform_for_initializer(&self, init: &'a ForInitializer<'a>) -> ForInitializer<'a> {
        match init {
            ForInitializer::VariableDeclarationList(list) => {
                ForInitializer::VariableDeclarationList(self.transform_declaration_list(list))
            }
            ForInitializer::Expression(expr) => {
                ForInitializer::Expression(self.transform_expression(expr))
            }
        }
    }

    fn transform_parameters(
        &self,
        parameters: &'a [ParameterDeclaration<'a>],
    ) -> &'a [ParameterDeclaration<'a>] {
        let transformed = parameters
            .iter()
            .map(|param| ParameterDeclaration {
                data: param.data.clone(),
                name: self.transform_binding_name(&param.name),
                initializer: param.initializer.map(|e| self.transform_expression(e)),
            })
            .collect();
        self.factory.alloc_vec(transformed)
    }

    fn transform_binding_name(&self, name: &'a BindingName<'a>) -> BindingName<'a> {
        match name {
            BindingName::Identifier(id) => BindingName::Identifier(id.clone()),
            BindingName::ObjectBindingPattern(pattern) => {
                let elements = pattern
                    .elements
                    .iter()
                    .map(|e| self.transform_binding_element(e))
                    .collect();
                BindingName::ObjectBindingPattern(self.arena.alloc(ObjectBindingPattern {
                    data: pattern.data.clone(),
                    elements: self.factory.alloc_vec(elements),
                }))
            }
            BindingName::ArrayBindingPattern(pattern) => {
                let elements = pattern
                    .elements
                    .iter()
                    .map(|e| self.transform_binding_element(e))
                    .collect();
                BindingName::ArrayBindingPattern(self.arena.alloc(ArrayBindingPattern {
                    data: pattern.data.clone(),
                    elements: self.factory.alloc_vec(elements),
                }))
            }
        }
    }

    fn transform_binding_element(&self, elem: &'a BindingElement<'a>) -> BindingElement<'a> {
        BindingElement {
            data: elem.data.clone(),
            property_name: elem.property_name.as_ref().map(|p| self.transform_property_name(p)),
            name: self.transform_binding_name(&elem.name),
            initializer: elem.initializer.map(|e| self.transform_expression(e)),
        }
    }

    fn transform_property_name(&self, name: &'a PropertyName<'a>) -> PropertyName<'a> {
        match name {
            PropertyName::Identifier(id) => PropertyName::Identifier(id.clone()),
            PropertyName::StringLiteral(s) => PropertyName::StringLiteral(s.clone()),
            PropertyName::NumericLiteral(n) => PropertyName::NumericLiteral(n.clone()),
            PropertyName::Computed(c) => PropertyName::Computed(self.arena.alloc(
                ComputedPropertyName {
                    data: c.data.clone(),
                    expression: self.transform_expression(c.expression),
                },
            )),
        }
    }

    /// Transform an expression, reusing unchanged leaves by reference.
    fn transform_expression(&self, expr: &'a Expression<'a>) -> &'a Expression<'a> {
        if Self::is_leaf(expr) {
            return expr;
        }
        self.arena.alloc(self.transform_expression_owned(expr))
    }

    fn is_leaf(expr: &Expression<'_>) -> bool {
        matches!(
            expr,
            Expression::Identifier(_)
                | Expression::StringLiteral(_)
                | Expression::NumericLiteral(_)
                | Expression::ThisKeyword(_)
                | Expression::NullKeyword(_)
                | Expression::UndefinedKeyword(_)
                | Expression::TrueKeyword(_)
                | Expression::FalseKeyword(_)
        )
    }

    /// Transform an expression into a new node value, for slots that store
    /// nodes inline (argument and element lists).
    fn transform_expression_owned(&self, expr: &'a Expression<'a>) -> Expression<'a> {
        match expr {
            Expression::Identifier(id) => Expression::Identifier(id.clone()),
            Expression::StringLiteral(s) => Expression::StringLiteral(s.clone()),
            Expression::NumericLiteral(n) => Expression::NumericLiteral(n.clone()),
            Expression::ThisKeyword(d) => Expression::ThisKeyword(d.clone()),
            Expression::NullKeyword(d) => Expression::NullKeyword(d.clone()),
            Expression::UndefinedKeyword(d) => Expression::UndefinedKeyword(d.clone()),
            Expression::TrueKeyword(d) => Expression::TrueKeyword(d.clone()),
            Expression::FalseKeyword(d) => Expression::FalseKeyword(d.clone()),

            Expression::ArrayLiteral(n) => {
                let elements = n
                    .elements
                    .iter()
                    .map(|e| self.transform_expression_owned(e))
                    .collect();
                Expression::ArrayLiteral(ArrayLiteralExpression {
                    data: n.data.clone(),
                    elements: self.factory.alloc_vec(elements),
                })
            }
            Expression::ObjectLiteral(n) => {
                let properties = n
                    .properties
                    .iter()
                    .map(|p| match p {
                        ObjectLiteralElement::PropertyAssignment(pa) => {
                            ObjectLiteralElement::PropertyAssignment(PropertyAssignment {
                                data: pa.data.clone(),
                                name: self.transform_property_name(&pa.name),
                                initializer: self.transform_expression(pa.initializer),
                            })
                        }
                        ObjectLiteralElement::ShorthandPropertyAssignment(sp) => {
                            ObjectLiteralElement::ShorthandPropertyAssignment(
                                ShorthandPropertyAssignment {
                                    data: sp.data.clone(),
                                    name: sp.name.clone(),
                                },
                            )
                        }
                    })
                    .collect();
                Expression::ObjectLiteral(ObjectLiteralExpression {
                    data: n.data.clone(),
                    properties: self.factory.alloc_vec(properties),
                })
            }
            Expression::PropertyAccess(n) => {
                Expression::PropertyAccess(PropertyAccessExpression {
                    data: n.data.clone(),
                    expression: self.transform_expression(n.expression),
                    name: n.name.clone(),
                })
            }
            Expression::ElementAccess(n) => {
                Expression::ElementAccess(ElementAccessExpression {
                    data: n.data.clone(),
                    expression: self.transform_expression(n.expression),
                    argument_expression: self.transform_expression(n.argument_expression),
                })
            }
            Expression::Call(n) => {
                let arguments = n
                    .arguments
                    .iter()
                    .map(|a| self.transform_expression_owned(a))
                    .collect();
                Expression::Call(CallExpression {
                    data: n.data.clone(),
                    expression: self.transform_expression(n.expression),
                    arguments: self.factory.alloc_vec(arguments),
                })
            }
            Expression::New(n) => {
                let arguments = n.arguments.map(|args| {
                    let transformed: Vec<_> = args
                        .iter()
                        .map(|a| self.transform_expression_owned(a))
                        .collect();
                    self.factory.alloc_vec(transformed)
                });
                Expression::New(NewExpression {
                    data: n.data.clone(),
                    expression: self.transform_expression(n.expression),
                    arguments,
                })
            }
            Expression::Parenthesized(n) => {
                Expression::Parenthesized(ParenthesizedExpression {
                    data: n.data.clone(),
                    expression: self.transform_expression(n.expression),
                })
            }
            Expression::FunctionExpression(n) => {
                let body = self.wrap_statements_body(n.body.statements, false);
                Expression::FunctionExpression(FunctionExpression {
                    data: n.data.clone(),
                    name: n.name.clone(),
                    parameters: self.transform_parameters(n.parameters),
                    body: self.arena.alloc(body),
                })
            }
            Expression::ArrowFunction(n) => {
                let body = match &n.body {
                    ArrowFunctionBody::Block(block) => {
                        let wrapped = self.wrap_statements_body(block.statements, false);
                        ArrowFunctionBody::Block(self.arena.alloc(wrapped))
                    }
                    ArrowFunctionBody::Expression(e) => {
                        let wrapped =
                            self.wrap_body(Vec::new(), false, Some(self.transform_expression(e)));
                        ArrowFunctionBody::Block(self.arena.alloc(wrapped))
                    }
                };
                Expression::ArrowFunction(ArrowFunction {
                    data: n.data.clone(),
                    parameters: self.transform_parameters(n.parameters),
                    body,
                })
            }
            Expression::PrefixUnary(n) => {
                Expression::PrefixUnary(PrefixUnaryExpression {
                    data: n.data.clone(),
                    operator: n.operator,
                    operand: self.transform_expression(n.operand),
                })
            }
            Expression::PostfixUnary(n) => {
                Expression::PostfixUnary(PostfixUnaryExpression {
                    data: n.data.clone(),
                    operand: self.transform_expression(n.operand),
                    operator: n.operator,
                })
            }
            Expression::Binary(n) => Expression::Binary(BinaryExpression {
                data: n.data.clone(),
                left: self.transform_expression(n.left),
                operator_token: n.operator_token.clone(),
                right: self.transform_expression(n.right),
            }),
            Expression::Conditional(n) => {
                Expression::Conditional(ConditionalExpression {
                    data: n.data.clone(),
                    condition: self.transform_expression(n.condition),
                    when_true: self.transform_expression(n.when_true),
                    when_false: self.transform_expression(n.when_false),
                })
            }
        }
    }
}
