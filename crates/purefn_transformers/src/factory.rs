//! Synthetic AST node construction.
//!
//! Builds the handful of node shapes the guard transform injects. All nodes
//! are marked SYNTHESIZED and carry empty source ranges.

use bumpalo::Bump;
use purefn_ast::node::*;
use purefn_ast::syntax_kind::SyntaxKind;
use purefn_core::intern::StringInterner;

/// Builds synthetic nodes in the compilation arena.
pub struct NodeFactory<'a> {
    arena: &'a Bump,
    interner: StringInterner,
}

impl<'a> NodeFactory<'a> {
    pub fn new(arena: &'a Bump, interner: StringInterner) -> Self {
        Self { arena, interner }
    }

    pub fn identifier(&self, name: &str) -> Identifier {
        Identifier {
            data: NodeData::synthesized(SyntaxKind::Identifier),
            text: self.interner.intern(name),
            text_name: name.to_string(),
        }
    }

    pub fn identifier_expr(&self, name: &str) -> &'a Expression<'a> {
        self.arena
            .alloc(Expression::Identifier(self.identifier(name)))
    }

    pub fn number_expr(&self, value: u64) -> &'a Expression<'a> {
        let text_value = value.to_string();
        self.arena.alloc(Expression::NumericLiteral(NumericLiteral {
            data: NodeData::synthesized(SyntaxKind::NumericLiteral),
            text: self.interner.intern(&text_value),
            text_value,
        }))
    }

    pub fn binary(
        &self,
        left: &'a Expression<'a>,
        operator: SyntaxKind,
        right: &'a Expression<'a>,
    ) -> &'a Expression<'a> {
        self.arena.alloc(Expression::Binary(BinaryExpression {
            data: NodeData::synthesized(SyntaxKind::BinaryExpression),
            left,
            operator_token: Token {
                data: NodeData::synthesized(operator),
            },
            right,
        }))
    }

    /// `name(...)` as an expression statement.
    pub fn call_statement(&self, name: &str) -> Statement<'a> {
        let callee = self.identifier_expr(name);
        let call = self.arena.alloc(Expression::Call(CallExpression {
            data: NodeData::synthesized(SyntaxKind::CallExpression),
            expression: callee,
            arguments: &[],
        }));
        Statement::ExpressionStatement(ExpressionStatement {
            data: NodeData::synthesized(SyntaxKind::ExpressionStatement),
            expression: call,
        })
    }

    /// `name = expr;`
    pub fn assignment_statement(&self, name: &str, value: &'a Expression<'a>) -> Statement<'a> {
        let target = self.identifier_expr(name);
        let assignment = self.binary(target, SyntaxKind::EqualsToken, value);
        Statement::ExpressionStatement(ExpressionStatement {
            data: NodeData::synthesized(SyntaxKind::ExpressionStatement),
            expression: assignment,
        })
    }

    /// `let name = init;` or `const name = init;`
    pub fn declaration_statement(
        &self,
        keyword: SyntaxKind,
        name: &str,
        initializer: &'a Expression<'a>,
    ) -> Statement<'a> {
        let flags = match keyword {
            SyntaxKind::ConstKeyword => purefn_ast::types::NodeFlags::CONST,
            _ => purefn_ast::types::NodeFlags::LET,
        };
        let mut list_data = NodeData::synthesized(SyntaxKind::VariableDeclarationList);
        list_data.flags |= flags;

        let declaration = VariableDeclaration {
            data: NodeData::synthesized(SyntaxKind::VariableDeclaration),
            name: BindingName::Identifier(self.identifier(name)),
            initializer: Some(initializer),
        };
        Statement::VariableStatement(VariableStatement {
            data: NodeData::synthesized(SyntaxKind::VariableStatement),
            declaration_list: VariableDeclarationList {
                data: list_data,
                declarations: self.alloc_vec(vec![declaration]),
            },
        })
    }

    /// `if (cond) { ...then }`
    pub fn if_statement(&self, condition: &'a Expression<'a>, then: Vec<Statement<'a>>) -> Statement<'a> {
        let then_block = Statement::Block(self.block(then));
        Statement::IfStatement(IfStatement {
            data: NodeData::synthesized(SyntaxKind::IfStatement),
            expression: condition,
            then_statement: self.arena.alloc(then_block),
            else_statement: None,
        })
    }

    /// `() => { ...body }`
    pub fn arrow_with_block(&self, body: Vec<Statement<'a>>) -> &'a Expression<'a> {
        let block = self.arena.alloc(self.block(body));
        self.arena.alloc(Expression::ArrowFunction(ArrowFunction {
            data: NodeData::synthesized(SyntaxKind::ArrowFunction),
            parameters: &[],
            body: ArrowFunctionBody::Block(block),
        }))
    }

    /// `return expr;`
    pub fn return_statement(&self, expression: &'a Expression<'a>) -> Statement<'a> {
        Statement::ReturnStatement(ReturnStatement {
            data: NodeData::synthesized(SyntaxKind::ReturnStatement),
            expression: Some(expression),
        })
    }

    pub fn block(&self, statements: Vec<Statement<'a>>) -> Block<'a> {
        Block {
            data: NodeData::synthesized(SyntaxKind::Block),
            statements: self.alloc_vec(statements),
        }
    }

    pub fn alloc_vec<T>(&self, vec: Vec<T>) -> &'a [T] {
        if vec.is_empty() {
            return &[];
        }
        self.arena.alloc_slice_fill_iter(vec)
    }

    pub fn alloc<T>(&self, value: T) -> &'a T {
        self.arena.alloc(value)
    }
}
