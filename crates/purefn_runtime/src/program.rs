//! Owned program form and lowering.
//!
//! The evaluator receives source text, but a callable must own its code
//! after the compile-time arena is gone, so the arena AST is lowered into
//! this owned form once per `instantiate`. Lowering is mechanical; static
//! member keys become plain strings, and arrow expression bodies become
//! bodies ending in a return.

use crate::error::RuntimeError;
use purefn_ast::node as ast;
use purefn_ast::syntax_kind::SyntaxKind;
use std::rc::Rc;

// ============================================================================
// Program form
// ============================================================================

#[derive(Debug, Clone)]
pub enum Pattern {
    Identifier(String),
    Object(Vec<PatternProperty>),
    Array(Vec<PatternElement>),
}

#[derive(Debug, Clone)]
pub struct PatternProperty {
    /// The source property to read.
    pub key: String,
    pub binding: Pattern,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct PatternElement {
    pub binding: Pattern,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub pattern: Pattern,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Gt,
    Le,
    Ge,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// An assignable location.
#[derive(Debug, Clone)]
pub enum Target {
    Ident(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    /// Static member access: `a.b`, or `a["b"]` with a literal key.
    Member(Box<Expr>, String),
    /// Dynamic member access. Cannot come out of the validating pipeline;
    /// the evaluator re-checks the key against the capability policy.
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    New(Box<Expr>, Vec<Expr>),
    Function {
        name: Option<String>,
        params: Vec<Param>,
        body: Rc<Vec<Stmt>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Target,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Target,
        value: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },
}

#[derive(Debug, Clone)]
pub enum ForInit {
    Decl(Vec<(Pattern, Option<Expr>)>),
    Expr(Expr),
}

/// The head binding of a `for-in`/`for-of` loop.
#[derive(Debug, Clone)]
pub enum ForHead {
    Decl(Pattern),
    Target(Target),
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Empty,
    Expr(Expr),
    VarDecl(Vec<(Pattern, Option<Expr>)>),
    Func {
        name: String,
        params: Vec<Param>,
        body: Rc<Vec<Stmt>>,
    },
    Block(Vec<Stmt>),
    If {
        condition: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
    },
    For {
        init: Option<ForInit>,
        condition: Option<Expr>,
        incrementor: Option<Expr>,
        body: Box<Stmt>,
    },
    ForIn {
        head: ForHead,
        object: Expr,
        body: Box<Stmt>,
    },
    ForOf {
        head: ForHead,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Throw(Expr),
}

/// A lowered top-level function, ready to wrap into a callable.
#[derive(Debug, Clone)]
pub struct LoweredFunction {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: Rc<Vec<Stmt>>,
}

// ============================================================================
// Lowering
// ============================================================================

fn internal(what: &str) -> RuntimeError {
    RuntimeError::Internal(what.to_string())
}

/// Extract and lower the single top-level function of a parsed file.
pub fn lower_function(source_file: &ast::SourceFile<'_>) -> Result<LoweredFunction, RuntimeError> {
    let mut meaningful = source_file
        .statements
        .iter()
        .filter(|s| !matches!(s, ast::Statement::EmptyStatement(_)));
    let stmt = meaningful
        .next()
        .ok_or_else(|| internal("empty program"))?;
    if meaningful.next().is_some() {
        return Err(internal("more than one top-level statement"));
    }

    match stmt {
        ast::Statement::FunctionDeclaration(f) => Ok(LoweredFunction {
            name: f.name.as_ref().map(|n| n.text_name.clone()),
            params: lower_params(f.parameters)?,
            body: Rc::new(lower_statements(f.body.statements)?),
        }),
        ast::Statement::ExpressionStatement(n) => match n.expression.unwrap_parens() {
            ast::Expression::FunctionExpression(f) => Ok(LoweredFunction {
                name: f.name.as_ref().map(|id| id.text_name.clone()),
                params: lower_params(f.parameters)?,
                body: Rc::new(lower_statements(f.body.statements)?),
            }),
            ast::Expression::ArrowFunction(a) => Ok(LoweredFunction {
                name: None,
                params: lower_params(a.parameters)?,
                body: Rc::new(lower_arrow_body(&a.body)?),
            }),
            _ => Err(internal("top-level statement is not a function")),
        },
        _ => Err(internal("top-level statement is not a function")),
    }
}

fn lower_statements(statements: &[ast::Statement<'_>]) -> Result<Vec<Stmt>, RuntimeError> {
    statements.iter().map(lower_statement).collect()
}

fn lower_statement(stmt: &ast::Statement<'_>) -> Result<Stmt, RuntimeError> {
    Ok(match stmt {
        ast::Statement::EmptyStatement(_) => Stmt::Empty,
        ast::Statement::ExpressionStatement(n) => Stmt::Expr(lower_expression(n.expression)?),
        ast::Statement::VariableStatement(n) => {
            Stmt::VarDecl(lower_declarations(&n.declaration_list)?)
        }
        ast::Statement::FunctionDeclaration(f) => Stmt::Func {
            name: f
                .name
                .as_ref()
                .map(|n| n.text_name.clone())
                .unwrap_or_default(),
            params: lower_params(f.parameters)?,
            body: Rc::new(lower_statements(f.body.statements)?),
        },
        ast::Statement::Block(n) => Stmt::Block(lower_statements(n.statements)?),
        ast::Statement::IfStatement(n) => Stmt::If {
            condition: lower_expression(n.expression)?,
            then: Box::new(lower_statement(n.then_statement)?),
            otherwise: match n.else_statement {
                Some(s) => Some(Box::new(lower_statement(s)?)),
                None => None,
            },
        },
        ast::Statement::WhileStatement(n) => Stmt::While {
            condition: lower_expression(n.expression)?,
            body: Box::new(lower_statement(n.statement)?),
        },
        ast::Statement::DoStatement(n) => Stmt::DoWhile {
            body: Box::new(lower_statement(n.statement)?),
            condition: lower_expression(n.expression)?,
        },
        ast::Statement::ForStatement(n) => Stmt::For {
            init: match &n.initializer {
                Some(ast::ForInitializer::VariableDeclarationList(list)) => {
                    Some(ForInit::Decl(lower_declarations(list)?))
                }
                Some(ast::ForInitializer::Expression(e)) => {
                    Some(ForInit::Expr(lower_expression(e)?))
                }
                None => None,
            },
            condition: n.condition.map(lower_expression).transpose()?,
            incrementor: n.incrementor.map(lower_expression).transpose()?,
            body: Box::new(lower_statement(n.statement)?),
        },
        ast::Statement::ForInStatement(n) => Stmt::ForIn {
            head: lower_for_head(&n.initializer)?,
            object: lower_expression(n.expression)?,
            body: Box::new(lower_statement(n.statement)?),
        },
        ast::Statement::ForOfStatement(n) => Stmt::ForOf {
            head: lower_for_head(&n.initializer)?,
            iterable: lower_expression(n.expression)?,
            body: Box::new(lower_statement(n.statement)?),
        },
        ast::Statement::ReturnStatement(n) => {
            Stmt::Return(n.expression.map(lower_expression).transpose()?)
        }
        ast::Statement::BreakStatement(_) => Stmt::Break,
        ast::Statement::ContinueStatement(_) => Stmt::Continue,
        ast::Statement::ThrowStatement(n) => Stmt::Throw(lower_expression(n.expression)?),
    })
}

fn lower_declarations(
    list: &ast::VariableDeclarationList<'_>,
) -> Result<Vec<(Pattern, Option<Expr>)>, RuntimeError> {
    list.declarations
        .iter()
        .map(|decl| {
            Ok((
                lower_pattern(&decl.name)?,
                decl.initializer.map(lower_expression).transpose()?,
            ))
        })
        .collect()
}

fn lower_for_head(init: &ast::ForInitializer<'_>) -> Result<ForHead, RuntimeError> {
    match init {
        ast::ForInitializer::VariableDeclarationList(list) => {
            let decl = list
                .declarations
                .first()
                .ok_or_else(|| internal("empty loop declaration"))?;
            Ok(ForHead::Decl(lower_pattern(&decl.name)?))
        }
        ast::ForInitializer::Expression(expr) => Ok(ForHead::Target(lower_target(expr)?)),
    }
}

fn lower_params(params: &[ast::ParameterDeclaration<'_>]) -> Result<Vec<Param>, RuntimeError> {
    params
        .iter()
        .map(|param| {
            Ok(Param {
                pattern: lower_pattern(&param.name)?,
                default: param.initializer.map(lower_expression).transpose()?,
            })
        })
        .collect()
}

fn lower_pattern(name: &ast::BindingName<'_>) -> Result<Pattern, RuntimeError> {
    Ok(match name {
        ast::BindingName::Identifier(id) => Pattern::Identifier(id.text_name.clone()),
        ast::BindingName::ObjectBindingPattern(pattern) => {
            let mut properties = Vec::with_capacity(pattern.elements.len());
            for elem in pattern.elements.iter() {
                let binding = lower_pattern(&elem.name)?;
                let key = match &elem.property_name {
                    Some(prop) => lower_property_key(prop)?,
                    None => match &binding {
                        Pattern::Identifier(name) => name.clone(),
                        _ => return Err(internal("shorthand pattern without a name")),
                    },
                };
                properties.push(PatternProperty {
                    key,
                    binding,
                    default: elem.initializer.map(lower_expression).transpose()?,
                });
            }
            Pattern::Object(properties)
        }
        ast::BindingName::ArrayBindingPattern(pattern) => {
            let mut elements = Vec::with_capacity(pattern.elements.len());
            for elem in pattern.elements.iter() {
                elements.push(PatternElement {
                    binding: lower_pattern(&elem.name)?,
                    default: elem.initializer.map(lower_expression).transpose()?,
                });
            }
            Pattern::Array(elements)
        }
    })
}

fn lower_property_key(name: &ast::PropertyName<'_>) -> Result<String, RuntimeError> {
    Ok(match name {
        ast::PropertyName::Identifier(id) => id.text_name.clone(),
        ast::PropertyName::StringLiteral(s) => s.text_value.clone(),
        ast::PropertyName::NumericLiteral(n) => n.text_value.clone(),
        ast::PropertyName::Computed(c) => match c.expression.unwrap_parens() {
            ast::Expression::StringLiteral(s) => s.text_value.clone(),
            _ => return Err(internal("computed key is not a string literal")),
        },
    })
}

fn lower_number(literal: &ast::NumericLiteral) -> Result<f64, RuntimeError> {
    let text = &literal.text_value;
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .map_err(|_| internal("bad hexadecimal literal"));
    }
    text.parse()
        .map_err(|_| internal("bad numeric literal"))
}

fn lower_target(expr: &ast::Expression<'_>) -> Result<Target, RuntimeError> {
    Ok(match expr.unwrap_parens() {
        ast::Expression::Identifier(id) => Target::Ident(id.text_name.clone()),
        ast::Expression::PropertyAccess(n) => Target::Member(
            Box::new(lower_expression(n.expression)?),
            n.name.text_name.clone(),
        ),
        ast::Expression::ElementAccess(n) => match n.argument_expression.unwrap_parens() {
            ast::Expression::StringLiteral(s) => Target::Member(
                Box::new(lower_expression(n.expression)?),
                s.text_value.clone(),
            ),
            key => Target::Index(
                Box::new(lower_expression(n.expression)?),
                Box::new(lower_expression(key)?),
            ),
        },
        _ => return Err(internal("invalid assignment target")),
    })
}

fn lower_arrow_body(body: &ast::ArrowFunctionBody<'_>) -> Result<Vec<Stmt>, RuntimeError> {
    match body {
        ast::ArrowFunctionBody::Block(block) => lower_statements(block.statements),
        ast::ArrowFunctionBody::Expression(e) => Ok(vec![Stmt::Return(Some(lower_expression(e)?))]),
    }
}

fn lower_expression(expr: &ast::Expression<'_>) -> Result<Expr, RuntimeError> {
    Ok(match expr {
        ast::Expression::Identifier(id) => Expr::Ident(id.text_name.clone()),
        ast::Expression::StringLiteral(s) => Expr::Str(s.text_value.clone()),
        ast::Expression::NumericLiteral(n) => Expr::Number(lower_number(n)?),
        ast::Expression::NullKeyword(_) => Expr::Null,
        ast::Expression::UndefinedKeyword(_) => Expr::Undefined,
        ast::Expression::TrueKeyword(_) => Expr::Bool(true),
        ast::Expression::FalseKeyword(_) => Expr::Bool(false),
        ast::Expression::ThisKeyword(_) => return Err(internal("self-reference in program")),
        ast::Expression::Parenthesized(n) => lower_expression(n.expression)?,
        ast::Expression::ArrayLiteral(n) => Expr::Array(
            n.elements
                .iter()
                .map(lower_expression)
                .collect::<Result<_, _>>()?,
        ),
        ast::Expression::ObjectLiteral(n) => {
            let mut properties = Vec::with_capacity(n.properties.len());
            for prop in n.properties.iter() {
                match prop {
                    ast::ObjectLiteralElement::PropertyAssignment(p) => {
                        properties.push((lower_property_key(&p.name)?, lower_expression(p.initializer)?));
                    }
                    ast::ObjectLiteralElement::ShorthandPropertyAssignment(p) => {
                        properties.push((p.name.text_name.clone(), Expr::Ident(p.name.text_name.clone())));
                    }
                }
            }
            Expr::Object(properties)
        }
        ast::Expression::PropertyAccess(n) => Expr::Member(
            Box::new(lower_expression(n.expression)?),
            n.name.text_name.clone(),
        ),
        ast::Expression::ElementAccess(n) => match n.argument_expression.unwrap_parens() {
            ast::Expression::StringLiteral(s) => Expr::Member(
                Box::new(lower_expression(n.expression)?),
                s.text_value.clone(),
            ),
            key => Expr::Index(
                Box::new(lower_expression(n.expression)?),
                Box::new(lower_expression(key)?),
            ),
        },
        ast::Expression::Call(n) => Expr::Call(
            Box::new(lower_expression(n.expression)?),
            n.arguments
                .iter()
                .map(lower_expression)
                .collect::<Result<_, _>>()?,
        ),
        ast::Expression::New(n) => Expr::New(
            Box::new(lower_expression(n.expression)?),
            n.arguments
                .unwrap_or(&[])
                .iter()
                .map(lower_expression)
                .collect::<Result<_, _>>()?,
        ),
        ast::Expression::FunctionExpression(f) => Expr::Function {
            name: f.name.as_ref().map(|id| id.text_name.clone()),
            params: lower_params(f.parameters)?,
            body: Rc::new(lower_statements(f.body.statements)?),
        },
        ast::Expression::ArrowFunction(a) => Expr::Function {
            name: None,
            params: lower_params(a.parameters)?,
            body: Rc::new(lower_arrow_body(&a.body)?),
        },
        ast::Expression::PrefixUnary(n) => match n.operator {
            SyntaxKind::PlusPlusToken | SyntaxKind::MinusMinusToken => Expr::Update {
                op: if n.operator == SyntaxKind::PlusPlusToken {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                },
                prefix: true,
                target: lower_target(n.operand)?,
            },
            SyntaxKind::MinusToken => Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(lower_expression(n.operand)?),
            },
            SyntaxKind::PlusToken => Expr::Unary {
                op: UnaryOp::Pos,
                operand: Box::new(lower_expression(n.operand)?),
            },
            SyntaxKind::ExclamationToken => Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(lower_expression(n.operand)?),
            },
            _ => return Err(internal("unsupported unary operator")),
        },
        ast::Expression::PostfixUnary(n) => Expr::Update {
            op: if n.operator == SyntaxKind::PlusPlusToken {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            },
            prefix: false,
            target: lower_target(n.operand)?,
        },
        ast::Expression::Binary(n) => lower_binary(n)?,
        ast::Expression::Conditional(n) => Expr::Conditional {
            condition: Box::new(lower_expression(n.condition)?),
            when_true: Box::new(lower_expression(n.when_true)?),
            when_false: Box::new(lower_expression(n.when_false)?),
        },
    })
}

fn lower_binary(n: &ast::BinaryExpression<'_>) -> Result<Expr, RuntimeError> {
    let op_kind = n.operator_token.data.kind;

    if op_kind.is_assignment_operator() {
        let op = match op_kind {
            SyntaxKind::EqualsToken => AssignOp::Assign,
            SyntaxKind::PlusEqualsToken => AssignOp::Add,
            SyntaxKind::MinusEqualsToken => AssignOp::Sub,
            SyntaxKind::AsteriskEqualsToken => AssignOp::Mul,
            SyntaxKind::SlashEqualsToken => AssignOp::Div,
            SyntaxKind::PercentEqualsToken => AssignOp::Rem,
            _ => return Err(internal("unsupported assignment operator")),
        };
        return Ok(Expr::Assign {
            op,
            target: lower_target(n.left)?,
            value: Box::new(lower_expression(n.right)?),
        });
    }

    if let Some(op) = match op_kind {
        SyntaxKind::AmpersandAmpersandToken => Some(LogicalOp::And),
        SyntaxKind::BarBarToken => Some(LogicalOp::Or),
        SyntaxKind::QuestionQuestionToken => Some(LogicalOp::Nullish),
        _ => None,
    } {
        return Ok(Expr::Logical {
            op,
            left: Box::new(lower_expression(n.left)?),
            right: Box::new(lower_expression(n.right)?),
        });
    }

    let op = match op_kind {
        SyntaxKind::PlusToken => BinaryOp::Add,
        SyntaxKind::MinusToken => BinaryOp::Sub,
        SyntaxKind::AsteriskToken => BinaryOp::Mul,
        SyntaxKind::SlashToken => BinaryOp::Div,
        SyntaxKind::PercentToken => BinaryOp::Rem,
        SyntaxKind::LessThanToken => BinaryOp::Lt,
        SyntaxKind::GreaterThanToken => BinaryOp::Gt,
        SyntaxKind::LessThanEqualsToken => BinaryOp::Le,
        SyntaxKind::GreaterThanEqualsToken => BinaryOp::Ge,
        SyntaxKind::EqualsEqualsToken => BinaryOp::LooseEq,
        SyntaxKind::ExclamationEqualsToken => BinaryOp::LooseNe,
        SyntaxKind::EqualsEqualsEqualsToken => BinaryOp::StrictEq,
        SyntaxKind::ExclamationEqualsEqualsToken => BinaryOp::StrictNe,
        SyntaxKind::InKeyword => BinaryOp::In,
        _ => return Err(internal("unsupported binary operator")),
    };
    Ok(Expr::Binary {
        op,
        left: Box::new(lower_expression(n.left)?),
        right: Box::new(lower_expression(n.right)?),
    })
}
