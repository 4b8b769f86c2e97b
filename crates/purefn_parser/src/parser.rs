//! The subject-language parser implementation.
//!
//! A recursive descent parser consuming tokens from the scanner and building
//! an arena-allocated AST. Parse failures are collected as diagnostics with
//! local recovery so a single failure does not cascade; the pipeline turns
//! the first error into a fatal Parse failure.

use bumpalo::Bump;
use purefn_ast::node::*;
use purefn_ast::syntax_kind::SyntaxKind;
use purefn_ast::types::*;
use purefn_core::intern::StringInterner;
use purefn_core::text::TextSpan;
use purefn_diagnostics::{messages, Diagnostic, DiagnosticCollection};
use purefn_scanner::Scanner;

use crate::precedence::{get_binary_operator_precedence, OperatorPrecedence};

/// Maximum recursion depth to prevent stack overflow on deeply nested input.
const MAX_RECURSION_DEPTH: u32 = 200;

/// Allocate a Vec into the arena as a slice.
fn alloc_vec_in<T>(arena: &Bump, vec: Vec<T>) -> &[T] {
    if vec.is_empty() {
        return &[];
    }
    arena.alloc_slice_fill_iter(vec)
}

/// The parser produces a SourceFile AST from subject source text.
pub struct Parser<'a> {
    arena: &'a Bump,
    scanner: Scanner,
    interner: StringInterner,
    file_name: String,
    source_text: String,
    diagnostics: DiagnosticCollection,
    /// Tracks recursion depth to prevent stack overflow on deeply nested input.
    recursion_depth: u32,
}

impl<'a> Parser<'a> {
    pub fn new(
        arena: &'a Bump,
        interner: StringInterner,
        file_name: &str,
        source_text: &str,
    ) -> Self {
        let scanner = Scanner::new(source_text);
        Self {
            arena,
            scanner,
            interner,
            file_name: file_name.to_string(),
            source_text: source_text.to_string(),
            diagnostics: DiagnosticCollection::new(),
            recursion_depth: 0,
        }
    }

    /// Parse the whole source text into a SourceFile.
    pub fn parse_source_file(&mut self) -> SourceFile<'a> {
        self.next_token();

        let statements = self.parse_statements();
        let end = self.source_text.len() as u32;

        SourceFile {
            data: NodeData::new(SyntaxKind::SourceFile, 0, end),
            statements,
            file_name: std::mem::take(&mut self.file_name),
            text: self.source_text.clone(),
        }
    }

    /// Take the accumulated diagnostics (parser and scanner).
    pub fn take_diagnostics(&mut self) -> DiagnosticCollection {
        let mut diags = std::mem::take(&mut self.diagnostics);
        for d in self.scanner.take_diagnostics().into_diagnostics() {
            diags.add(d);
        }
        diags
    }

    // ========================================================================
    // Token management
    // ========================================================================

    #[inline]
    fn current_token(&self) -> SyntaxKind {
        self.scanner.token()
    }

    #[inline]
    fn next_token(&mut self) -> SyntaxKind {
        self.scanner.scan()
    }

    #[inline]
    fn token_pos(&self) -> u32 {
        self.scanner.token_start() as u32
    }

    #[inline]
    fn token_end(&self) -> u32 {
        self.scanner.token_end() as u32
    }

    #[inline]
    fn token_value(&self) -> &str {
        self.scanner.token_value()
    }

    fn expect_token(&mut self, kind: SyntaxKind) -> Token {
        let pos = self.token_pos();
        let end = self.token_end();
        if self.current_token() == kind {
            let token = Token::new(kind, pos, end);
            self.next_token();
            token
        } else {
            let text = kind.token_text().unwrap_or("token");
            self.error(&messages::_0_EXPECTED, &[text]);
            Token::new(kind, pos, pos)
        }
    }

    fn optional_token(&mut self, kind: SyntaxKind) -> Option<Token> {
        if self.current_token() == kind {
            let pos = self.token_pos();
            let end = self.token_end();
            self.next_token();
            Some(Token::new(kind, pos, end))
        } else {
            None
        }
    }

    fn parse_expected_semicolon(&mut self) {
        if self.current_token() == SyntaxKind::SemicolonToken {
            self.next_token();
        }
        // ASI: no error on line break, close brace, or EOF
    }

    fn error(&mut self, msg: &purefn_diagnostics::DiagnosticMessage, args: &[&str]) {
        let span = TextSpan::from_bounds(self.token_pos(), self.token_end());
        self.diagnostics.add(Diagnostic::with_span(span, msg, args));
    }

    fn intern(&self, s: &str) -> purefn_core::intern::InternedString {
        self.interner.intern(s)
    }

    // ========================================================================
    // Statement parsing
    // ========================================================================

    fn parse_statements(&mut self) -> &'a [Statement<'a>] {
        let mut statements = Vec::new();
        while self.current_token() != SyntaxKind::EndOfFileToken
            && self.current_token() != SyntaxKind::CloseBraceToken
        {
            let saved_pos = self.scanner.token_start();
            let stmt = self.parse_statement();
            statements.push(stmt);

            // Recovery: skip forward if a failed production made no progress,
            // so one error cannot loop forever.
            if self.scanner.token_start() == saved_pos {
                self.skip_to_next_statement();
            }
        }
        alloc_vec_in(self.arena, statements)
    }

    fn skip_to_next_statement(&mut self) {
        while self.current_token() != SyntaxKind::EndOfFileToken {
            match self.current_token() {
                SyntaxKind::VarKeyword
                | SyntaxKind::LetKeyword
                | SyntaxKind::ConstKeyword
                | SyntaxKind::FunctionKeyword
                | SyntaxKind::IfKeyword
                | SyntaxKind::ForKeyword
                | SyntaxKind::WhileKeyword
                | SyntaxKind::DoKeyword
                | SyntaxKind::ReturnKeyword
                | SyntaxKind::ThrowKeyword
                | SyntaxKind::BreakKeyword
                | SyntaxKind::ContinueKeyword
                | SyntaxKind::CloseBraceToken => return,
                _ => {
                    self.next_token();
                }
            }
        }
    }

    fn parse_statement(&mut self) -> Statement<'a> {
        match self.current_token() {
            SyntaxKind::SemicolonToken => {
                let pos = self.token_pos();
                let end = self.token_end();
                self.next_token();
                Statement::EmptyStatement(NodeData::new(SyntaxKind::EmptyStatement, pos, end))
            }
            SyntaxKind::OpenBraceToken => Statement::Block(self.parse_block()),
            SyntaxKind::VarKeyword | SyntaxKind::LetKeyword | SyntaxKind::ConstKeyword => {
                self.parse_variable_statement()
            }
            SyntaxKind::FunctionKeyword => self.parse_function_declaration(),
            SyntaxKind::IfKeyword => self.parse_if_statement(),
            SyntaxKind::WhileKeyword => self.parse_while_statement(),
            SyntaxKind::DoKeyword => self.parse_do_statement(),
            SyntaxKind::ForKeyword => self.parse_for_statement(),
            SyntaxKind::ReturnKeyword => self.parse_return_statement(),
            SyntaxKind::BreakKeyword => {
                let pos = self.token_pos();
                let end = self.token_end();
                self.next_token();
                self.parse_expected_semicolon();
                Statement::BreakStatement(BreakStatement {
                    data: NodeData::new(SyntaxKind::BreakStatement, pos, end),
                })
            }
            SyntaxKind::ContinueKeyword => {
                let pos = self.token_pos();
                let end = self.token_end();
                self.next_token();
                self.parse_expected_semicolon();
                Statement::ContinueStatement(ContinueStatement {
                    data: NodeData::new(SyntaxKind::ContinueStatement, pos, end),
                })
            }
            SyntaxKind::ThrowKeyword => {
                let pos = self.token_pos();
                self.next_token();
                let expression = self.parse_expression_alloc();
                let end = self.token_pos();
                self.parse_expected_semicolon();
                Statement::ThrowStatement(ThrowStatement {
                    data: NodeData::new(SyntaxKind::ThrowStatement, pos, end),
                    expression,
                })
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_block(&mut self) -> Block<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::OpenBraceToken);
        let statements = self.parse_statements();
        let end = self.token_end();
        self.expect_token(SyntaxKind::CloseBraceToken);
        Block {
            data: NodeData::new(SyntaxKind::Block, pos, end),
            statements,
        }
    }

    fn parse_variable_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        let declaration_list = self.parse_variable_declaration_list();
        let end = self.token_pos();
        self.parse_expected_semicolon();
        Statement::VariableStatement(VariableStatement {
            data: NodeData::new(SyntaxKind::VariableStatement, pos, end),
            declaration_list,
        })
    }

    /// Parse `var|let|const decl (, decl)*` without the trailing semicolon.
    fn parse_variable_declaration_list(&mut self) -> VariableDeclarationList<'a> {
        let pos = self.token_pos();
        let flags = match self.current_token() {
            SyntaxKind::LetKeyword => NodeFlags::LET,
            SyntaxKind::ConstKeyword => NodeFlags::CONST,
            _ => NodeFlags::NONE,
        };
        self.next_token();

        let mut declarations = Vec::new();
        loop {
            declarations.push(self.parse_variable_declaration());
            if self.optional_token(SyntaxKind::CommaToken).is_none() {
                break;
            }
        }
        let end = self.token_pos();

        let mut data = NodeData::new(SyntaxKind::VariableDeclarationList, pos, end);
        data.flags = flags;
        VariableDeclarationList {
            data,
            declarations: alloc_vec_in(self.arena, declarations),
        }
    }

    fn parse_variable_declaration(&mut self) -> VariableDeclaration<'a> {
        let pos = self.token_pos();
        let name = self.parse_binding_name();
        let initializer = if self.optional_token(SyntaxKind::EqualsToken).is_some() {
            Some(self.parse_assignment_expression_alloc())
        } else {
            None
        };
        let end = self.token_pos();
        VariableDeclaration {
            data: NodeData::new(SyntaxKind::VariableDeclaration, pos, end),
            name,
            initializer,
        }
    }

    fn parse_function_declaration(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::FunctionKeyword);
        let name = if self.current_token() == SyntaxKind::Identifier {
            Some(self.parse_identifier())
        } else {
            None
        };
        let parameters = self.parse_parameters();
        let body = self.parse_block();
        let end = body.data.range.end;
        Statement::FunctionDeclaration(FunctionDeclaration {
            data: NodeData::new(SyntaxKind::FunctionDeclaration, pos, end),
            name,
            parameters,
            body,
        })
    }

    fn parse_if_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::IfKeyword);
        self.expect_token(SyntaxKind::OpenParenToken);
        let expression = self.parse_expression_alloc();
        self.expect_token(SyntaxKind::CloseParenToken);
        let then_statement = self.parse_statement_alloc();
        let else_statement = if self.optional_token(SyntaxKind::ElseKeyword).is_some() {
            Some(self.parse_statement_alloc())
        } else {
            None
        };
        let end = self.token_pos();
        Statement::IfStatement(IfStatement {
            data: NodeData::new(SyntaxKind::IfStatement, pos, end),
            expression,
            then_statement,
            else_statement,
        })
    }

    fn parse_while_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::WhileKeyword);
        self.expect_token(SyntaxKind::OpenParenToken);
        let expression = self.parse_expression_alloc();
        self.expect_token(SyntaxKind::CloseParenToken);
        let statement = self.parse_statement_alloc();
        let end = self.token_pos();
        Statement::WhileStatement(WhileStatement {
            data: NodeData::new(SyntaxKind::WhileStatement, pos, end),
            expression,
            statement,
        })
    }

    fn parse_do_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::DoKeyword);
        let statement = self.parse_statement_alloc();
        self.expect_token(SyntaxKind::WhileKeyword);
        self.expect_token(SyntaxKind::OpenParenToken);
        let expression = self.parse_expression_alloc();
        let end = self.token_end();
        self.expect_token(SyntaxKind::CloseParenToken);
        self.parse_expected_semicolon();
        Statement::DoStatement(DoStatement {
            data: NodeData::new(SyntaxKind::DoStatement, pos, end),
            statement,
            expression,
        })
    }

    /// Parse `for (...)`: counted, `for-in`, or `for-of`.
    fn parse_for_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::ForKeyword);
        self.expect_token(SyntaxKind::OpenParenToken);

        let initializer = match self.current_token() {
            SyntaxKind::SemicolonToken => None,
            SyntaxKind::VarKeyword | SyntaxKind::LetKeyword | SyntaxKind::ConstKeyword => Some(
                ForInitializer::VariableDeclarationList(self.parse_variable_declaration_list()),
            ),
            _ => Some(ForInitializer::Expression(self.parse_expression_alloc())),
        };

        match self.current_token() {
            SyntaxKind::InKeyword | SyntaxKind::OfKeyword => {
                let is_of = self.current_token() == SyntaxKind::OfKeyword;
                self.next_token();
                let expression = self.parse_expression_alloc();
                self.expect_token(SyntaxKind::CloseParenToken);
                let statement = self.parse_statement_alloc();
                let end = self.token_pos();
                let initializer = initializer.unwrap_or_else(|| {
                    self.error(&messages::VARIABLE_DECLARATION_EXPECTED, &[]);
                    ForInitializer::Expression(
                        self.arena
                            .alloc(Expression::NullKeyword(NodeData::new(
                                SyntaxKind::NullKeyword,
                                pos,
                                pos,
                            ))),
                    )
                });
                if is_of {
                    Statement::ForOfStatement(ForOfStatement {
                        data: NodeData::new(SyntaxKind::ForOfStatement, pos, end),
                        initializer,
                        expression,
                        statement,
                    })
                } else {
                    Statement::ForInStatement(ForInStatement {
                        data: NodeData::new(SyntaxKind::ForInStatement, pos, end),
                        initializer,
                        expression,
                        statement,
                    })
                }
            }
            _ => {
                self.expect_token(SyntaxKind::SemicolonToken);
                let condition = if self.current_token() != SyntaxKind::SemicolonToken {
                    Some(self.parse_expression_alloc())
                } else {
                    None
                };
                self.expect_token(SyntaxKind::SemicolonToken);
                let incrementor = if self.current_token() != SyntaxKind::CloseParenToken {
                    Some(self.parse_expression_alloc())
                } else {
                    None
                };
                self.expect_token(SyntaxKind::CloseParenToken);
                let statement = self.parse_statement_alloc();
                let end = self.token_pos();
                Statement::ForStatement(ForStatement {
                    data: NodeData::new(SyntaxKind::ForStatement, pos, end),
                    initializer,
                    condition,
                    incrementor,
                    statement,
                })
            }
        }
    }

    fn parse_return_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::ReturnKeyword);
        let expression = if self.current_token() != SyntaxKind::SemicolonToken
            && self.current_token() != SyntaxKind::CloseBraceToken
            && self.current_token() != SyntaxKind::EndOfFileToken
            && !self.scanner.has_preceding_line_break()
        {
            Some(self.parse_expression_alloc())
        } else {
            None
        };
        let end = self.token_pos();
        self.parse_expected_semicolon();
        Statement::ReturnStatement(ReturnStatement {
            data: NodeData::new(SyntaxKind::ReturnStatement, pos, end),
            expression,
        })
    }

    fn parse_expression_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        let expression = self.parse_expression_alloc();
        let end = self.token_pos();
        self.parse_expected_semicolon();
        Statement::ExpressionStatement(ExpressionStatement {
            data: NodeData::new(SyntaxKind::ExpressionStatement, pos, end),
            expression,
        })
    }

    fn parse_statement_alloc(&mut self) -> &'a Statement<'a> {
        let stmt = self.parse_statement();
        self.arena.alloc(stmt)
    }

    // ========================================================================
    // Binding patterns and parameters
    // ========================================================================

    fn parse_binding_name(&mut self) -> BindingName<'a> {
        match self.current_token() {
            SyntaxKind::OpenBraceToken => {
                BindingName::ObjectBindingPattern(self.parse_object_binding_pattern())
            }
            SyntaxKind::OpenBracketToken => {
                BindingName::ArrayBindingPattern(self.parse_array_binding_pattern())
            }
            _ => BindingName::Identifier(self.parse_identifier()),
        }
    }

    fn parse_object_binding_pattern(&mut self) -> &'a ObjectBindingPattern<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::OpenBraceToken);
        let mut elements = Vec::new();
        while self.current_token() != SyntaxKind::CloseBraceToken
            && self.current_token() != SyntaxKind::EndOfFileToken
        {
            elements.push(self.parse_object_binding_element());
            if self.optional_token(SyntaxKind::CommaToken).is_none() {
                break;
            }
        }
        let end = self.token_end();
        self.expect_token(SyntaxKind::CloseBraceToken);
        self.arena.alloc(ObjectBindingPattern {
            data: NodeData::new(SyntaxKind::ObjectBindingPattern, pos, end),
            elements: alloc_vec_in(self.arena, elements),
        })
    }

    /// One element of an object pattern: `name`, `name = init`,
    /// `prop: name`, or `prop: pattern = init`.
    fn parse_object_binding_element(&mut self) -> BindingElement<'a> {
        let pos = self.token_pos();
        let first_name = self.parse_identifier();
        let (property_name, name) = if self.optional_token(SyntaxKind::ColonToken).is_some() {
            (
                Some(PropertyName::Identifier(first_name)),
                self.parse_binding_name(),
            )
        } else {
            (None, BindingName::Identifier(first_name))
        };
        let initializer = if self.optional_token(SyntaxKind::EqualsToken).is_some() {
            Some(self.parse_assignment_expression_alloc())
        } else {
            None
        };
        let end = self.token_pos();
        BindingElement {
            data: NodeData::new(SyntaxKind::BindingElement, pos, end),
            property_name,
            name,
            initializer,
        }
    }

    fn parse_array_binding_pattern(&mut self) -> &'a ArrayBindingPattern<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::OpenBracketToken);
        let mut elements = Vec::new();
        while self.current_token() != SyntaxKind::CloseBracketToken
            && self.current_token() != SyntaxKind::EndOfFileToken
        {
            let elem_pos = self.token_pos();
            let name = self.parse_binding_name();
            let initializer = if self.optional_token(SyntaxKind::EqualsToken).is_some() {
                Some(self.parse_assignment_expression_alloc())
            } else {
                None
            };
            let elem_end = self.token_pos();
            elements.push(BindingElement {
                data: NodeData::new(SyntaxKind::BindingElement, elem_pos, elem_end),
                property_name: None,
                name,
                initializer,
            });
            if self.optional_token(SyntaxKind::CommaToken).is_none() {
                break;
            }
        }
        let end = self.token_end();
        self.expect_token(SyntaxKind::CloseBracketToken);
        self.arena.alloc(ArrayBindingPattern {
            data: NodeData::new(SyntaxKind::ArrayBindingPattern, pos, end),
            elements: alloc_vec_in(self.arena, elements),
        })
    }

    fn parse_parameters(&mut self) -> &'a [ParameterDeclaration<'a>] {
        self.expect_token(SyntaxKind::OpenParenToken);
        let mut parameters = Vec::new();
        while self.current_token() != SyntaxKind::CloseParenToken
            && self.current_token() != SyntaxKind::EndOfFileToken
        {
            parameters.push(self.parse_parameter());
            if self.optional_token(SyntaxKind::CommaToken).is_none() {
                break;
            }
        }
        self.expect_token(SyntaxKind::CloseParenToken);
        alloc_vec_in(self.arena, parameters)
    }

    fn parse_parameter(&mut self) -> ParameterDeclaration<'a> {
        let pos = self.token_pos();
        let name = self.parse_binding_name();
        let initializer = if self.optional_token(SyntaxKind::EqualsToken).is_some() {
            Some(self.parse_assignment_expression_alloc())
        } else {
            None
        };
        let end = self.token_pos();
        ParameterDeclaration {
            data: NodeData::new(SyntaxKind::Parameter, pos, end),
            name,
            initializer,
        }
    }

    fn parse_identifier(&mut self) -> Identifier {
        let pos = self.token_pos();
        let end = self.token_end();
        if self.current_token() == SyntaxKind::Identifier {
            let text_name = self.token_value().to_string();
            let text = self.intern(&text_name);
            self.next_token();
            Identifier {
                data: NodeData::new(SyntaxKind::Identifier, pos, end),
                text,
                text_name,
            }
        } else {
            self.error(&messages::IDENTIFIER_EXPECTED, &[]);
            Identifier {
                data: NodeData::new(SyntaxKind::Identifier, pos, pos),
                text: self.intern(""),
                text_name: String::new(),
            }
        }
    }

    // ========================================================================
    // Expression parsing
    // ========================================================================

    fn parse_expression_alloc(&mut self) -> &'a Expression<'a> {
        let expr = self.parse_assignment_expression();
        self.arena.alloc(expr)
    }

    fn parse_assignment_expression_alloc(&mut self) -> &'a Expression<'a> {
        let expr = self.parse_assignment_expression();
        self.arena.alloc(expr)
    }

    fn parse_assignment_expression(&mut self) -> Expression<'a> {
        if self.recursion_depth >= MAX_RECURSION_DEPTH {
            self.error(&messages::EXPRESSION_EXPECTED, &[]);
            let pos = self.token_pos();
            return Expression::NullKeyword(NodeData::new(SyntaxKind::NullKeyword, pos, pos));
        }
        self.recursion_depth += 1;
        let result = self.parse_assignment_expression_inner();
        self.recursion_depth -= 1;
        result
    }

    fn parse_assignment_expression_inner(&mut self) -> Expression<'a> {
        // Arrow functions need lookahead: `a => ...` or `( params ) => ...`
        if self.is_simple_arrow_function() {
            return self.parse_simple_arrow_function();
        }
        if self.current_token() == SyntaxKind::OpenParenToken
            && self.is_parenthesized_arrow_function()
        {
            return self.parse_parenthesized_arrow_function();
        }

        let pos = self.token_pos();
        let expr = self.parse_conditional_expression();

        if self.current_token().is_assignment_operator() {
            let op_pos = self.token_pos();
            let op_end = self.token_end();
            let op_kind = self.current_token();
            self.next_token();
            let left = self.arena.alloc(expr);
            let right = self.parse_assignment_expression_alloc();
            let end = self.token_pos();
            return Expression::Binary(BinaryExpression {
                data: NodeData::new(SyntaxKind::BinaryExpression, pos, end),
                left,
                operator_token: Token::new(op_kind, op_pos, op_end),
                right,
            });
        }
        expr
    }

    /// `a => ...`: an identifier immediately followed by `=>`.
    fn is_simple_arrow_function(&mut self) -> bool {
        if self.current_token() != SyntaxKind::Identifier {
            return false;
        }
        self.scanner
            .look_ahead(|s| s.scan() == SyntaxKind::EqualsGreaterThanToken)
    }

    fn parse_simple_arrow_function(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        let name = self.parse_identifier();
        let param = ParameterDeclaration {
            data: NodeData::new(SyntaxKind::Parameter, name.data.range.pos, name.data.range.end),
            name: BindingName::Identifier(name),
            initializer: None,
        };
        let parameters = alloc_vec_in(self.arena, vec![param]);
        self.expect_token(SyntaxKind::EqualsGreaterThanToken);
        let body = self.parse_arrow_function_body();
        let end = self.token_pos();
        Expression::ArrowFunction(ArrowFunction {
            data: NodeData::new(SyntaxKind::ArrowFunction, pos, end),
            parameters,
            body,
        })
    }

    /// Whether the `(` at the current position opens an arrow-function
    /// parameter list: skip to the matching `)` and look for `=>`.
    fn is_parenthesized_arrow_function(&mut self) -> bool {
        self.scanner.look_ahead(|s| {
            let mut depth = 1u32;
            loop {
                match s.scan() {
                    SyntaxKind::OpenParenToken => depth += 1,
                    SyntaxKind::CloseParenToken => {
                        depth -= 1;
                        if depth == 0 {
                            return s.scan() == SyntaxKind::EqualsGreaterThanToken;
                        }
                    }
                    SyntaxKind::EndOfFileToken => return false,
                    _ => {}
                }
            }
        })
    }

    fn parse_parenthesized_arrow_function(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        let parameters = self.parse_parameters();
        self.expect_token(SyntaxKind::EqualsGreaterThanToken);
        let body = self.parse_arrow_function_body();
        let end = self.token_pos();
        Expression::ArrowFunction(ArrowFunction {
            data: NodeData::new(SyntaxKind::ArrowFunction, pos, end),
            parameters,
            body,
        })
    }

    fn parse_arrow_function_body(&mut self) -> ArrowFunctionBody<'a> {
        if self.current_token() == SyntaxKind::OpenBraceToken {
            let block = self.parse_block();
            ArrowFunctionBody::Block(self.arena.alloc(block))
        } else {
            ArrowFunctionBody::Expression(self.parse_assignment_expression_alloc())
        }
    }

    fn parse_conditional_expression(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        let condition = self.parse_binary_expression(OperatorPrecedence::Lowest);
        if self.current_token() != SyntaxKind::QuestionToken {
            return condition;
        }
        self.next_token();
        let condition = self.arena.alloc(condition);
        let when_true = self.parse_assignment_expression_alloc();
        self.expect_token(SyntaxKind::ColonToken);
        let when_false = self.parse_assignment_expression_alloc();
        let end = self.token_pos();
        Expression::Conditional(ConditionalExpression {
            data: NodeData::new(SyntaxKind::ConditionalExpression, pos, end),
            condition,
            when_true,
            when_false,
        })
    }

    fn parse_binary_expression(&mut self, min_precedence: OperatorPrecedence) -> Expression<'a> {
        let pos = self.token_pos();
        let mut left = self.parse_unary_expression();
        loop {
            let precedence = get_binary_operator_precedence(self.current_token());
            if precedence == OperatorPrecedence::Invalid || precedence <= min_precedence {
                break;
            }
            let op_pos = self.token_pos();
            let op_end = self.token_end();
            let op_kind = self.current_token();
            self.next_token();
            let right = self.parse_binary_expression(precedence);
            let end = self.token_pos();
            left = Expression::Binary(BinaryExpression {
                data: NodeData::new(SyntaxKind::BinaryExpression, pos, end),
                left: self.arena.alloc(left),
                operator_token: Token::new(op_kind, op_pos, op_end),
                right: self.arena.alloc(right),
            });
        }
        left
    }

    fn parse_unary_expression(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        match self.current_token() {
            SyntaxKind::PlusPlusToken
            | SyntaxKind::MinusMinusToken
            | SyntaxKind::PlusToken
            | SyntaxKind::MinusToken
            | SyntaxKind::ExclamationToken => {
                let operator = self.current_token();
                self.next_token();
                let operand = {
                    let operand = self.parse_unary_expression();
                    self.arena.alloc(operand)
                };
                let end = self.token_pos();
                Expression::PrefixUnary(PrefixUnaryExpression {
                    data: NodeData::new(SyntaxKind::PrefixUnaryExpression, pos, end),
                    operator,
                    operand,
                })
            }
            _ => self.parse_postfix_expression(),
        }
    }

    fn parse_postfix_expression(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        let expr = self.parse_left_hand_side_expression();
        if matches!(
            self.current_token(),
            SyntaxKind::PlusPlusToken | SyntaxKind::MinusMinusToken
        ) && !self.scanner.has_preceding_line_break()
        {
            let operator = self.current_token();
            let end = self.token_end();
            self.next_token();
            return Expression::PostfixUnary(PostfixUnaryExpression {
                data: NodeData::new(SyntaxKind::PostfixUnaryExpression, pos, end),
                operand: self.arena.alloc(expr),
                operator,
            });
        }
        expr
    }

    fn parse_left_hand_side_expression(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        let expr = if self.current_token() == SyntaxKind::NewKeyword {
            self.parse_new_expression()
        } else {
            self.parse_primary_expression()
        };
        self.parse_call_and_access_suffixes(pos, expr)
    }

    /// `new Callee(args)`: the callee is a primary expression plus property
    /// accesses, so `new a.b.C()` binds the argument list to the `new`.
    fn parse_new_expression(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::NewKeyword);
        let mut callee = self.parse_primary_expression();
        loop {
            match self.current_token() {
                SyntaxKind::DotToken => {
                    self.next_token();
                    let name = self.parse_identifier();
                    let end = name.data.range.end;
                    callee = Expression::PropertyAccess(PropertyAccessExpression {
                        data: NodeData::new(SyntaxKind::PropertyAccessExpression, pos, end),
                        expression: self.arena.alloc(callee),
                        name,
                    });
                }
                _ => break,
            }
        }
        let arguments = if self.current_token() == SyntaxKind::OpenParenToken {
            Some(self.parse_arguments())
        } else {
            None
        };
        let end = self.token_pos();
        Expression::New(NewExpression {
            data: NodeData::new(SyntaxKind::NewExpression, pos, end),
            expression: self.arena.alloc(callee),
            arguments,
        })
    }

    fn parse_call_and_access_suffixes(
        &mut self,
        pos: u32,
        mut expr: Expression<'a>,
    ) -> Expression<'a> {
        loop {
            match self.current_token() {
                SyntaxKind::DotToken => {
                    self.next_token();
                    let name = self.parse_identifier();
                    let end = name.data.range.end;
                    expr = Expression::PropertyAccess(PropertyAccessExpression {
                        data: NodeData::new(SyntaxKind::PropertyAccessExpression, pos, end),
                        expression: self.arena.alloc(expr),
                        name,
                    });
                }
                SyntaxKind::OpenBracketToken => {
                    self.next_token();
                    let argument_expression = self.parse_expression_alloc();
                    let end = self.token_end();
                    self.expect_token(SyntaxKind::CloseBracketToken);
                    expr = Expression::ElementAccess(ElementAccessExpression {
                        data: NodeData::new(SyntaxKind::ElementAccessExpression, pos, end),
                        expression: self.arena.alloc(expr),
                        argument_expression,
                    });
                }
                SyntaxKind::OpenParenToken => {
                    let arguments = self.parse_arguments();
                    let end = self.token_pos();
                    expr = Expression::Call(CallExpression {
                        data: NodeData::new(SyntaxKind::CallExpression, pos, end),
                        expression: self.arena.alloc(expr),
                        arguments,
                    });
                }
                _ => return expr,
            }
        }
    }

    fn parse_arguments(&mut self) -> &'a [Expression<'a>] {
        self.expect_token(SyntaxKind::OpenParenToken);
        let mut arguments = Vec::new();
        while self.current_token() != SyntaxKind::CloseParenToken
            && self.current_token() != SyntaxKind::EndOfFileToken
        {
            arguments.push(self.parse_assignment_expression());
            if self.optional_token(SyntaxKind::CommaToken).is_none() {
                break;
            }
        }
        self.expect_token(SyntaxKind::CloseParenToken);
        alloc_vec_in(self.arena, arguments)
    }

    fn parse_primary_expression(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        let end = self.token_end();
        match self.current_token() {
            SyntaxKind::NumericLiteral => {
                let text_value = self.token_value().to_string();
                let text = self.intern(&text_value);
                self.next_token();
                Expression::NumericLiteral(NumericLiteral {
                    data: NodeData::new(SyntaxKind::NumericLiteral, pos, end),
                    text,
                    text_value,
                })
            }
            SyntaxKind::StringLiteral => Expression::StringLiteral(self.parse_string_literal()),
            SyntaxKind::Identifier => Expression::Identifier(self.parse_identifier()),
            SyntaxKind::ThisKeyword => {
                self.next_token();
                Expression::ThisKeyword(NodeData::new(SyntaxKind::ThisKeyword, pos, end))
            }
            SyntaxKind::NullKeyword => {
                self.next_token();
                Expression::NullKeyword(NodeData::new(SyntaxKind::NullKeyword, pos, end))
            }
            SyntaxKind::UndefinedKeyword => {
                self.next_token();
                Expression::UndefinedKeyword(NodeData::new(SyntaxKind::UndefinedKeyword, pos, end))
            }
            SyntaxKind::TrueKeyword => {
                self.next_token();
                Expression::TrueKeyword(NodeData::new(SyntaxKind::TrueKeyword, pos, end))
            }
            SyntaxKind::FalseKeyword => {
                self.next_token();
                Expression::FalseKeyword(NodeData::new(SyntaxKind::FalseKeyword, pos, end))
            }
            SyntaxKind::OpenParenToken => {
                self.next_token();
                let expression = self.parse_expression_alloc();
                let close_end = self.token_end();
                self.expect_token(SyntaxKind::CloseParenToken);
                Expression::Parenthesized(ParenthesizedExpression {
                    data: NodeData::new(SyntaxKind::ParenthesizedExpression, pos, close_end),
                    expression,
                })
            }
            SyntaxKind::OpenBracketToken => self.parse_array_literal(),
            SyntaxKind::OpenBraceToken => self.parse_object_literal(),
            SyntaxKind::FunctionKeyword => self.parse_function_expression(),
            _ => {
                self.error(&messages::EXPRESSION_EXPECTED, &[]);
                self.next_token();
                Expression::NullKeyword(NodeData::new(SyntaxKind::NullKeyword, pos, pos))
            }
        }
    }

    fn parse_string_literal(&mut self) -> StringLiteral {
        let pos = self.token_pos();
        let end = self.token_end();
        let text_value = self.token_value().to_string();
        let text = self.intern(&text_value);
        let is_single_quote = self.source_text.chars().nth(pos as usize) == Some('\'');
        self.next_token();
        StringLiteral {
            data: NodeData::new(SyntaxKind::StringLiteral, pos, end),
            text,
            text_value,
            is_single_quote,
        }
    }

    fn parse_array_literal(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::OpenBracketToken);
        let mut elements = Vec::new();
        while self.current_token() != SyntaxKind::CloseBracketToken
            && self.current_token() != SyntaxKind::EndOfFileToken
        {
            elements.push(self.parse_assignment_expression());
            if self.optional_token(SyntaxKind::CommaToken).is_none() {
                break;
            }
        }
        let end = self.token_end();
        self.expect_token(SyntaxKind::CloseBracketToken);
        Expression::ArrayLiteral(ArrayLiteralExpression {
            data: NodeData::new(SyntaxKind::ArrayLiteralExpression, pos, end),
            elements: alloc_vec_in(self.arena, elements),
        })
    }

    fn parse_object_literal(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::OpenBraceToken);
        let mut properties = Vec::new();
        while self.current_token() != SyntaxKind::CloseBraceToken
            && self.current_token() != SyntaxKind::EndOfFileToken
        {
            properties.push(self.parse_object_literal_element());
            if self.optional_token(SyntaxKind::CommaToken).is_none() {
                break;
            }
        }
        let end = self.token_end();
        self.expect_token(SyntaxKind::CloseBraceToken);
        Expression::ObjectLiteral(ObjectLiteralExpression {
            data: NodeData::new(SyntaxKind::ObjectLiteralExpression, pos, end),
            properties: alloc_vec_in(self.arena, properties),
        })
    }

    fn parse_object_literal_element(&mut self) -> ObjectLiteralElement<'a> {
        let pos = self.token_pos();
        let name = match self.current_token() {
            SyntaxKind::StringLiteral => PropertyName::StringLiteral(self.parse_string_literal()),
            SyntaxKind::NumericLiteral => {
                let end = self.token_end();
                let text_value = self.token_value().to_string();
                let text = self.intern(&text_value);
                self.next_token();
                PropertyName::NumericLiteral(NumericLiteral {
                    data: NodeData::new(SyntaxKind::NumericLiteral, pos, end),
                    text,
                    text_value,
                })
            }
            SyntaxKind::OpenBracketToken => {
                self.next_token();
                let expression = self.parse_assignment_expression_alloc();
                let end = self.token_end();
                self.expect_token(SyntaxKind::CloseBracketToken);
                PropertyName::Computed(self.arena.alloc(ComputedPropertyName {
                    data: NodeData::new(SyntaxKind::ComputedPropertyName, pos, end),
                    expression,
                }))
            }
            _ => PropertyName::Identifier(self.parse_identifier()),
        };

        if self.optional_token(SyntaxKind::ColonToken).is_some() {
            let initializer = self.parse_assignment_expression_alloc();
            let end = self.token_pos();
            return ObjectLiteralElement::PropertyAssignment(PropertyAssignment {
                data: NodeData::new(SyntaxKind::PropertyAssignment, pos, end),
                name,
                initializer,
            });
        }

        // Shorthand `{ a }` reads the identifier `a` from scope.
        match name {
            PropertyName::Identifier(id) => {
                let end = id.data.range.end;
                ObjectLiteralElement::ShorthandPropertyAssignment(ShorthandPropertyAssignment {
                    data: NodeData::new(SyntaxKind::ShorthandPropertyAssignment, pos, end),
                    name: id,
                })
            }
            other => {
                self.error(&messages::PROPERTY_ASSIGNMENT_EXPECTED, &[]);
                let initializer: &'a Expression<'a> = self.arena.alloc(Expression::NullKeyword(
                    NodeData::new(SyntaxKind::NullKeyword, pos, pos),
                ));
                ObjectLiteralElement::PropertyAssignment(PropertyAssignment {
                    data: NodeData::new(SyntaxKind::PropertyAssignment, pos, pos),
                    name: other,
                    initializer,
                })
            }
        }
    }

    fn parse_function_expression(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::FunctionKeyword);
        let name = if self.current_token() == SyntaxKind::Identifier {
            Some(self.parse_identifier())
        } else {
            None
        };
        let parameters = self.parse_parameters();
        let body = self.parse_block();
        let end = body.data.range.end;
        Expression::FunctionExpression(FunctionExpression {
            data: NodeData::new(SyntaxKind::FunctionExpression, pos, end),
            name,
            parameters,
            body: self.arena.alloc(body),
        })
    }
}
