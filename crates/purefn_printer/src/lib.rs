//! purefn_printer: AST to text output.
//!
//! Converts validated (and guard-injected) trees back into source text for
//! the evaluator. The output must be semantics-preserving and re-parseable;
//! formatting follows the tree structure, with parentheses kept as explicit
//! nodes.

use purefn_ast::node::*;
use purefn_ast::syntax_kind::SyntaxKind;
use purefn_ast::types::NodeFlags;

/// Options for the printer.
pub struct PrinterOptions {
    /// Indentation string.
    pub indent_str: String,
    /// Newline string.
    pub new_line: String,
    /// Whether to emit a trailing newline.
    pub trailing_newline: bool,
}

impl Default for PrinterOptions {
    fn default() -> Self {
        Self {
            indent_str: "    ".to_string(),
            new_line: "\n".to_string(),
            trailing_newline: true,
        }
    }
}

/// The printer converts AST nodes to text.
pub struct Printer {
    output: String,
    indent_level: u32,
    options: PrinterOptions,
}

impl Printer {
    pub fn new() -> Self {
        Self {
            output: String::with_capacity(4096),
            indent_level: 0,
            options: PrinterOptions::default(),
        }
    }

    pub fn with_options(options: PrinterOptions) -> Self {
        Self {
            output: String::with_capacity(4096),
            indent_level: 0,
            options,
        }
    }

    /// Print a source file to a string.
    pub fn print_source_file(&mut self, source_file: &SourceFile<'_>) -> String {
        self.output.clear();
        for (i, stmt) in source_file.statements.iter().enumerate() {
            if i > 0 {
                self.write_newline();
            }
            self.write_indent();
            self.print_statement(stmt);
        }
        if self.options.trailing_newline && !self.output.is_empty() {
            self.write_newline();
        }
        self.output.clone()
    }

    // ========================================================================
    // Statement printing
    // ========================================================================

    fn print_statement(&mut self, stmt: &Statement<'_>) {
        match stmt {
            Statement::EmptyStatement(_) => self.write(";"),
            Statement::ExpressionStatement(n) => {
                self.print_expression(n.expression);
                self.write(";");
            }
            Statement::VariableStatement(n) => {
                self.print_variable_declaration_list(&n.declaration_list);
                self.write(";");
            }
            Statement::ReturnStatement(n) => {
                self.write("return");
                if let Some(expr) = n.expression {
                    self.write(" ");
                    self.print_expression(expr);
                }
                self.write(";");
            }
            Statement::IfStatement(n) => self.print_if_statement(n),
            Statement::Block(n) => self.print_block(n),
            Statement::FunctionDeclaration(n) => self.print_function_declaration(n),
            Statement::ForStatement(n) => self.print_for_statement(n),
            Statement::ForInStatement(n) => self.print_for_in_statement(n),
            Statement::ForOfStatement(n) => self.print_for_of_statement(n),
            Statement::WhileStatement(n) => {
                self.write("while (");
                self.print_expression(n.expression);
                self.write(") ");
                self.print_statement(n.statement);
            }
            Statement::DoStatement(n) => {
                self.write("do ");
                self.print_statement(n.statement);
                self.write(" while (");
                self.print_expression(n.expression);
                self.write(");");
            }
            Statement::ThrowStatement(n) => {
                self.write("throw ");
                self.print_expression(n.expression);
                self.write(";");
            }
            Statement::BreakStatement(_) => self.write("break;"),
            Statement::ContinueStatement(_) => self.write("continue;"),
        }
    }

    fn print_variable_declaration_list(&mut self, list: &VariableDeclarationList<'_>) {
        let keyword = if list.data.flags.contains(NodeFlags::CONST) {
            "const"
        } else if list.data.flags.contains(NodeFlags::LET) {
            "let"
        } else {
            "var"
        };
        self.write(keyword);
        self.write(" ");
        for (i, decl) in list.declarations.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.print_binding_name(&decl.name);
            if let Some(init) = decl.initializer {
                self.write(" = ");
                self.print_expression(init);
            }
        }
    }

    fn print_binding_name(&mut self, name: &BindingName<'_>) {
        match name {
            BindingName::Identifier(id) => self.print_identifier(id),
            BindingName::ObjectBindingPattern(p) => {
                self.write("{ ");
                for (i, elem) in p.elements.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.print_binding_element(elem);
                }
                self.write(" }");
            }
            BindingName::ArrayBindingPattern(p) => {
                self.write("[");
                for (i, elem) in p.elements.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.print_binding_element(elem);
                }
                self.write("]");
            }
        }
    }

    fn print_binding_element(&mut self, elem: &BindingElement<'_>) {
        if let Some(ref prop_name) = elem.property_name {
            self.print_property_name(prop_name);
            self.write(": ");
        }
        self.print_binding_name(&elem.name);
        if let Some(init) = elem.initializer {
            self.write(" = ");
            self.print_expression(init);
        }
    }

    fn print_if_statement(&mut self, node: &IfStatement<'_>) {
        self.write("if (");
        self.print_expression(node.expression);
        self.write(") ");
        self.print_statement(node.then_statement);
        if let Some(else_stmt) = node.else_statement {
            self.write(" else ");
            self.print_statement(else_stmt);
        }
    }

    fn print_block(&mut self, node: &Block<'_>) {
        self.write("{");
        if !node.statements.is_empty() {
            self.increase_indent();
            for stmt in node.statements.iter() {
                self.write_newline();
                self.write_indent();
                self.print_statement(stmt);
            }
            self.decrease_indent();
            self.write_newline();
            self.write_indent();
        }
        self.write("}");
    }

    fn print_function_declaration(&mut self, node: &FunctionDeclaration<'_>) {
        self.write("function");
        if let Some(ref name) = node.name {
            self.write(" ");
            self.print_identifier(name);
        }
        self.write("(");
        self.print_parameters(node.parameters);
        self.write(") ");
        self.print_block(&node.body);
    }

    fn print_for_statement(&mut self, node: &ForStatement<'_>) {
        self.write("for (");
        if let Some(ref init) = node.initializer {
            self.print_for_initializer(init);
        }
        self.write("; ");
        if let Some(cond) = node.condition {
            self.print_expression(cond);
        }
        self.write("; ");
        if let Some(incr) = node.incrementor {
            self.print_expression(incr);
        }
        self.write(") ");
        self.print_statement(node.statement);
    }

    fn print_for_in_statement(&mut self, node: &ForInStatement<'_>) {
        self.write("for (");
        self.print_for_initializer(&node.initializer);
        self.write(" in ");
        self.print_expression(node.expression);
        self.write(") ");
        self.print_statement(node.statement);
    }

    fn print_for_of_statement(&mut self, node: &ForOfStatement<'_>) {
        self.write("for (");
        self.print_for_initializer(&node.initializer);
        self.write(" of ");
        self.print_expression(node.expression);
        self.write(") ");
        self.print_statement(node.statement);
    }

    fn print_for_initializer(&mut self, init: &ForInitializer<'_>) {
        match init {
            ForInitializer::VariableDeclarationList(list) => {
                self.print_variable_declaration_list(list);
            }
            ForInitializer::Expression(expr) => self.print_expression(expr),
        }
    }

    fn print_parameters(&mut self, parameters: &[ParameterDeclaration<'_>]) {
        for (i, param) in parameters.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.print_binding_name(&param.name);
            if let Some(init) = param.initializer {
                self.write(" = ");
                self.print_expression(init);
            }
        }
    }

    // ========================================================================
    // Expression printing
    // ========================================================================

    fn print_expression(&mut self, expr: &Expression<'_>) {
        match expr {
            Expression::Identifier(n) => self.print_identifier(n),
            Expression::StringLiteral(n) => self.print_string_literal(n),
            Expression::NumericLiteral(n) => self.write_owned(n.text_value.clone()),
            Expression::ThisKeyword(_) => self.write("this"),
            Expression::NullKeyword(_) => self.write("null"),
            Expression::UndefinedKeyword(_) => self.write("undefined"),
            Expression::TrueKeyword(_) => self.write("true"),
            Expression::FalseKeyword(_) => self.write("false"),
            Expression::ArrayLiteral(n) => {
                self.write("[");
                for (i, elem) in n.elements.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.print_expression(elem);
                }
                self.write("]");
            }
            Expression::ObjectLiteral(n) => self.print_object_literal(n),
            Expression::PropertyAccess(n) => {
                self.print_expression(n.expression);
                self.write(".");
                self.print_identifier(&n.name);
            }
            Expression::ElementAccess(n) => {
                self.print_expression(n.expression);
                self.write("[");
                self.print_expression(n.argument_expression);
                self.write("]");
            }
            Expression::Call(n) => {
                self.print_expression(n.expression);
                self.write("(");
                for (i, arg) in n.arguments.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.print_expression(arg);
                }
                self.write(")");
            }
            Expression::New(n) => {
                self.write("new ");
                self.print_expression(n.expression);
                self.write("(");
                if let Some(args) = n.arguments {
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            self.write(", ");
                        }
                        self.print_expression(arg);
                    }
                }
                self.write(")");
            }
            Expression::Parenthesized(n) => {
                self.write("(");
                self.print_expression(n.expression);
                self.write(")");
            }
            Expression::FunctionExpression(n) => {
                self.write("function");
                if let Some(ref name) = n.name {
                    self.write(" ");
                    self.print_identifier(name);
                }
                self.write("(");
                self.print_parameters(n.parameters);
                self.write(") ");
                self.print_block(n.body);
            }
            Expression::ArrowFunction(n) => {
                self.write("(");
                self.print_parameters(n.parameters);
                self.write(") => ");
                match &n.body {
                    ArrowFunctionBody::Block(block) => self.print_block(block),
                    ArrowFunctionBody::Expression(e) => self.print_expression(e),
                }
            }
            Expression::PrefixUnary(n) => {
                self.write(n.operator.token_text().unwrap_or(""));
                // `- -a` must not fuse into `--a`.
                let needs_parens = matches!(n.operand, Expression::PrefixUnary(_));
                if needs_parens {
                    self.write("(");
                }
                self.print_expression(n.operand);
                if needs_parens {
                    self.write(")");
                }
            }
            Expression::PostfixUnary(n) => {
                self.print_expression(n.operand);
                self.write(n.operator.token_text().unwrap_or(""));
            }
            Expression::Binary(n) => {
                self.print_expression(n.left);
                let op = n.operator_token.data.kind;
                if op == SyntaxKind::InKeyword {
                    self.write(" in ");
                } else {
                    self.write(" ");
                    self.write(op.token_text().unwrap_or("?"));
                    self.write(" ");
                }
                self.print_expression(n.right);
            }
            Expression::Conditional(n) => {
                self.print_expression(n.condition);
                self.write(" ? ");
                self.print_expression(n.when_true);
                self.write(" : ");
                self.print_expression(n.when_false);
            }
        }
    }

    fn print_object_literal(&mut self, node: &ObjectLiteralExpression<'_>) {
        if node.properties.is_empty() {
            self.write("{}");
            return;
        }
        self.write("{ ");
        for (i, prop) in node.properties.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            match prop {
                ObjectLiteralElement::PropertyAssignment(p) => {
                    self.print_property_name(&p.name);
                    self.write(": ");
                    self.print_expression(p.initializer);
                }
                ObjectLiteralElement::ShorthandPropertyAssignment(p) => {
                    self.print_identifier(&p.name);
                }
            }
        }
        self.write(" }");
    }

    fn print_property_name(&mut self, name: &PropertyName<'_>) {
        match name {
            PropertyName::Identifier(id) => self.print_identifier(id),
            PropertyName::StringLiteral(s) => self.print_string_literal(s),
            PropertyName::NumericLiteral(n) => self.write_owned(n.text_value.clone()),
            PropertyName::Computed(c) => {
                self.write("[");
                self.print_expression(c.expression);
                self.write("]");
            }
        }
    }

    fn print_identifier(&mut self, id: &Identifier) {
        self.write_owned(id.text_name.clone());
    }

    fn print_string_literal(&mut self, lit: &StringLiteral) {
        let quote = if lit.is_single_quote { '\'' } else { '"' };
        self.output.push(quote);
        for ch in lit.text_value.chars() {
            match ch {
                '\\' => self.output.push_str("\\\\"),
                '\n' => self.output.push_str("\\n"),
                '\r' => self.output.push_str("\\r"),
                '\t' => self.output.push_str("\\t"),
                c if c == quote => {
                    self.output.push('\\');
                    self.output.push(c);
                }
                c => self.output.push(c),
            }
        }
        self.output.push(quote);
    }

    // ========================================================================
    // Output helpers
    // ========================================================================

    fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn write_owned(&mut self, text: String) {
        self.output.push_str(&text);
    }

    fn write_newline(&mut self) {
        let nl = self.options.new_line.clone();
        self.output.push_str(&nl);
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            let indent = self.options.indent_str.clone();
            self.output.push_str(&indent);
        }
    }

    fn increase_indent(&mut self) {
        self.indent_level += 1;
    }

    fn decrease_indent(&mut self) {
        self.indent_level -= 1;
    }
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}
