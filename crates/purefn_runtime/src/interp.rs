//! The tree-walking evaluator.
//!
//! Executes the owned program form against an environment chain rooted at
//! the capability binding map. Statement execution yields completion values
//! so `break`/`continue`/`return` unwind without unwinding the Rust stack;
//! thrown subject values travel as `RuntimeError::Thrown`.

use crate::env::Environment;
use crate::error::RuntimeError;
use crate::program::*;
use crate::value::{Closure, Value};
use purefn_policy::{check_name, Decision};
use std::cell::Cell;
use std::rc::Rc;

/// Cap on native call depth. The injected guard counts loop iterations and
/// closure calls, but direct self-recursion of the top-level function resets
/// its counter per invocation, so the evaluator bounds depth itself.
pub const MAX_CALL_DEPTH: u32 = 1000;

/// How a statement completed.
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Per-invocation evaluator state.
pub(crate) struct Evaluator {
    depth: Cell<u32>,
}

impl Evaluator {
    pub(crate) fn new() -> Self {
        Self { depth: Cell::new(0) }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    pub(crate) fn call_closure(
        &self,
        closure: &Rc<Closure>,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        if self.depth.get() >= MAX_CALL_DEPTH {
            return Err(RuntimeError::CallDepth);
        }
        self.depth.set(self.depth.get() + 1);
        let result = self.call_closure_inner(closure, args);
        self.depth.set(self.depth.get() - 1);
        result
    }

    fn call_closure_inner(
        &self,
        closure: &Rc<Closure>,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        let env = Environment::child(&closure.env);
        if let Some(ref name) = closure.name {
            env.declare(name, Value::Function(Rc::clone(closure)));
        }

        for (i, param) in closure.params.iter().enumerate() {
            let mut value = args.get(i).cloned().unwrap_or(Value::Undefined);
            if matches!(value, Value::Undefined) {
                if let Some(ref default) = param.default {
                    value = self.eval(default, &env)?;
                }
            }
            self.bind_pattern(&param.pattern, value, &env)?;
        }

        match self.exec_all(&closure.body, &env)? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Undefined),
        }
    }

    fn call_value(&self, callee: Value, args: &[Value]) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(closure) => self.call_closure(&closure, args),
            Value::Native(native) => native.call(args),
            other => Err(RuntimeError::Type(format!(
                "{} is not a function",
                other.type_name()
            ))),
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn exec_all(&self, statements: &[Stmt], env: &Rc<Environment>) -> Result<Flow, RuntimeError> {
        for stmt in statements {
            match self.exec(stmt, env)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&self, stmt: &Stmt, env: &Rc<Environment>) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Empty => Ok(Flow::Normal),
            Stmt::Expr(expr) => {
                self.eval(expr, env)?;
                Ok(Flow::Normal)
            }
            Stmt::VarDecl(declarations) => {
                for (pattern, initializer) in declarations {
                    let value = match initializer {
                        Some(expr) => self.eval(expr, env)?,
                        None => Value::Undefined,
                    };
                    self.bind_pattern(pattern, value, env)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::Func { name, params, body } => {
                let closure = Rc::new(Closure {
                    name: Some(name.clone()),
                    params: params.clone(),
                    body: Rc::clone(body),
                    env: Rc::clone(env),
                });
                env.declare(name, Value::Function(closure));
                Ok(Flow::Normal)
            }
            Stmt::Block(statements) => {
                let block_env = Environment::child(env);
                self.exec_all(statements, &block_env)
            }
            Stmt::If {
                condition,
                then,
                otherwise,
            } => {
                if self.eval(condition, env)?.is_truthy() {
                    self.exec(then, env)
                } else if let Some(otherwise) = otherwise {
                    self.exec(otherwise, env)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { condition, body } => {
                while self.eval(condition, env)?.is_truthy() {
                    match self.exec(body, env)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::DoWhile { body, condition } => {
                loop {
                    match self.exec(body, env)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                    if !self.eval(condition, env)?.is_truthy() {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                init,
                condition,
                incrementor,
                body,
            } => {
                let loop_env = Environment::child(env);
                match init {
                    Some(ForInit::Decl(declarations)) => {
                        for (pattern, initializer) in declarations {
                            let value = match initializer {
                                Some(expr) => self.eval(expr, &loop_env)?,
                                None => Value::Undefined,
                            };
                            self.bind_pattern(pattern, value, &loop_env)?;
                        }
                    }
                    Some(ForInit::Expr(expr)) => {
                        self.eval(expr, &loop_env)?;
                    }
                    None => {}
                }
                loop {
                    if let Some(condition) = condition {
                        if !self.eval(condition, &loop_env)?.is_truthy() {
                            break;
                        }
                    }
                    match self.exec(body, &loop_env)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                    if let Some(incrementor) = incrementor {
                        self.eval(incrementor, &loop_env)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::ForIn { head, object, body } => {
                let value = self.eval(object, env)?;
                let keys: Vec<String> = match &value {
                    Value::Object(map) => map.borrow().keys().cloned().collect(),
                    Value::Array(items) => {
                        (0..items.borrow().len()).map(|i| i.to_string()).collect()
                    }
                    other => {
                        return Err(RuntimeError::Type(format!(
                            "cannot enumerate {}",
                            other.type_name()
                        )))
                    }
                };
                for key in keys {
                    let iter_env = Environment::child(env);
                    self.bind_loop_head(head, Value::string(key), &iter_env)?;
                    match self.exec(body, &iter_env)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::ForOf {
                head,
                iterable,
                body,
            } => {
                let value = self.eval(iterable, env)?;
                let items: Vec<Value> = match &value {
                    Value::Array(items) => items.borrow().clone(),
                    Value::Str(s) => s.chars().map(|c| Value::string(c.to_string())).collect(),
                    other => {
                        return Err(RuntimeError::Type(format!(
                            "{} is not iterable",
                            other.type_name()
                        )))
                    }
                };
                for item in items {
                    let iter_env = Environment::child(env);
                    self.bind_loop_head(head, item, &iter_env)?;
                    match self.exec(body, &iter_env)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Throw(expr) => Err(RuntimeError::Thrown(self.eval(expr, env)?)),
        }
    }

    fn bind_loop_head(
        &self,
        head: &ForHead,
        value: Value,
        env: &Rc<Environment>,
    ) -> Result<(), RuntimeError> {
        match head {
            ForHead::Decl(pattern) => self.bind_pattern(pattern, value, env),
            ForHead::Target(target) => self.write_target(target, value, env),
        }
    }

    // ========================================================================
    // Patterns
    // ========================================================================

    fn bind_pattern(
        &self,
        pattern: &Pattern,
        value: Value,
        env: &Rc<Environment>,
    ) -> Result<(), RuntimeError> {
        match pattern {
            Pattern::Identifier(name) => {
                env.declare(name, value);
                Ok(())
            }
            Pattern::Object(properties) => {
                if value.is_nullish() {
                    return Err(RuntimeError::Type(format!(
                        "cannot destructure {}",
                        value.type_name()
                    )));
                }
                for prop in properties {
                    let mut item = self.get_member(&value, &prop.key)?;
                    if matches!(item, Value::Undefined) {
                        if let Some(ref default) = prop.default {
                            item = self.eval(default, env)?;
                        }
                    }
                    self.bind_pattern(&prop.binding, item, env)?;
                }
                Ok(())
            }
            Pattern::Array(elements) => {
                let items = match &value {
                    Value::Array(items) => items.borrow().clone(),
                    other => {
                        return Err(RuntimeError::Type(format!(
                            "cannot destructure {} as an array",
                            other.type_name()
                        )))
                    }
                };
                for (i, elem) in elements.iter().enumerate() {
                    let mut item = items.get(i).cloned().unwrap_or(Value::Undefined);
                    if matches!(item, Value::Undefined) {
                        if let Some(ref default) = elem.default {
                            item = self.eval(default, env)?;
                        }
                    }
                    self.bind_pattern(&elem.binding, item, env)?;
                }
                Ok(())
            }
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn eval(&self, expr: &Expr, env: &Rc<Environment>) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::string(s.clone())),
            Expr::Ident(name) => env
                .get(name)
                .ok_or_else(|| RuntimeError::Unresolved(name.clone())),
            Expr::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for elem in elements {
                    items.push(self.eval(elem, env)?);
                }
                Ok(Value::new_array(items))
            }
            Expr::Object(properties) => {
                let object = Value::new_object();
                if let Value::Object(ref map) = object {
                    for (key, value_expr) in properties {
                        let value = self.eval(value_expr, env)?;
                        map.borrow_mut().insert(key.clone(), value);
                    }
                }
                Ok(object)
            }
            Expr::Member(object, name) => {
                let value = self.eval(object, env)?;
                self.get_member(&value, name)
            }
            Expr::Index(object, key) => {
                let value = self.eval(object, env)?;
                let key = self.eval(key, env)?.display_string();
                // Dynamic keys cannot come out of the validating pipeline,
                // but the evaluator is a replaceable component; re-check.
                if let Decision::Denied(reason) = check_name(&key) {
                    return Err(RuntimeError::ForbiddenKey {
                        key,
                        reason: reason.describe(),
                    });
                }
                self.get_member(&value, &key)
            }
            Expr::Call(callee, arg_exprs) => {
                let callee = self.eval(callee, env)?;
                let args = self.eval_args(arg_exprs, env)?;
                self.call_value(callee, &args)
            }
            Expr::New(callee, arg_exprs) => {
                let callee = self.eval(callee, env)?;
                let args = self.eval_args(arg_exprs, env)?;
                self.call_value(callee, &args)
            }
            Expr::Function { name, params, body } => Ok(Value::Function(Rc::new(Closure {
                name: name.clone(),
                params: params.clone(),
                body: Rc::clone(body),
                env: Rc::clone(env),
            }))),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, env)?;
                Ok(match op {
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Pos => Value::Number(value.to_number()),
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                })
            }
            Expr::Update { op, prefix, target } => {
                let old = self.read_target(target, env)?.to_number();
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.write_target(target, Value::Number(new), env)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                self.apply_binary(*op, left, right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left, env)?;
                match op {
                    LogicalOp::And => {
                        if left.is_truthy() {
                            self.eval(right, env)
                        } else {
                            Ok(left)
                        }
                    }
                    LogicalOp::Or => {
                        if left.is_truthy() {
                            Ok(left)
                        } else {
                            self.eval(right, env)
                        }
                    }
                    LogicalOp::Nullish => {
                        if left.is_nullish() {
                            self.eval(right, env)
                        } else {
                            Ok(left)
                        }
                    }
                }
            }
            Expr::Assign { op, target, value } => {
                let value = match op {
                    AssignOp::Assign => self.eval(value, env)?,
                    compound => {
                        let current = self.read_target(target, env)?;
                        let operand = self.eval(value, env)?;
                        let binary = match compound {
                            AssignOp::Add => BinaryOp::Add,
                            AssignOp::Sub => BinaryOp::Sub,
                            AssignOp::Mul => BinaryOp::Mul,
                            AssignOp::Div => BinaryOp::Div,
                            AssignOp::Rem => BinaryOp::Rem,
                            AssignOp::Assign => unreachable!(),
                        };
                        self.apply_binary(binary, current, operand)?
                    }
                };
                self.write_target(target, value.clone(), env)?;
                Ok(value)
            }
            Expr::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                if self.eval(condition, env)?.is_truthy() {
                    self.eval(when_true, env)
                } else {
                    self.eval(when_false, env)
                }
            }
        }
    }

    fn eval_args(
        &self,
        exprs: &[Expr],
        env: &Rc<Environment>,
    ) -> Result<Vec<Value>, RuntimeError> {
        let mut args = Vec::with_capacity(exprs.len());
        for expr in exprs {
            args.push(self.eval(expr, env)?);
        }
        Ok(args)
    }

    fn apply_binary(&self, op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
        Ok(match op {
            BinaryOp::Add => match (&left, &right) {
                (Value::Str(_), _) | (_, Value::Str(_)) => {
                    Value::string(format!("{}{}", left.display_string(), right.display_string()))
                }
                _ => Value::Number(left.to_number() + right.to_number()),
            },
            BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
            BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
            BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
            BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
            BinaryOp::Lt => self.compare(&left, &right, |o| o == std::cmp::Ordering::Less),
            BinaryOp::Gt => self.compare(&left, &right, |o| o == std::cmp::Ordering::Greater),
            BinaryOp::Le => self.compare(&left, &right, |o| o != std::cmp::Ordering::Greater),
            BinaryOp::Ge => self.compare(&left, &right, |o| o != std::cmp::Ordering::Less),
            BinaryOp::LooseEq => Value::Bool(left.loose_equals(&right)),
            BinaryOp::LooseNe => Value::Bool(!left.loose_equals(&right)),
            BinaryOp::StrictEq => Value::Bool(left.strict_equals(&right)),
            BinaryOp::StrictNe => Value::Bool(!left.strict_equals(&right)),
            BinaryOp::In => {
                let key = left.display_string();
                match &right {
                    Value::Object(map) => Value::Bool(map.borrow().contains_key(&key)),
                    Value::Array(items) => {
                        let len = items.borrow().len();
                        Value::Bool(key.parse::<usize>().map_or(false, |i| i < len))
                    }
                    other => {
                        return Err(RuntimeError::Type(format!(
                            "cannot use 'in' on {}",
                            other.type_name()
                        )))
                    }
                }
            }
        })
    }

    fn compare(
        &self,
        left: &Value,
        right: &Value,
        accept: impl Fn(std::cmp::Ordering) -> bool,
    ) -> Value {
        let ordering = match (left, right) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => left.to_number().partial_cmp(&right.to_number()),
        };
        Value::Bool(ordering.map_or(false, accept))
    }

    // ========================================================================
    // Member and target access
    // ========================================================================

    fn get_member(&self, value: &Value, name: &str) -> Result<Value, RuntimeError> {
        match value {
            Value::Object(map) => Ok(map.borrow().get(name).cloned().unwrap_or(Value::Undefined)),
            Value::Array(items) => {
                if name == "length" {
                    return Ok(Value::Number(items.borrow().len() as f64));
                }
                match name.parse::<usize>() {
                    Ok(index) => Ok(items
                        .borrow()
                        .get(index)
                        .cloned()
                        .unwrap_or(Value::Undefined)),
                    Err(_) => Ok(Value::Undefined),
                }
            }
            Value::Str(s) => {
                if name == "length" {
                    Ok(Value::Number(s.chars().count() as f64))
                } else {
                    Ok(Value::Undefined)
                }
            }
            Value::Undefined | Value::Null => Err(RuntimeError::Type(format!(
                "cannot read property '{}' of {}",
                name,
                value.type_name()
            ))),
            _ => Ok(Value::Undefined),
        }
    }

    fn set_member(&self, value: &Value, name: &str, item: Value) -> Result<(), RuntimeError> {
        match value {
            Value::Object(map) => {
                map.borrow_mut().insert(name.to_string(), item);
                Ok(())
            }
            Value::Array(items) => match name.parse::<usize>() {
                Ok(index) => {
                    let mut items = items.borrow_mut();
                    if index >= items.len() {
                        items.resize(index + 1, Value::Undefined);
                    }
                    items[index] = item;
                    Ok(())
                }
                Err(_) => Err(RuntimeError::Type(format!(
                    "invalid array index '{}'",
                    name
                ))),
            },
            other => Err(RuntimeError::Type(format!(
                "cannot set property '{}' on {}",
                name,
                other.type_name()
            ))),
        }
    }

    fn read_target(&self, target: &Target, env: &Rc<Environment>) -> Result<Value, RuntimeError> {
        match target {
            Target::Ident(name) => env
                .get(name)
                .ok_or_else(|| RuntimeError::Unresolved(name.clone())),
            Target::Member(object, name) => {
                let value = self.eval(object, env)?;
                self.get_member(&value, name)
            }
            Target::Index(object, key) => {
                let value = self.eval(object, env)?;
                let key = self.eval(key, env)?.display_string();
                if let Decision::Denied(reason) = check_name(&key) {
                    return Err(RuntimeError::ForbiddenKey {
                        key,
                        reason: reason.describe(),
                    });
                }
                self.get_member(&value, &key)
            }
        }
    }

    fn write_target(
        &self,
        target: &Target,
        value: Value,
        env: &Rc<Environment>,
    ) -> Result<(), RuntimeError> {
        match target {
            Target::Ident(name) => env.assign(name, value),
            Target::Member(object, name) => {
                let base = self.eval(object, env)?;
                self.set_member(&base, name, value)
            }
            Target::Index(object, key) => {
                let base = self.eval(object, env)?;
                let key = self.eval(key, env)?.display_string();
                if let Decision::Denied(reason) = check_name(&key) {
                    return Err(RuntimeError::ForbiddenKey {
                        key,
                        reason: reason.describe(),
                    });
                }
                self.set_member(&base, &key, value)
            }
        }
    }
}

// ============================================================================
// The compiled callable
// ============================================================================

/// A verified, resource-bounded callable produced by the pipeline. Its free
/// variables resolve against the capability binding map and nothing else;
/// its signature mirrors the subject function's parameter list.
pub struct SandboxedFunction {
    closure: Rc<Closure>,
}

impl SandboxedFunction {
    pub(crate) fn new(closure: Rc<Closure>) -> Self {
        Self { closure }
    }

    /// The subject function's name, if it had one.
    pub fn name(&self) -> Option<&str> {
        self.closure.name.as_deref()
    }

    /// Declared parameter count.
    pub fn arity(&self) -> usize {
        self.closure.params.len()
    }

    /// Invoke the callable. Missing arguments are `undefined`; extra
    /// arguments are ignored, mirroring the subject language.
    pub fn call(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        let evaluator = Evaluator::new();
        evaluator.call_closure(&self.closure, args)
    }
}

impl std::fmt::Debug for SandboxedFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxedFunction")
            .field("name", &self.closure.name)
            .field("arity", &self.closure.params.len())
            .finish()
    }
}
