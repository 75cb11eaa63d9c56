//! Statement and expression evaluation.
//!
//! Semantics that matter for contracts: `&&`/`||` short-circuit,
//! `catch` matches by subclass, `finally` runs on every exit, integer division
//! by zero throws `ArithmeticException`. Field accesses go through the
//! permission frame stack; built-in classes are exempt.

use std::sync::Arc;

use covenant_core::types::{ASSERTION_ERROR_CLASS, OUT_OF_MEMORY_CLASS};
use covenant_core::{
    BinaryOp, ClassDecl, ConstructorTarget, Expr, ExprKind, Intrinsic, Literal, ScopeKind, Span,
    Stmt, StmtKind, UnaryOp,
};
use covenant_effects::{ObjectRef, PermissionLevel};

use super::error::RuntimeError;
use super::logging::LogRecord;
use super::state::{Env, Exec, Flow, Interpreter, Unwind};
use super::value::{ArrayObject, Closure, HeapObject, Value};
use crate::contracts::names::RESULT_LOCAL;

const NULL_POINTER: &str = "NullPointerException";
const ARITHMETIC: &str = "ArithmeticException";
const INDEX_OUT_OF_BOUNDS: &str = "ArrayIndexOutOfBoundsException";

fn mismatch(expected: &str, found: &Value, span: Span) -> Unwind {
    RuntimeError::TypeMismatch {
        expected: expected.to_string(),
        found: found.type_name().to_string(),
        span,
    }
    .into()
}

fn internal(message: impl Into<String>) -> Unwind {
    RuntimeError::Internal {
        message: message.into(),
    }
    .into()
}

/// Whether a constructor body starts with `super(...)` or `this(...)`, looking
/// through blocks and scopes added by the lowering.
fn calls_constructor(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|s| match &s.kind {
        StmtKind::ConstructorCall { .. } => true,
        StmtKind::Block(body) | StmtKind::SpecScope { body, .. } => calls_constructor(body),
        _ => false,
    })
}

impl Interpreter<'_> {
    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    pub(crate) fn exec_block(&mut self, env: &mut Env, stmts: &[Stmt]) -> Exec<Flow> {
        env.push();
        let flow = self.exec_stmts(env, stmts);
        env.pop();
        flow
    }

    pub(crate) fn exec_stmts(&mut self, env: &mut Env, stmts: &[Stmt]) -> Exec<Flow> {
        for stmt in stmts {
            if let Flow::Return(v) = self.exec_stmt(env, stmt)? {
                return Ok(Flow::Return(v));
            }
        }
        Ok(Flow::Normal)
    }

    /// Constructor bodies without an explicit constructor call start with
    /// an implicit `super()`.
    pub(crate) fn run_constructor_body(
        &mut self,
        env: &mut Env,
        owner: &ClassDecl,
        body: &[Stmt],
    ) -> Exec<()> {
        if !calls_constructor(body) {
            if let Some(sup) = owner.superclass() {
                let this = env
                    .this
                    .clone()
                    .ok_or_else(|| internal("constructor without a receiver"))?;
                self.run_constructor(sup, this, Vec::new())?;
            }
        }
        self.exec_stmts(env, body)?;
        Ok(())
    }

    fn exec_stmt(&mut self, env: &mut Env, stmt: &Stmt) -> Exec<Flow> {
        match &stmt.kind {
            StmtKind::Local { name, ty, init } => {
                let value = match init {
                    Some(e) => self.eval(env, e)?,
                    None => ty.as_ref().map_or(Value::Null, Value::default_for),
                };
                env.declare(name, value);
            }
            StmtKind::Expr(e) => {
                self.eval(env, e)?;
            }
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval_bool(env, cond)? {
                    return self.exec_block(env, then);
                }
                if let Some(otherwise) = otherwise {
                    return self.exec_block(env, otherwise);
                }
            }
            StmtKind::While { cond, body } => {
                while self.eval_bool(env, cond)? {
                    if let Flow::Return(v) = self.exec_block(env, body)? {
                        return Ok(Flow::Return(v));
                    }
                }
            }
            StmtKind::ForEach {
                var,
                iterable,
                body,
            } => {
                // Iterates over the elements present when the loop starts.
                let items = self.eval_array(env, iterable)?.snapshot();
                for item in items {
                    env.push();
                    env.declare(var, item);
                    let flow = self.exec_stmts(env, body);
                    env.pop();
                    if let Flow::Return(v) = flow? {
                        return Ok(Flow::Return(v));
                    }
                }
            }
            StmtKind::Block(stmts) => return self.exec_block(env, stmts),
            StmtKind::Return(value) => {
                let v = match value {
                    Some(e) => self.eval(env, e)?,
                    None => Value::Null,
                };
                return Ok(Flow::Return(v));
            }
            StmtKind::Throw(e) => {
                return match self.eval(env, e)? {
                    Value::Object(o) if self.program.is_throwable(o.class_name()) => {
                        Err(Unwind::Throw(o))
                    }
                    Value::Null => self.raise(NULL_POINTER, "cannot throw null", e.span),
                    other => Err(mismatch("Throwable", &other, e.span)),
                };
            }
            StmtKind::Try {
                body,
                catches,
                finally,
            } => {
                let mut outcome = self.exec_block(env, body);
                if let Err(Unwind::Throw(exception)) = &outcome {
                    let exception = exception.clone();
                    let handler = catches
                        .iter()
                        .find(|c| self.program.is_subclass(exception.class_name(), &c.class));
                    if let Some(handler) = handler {
                        env.push();
                        env.declare(&handler.param, Value::Object(exception));
                        outcome = self.exec_stmts(env, &handler.body);
                        env.pop();
                    }
                }
                if let Some(finally) = finally {
                    if let Flow::Return(v) = self.exec_block(env, finally)? {
                        return Ok(Flow::Return(v));
                    }
                }
                return outcome;
            }
            StmtKind::Assert { cond, message } => {
                if self.config.enable_assertions && !self.eval_bool(env, cond)? {
                    let message = match message {
                        Some(m) => Some(self.eval(env, m)?.to_string()),
                        None => None,
                    };
                    return Err(self.exception(ASSERTION_ERROR_CLASS, message, None, stmt.span));
                }
            }
            StmtKind::ConstructorCall { target, args } => {
                let args = self.eval_args(env, args)?;
                let this = env
                    .this
                    .clone()
                    .ok_or_else(|| internal("constructor call outside a constructor"))?;
                let class = self.class_decl(&env.class)?;
                match target {
                    ConstructorTarget::This => self.run_constructor(&class.name, this, args)?,
                    ConstructorTarget::Super => {
                        if let Some(sup) = class.superclass() {
                            self.run_constructor(sup, this, args)?;
                        }
                    }
                }
            }
            StmtKind::SpecScope { kind, body } => return self.exec_scope(env, *kind, body),
        }
        Ok(Flow::Normal)
    }

    /// Run `body` in a fresh permission frame. An invariant scope also marks
    /// `this` as a subject whose non-private methods may not be called.
    fn exec_scope(&mut self, env: &mut Env, kind: ScopeKind, body: &[Stmt]) -> Exec<Flow> {
        let subject = match kind {
            ScopeKind::Invariant => env.this.as_ref().and_then(Value::as_object).cloned(),
            ScopeKind::Routine => None,
        };
        if let Some(s) = &subject {
            self.invariant_subjects.push(s.clone());
        }
        let frame = self.config.check_effects.then(|| self.effects.push_frame());

        let flow = self.exec_block(env, body);

        let popped = match frame {
            Some(id) => self.effects.pop_frame(id),
            None => Ok(()),
        };
        if subject.is_some() {
            self.invariant_subjects.pop();
        }
        popped.map_err(|e| internal(e.to_string()))?;
        flow
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    pub(crate) fn eval(&mut self, env: &mut Env, e: &Expr) -> Exec<Value> {
        let span = e.span;
        match &e.kind {
            ExprKind::Literal(lit) => Ok(match lit {
                Literal::Null => Value::Null,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(i) => Value::Int(*i),
                Literal::Double(d) => Value::Double(*d),
                Literal::Str(s) => Value::string(s),
            }),
            ExprKind::Name(name) => self.read_name(env, name, span),
            ExprKind::This => env
                .this
                .clone()
                .ok_or_else(|| internal("'this' in a static context")),
            ExprKind::Result => env.lookup(RESULT_LOCAL).ok_or_else(|| {
                RuntimeError::UnknownName {
                    name: RESULT_LOCAL.to_string(),
                    span,
                }
                .into()
            }),
            ExprKind::ClassRef(class) => Err(internal(format!("class {} used as a value", class))),
            ExprKind::Field { receiver, name } => {
                let target = self.eval(env, receiver)?;
                match target {
                    Value::Array(a) if name == "length" => Ok(Value::Int(a.len() as i64)),
                    Value::Object(o) => self.read_field(&o, name, span),
                    Value::Null => {
                        self.raise(NULL_POINTER, format!("cannot read field {} of null", name), span)
                    }
                    other => Err(mismatch("object", &other, span)),
                }
            }
            ExprKind::Call {
                receiver,
                method,
                args,
            } => self.eval_call(env, receiver.as_deref(), method, args, span),
            ExprKind::New { class, args } => {
                let args = self.eval_args(env, args)?;
                self.construct(class, args, span)
            }
            ExprKind::NewArray { element, length } => {
                let n = self.eval_int(env, length)?;
                if n < 0 {
                    return self.raise(
                        "IllegalArgumentException",
                        format!("negative array size {}", n),
                        span,
                    );
                }
                let len = match usize::try_from(n) {
                    Ok(len) if n <= i64::from(i32::MAX) && len <= self.config.max_array_length => {
                        len
                    }
                    _ => {
                        return self.raise(
                            OUT_OF_MEMORY_CLASS,
                            format!("requested array size {} exceeds the limit", n),
                            span,
                        )
                    }
                };
                let mut items = Vec::new();
                if items.try_reserve_exact(len).is_err() {
                    return self.raise(
                        OUT_OF_MEMORY_CLASS,
                        format!("cannot allocate an array of {} elements", n),
                        span,
                    );
                }
                items.resize(len, Value::default_for(element));
                Ok(Value::Array(Arc::new(ArrayObject::new(element.clone(), items))))
            }
            ExprKind::ArrayLiteral { element, elements } => {
                let items = self.eval_args(env, elements)?;
                Ok(Value::Array(Arc::new(ArrayObject::new(element.clone(), items))))
            }
            ExprKind::Index { array, index } => {
                let a = self.eval_array(env, array)?;
                let i = self.eval_int(env, index)?;
                match usize::try_from(i).ok().and_then(|i| a.get(i)) {
                    Some(v) => Ok(v),
                    None => self.raise(
                        INDEX_OUT_OF_BOUNDS,
                        format!("Index {} out of bounds for length {}", i, a.len()),
                        span,
                    ),
                }
            }
            ExprKind::Unary { op, operand } => match (op, self.eval(env, operand)?) {
                (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (UnaryOp::Neg, Value::Int(i)) => Ok(Value::Int(i.wrapping_neg())),
                (UnaryOp::Neg, Value::Double(d)) => Ok(Value::Double(-d)),
                (_, other) => Err(mismatch("operand", &other, span)),
            },
            ExprKind::Binary {
                op: BinaryOp::And,
                lhs,
                rhs,
            } => Ok(Value::Bool(
                self.eval_bool(env, lhs)? && self.eval_bool(env, rhs)?,
            )),
            ExprKind::Binary {
                op: BinaryOp::Or,
                lhs,
                rhs,
            } => Ok(Value::Bool(
                self.eval_bool(env, lhs)? || self.eval_bool(env, rhs)?,
            )),
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.eval(env, lhs)?;
                let r = self.eval(env, rhs)?;
                self.binary(*op, l, r, span)
            }
            ExprKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                if self.eval_bool(env, cond)? {
                    self.eval(env, then)
                } else {
                    self.eval(env, otherwise)
                }
            }
            ExprKind::InstanceOf { expr, class } => {
                let v = self.eval(env, expr)?;
                Ok(Value::Bool(self.is_instance(&v, class)))
            }
            ExprKind::Old(_) => Err(internal("old() outside a lowered postcondition")),
            ExprKind::Spread(_) => Err(internal("spread outside an effect clause")),
            ExprKind::Lambda { name, params, body } => Ok(Value::Closure(Arc::new(Closure {
                name: name.clone(),
                params: params.clone(),
                body: body.clone(),
                captured: env.flatten(),
                this: env.this.clone(),
                class: env.class.clone(),
            }))),
            ExprKind::Assign { target, value } => {
                let v = self.eval(env, value)?;
                self.store(env, target, v.clone())?;
                Ok(v)
            }
            ExprKind::CompoundAssign { op, target, value } => {
                let current = self.eval(env, target)?;
                let rhs = self.eval(env, value)?;
                let v = self.binary(*op, current, rhs, span)?;
                self.store(env, target, v.clone())?;
                Ok(v)
            }
            ExprKind::IncDec {
                target,
                increment,
                prefix,
            } => {
                let current = self.eval(env, target)?;
                let delta: i64 = if *increment { 1 } else { -1 };
                let next = match &current {
                    Value::Int(i) => Value::Int(i.wrapping_add(delta)),
                    Value::Double(d) => Value::Double(d + delta as f64),
                    other => return Err(mismatch("number", other, span)),
                };
                self.store(env, target, next.clone())?;
                Ok(if *prefix { next } else { current })
            }
            ExprKind::Intrinsic(intrinsic) => self.eval_intrinsic(env, intrinsic, span),
        }
    }

    fn eval_args(&mut self, env: &mut Env, args: &[Expr]) -> Exec<Vec<Value>> {
        args.iter().map(|a| self.eval(env, a)).collect()
    }

    fn eval_bool(&mut self, env: &mut Env, e: &Expr) -> Exec<bool> {
        match self.eval(env, e)? {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch("boolean", &other, e.span)),
        }
    }

    fn eval_int(&mut self, env: &mut Env, e: &Expr) -> Exec<i64> {
        match self.eval(env, e)? {
            Value::Int(i) => Ok(i),
            other => Err(mismatch("int", &other, e.span)),
        }
    }

    fn eval_array(&mut self, env: &mut Env, e: &Expr) -> Exec<Arc<ArrayObject>> {
        match self.eval(env, e)? {
            Value::Array(a) => Ok(a),
            Value::Null => self.raise(NULL_POINTER, "array is null", e.span),
            other => Err(mismatch("array", &other, e.span)),
        }
    }

    fn eval_call(
        &mut self,
        env: &mut Env,
        receiver: Option<&Expr>,
        method: &str,
        args: &[Expr],
        span: Span,
    ) -> Exec<Value> {
        match receiver {
            None => {
                let args = self.eval_args(env, args)?;
                let lexical = env.class.clone();
                match env.this.clone() {
                    Some(this) => self.invoke_method(this, Some(&lexical), method, args, span),
                    None => self.invoke_static(&lexical, method, args, span),
                }
            }
            Some(Expr {
                kind: ExprKind::ClassRef(class),
                ..
            }) => {
                let args = self.eval_args(env, args)?;
                self.invoke_static(class, method, args, span)
            }
            Some(Expr {
                kind: ExprKind::Spread(collection),
                ..
            }) => {
                let items = self.eval_array(env, collection)?.snapshot();
                let args = self.eval_args(env, args)?;
                for item in items {
                    self.invoke_method(item, None, method, args.clone(), span)?;
                }
                Ok(Value::Null)
            }
            Some(r) => {
                let target = self.eval(env, r)?;
                let args = self.eval_args(env, args)?;
                let lexical = r.is_this().then(|| env.class.clone());
                self.invoke_method(target, lexical.as_deref(), method, args, span)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Variables and fields
    // -----------------------------------------------------------------------

    /// Locals first, then fields of `this`.
    fn read_name(&mut self, env: &Env, name: &str, span: Span) -> Exec<Value> {
        if let Some(v) = env.lookup(name) {
            return Ok(v);
        }
        if let Some(Value::Object(this)) = &env.this {
            if this.has_field(name) {
                return self.read_field(this, name, span);
            }
        }
        Err(RuntimeError::UnknownName {
            name: name.to_string(),
            span,
        }
        .into())
    }

    fn check_access(&self, object: &Arc<HeapObject>, level: PermissionLevel, span: Span) -> Exec<()> {
        if !(self.config.check_effects && self.config.enable_assertions) || self.is_builtin(object) {
            return Ok(());
        }
        let tracked: ObjectRef = object.clone();
        let checked = match level {
            PermissionLevel::Mutate => self.effects.assert_can_mutate(&tracked),
            _ => self.effects.assert_can_inspect(&tracked),
        };
        checked.map_err(|e| self.exception(ASSERTION_ERROR_CLASS, Some(e.to_string()), None, span))
    }

    fn read_field(&mut self, object: &Arc<HeapObject>, field: &str, span: Span) -> Exec<Value> {
        self.check_access(object, PermissionLevel::Inspect, span)?;
        object.get(field).ok_or_else(|| {
            RuntimeError::UnknownField {
                class: object.class_name().to_string(),
                field: field.to_string(),
                span,
            }
            .into()
        })
    }

    fn write_field(
        &mut self,
        object: &Arc<HeapObject>,
        field: &str,
        value: Value,
        span: Span,
    ) -> Exec<()> {
        self.check_access(object, PermissionLevel::Mutate, span)?;
        if !object.has_field(field) {
            return Err(RuntimeError::UnknownField {
                class: object.class_name().to_string(),
                field: field.to_string(),
                span,
            }
            .into());
        }
        object.set(field, value);
        Ok(())
    }

    fn store(&mut self, env: &mut Env, target: &Expr, value: Value) -> Exec<()> {
        let span = target.span;
        match &target.kind {
            ExprKind::Name(name) => {
                if env.assign(name, value.clone()) {
                    return Ok(());
                }
                match env.this.clone() {
                    Some(Value::Object(this)) if this.has_field(name) => {
                        self.write_field(&this, name, value, span)
                    }
                    _ => Err(RuntimeError::UnknownName {
                        name: name.clone(),
                        span,
                    }
                    .into()),
                }
            }
            ExprKind::Field { receiver, name } => match self.eval(env, receiver)? {
                Value::Object(o) => self.write_field(&o, name, value, span),
                Value::Null => {
                    self.raise(NULL_POINTER, format!("cannot write field {} of null", name), span)
                }
                other => Err(mismatch("object", &other, span)),
            },
            ExprKind::Index { array, index } => {
                let a = self.eval_array(env, array)?;
                let i = self.eval_int(env, index)?;
                let stored = usize::try_from(i).is_ok_and(|i| a.set(i, value));
                if stored {
                    Ok(())
                } else {
                    self.raise(
                        INDEX_OUT_OF_BOUNDS,
                        format!("Index {} out of bounds for length {}", i, a.len()),
                        span,
                    )
                }
            }
            _ => Err(internal(format!("cannot assign to {}", target))),
        }
    }

    // -----------------------------------------------------------------------
    // Operators
    // -----------------------------------------------------------------------

    fn binary(&self, op: BinaryOp, l: Value, r: Value, span: Span) -> Exec<Value> {
        match op {
            BinaryOp::Eq => return Ok(Value::Bool(l.same(&r))),
            BinaryOp::Ne => return Ok(Value::Bool(!l.same(&r))),
            BinaryOp::Add if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) => {
                return Ok(Value::string(format!("{}{}", l, r)));
            }
            BinaryOp::And | BinaryOp::Or => {
                return match (l, r) {
                    (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if op == BinaryOp::And {
                        a && b
                    } else {
                        a || b
                    })),
                    (other, _) => Err(mismatch("boolean", &other, span)),
                };
            }
            _ => {}
        }
        match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => self.int_op(op, *a, *b, span),
            _ => match (as_f64(&l), as_f64(&r)) {
                (Some(a), Some(b)) => Ok(double_op(op, a, b)),
                (None, _) => Err(mismatch("number", &l, span)),
                (_, None) => Err(mismatch("number", &r, span)),
            },
        }
    }

    /// `int` is 64 bits wide; overflow wraps.
    fn int_op(&self, op: BinaryOp, a: i64, b: i64, span: Span) -> Exec<Value> {
        Ok(match op {
            BinaryOp::Add => Value::Int(a.wrapping_add(b)),
            BinaryOp::Sub => Value::Int(a.wrapping_sub(b)),
            BinaryOp::Mul => Value::Int(a.wrapping_mul(b)),
            BinaryOp::Div | BinaryOp::Rem if b == 0 => {
                return self.raise(ARITHMETIC, "/ by zero", span);
            }
            BinaryOp::Div => Value::Int(a.wrapping_div(b)),
            BinaryOp::Rem => Value::Int(a.wrapping_rem(b)),
            BinaryOp::Lt => Value::Bool(a < b),
            BinaryOp::Le => Value::Bool(a <= b),
            BinaryOp::Gt => Value::Bool(a > b),
            BinaryOp::Ge => Value::Bool(a >= b),
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::And | BinaryOp::Or => {
                return Err(internal(format!("operator {} on int", op.symbol())));
            }
        })
    }

    // -----------------------------------------------------------------------
    // Lowering hooks
    // -----------------------------------------------------------------------

    fn eval_intrinsic(&mut self, env: &mut Env, intrinsic: &Intrinsic, span: Span) -> Exec<Value> {
        match intrinsic {
            Intrinsic::Inspects(operand) => {
                self.require(env, operand, PermissionLevel::Inspect, span)
            }
            Intrinsic::Mutates(operand) => self.require(env, operand, PermissionLevel::Mutate, span),
            Intrinsic::AssertCanCreate(operand) => {
                let v = self.eval(env, operand)?;
                if self.config.check_effects {
                    if let Some(tracked) = v.as_tracked() {
                        self.effects.assert_can_create(&tracked);
                    }
                }
                Ok(Value::Null)
            }
            Intrinsic::OldValue { value, failure } => {
                if let Some(Value::Object(failure)) = env.lookup(failure) {
                    return Err(Unwind::Throw(failure));
                }
                env.lookup(value).ok_or_else(|| {
                    RuntimeError::UnknownName {
                        name: value.clone(),
                        span,
                    }
                    .into()
                })
            }
            Intrinsic::Log { logger, message } => {
                self.loggers.emit(LogRecord {
                    logger: logger.clone(),
                    message: message.clone(),
                    span,
                    stack: self.stack_snapshot(),
                });
                Ok(Value::Null)
            }
        }
    }

    /// Require `level` on the operand (every element, for a spread) from
    /// the enclosing frame, granting it in the current one.
    fn require(
        &mut self,
        env: &mut Env,
        operand: &Expr,
        level: PermissionLevel,
        span: Span,
    ) -> Exec<Value> {
        let objects: Vec<ObjectRef> = match &operand.kind {
            ExprKind::Spread(collection) => self
                .eval_array(env, collection)?
                .snapshot()
                .iter()
                .filter_map(Value::as_tracked)
                .collect(),
            _ => self.eval(env, operand)?.as_tracked().into_iter().collect(),
        };
        if !self.config.check_effects || !self.effects.is_active() {
            return Ok(Value::Bool(true));
        }
        let granted = match level {
            PermissionLevel::Mutate => self.effects.mutates_all(objects),
            _ => self.effects.inspects_all(objects),
        };
        granted
            .map(Value::Bool)
            .map_err(|e| self.exception(ASSERTION_ERROR_CLASS, Some(e.to_string()), None, span))
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Double(d) => Some(*d),
        _ => None,
    }
}

fn double_op(op: BinaryOp, a: f64, b: f64) -> Value {
    match op {
        BinaryOp::Add => Value::Double(a + b),
        BinaryOp::Sub => Value::Double(a - b),
        BinaryOp::Mul => Value::Double(a * b),
        BinaryOp::Div => Value::Double(a / b),
        BinaryOp::Rem => Value::Double(a % b),
        BinaryOp::Lt => Value::Bool(a < b),
        BinaryOp::Le => Value::Bool(a <= b),
        BinaryOp::Gt => Value::Bool(a > b),
        BinaryOp::Ge => Value::Bool(a >= b),
        BinaryOp::Eq => Value::Bool(a == b),
        BinaryOp::Ne => Value::Bool(a != b),
        BinaryOp::And | BinaryOp::Or => Value::Bool(false),
    }
}
