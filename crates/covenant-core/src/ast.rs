//! Expression and statement trees of the Java-like source language.
//!
//! Both trees are closed sum types. Every pass in `covenant-check` (clause
//! resolution, purity checking, old-value capture, lowering, interpretation)
//! dispatches on them with exhaustive `match`, so a new node kind cannot be
//! silently ignored by one of them.
//!
//! A handful of variants never come from user source and are only produced by
//! the contract lowering: [`ExprKind::Intrinsic`] and [`StmtKind::SpecScope`].

use serde::{Deserialize, Serialize};

use crate::span::Span;
use crate::types::Type;

/// Literal constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem
        )
    }

    pub fn is_relational(self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

/// A typed lambda or routine parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Param {
            name: name.into(),
            ty,
        }
    }
}

/// Body of a lambda expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

/// Run-time hooks emitted by the contract lowering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Intrinsic {
    /// Require INSPECT permission on the operand in the current frame; yields `true`.
    Inspects(Box<Expr>),
    /// Require MUTATE permission on the operand in the current frame; yields `true`.
    Mutates(Box<Expr>),
    /// Record the operand as freshly created.
    AssertCanCreate(Box<Expr>),
    /// Read a captured pre-state value, re-throwing the captured failure if any.
    OldValue { value: String, failure: String },
    /// Emit a diagnostic through the named logger, if one is registered.
    Log { logger: String, message: String },
}

/// An expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    #[serde(default)]
    pub span: Span,
}

/// Expression kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),
    /// A local variable, parameter, or (implicitly `this.`-qualified) field.
    Name(String),
    This,
    /// The routine's return value inside postconditions and `@creates`.
    Result,
    /// A class used as the receiver of a static call.
    ClassRef(String),
    Field {
        receiver: Box<Expr>,
        name: String,
    },
    Call {
        receiver: Option<Box<Expr>>,
        method: String,
        args: Vec<Expr>,
    },
    New {
        class: String,
        args: Vec<Expr>,
    },
    /// `new T[length]`
    NewArray {
        element: Type,
        length: Box<Expr>,
    },
    /// `new T[] { a, b, c }`
    ArrayLiteral {
        element: Type,
        elements: Vec<Expr>,
    },
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    InstanceOf {
        expr: Box<Expr>,
        class: String,
    },
    /// `old(e)`: the value of `e` before the routine body ran.
    Old(Box<Expr>),
    /// `...e`: every element of the array `e`.
    Spread(Box<Expr>),
    Lambda {
        /// Deterministic selector of the synthesized method backing the lambda.
        name: Option<String>,
        params: Vec<Param>,
        body: LambdaBody,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    CompoundAssign {
        op: BinaryOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    IncDec {
        target: Box<Expr>,
        increment: bool,
        prefix: bool,
    },
    Intrinsic(Intrinsic),
}

/// A `catch (Class param) { body }` clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub param: String,
    pub class: String,
    pub body: Vec<Stmt>,
}

/// Target of an explicit constructor invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructorTarget {
    Super,
    This,
}

/// Kind of a permission scope emitted by the lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeKind {
    /// Effect frame of a routine that declares effect clauses.
    Routine,
    /// Invariant evaluation for the current `this`.
    Invariant,
}

/// A statement node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    #[serde(default)]
    pub span: Span,
}

/// Statement kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    Local {
        name: String,
        ty: Option<Type>,
        init: Option<Expr>,
    },
    Expr(Expr),
    If {
        cond: Expr,
        then: Vec<Stmt>,
        otherwise: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    ForEach {
        var: String,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    Block(Vec<Stmt>),
    Return(Option<Expr>),
    Throw(Expr),
    Try {
        body: Vec<Stmt>,
        catches: Vec<CatchClause>,
        finally: Option<Vec<Stmt>>,
    },
    Assert {
        cond: Expr,
        message: Option<Expr>,
    },
    ConstructorCall {
        target: ConstructorTarget,
        args: Vec<Expr>,
    },
    /// Permission frame pushed on entry and popped on every exit path.
    SpecScope {
        kind: ScopeKind,
        body: Vec<Stmt>,
    },
}

/// A node reached while walking a tree.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Expr(&'a Expr),
    Stmt(&'a Stmt),
}

// ---------------------------------------------------------------------------
// Expression builders
// ---------------------------------------------------------------------------

fn boxed(e: Expr) -> Box<Expr> {
    Box::new(e)
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr {
            kind,
            span: Span::default(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn null() -> Self {
        Expr::new(ExprKind::Literal(Literal::Null))
    }

    pub fn bool(v: bool) -> Self {
        Expr::new(ExprKind::Literal(Literal::Bool(v)))
    }

    pub fn int(v: i64) -> Self {
        Expr::new(ExprKind::Literal(Literal::Int(v)))
    }

    pub fn double(v: f64) -> Self {
        Expr::new(ExprKind::Literal(Literal::Double(v)))
    }

    pub fn string(v: impl Into<String>) -> Self {
        Expr::new(ExprKind::Literal(Literal::Str(v.into())))
    }

    pub fn name(n: impl Into<String>) -> Self {
        Expr::new(ExprKind::Name(n.into()))
    }

    pub fn this() -> Self {
        Expr::new(ExprKind::This)
    }

    pub fn result() -> Self {
        Expr::new(ExprKind::Result)
    }

    pub fn class_ref(class: impl Into<String>) -> Self {
        Expr::new(ExprKind::ClassRef(class.into()))
    }

    pub fn field(receiver: Expr, name: impl Into<String>) -> Self {
        Expr::new(ExprKind::Field {
            receiver: boxed(receiver),
            name: name.into(),
        })
    }

    /// Call with an explicit receiver.
    pub fn call(receiver: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::new(ExprKind::Call {
            receiver: Some(boxed(receiver)),
            method: method.into(),
            args,
        })
    }

    /// Unqualified call resolved against the enclosing class.
    pub fn call_self(method: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::new(ExprKind::Call {
            receiver: None,
            method: method.into(),
            args,
        })
    }

    pub fn new_object(class: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::new(ExprKind::New {
            class: class.into(),
            args,
        })
    }

    pub fn new_array(element: Type, length: Expr) -> Self {
        Expr::new(ExprKind::NewArray {
            element,
            length: boxed(length),
        })
    }

    pub fn array(element: Type, elements: Vec<Expr>) -> Self {
        Expr::new(ExprKind::ArrayLiteral { element, elements })
    }

    pub fn index(array: Expr, index: Expr) -> Self {
        Expr::new(ExprKind::Index {
            array: boxed(array),
            index: boxed(index),
        })
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::new(ExprKind::Unary {
            op,
            operand: boxed(operand),
        })
    }

    pub fn not(operand: Expr) -> Self {
        Expr::unary(UnaryOp::Not, operand)
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        let span = lhs.span.to(rhs.span);
        Expr::new(ExprKind::Binary {
            op,
            lhs: boxed(lhs),
            rhs: boxed(rhs),
        })
        .at(span)
    }

    pub fn eq(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Eq, lhs, rhs)
    }

    pub fn ne(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Ne, lhs, rhs)
    }

    pub fn and(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::And, lhs, rhs)
    }

    pub fn or(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Or, lhs, rhs)
    }

    pub fn conditional(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::new(ExprKind::Conditional {
            cond: boxed(cond),
            then: boxed(then),
            otherwise: boxed(otherwise),
        })
    }

    pub fn instance_of(expr: Expr, class: impl Into<String>) -> Self {
        Expr::new(ExprKind::InstanceOf {
            expr: boxed(expr),
            class: class.into(),
        })
    }

    pub fn old(expr: Expr) -> Self {
        let span = expr.span;
        Expr::new(ExprKind::Old(boxed(expr))).at(span)
    }

    pub fn spread(expr: Expr) -> Self {
        let span = expr.span;
        Expr::new(ExprKind::Spread(boxed(expr))).at(span)
    }

    pub fn lambda(params: Vec<Param>, body: LambdaBody) -> Self {
        Expr::new(ExprKind::Lambda {
            name: None,
            params,
            body,
        })
    }

    pub fn named_lambda(name: impl Into<String>, params: Vec<Param>, body: LambdaBody) -> Self {
        Expr::new(ExprKind::Lambda {
            name: Some(name.into()),
            params,
            body,
        })
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::new(ExprKind::Assign {
            target: boxed(target),
            value: boxed(value),
        })
    }

    pub fn compound_assign(op: BinaryOp, target: Expr, value: Expr) -> Self {
        Expr::new(ExprKind::CompoundAssign {
            op,
            target: boxed(target),
            value: boxed(value),
        })
    }

    pub fn inc_dec(target: Expr, increment: bool, prefix: bool) -> Self {
        Expr::new(ExprKind::IncDec {
            target: boxed(target),
            increment,
            prefix,
        })
    }

    pub fn intrinsic(intrinsic: Intrinsic) -> Self {
        Expr::new(ExprKind::Intrinsic(intrinsic))
    }

    pub fn is_this(&self) -> bool {
        matches!(self.kind, ExprKind::This)
    }

    /// Walk this expression pre-order, descending into lambda bodies.
    ///
    /// When the callback returns `false`, the children of that node are skipped.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(Node<'a>) -> bool) {
        if !f(Node::Expr(self)) {
            return;
        }
        match &self.kind {
            ExprKind::Literal(_)
            | ExprKind::Name(_)
            | ExprKind::This
            | ExprKind::Result
            | ExprKind::ClassRef(_) => {}
            ExprKind::Field { receiver, .. } => receiver.walk(f),
            ExprKind::Call { receiver, args, .. } => {
                if let Some(r) = receiver {
                    r.walk(f);
                }
                for a in args {
                    a.walk(f);
                }
            }
            ExprKind::New { args, .. } => {
                for a in args {
                    a.walk(f);
                }
            }
            ExprKind::NewArray { length, .. } => length.walk(f),
            ExprKind::ArrayLiteral { elements, .. } => {
                for e in elements {
                    e.walk(f);
                }
            }
            ExprKind::Index { array, index } => {
                array.walk(f);
                index.walk(f);
            }
            ExprKind::Unary { operand, .. } => operand.walk(f),
            ExprKind::Binary { lhs, rhs, .. } => {
                lhs.walk(f);
                rhs.walk(f);
            }
            ExprKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                cond.walk(f);
                then.walk(f);
                otherwise.walk(f);
            }
            ExprKind::InstanceOf { expr, .. } => expr.walk(f),
            ExprKind::Old(inner) | ExprKind::Spread(inner) => inner.walk(f),
            ExprKind::Lambda { body, .. } => match body {
                LambdaBody::Expr(e) => e.walk(f),
                LambdaBody::Block(stmts) => {
                    for s in stmts {
                        s.walk(f);
                    }
                }
            },
            ExprKind::Assign { target, value } | ExprKind::CompoundAssign { target, value, .. } => {
                target.walk(f);
                value.walk(f);
            }
            ExprKind::IncDec { target, .. } => target.walk(f),
            ExprKind::Intrinsic(intrinsic) => match intrinsic {
                Intrinsic::Inspects(e) | Intrinsic::Mutates(e) | Intrinsic::AssertCanCreate(e) => {
                    e.walk(f)
                }
                Intrinsic::OldValue { .. } | Intrinsic::Log { .. } => {}
            },
        }
    }

    /// Mutable pre-order walk over expressions, descending into lambda bodies.
    ///
    /// When the callback returns `false`, the children of that node are skipped
    /// (the callback may have replaced the node itself).
    pub fn walk_mut(&mut self, f: &mut dyn FnMut(&mut Expr) -> bool) {
        if !f(self) {
            return;
        }
        match &mut self.kind {
            ExprKind::Literal(_)
            | ExprKind::Name(_)
            | ExprKind::This
            | ExprKind::Result
            | ExprKind::ClassRef(_) => {}
            ExprKind::Field { receiver, .. } => receiver.walk_mut(f),
            ExprKind::Call { receiver, args, .. } => {
                if let Some(r) = receiver {
                    r.walk_mut(f);
                }
                for a in args {
                    a.walk_mut(f);
                }
            }
            ExprKind::New { args, .. } => {
                for a in args {
                    a.walk_mut(f);
                }
            }
            ExprKind::NewArray { length, .. } => length.walk_mut(f),
            ExprKind::ArrayLiteral { elements, .. } => {
                for e in elements {
                    e.walk_mut(f);
                }
            }
            ExprKind::Index { array, index } => {
                array.walk_mut(f);
                index.walk_mut(f);
            }
            ExprKind::Unary { operand, .. } => operand.walk_mut(f),
            ExprKind::Binary { lhs, rhs, .. } => {
                lhs.walk_mut(f);
                rhs.walk_mut(f);
            }
            ExprKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                cond.walk_mut(f);
                then.walk_mut(f);
                otherwise.walk_mut(f);
            }
            ExprKind::InstanceOf { expr, .. } => expr.walk_mut(f),
            ExprKind::Old(inner) | ExprKind::Spread(inner) => inner.walk_mut(f),
            ExprKind::Lambda { body, .. } => match body {
                LambdaBody::Expr(e) => e.walk_mut(f),
                LambdaBody::Block(stmts) => {
                    for s in stmts {
                        s.walk_exprs_mut(f);
                    }
                }
            },
            ExprKind::Assign { target, value } | ExprKind::CompoundAssign { target, value, .. } => {
                target.walk_mut(f);
                value.walk_mut(f);
            }
            ExprKind::IncDec { target, .. } => target.walk_mut(f),
            ExprKind::Intrinsic(intrinsic) => match intrinsic {
                Intrinsic::Inspects(e) | Intrinsic::Mutates(e) | Intrinsic::AssertCanCreate(e) => {
                    e.walk_mut(f)
                }
                Intrinsic::OldValue { .. } | Intrinsic::Log { .. } => {}
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Statement builders
// ---------------------------------------------------------------------------

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Stmt {
            kind,
            span: Span::default(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn local(name: impl Into<String>, ty: Option<Type>, init: Option<Expr>) -> Self {
        Stmt::new(StmtKind::Local {
            name: name.into(),
            ty,
            init,
        })
    }

    pub fn expr(e: Expr) -> Self {
        let span = e.span;
        Stmt::new(StmtKind::Expr(e)).at(span)
    }

    /// `target = value;`
    pub fn assign(target: Expr, value: Expr) -> Self {
        Stmt::expr(Expr::assign(target, value))
    }

    pub fn if_then(cond: Expr, then: Vec<Stmt>) -> Self {
        let span = cond.span;
        Stmt::new(StmtKind::If {
            cond,
            then,
            otherwise: None,
        })
        .at(span)
    }

    pub fn if_else(cond: Expr, then: Vec<Stmt>, otherwise: Vec<Stmt>) -> Self {
        let span = cond.span;
        Stmt::new(StmtKind::If {
            cond,
            then,
            otherwise: Some(otherwise),
        })
        .at(span)
    }

    pub fn while_loop(cond: Expr, body: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::While { cond, body })
    }

    pub fn for_each(var: impl Into<String>, iterable: Expr, body: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::ForEach {
            var: var.into(),
            iterable,
            body,
        })
    }

    pub fn block(stmts: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::Block(stmts))
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Stmt::new(StmtKind::Return(value))
    }

    pub fn throw(e: Expr) -> Self {
        let span = e.span;
        Stmt::new(StmtKind::Throw(e)).at(span)
    }

    pub fn try_catch(body: Vec<Stmt>, catches: Vec<CatchClause>) -> Self {
        Stmt::new(StmtKind::Try {
            body,
            catches,
            finally: None,
        })
    }

    pub fn assert(cond: Expr, message: Option<Expr>) -> Self {
        let span = cond.span;
        Stmt::new(StmtKind::Assert { cond, message }).at(span)
    }

    pub fn super_call(args: Vec<Expr>) -> Self {
        Stmt::new(StmtKind::ConstructorCall {
            target: ConstructorTarget::Super,
            args,
        })
    }

    pub fn this_call(args: Vec<Expr>) -> Self {
        Stmt::new(StmtKind::ConstructorCall {
            target: ConstructorTarget::This,
            args,
        })
    }

    pub fn spec_scope(kind: ScopeKind, body: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::SpecScope { kind, body })
    }

    /// Walk this statement pre-order, descending into nested statements and
    /// expressions (including lambda bodies).
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(Node<'a>) -> bool) {
        if !f(Node::Stmt(self)) {
            return;
        }
        match &self.kind {
            StmtKind::Local { init, .. } => {
                if let Some(e) = init {
                    e.walk(f);
                }
            }
            StmtKind::Expr(e) | StmtKind::Throw(e) => e.walk(f),
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                cond.walk(f);
                walk_block(then, f);
                if let Some(o) = otherwise {
                    walk_block(o, f);
                }
            }
            StmtKind::While { cond, body } => {
                cond.walk(f);
                walk_block(body, f);
            }
            StmtKind::ForEach { iterable, body, .. } => {
                iterable.walk(f);
                walk_block(body, f);
            }
            StmtKind::Block(stmts) | StmtKind::SpecScope { body: stmts, .. } => walk_block(stmts, f),
            StmtKind::Return(value) => {
                if let Some(e) = value {
                    e.walk(f);
                }
            }
            StmtKind::Try {
                body,
                catches,
                finally,
            } => {
                walk_block(body, f);
                for c in catches {
                    walk_block(&c.body, f);
                }
                if let Some(fin) = finally {
                    walk_block(fin, f);
                }
            }
            StmtKind::Assert { cond, message } => {
                cond.walk(f);
                if let Some(m) = message {
                    m.walk(f);
                }
            }
            StmtKind::ConstructorCall { args, .. } => {
                for a in args {
                    a.walk(f);
                }
            }
        }
    }

    /// Mutable walk over every expression reachable from this statement.
    pub fn walk_exprs_mut(&mut self, f: &mut dyn FnMut(&mut Expr) -> bool) {
        match &mut self.kind {
            StmtKind::Local { init, .. } => {
                if let Some(e) = init {
                    e.walk_mut(f);
                }
            }
            StmtKind::Expr(e) | StmtKind::Throw(e) => e.walk_mut(f),
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                cond.walk_mut(f);
                walk_block_mut(then, f);
                if let Some(o) = otherwise {
                    walk_block_mut(o, f);
                }
            }
            StmtKind::While { cond, body } => {
                cond.walk_mut(f);
                walk_block_mut(body, f);
            }
            StmtKind::ForEach { iterable, body, .. } => {
                iterable.walk_mut(f);
                walk_block_mut(body, f);
            }
            StmtKind::Block(stmts) | StmtKind::SpecScope { body: stmts, .. } => {
                walk_block_mut(stmts, f)
            }
            StmtKind::Return(value) => {
                if let Some(e) = value {
                    e.walk_mut(f);
                }
            }
            StmtKind::Try {
                body,
                catches,
                finally,
            } => {
                walk_block_mut(body, f);
                for c in catches {
                    walk_block_mut(&mut c.body, f);
                }
                if let Some(fin) = finally {
                    walk_block_mut(fin, f);
                }
            }
            StmtKind::Assert { cond, message } => {
                cond.walk_mut(f);
                if let Some(m) = message {
                    m.walk_mut(f);
                }
            }
            StmtKind::ConstructorCall { args, .. } => {
                for a in args {
                    a.walk_mut(f);
                }
            }
        }
    }
}

fn walk_block<'a>(stmts: &'a [Stmt], f: &mut dyn FnMut(Node<'a>) -> bool) {
    for s in stmts {
        s.walk(f);
    }
}

fn walk_block_mut(stmts: &mut [Stmt], f: &mut dyn FnMut(&mut Expr) -> bool) {
    for s in stmts {
        s.walk_exprs_mut(f);
    }
}
