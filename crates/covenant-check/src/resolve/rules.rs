//! Typing rules for clause expressions.
//!
//! [`ClauseTyper`] computes the static type of a clause expression and records
//! every error it meets instead of stopping at the first one. A sub-expression
//! that failed to type yields `None`, and its parents stay quiet about it so
//! that one mistake produces one diagnostic.

use covenant_core::types::OBJECT_CLASS;
use covenant_core::{
    BinaryOp, ClassDecl, ExceptionClause, Expr, ExprKind, LambdaBody, Literal, Param, Program,
    Span, Stmt, StmtKind, Type, UnaryOp,
};

use super::diagnostics::ContractError;
use super::scope::{ClauseKind, RoutineContext, Scope};
use crate::contracts::names::SPREAD_ELEMENT;

/// Whether a value of type `from` may be used where `to` is expected.
pub fn is_assignable(program: &Program, from: &Type, to: &Type) -> bool {
    if from == to {
        return true;
    }
    match (from, to) {
        (Type::Int, Type::Double) => true,
        (Type::Null, t) => t.is_reference(),
        (f, Type::Class(c)) if c == OBJECT_CLASS => f.is_reference(),
        (Type::Class(a), Type::Class(b)) => program.is_subclass(a, b),
        (Type::Array(a), Type::Array(b)) => a.is_reference() && is_assignable(program, a, b),
        _ => false,
    }
}

pub struct ClauseTyper<'a> {
    program: &'a Program,
    ctx: &'a RoutineContext<'a>,
    kind: ClauseKind,
    scope: Scope,
    in_old: bool,
    errors: Vec<ContractError>,
}

impl<'a> ClauseTyper<'a> {
    pub fn new(
        program: &'a Program,
        ctx: &'a RoutineContext<'a>,
        kind: ClauseKind,
        params: &[Param],
    ) -> Self {
        let mut scope = Scope::new();
        for p in params {
            scope.bind(p.name.clone(), p.ty.clone());
        }
        ClauseTyper {
            program,
            ctx,
            kind,
            scope,
            in_old: false,
            errors: Vec::new(),
        }
    }

    pub fn into_errors(self) -> Vec<ContractError> {
        self.errors
    }

    fn mismatch(&mut self, expected: impl ToString, found: &Type, span: Span) {
        self.errors.push(ContractError::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
            span,
        });
    }

    /// Type `e` and require it to be assignable to `expected`.
    pub fn expect(&mut self, e: &Expr, expected: &Type) {
        if let Some(found) = self.type_of(e) {
            if !is_assignable(self.program, &found, expected) {
                self.mismatch(expected, &found, e.span);
            }
        }
    }

    /// An `@inspects`, `@mutates` or `@creates` entry.
    pub fn effect_target(&mut self, e: &Expr) {
        if let ExprKind::Spread(inner) = &e.kind {
            if !self.kind.allows_spread() {
                self.errors.push(ContractError::SpreadNotAllowed { span: e.span });
                return;
            }
            let Some(ty) = self.type_of(inner) else {
                return;
            };
            match ty {
                Type::Array(element) if element.is_reference() => {}
                other => self.errors.push(ContractError::NotReference {
                    found: other.to_string(),
                    span: inner.span,
                }),
            }
            return;
        }
        if let Some(ty) = self.type_of(e) {
            if !ty.is_reference() {
                self.errors.push(ContractError::NotReference {
                    found: ty.to_string(),
                    span: e.span,
                });
            }
        }
    }

    /// A `@mutates_properties` entry: a zero-argument call, whose receiver may
    /// be a spread over a collection.
    pub fn property(&mut self, e: &Expr) {
        let ExprKind::Call {
            receiver,
            method,
            args,
        } = &e.kind
        else {
            self.errors
                .push(ContractError::MutatesPropertiesNotCall { span: e.span });
            return;
        };
        if !args.is_empty() {
            self.errors
                .push(ContractError::MutatesPropertiesWithArguments { span: e.span });
            return;
        }
        let Some(ExprKind::Spread(collection)) = receiver.as_deref().map(|r| &r.kind) else {
            self.type_of(e);
            return;
        };
        let Some(ty) = self.type_of(collection) else {
            return;
        };
        let element = match ty {
            Type::Array(element) if element.is_reference() => *element,
            other => {
                self.errors.push(ContractError::NotReference {
                    found: other.to_string(),
                    span: collection.span,
                });
                return;
            }
        };
        self.scope.push();
        self.scope.bind(SPREAD_ELEMENT, element);
        let call = Expr::call(
            Expr::name(SPREAD_ELEMENT).at(collection.span),
            method.clone(),
            vec![],
        )
        .at(e.span);
        self.type_of(&call);
        self.scope.pop();
    }

    /// The declared type of a `@throws` or `@may_throw` clause.
    pub fn exception_type(&mut self, clause: &ExceptionClause) {
        let Some(name) = &clause.exception else {
            self.errors.push(ContractError::InvalidExceptionType {
                name: None,
                span: clause.span,
            });
            return;
        };
        if self.known_class(name, clause.span).is_some() && !self.program.is_throwable(name) {
            self.errors.push(ContractError::InvalidExceptionType {
                name: Some(name.clone()),
                span: clause.span,
            });
        }
    }

    fn known_class(&mut self, name: &str, span: Span) -> Option<&'a ClassDecl> {
        let Some(class) = self.program.class(name) else {
            self.errors.push(ContractError::UnknownClass {
                name: name.to_string(),
                span,
            });
            return None;
        };
        if !self.ctx.visibility.allows(&class.modifiers, &class.package) {
            self.errors.push(ContractError::TypeNotVisible {
                class: name.to_string(),
                span,
            });
        }
        Some(class)
    }

    /// Class whose members a receiver of type `ty` exposes.
    fn receiver_class(&mut self, ty: &Type, span: Span) -> Option<String> {
        match ty {
            Type::Class(c) => Some(c.clone()),
            Type::Array(_) => Some(OBJECT_CLASS.to_string()),
            other => {
                self.mismatch("an object", other, span);
                None
            }
        }
    }

    pub fn type_of(&mut self, e: &Expr) -> Option<Type> {
        match &e.kind {
            ExprKind::Literal(lit) => Some(match lit {
                Literal::Null => Type::Null,
                Literal::Bool(_) => Type::Boolean,
                Literal::Int(_) => Type::Int,
                Literal::Double(_) => Type::Double,
                Literal::Str(_) => Type::string(),
            }),
            ExprKind::Name(name) => {
                if let Some(ty) = self.scope.lookup(name) {
                    return Some(ty.clone());
                }
                match self.program.lookup_field(&self.ctx.class.name, name) {
                    Some((owner, field)) => {
                        if !self.ctx.visibility.allows(&field.modifiers, &owner.package) {
                            self.errors.push(ContractError::FieldNotVisible {
                                field: name.clone(),
                                span: e.span,
                            });
                        }
                        Some(field.ty.clone())
                    }
                    None => {
                        self.errors.push(ContractError::UnknownName {
                            name: name.clone(),
                            span: e.span,
                        });
                        None
                    }
                }
            }
            ExprKind::This => {
                if self.ctx.is_static {
                    self.errors.push(ContractError::ThisInStatic { span: e.span });
                    return None;
                }
                Some(Type::class(self.ctx.class.name.clone()))
            }
            ExprKind::Result => {
                if !self.kind.allows_result() || self.ctx.return_type == Type::Void {
                    self.errors
                        .push(ContractError::ResultNotAllowed { span: e.span });
                    return None;
                }
                Some(self.ctx.return_type.clone())
            }
            ExprKind::ClassRef(name) => {
                self.known_class(name, e.span)?;
                Some(Type::class(name.clone()))
            }
            ExprKind::Field { receiver, name } => {
                let ty = self.type_of(receiver)?;
                if matches!(ty, Type::Array(_)) && name == "length" {
                    return Some(Type::Int);
                }
                let class = self.receiver_class(&ty, receiver.span)?;
                match self.program.lookup_field(&class, name) {
                    Some((owner, field)) => {
                        if !self.ctx.visibility.allows(&field.modifiers, &owner.package) {
                            self.errors.push(ContractError::FieldNotVisible {
                                field: name.clone(),
                                span: e.span,
                            });
                        }
                        Some(field.ty.clone())
                    }
                    None => {
                        self.errors.push(ContractError::UnknownField {
                            class,
                            field: name.clone(),
                            span: e.span,
                        });
                        None
                    }
                }
            }
            ExprKind::Call {
                receiver,
                method,
                args,
            } => {
                let arg_types: Vec<Option<Type>> = args.iter().map(|a| self.type_of(a)).collect();
                let class = match receiver.as_deref() {
                    None => self.ctx.class.name.clone(),
                    Some(Expr {
                        kind: ExprKind::ClassRef(name),
                        span,
                    }) => {
                        self.known_class(name, *span)?;
                        name.clone()
                    }
                    Some(Expr {
                        kind: ExprKind::Spread(_),
                        span,
                    }) => {
                        self.errors
                            .push(ContractError::SpreadNotAllowed { span: *span });
                        return None;
                    }
                    Some(r) => {
                        let ty = self.type_of(r)?;
                        self.receiver_class(&ty, r.span)?
                    }
                };
                let Some((owner, decl)) = self.program.lookup_method(&class, method, args.len())
                else {
                    self.errors.push(ContractError::UnknownMethod {
                        class,
                        method: method.clone(),
                        arity: args.len(),
                        span: e.span,
                    });
                    return None;
                };
                if !self.ctx.visibility.allows(&decl.modifiers, &owner.package) {
                    self.errors.push(ContractError::MethodNotVisible {
                        method: method.clone(),
                        span: e.span,
                    });
                }
                self.check_arguments(&decl.params, args, &arg_types);
                Some(decl.return_type.clone())
            }
            ExprKind::New { class, args } => {
                let arg_types: Vec<Option<Type>> = args.iter().map(|a| self.type_of(a)).collect();
                let decl = self.known_class(class, e.span)?;
                if decl.constructors.is_empty() && args.is_empty() {
                    return Some(Type::class(class.clone()));
                }
                let Some(ctor) = self.program.lookup_constructor(class, args.len()) else {
                    self.errors.push(ContractError::UnknownMethod {
                        class: class.clone(),
                        method: covenant_core::program::CONSTRUCTOR_NAME.to_string(),
                        arity: args.len(),
                        span: e.span,
                    });
                    return None;
                };
                if !self.ctx.visibility.allows(&ctor.modifiers, &decl.package) {
                    self.errors.push(ContractError::ConstructorNotVisible {
                        class: class.clone(),
                        span: e.span,
                    });
                }
                self.check_arguments(&ctor.params, args, &arg_types);
                Some(Type::class(class.clone()))
            }
            ExprKind::NewArray { element, length } => {
                self.expect(length, &Type::Int);
                Some(Type::array_of(element.clone()))
            }
            ExprKind::ArrayLiteral { element, elements } => {
                for el in elements {
                    self.expect(el, element);
                }
                Some(Type::array_of(element.clone()))
            }
            ExprKind::Index { array, index } => {
                let ty = self.type_of(array);
                self.expect(index, &Type::Int);
                match ty? {
                    Type::Array(element) => Some(*element),
                    other => {
                        self.mismatch("an array", &other, array.span);
                        None
                    }
                }
            }
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not => {
                    self.expect(operand, &Type::Boolean);
                    Some(Type::Boolean)
                }
                UnaryOp::Neg => {
                    let ty = self.type_of(operand)?;
                    if !ty.is_numeric() {
                        self.mismatch("a number", &ty, operand.span);
                        return None;
                    }
                    Some(ty)
                }
            },
            ExprKind::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs),
            ExprKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                self.expect(cond, &Type::Boolean);
                let t = self.type_of(then);
                let o = self.type_of(otherwise);
                let (t, o) = (t?, o?);
                if is_assignable(self.program, &o, &t) {
                    Some(t)
                } else if is_assignable(self.program, &t, &o) {
                    Some(o)
                } else {
                    self.mismatch(&t, &o, otherwise.span);
                    None
                }
            }
            ExprKind::InstanceOf { expr, class } => {
                if let Some(ty) = self.type_of(expr) {
                    if !ty.is_reference() {
                        self.mismatch("an object", &ty, expr.span);
                    }
                }
                self.known_class(class, e.span)?;
                Some(Type::Boolean)
            }
            ExprKind::Old(inner) => {
                if !self.kind.allows_old() {
                    self.errors
                        .push(ContractError::OldOutsidePostcondition { span: e.span });
                } else if self.in_old {
                    self.errors.push(ContractError::NestedOld { span: e.span });
                }
                let outer = std::mem::replace(&mut self.in_old, true);
                let ty = self.type_of(inner);
                self.in_old = outer;
                ty
            }
            ExprKind::Spread(_) => {
                self.errors
                    .push(ContractError::SpreadNotAllowed { span: e.span });
                None
            }
            ExprKind::Lambda { params, body, .. } => {
                self.scope.push();
                for p in params {
                    self.scope.bind(p.name.clone(), p.ty.clone());
                }
                let ret = match body {
                    LambdaBody::Expr(body) => self.type_of(body),
                    LambdaBody::Block(stmts) => {
                        let mut ret = None;
                        self.check_stmts(stmts, &mut ret);
                        Some(ret.unwrap_or(Type::Void))
                    }
                };
                self.scope.pop();
                Some(Type::Function {
                    params: params.iter().map(|p| p.ty.clone()).collect(),
                    ret: Box::new(ret?),
                })
            }
            // Reported by the purity pass.
            ExprKind::Assign { .. }
            | ExprKind::CompoundAssign { .. }
            | ExprKind::IncDec { .. }
            | ExprKind::Intrinsic(_) => None,
        }
    }

    fn check_arguments(&mut self, params: &[Param], args: &[Expr], types: &[Option<Type>]) {
        for ((param, arg), ty) in params.iter().zip(args).zip(types) {
            if let Some(ty) = ty {
                if !is_assignable(self.program, ty, &param.ty) {
                    self.mismatch(&param.ty, ty, arg.span);
                }
            }
        }
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Option<Type> {
        let l = self.type_of(lhs);
        let r = self.type_of(rhs);
        let (l, r) = (l?, r?);
        if op == BinaryOp::Add && (l == Type::string() || r == Type::string()) {
            return Some(Type::string());
        }
        if op.is_arithmetic() || op.is_relational() {
            for (ty, side) in [(&l, lhs), (&r, rhs)] {
                if !ty.is_numeric() {
                    self.mismatch("a number", ty, side.span);
                    return None;
                }
            }
            if op.is_relational() {
                return Some(Type::Boolean);
            }
            return Some(if l == Type::Int && r == Type::Int {
                Type::Int
            } else {
                Type::Double
            });
        }
        if op.is_equality() {
            let comparable = (l.is_numeric() && r.is_numeric())
                || (l == Type::Boolean && r == Type::Boolean)
                || (l.is_reference() && r.is_reference());
            if !comparable {
                self.mismatch(&l, &r, rhs.span);
                return None;
            }
            return Some(Type::Boolean);
        }
        for (ty, side) in [(&l, lhs), (&r, rhs)] {
            if *ty != Type::Boolean {
                self.mismatch(Type::Boolean, ty, side.span);
                return None;
            }
        }
        Some(Type::Boolean)
    }

    /// Statements of a lambda block. `ret` receives the type of the first
    /// `return` with a value.
    fn check_stmts(&mut self, stmts: &[Stmt], ret: &mut Option<Type>) {
        self.scope.push();
        for s in stmts {
            self.check_stmt(s, ret);
        }
        self.scope.pop();
    }

    fn check_stmt(&mut self, s: &Stmt, ret: &mut Option<Type>) {
        match &s.kind {
            StmtKind::Local { name, ty, init } => {
                let init_ty = match (init, ty) {
                    (Some(e), Some(declared)) => {
                        self.expect(e, declared);
                        Some(declared.clone())
                    }
                    (Some(e), None) => self.type_of(e),
                    (None, declared) => declared.clone(),
                };
                if let Some(t) = init_ty {
                    self.scope.bind(name.clone(), t);
                }
            }
            StmtKind::Expr(e) => {
                self.type_of(e);
            }
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                self.expect(cond, &Type::Boolean);
                self.check_stmts(then, ret);
                if let Some(o) = otherwise {
                    self.check_stmts(o, ret);
                }
            }
            StmtKind::While { cond, body } => {
                self.expect(cond, &Type::Boolean);
                self.check_stmts(body, ret);
            }
            StmtKind::ForEach {
                var,
                iterable,
                body,
            } => {
                let element = match self.type_of(iterable) {
                    Some(Type::Array(element)) => Some(*element),
                    Some(other) => {
                        self.mismatch("an array", &other, iterable.span);
                        None
                    }
                    None => None,
                };
                self.scope.push();
                if let Some(element) = element {
                    self.scope.bind(var.clone(), element);
                }
                self.check_stmts(body, ret);
                self.scope.pop();
            }
            StmtKind::Block(stmts) => self.check_stmts(stmts, ret),
            StmtKind::Return(value) => {
                if let Some(e) = value {
                    if let Some(t) = self.type_of(e) {
                        ret.get_or_insert(t);
                    }
                }
            }
            StmtKind::Assert { cond, message } => {
                self.expect(cond, &Type::Boolean);
                if let Some(m) = message {
                    self.type_of(m);
                }
            }
            // Reported by the purity pass.
            StmtKind::Throw(_)
            | StmtKind::Try { .. }
            | StmtKind::ConstructorCall { .. }
            | StmtKind::SpecScope { .. } => {}
        }
    }
}
