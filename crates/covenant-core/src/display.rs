//! Java-like pretty printer for expressions and statements.
//!
//! The rendering is deterministic: two structurally equal expressions always
//! print identically (spans are ignored). The contract lowering relies on this
//! to deduplicate `old(...)` captures by their source text.

use std::fmt::{self, Write};

use crate::ast::{
    CatchClause, ConstructorTarget, Expr, ExprKind, Intrinsic, LambdaBody, Literal, Param,
    ScopeKind, Stmt, StmtKind, UnaryOp,
};

const INDENT: &str = "    ";

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Double(d) => write!(f, "{:?}", d),
            Literal::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty, self.name)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(f, self, 0)
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_stmt(f, self, 0)
    }
}

/// Render a statement list as an indented block body, one statement per line.
pub fn render_block(stmts: &[Stmt]) -> String {
    let mut out = String::new();
    for s in stmts {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{}", s);
    }
    out
}

/// Operands that need parentheses when nested inside an operator.
fn is_compound(e: &Expr) -> bool {
    matches!(
        e.kind,
        ExprKind::Binary { .. }
            | ExprKind::Conditional { .. }
            | ExprKind::Assign { .. }
            | ExprKind::CompoundAssign { .. }
            | ExprKind::InstanceOf { .. }
            | ExprKind::Lambda { .. }
    )
}

fn write_operand(f: &mut dyn Write, e: &Expr, indent: usize) -> fmt::Result {
    if is_compound(e) {
        write!(f, "(")?;
        write_expr(f, e, indent)?;
        write!(f, ")")
    } else {
        write_expr(f, e, indent)
    }
}

fn write_args(f: &mut dyn Write, args: &[Expr], indent: usize) -> fmt::Result {
    write!(f, "(")?;
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write_expr(f, a, indent)?;
    }
    write!(f, ")")
}

fn write_expr(f: &mut dyn Write, e: &Expr, indent: usize) -> fmt::Result {
    match &e.kind {
        ExprKind::Literal(lit) => write!(f, "{}", lit),
        ExprKind::Name(n) => write!(f, "{}", n),
        ExprKind::This => write!(f, "this"),
        ExprKind::Result => write!(f, "result"),
        ExprKind::ClassRef(c) => write!(f, "{}", c),
        ExprKind::Field { receiver, name } => {
            write_operand(f, receiver, indent)?;
            write!(f, ".{}", name)
        }
        ExprKind::Call {
            receiver,
            method,
            args,
        } => {
            if let Some(r) = receiver {
                write_operand(f, r, indent)?;
                write!(f, ".")?;
            }
            write!(f, "{}", method)?;
            write_args(f, args, indent)
        }
        ExprKind::New { class, args } => {
            write!(f, "new {}", class)?;
            write_args(f, args, indent)
        }
        ExprKind::NewArray { element, length } => {
            write!(f, "new {}[", element)?;
            write_expr(f, length, indent)?;
            write!(f, "]")
        }
        ExprKind::ArrayLiteral { element, elements } => {
            write!(f, "new {}[] {{", element)?;
            for (i, el) in elements.iter().enumerate() {
                write!(f, "{}", if i == 0 { " " } else { ", " })?;
                write_expr(f, el, indent)?;
            }
            write!(f, " }}")
        }
        ExprKind::Index { array, index } => {
            write_operand(f, array, indent)?;
            write!(f, "[")?;
            write_expr(f, index, indent)?;
            write!(f, "]")
        }
        ExprKind::Unary { op, operand } => {
            let sym = match op {
                UnaryOp::Not => "!",
                UnaryOp::Neg => "-",
            };
            write!(f, "{}", sym)?;
            write_operand(f, operand, indent)
        }
        ExprKind::Binary { op, lhs, rhs } => {
            write_operand(f, lhs, indent)?;
            write!(f, " {} ", op.symbol())?;
            write_operand(f, rhs, indent)
        }
        ExprKind::Conditional {
            cond,
            then,
            otherwise,
        } => {
            write_operand(f, cond, indent)?;
            write!(f, " ? ")?;
            write_operand(f, then, indent)?;
            write!(f, " : ")?;
            write_operand(f, otherwise, indent)
        }
        ExprKind::InstanceOf { expr, class } => {
            write_operand(f, expr, indent)?;
            write!(f, " instanceof {}", class)
        }
        ExprKind::Old(inner) => {
            write!(f, "old(")?;
            write_expr(f, inner, indent)?;
            write!(f, ")")
        }
        ExprKind::Spread(inner) => {
            write!(f, "(...")?;
            write_expr(f, inner, indent)?;
            write!(f, ")")
        }
        ExprKind::Lambda { name, params, body } => {
            if let Some(n) = name {
                write!(f, "{}: ", n)?;
            }
            write!(f, "(")?;
            for (i, p) in params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", p)?;
            }
            write!(f, ") -> ")?;
            match body {
                LambdaBody::Expr(e) => write_expr(f, e, indent),
                LambdaBody::Block(stmts) => write_block(f, stmts, indent),
            }
        }
        ExprKind::Assign { target, value } => {
            write_expr(f, target, indent)?;
            write!(f, " = ")?;
            write_expr(f, value, indent)
        }
        ExprKind::CompoundAssign { op, target, value } => {
            write_expr(f, target, indent)?;
            write!(f, " {}= ", op.symbol())?;
            write_expr(f, value, indent)
        }
        ExprKind::IncDec {
            target,
            increment,
            prefix,
        } => {
            let sym = if *increment { "++" } else { "--" };
            if *prefix {
                write!(f, "{}", sym)?;
                write_operand(f, target, indent)
            } else {
                write_operand(f, target, indent)?;
                write!(f, "{}", sym)
            }
        }
        ExprKind::Intrinsic(intrinsic) => match intrinsic {
            Intrinsic::Inspects(e) => {
                write!(f, "inspects(")?;
                write_expr(f, e, indent)?;
                write!(f, ")")
            }
            Intrinsic::Mutates(e) => {
                write!(f, "mutates(")?;
                write_expr(f, e, indent)?;
                write!(f, ")")
            }
            Intrinsic::AssertCanCreate(e) => {
                write!(f, "assertCanCreate(")?;
                write_expr(f, e, indent)?;
                write!(f, ")")
            }
            Intrinsic::OldValue { value, failure } => {
                write!(f, "oldValue({}, {})", value, failure)
            }
            Intrinsic::Log { logger, message } => write!(f, "log({:?}, {:?})", logger, message),
        },
    }
}

fn pad(f: &mut dyn Write, indent: usize) -> fmt::Result {
    for _ in 0..indent {
        f.write_str(INDENT)?;
    }
    Ok(())
}

/// `{ ... }` with the closing brace at `indent`.
fn write_block(f: &mut dyn Write, stmts: &[Stmt], indent: usize) -> fmt::Result {
    if stmts.is_empty() {
        return write!(f, "{{ }}");
    }
    writeln!(f, "{{")?;
    for s in stmts {
        pad(f, indent + 1)?;
        write_stmt(f, s, indent + 1)?;
        writeln!(f)?;
    }
    pad(f, indent)?;
    write!(f, "}}")
}

fn write_catch(f: &mut dyn Write, c: &CatchClause, indent: usize) -> fmt::Result {
    write!(f, " catch ({} {}) ", c.class, c.param)?;
    write_block(f, &c.body, indent)
}

fn write_stmt(f: &mut dyn Write, s: &Stmt, indent: usize) -> fmt::Result {
    match &s.kind {
        StmtKind::Local { name, ty, init } => {
            match ty {
                Some(t) => write!(f, "{} {}", t, name)?,
                None => write!(f, "var {}", name)?,
            }
            if let Some(e) = init {
                write!(f, " = ")?;
                write_expr(f, e, indent)?;
            }
            write!(f, ";")
        }
        StmtKind::Expr(e) => {
            write_expr(f, e, indent)?;
            write!(f, ";")
        }
        StmtKind::If {
            cond,
            then,
            otherwise,
        } => {
            write!(f, "if (")?;
            write_expr(f, cond, indent)?;
            write!(f, ") ")?;
            write_block(f, then, indent)?;
            if let Some(o) = otherwise {
                write!(f, " else ")?;
                write_block(f, o, indent)?;
            }
            Ok(())
        }
        StmtKind::While { cond, body } => {
            write!(f, "while (")?;
            write_expr(f, cond, indent)?;
            write!(f, ") ")?;
            write_block(f, body, indent)
        }
        StmtKind::ForEach {
            var,
            iterable,
            body,
        } => {
            write!(f, "for (var {} : ", var)?;
            write_expr(f, iterable, indent)?;
            write!(f, ") ")?;
            write_block(f, body, indent)
        }
        StmtKind::Block(stmts) => write_block(f, stmts, indent),
        StmtKind::Return(value) => match value {
            Some(e) => {
                write!(f, "return ")?;
                write_expr(f, e, indent)?;
                write!(f, ";")
            }
            None => write!(f, "return;"),
        },
        StmtKind::Throw(e) => {
            write!(f, "throw ")?;
            write_expr(f, e, indent)?;
            write!(f, ";")
        }
        StmtKind::Try {
            body,
            catches,
            finally,
        } => {
            write!(f, "try ")?;
            write_block(f, body, indent)?;
            for c in catches {
                write_catch(f, c, indent)?;
            }
            if let Some(fin) = finally {
                write!(f, " finally ")?;
                write_block(f, fin, indent)?;
            }
            Ok(())
        }
        StmtKind::Assert { cond, message } => {
            write!(f, "assert ")?;
            write_expr(f, cond, indent)?;
            if let Some(m) = message {
                write!(f, " : ")?;
                write_expr(f, m, indent)?;
            }
            write!(f, ";")
        }
        StmtKind::ConstructorCall { target, args } => {
            let kw = match target {
                ConstructorTarget::Super => "super",
                ConstructorTarget::This => "this",
            };
            write!(f, "{}", kw)?;
            write_args(f, args, indent)?;
            write!(f, ";")
        }
        StmtKind::SpecScope { kind, body } => {
            let kw = match kind {
                ScopeKind::Routine => "effectScope",
                ScopeKind::Invariant => "invariantScope",
            };
            write!(f, "{} ", kw)?;
            write_block(f, body, indent)
        }
    }
}
