//! Dispatch of `@throws` and `@may_throw` clauses.
//!
//! `@throws T | C` is a guarantee: when `C` holds after the call, the routine
//! must have thrown a `T`. `@may_throw T | C` is a permission: when `C` held
//! before the call, throwing a `T` is allowed. The generated statements run
//! inside the postcondition closure, with the thrown exception (or null) bound
//! to [`EXCEPTION_PARAM`].

use covenant_core::types::ASSERTION_ERROR_CLASS;
use covenant_core::{ExceptionClause, Expr, Intrinsic, Span, Stmt, Type};

use super::names::{AUTHORIZED_VAR, EXCEPTION_PARAM, MATCHED_VAR, NOTICED_VAR, UNMATCHED_VAR};
use super::{EXCEPTION_NOT_SPECIFIED, LOGGER_NAME, THROWS_NOT_THROWN};

/// A `@may_throw` clause whose condition was captured before the call.
#[derive(Debug, Clone, PartialEq)]
pub struct MayThrowGuard {
    pub exception: String,
    /// Read of the captured condition.
    pub guard: Expr,
    pub span: Span,
}

fn exception() -> Expr {
    Expr::name(EXCEPTION_PARAM)
}

fn flag(name: &str) -> Stmt {
    Stmt::local(name, Some(Type::Boolean), Some(Expr::bool(false)))
}

fn set(name: &str, value: Expr) -> Stmt {
    Stmt::assign(Expr::name(name), value)
}

fn notice() -> Stmt {
    Stmt::expr(Expr::intrinsic(Intrinsic::Log {
        logger: LOGGER_NAME.to_string(),
        message: EXCEPTION_NOT_SPECIFIED.to_string(),
    }))
}

fn unsatisfied(cause: Option<Expr>) -> Expr {
    let mut args = vec![Expr::string(THROWS_NOT_THROWN)];
    args.extend(cause);
    Expr::new_object(ASSERTION_ERROR_CLASS, args)
}

/// Checks run when the body completed normally: the first `@throws`
/// condition that holds is a broken guarantee.
pub fn normal_completion(throws: &[ExceptionClause]) -> Vec<Stmt> {
    throws
        .iter()
        .filter(|c| c.exception.is_some())
        .map(|c| {
            Stmt::if_then(
                c.condition.clone(),
                vec![Stmt::throw(unsatisfied(None).at(c.span)).at(c.span)],
            )
            .at(c.span)
        })
        .collect()
}

/// Dispatch run when the body threw a runtime exception. Always ends by
/// throwing: either the original exception or an assertion caused by it.
///
/// The first `@may_throw` clause whose captured condition holds decides: a
/// matching type authorizes the exception, any other type logs the notice.
/// An exception matched by no holding clause of either kind is noticed once.
pub fn exceptional_completion(throws: &[ExceptionClause], may_throw: &[MayThrowGuard]) -> Vec<Stmt> {
    let mut out = vec![flag(AUTHORIZED_VAR), flag(NOTICED_VAR)];
    let chain = may_throw.iter().rev().fold(None::<Stmt>, |otherwise, g| {
        let decide = vec![Stmt::if_else(
            Expr::instance_of(exception(), g.exception.clone()),
            vec![set(AUTHORIZED_VAR, Expr::bool(true))],
            vec![notice(), set(NOTICED_VAR, Expr::bool(true))],
        )];
        let stmt = match otherwise {
            None => Stmt::if_then(g.guard.clone(), decide),
            Some(o) => Stmt::if_else(g.guard.clone(), decide, vec![o]),
        };
        Some(stmt.at(g.span))
    });
    out.extend(chain);

    out.push(flag(MATCHED_VAR));
    out.push(flag(UNMATCHED_VAR));
    let guaranteed: Vec<(&String, &ExceptionClause)> = throws
        .iter()
        .filter_map(|c| c.exception.as_ref().map(|t| (t, c)))
        .collect();
    for (ty, c) in &guaranteed {
        out.push(
            Stmt::if_then(
                Expr::and(Expr::not(Expr::name(MATCHED_VAR)), c.condition.clone()),
                vec![Stmt::if_else(
                    Expr::instance_of(exception(), (*ty).clone()),
                    vec![set(MATCHED_VAR, Expr::bool(true))],
                    vec![set(UNMATCHED_VAR, Expr::bool(true))],
                )],
            )
            .at(c.span),
        );
    }

    out.push(Stmt::if_then(
        Expr::and(
            Expr::and(
                Expr::not(Expr::name(MATCHED_VAR)),
                Expr::not(Expr::name(AUTHORIZED_VAR)),
            ),
            Expr::not(Expr::name(NOTICED_VAR)),
        ),
        vec![notice()],
    ));
    let span = guaranteed.first().map(|(_, c)| c.span).unwrap_or_default();
    out.push(Stmt::if_then(
        Expr::and(Expr::name(UNMATCHED_VAR), Expr::not(Expr::name(MATCHED_VAR))),
        vec![Stmt::throw(unsatisfied(Some(exception())).at(span)).at(span)],
    ));
    out.push(Stmt::throw(exception()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_core::{ExprKind, StmtKind};

    #[test]
    fn normal_completion_skips_untyped_clauses() {
        let clauses = vec![
            ExceptionClause::new("IllegalArgumentException", Expr::bool(true)).at(Span::new(1, 2)),
            ExceptionClause {
                exception: None,
                condition: Expr::bool(true),
                span: Span::new(3, 4),
            },
        ];
        let stmts = normal_completion(&clauses);
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].span, Span::new(1, 2));
    }

    #[test]
    fn may_throw_clauses_form_one_chain() {
        let guard = |t: &str| MayThrowGuard {
            exception: t.into(),
            guard: Expr::bool(true),
            span: Span::default(),
        };
        let stmts = exceptional_completion(
            &[],
            &[guard("IllegalStateException"), guard("ArithmeticException")],
        );
        // two flags, chain, two flags, log, assertion, rethrow
        assert_eq!(stmts.len(), 8);
        match &stmts[2].kind {
            StmtKind::If {
                otherwise: Some(o), ..
            } => assert!(matches!(o[0].kind, StmtKind::If { otherwise: None, .. })),
            other => panic!("expected if/else, got {other:?}"),
        }
        assert!(matches!(
            &stmts[7].kind,
            StmtKind::Throw(Expr { kind: ExprKind::Name(n), .. }) if n == EXCEPTION_PARAM
        ));
    }
}
