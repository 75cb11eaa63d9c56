//! Rejection of side-effecting constructs inside clauses.

use covenant_core::{Expr, ExprKind, Node, StmtKind};

use super::diagnostics::ContractError;

/// Every side-effecting or lowering-only construct reachable from `expr`,
/// including those inside lambda bodies.
pub fn side_effects(expr: &Expr) -> Vec<ContractError> {
    let mut errors = Vec::new();
    expr.walk(&mut |node| {
        match node {
            Node::Expr(e) => match &e.kind {
                ExprKind::Assign { .. } => errors.push(side_effect("assignment", e)),
                ExprKind::CompoundAssign { op, .. } => errors.push(ContractError::SideEffect {
                    construct: format!("compound assignment '{}='", op.symbol()),
                    span: e.span,
                }),
                ExprKind::IncDec { increment, .. } => errors.push(side_effect(
                    if *increment { "increment" } else { "decrement" },
                    e,
                )),
                ExprKind::Intrinsic(_) => {
                    errors.push(ContractError::InternalConstruct { span: e.span })
                }
                _ => {}
            },
            Node::Stmt(s) => match &s.kind {
                StmtKind::Throw(_) => errors.push(ContractError::SideEffect {
                    construct: "throw".into(),
                    span: s.span,
                }),
                StmtKind::Try { .. } => errors.push(ContractError::SideEffect {
                    construct: "try".into(),
                    span: s.span,
                }),
                StmtKind::ConstructorCall { .. } | StmtKind::SpecScope { .. } => {
                    errors.push(ContractError::InternalConstruct { span: s.span })
                }
                _ => {}
            },
        }
        true
    });
    errors
}

fn side_effect(construct: &str, e: &Expr) -> ContractError {
    ContractError::SideEffect {
        construct: construct.into(),
        span: e.span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_core::{BinaryOp, LambdaBody, Param, Span, Stmt, Type};

    #[test]
    fn pure_clause_has_no_errors() {
        let e = Expr::eq(
            Expr::call_self("getHealth", vec![]),
            Expr::binary(
                BinaryOp::Sub,
                Expr::old(Expr::call_self("getHealth", vec![])),
                Expr::name("amount"),
            ),
        );
        assert!(side_effects(&e).is_empty());
    }

    #[test]
    fn assignment_is_pinned() {
        let e = Expr::eq(
            Expr::assign(Expr::name("x"), Expr::int(1)).at(Span::new(4, 9)),
            Expr::int(1),
        );
        let errors = side_effects(&e);
        assert_eq!(
            errors,
            vec![ContractError::SideEffect {
                construct: "assignment".into(),
                span: Span::new(4, 9)
            }]
        );
    }

    #[test]
    fn increments_and_compound_assignments() {
        let e = Expr::and(
            Expr::eq(Expr::inc_dec(Expr::name("x"), true, false), Expr::int(1)),
            Expr::eq(
                Expr::compound_assign(BinaryOp::Add, Expr::name("y"), Expr::int(2)),
                Expr::int(3),
            ),
        );
        let constructs: Vec<String> = side_effects(&e)
            .into_iter()
            .map(|err| match err {
                ContractError::SideEffect { construct, .. } => construct,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(constructs, vec!["increment", "compound assignment '+='"]);
    }

    #[test]
    fn throw_inside_lambda_is_rejected() {
        let lambda = Expr::lambda(
            vec![Param::new("s", Type::class("Shape"))],
            LambdaBody::Block(vec![
                Stmt::throw(Expr::new_object("IllegalStateException", vec![])).at(Span::new(20, 30)),
            ]),
        );
        let e = Expr::call(Expr::name("shapes"), "forAll", vec![lambda]);
        let errors = side_effects(&e);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].span(), Span::new(20, 30));
    }
}
