//! Pre-state capture for `old(...)` expressions.
//!
//! Each distinct `old(E)` of a routine becomes two locals evaluated before the
//! body runs: the value of `E`, and the exception `E` threw, if any. The
//! capture never lets a failure escape; reading the captured value re-throws
//! the recorded failure instead, so a postcondition that never looks at a
//! broken `old(E)` is unaffected by it.

use covenant_core::types::{OBJECT_CLASS, THROWABLE_CLASS};
use covenant_core::{CatchClause, Expr, ExprKind, Intrinsic, Span, Stmt, StmtKind, Type};
use indexmap::IndexMap;

use super::names::{old_value_name, CAPTURE_FAILURE_PARAM};

/// One captured `old(E)`.
#[derive(Debug, Clone, PartialEq)]
pub struct OldCapture {
    /// Local holding the value of `E`.
    pub value: String,
    /// Local holding the failure of `E`, or null.
    pub failure: String,
    pub expr: Expr,
    /// Span of the first occurrence.
    pub span: Span,
}

impl OldCapture {
    /// `failure = null; value = null; try { inner = E; value = inner; } catch (Throwable t) { failure = t; }`
    fn statements(&self) -> Vec<Stmt> {
        let inner = format!("{} inner", self.value);
        let capture = StmtKind::Try {
            body: vec![
                Stmt::local(inner.clone(), None, Some(self.expr.clone())).at(self.span),
                Stmt::assign(Expr::name(self.value.clone()), Expr::name(inner)),
            ],
            catches: vec![CatchClause {
                param: CAPTURE_FAILURE_PARAM.to_string(),
                class: THROWABLE_CLASS.to_string(),
                body: vec![Stmt::assign(
                    Expr::name(self.failure.clone()),
                    Expr::name(CAPTURE_FAILURE_PARAM),
                )],
            }],
            finally: None,
        };
        vec![
            Stmt::local(
                self.failure.clone(),
                Some(Type::class(THROWABLE_CLASS)),
                Some(Expr::null()),
            )
            .at(self.span),
            Stmt::local(
                self.value.clone(),
                Some(Type::class(OBJECT_CLASS)),
                Some(Expr::null()),
            )
            .at(self.span),
            Stmt::new(capture).at(self.span),
        ]
    }
}

/// The captures of one routine, in order of first occurrence.
#[derive(Debug, Default)]
pub struct OldCaptures {
    captures: IndexMap<String, OldCapture>,
}

impl OldCaptures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.captures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OldCapture> {
        self.captures.values()
    }

    /// Capture `inner` (once per distinct source text) and return the
    /// expression that reads the captured value.
    pub fn capture(&mut self, inner: &Expr, span: Span) -> Expr {
        let value = old_value_name(inner);
        let capture = self
            .captures
            .entry(value.clone())
            .or_insert_with(|| OldCapture {
                failure: format!("{} exception", value),
                value,
                expr: inner.clone(),
                span,
            });
        Expr::intrinsic(Intrinsic::OldValue {
            value: capture.value.clone(),
            failure: capture.failure.clone(),
        })
        .at(span)
    }

    /// Replace every `old(E)` inside `e` with a read of its capture.
    pub fn rewrite(&mut self, e: &mut Expr) {
        e.walk_mut(&mut |node| {
            if let ExprKind::Old(inner) = &node.kind {
                let read = self.capture(inner, node.span);
                *node = read;
                return false;
            }
            true
        });
    }

    /// The capture statements, to run before the routine body.
    pub fn statements(&self) -> Vec<Stmt> {
        self.captures
            .values()
            .flat_map(OldCapture::statements)
            .collect()
    }
}
