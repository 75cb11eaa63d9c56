//! Contract clauses attached to a routine.
//!
//! Every clause list is an `Option<Vec<_>>`: `None` means no clause of that
//! kind was written, `Some(vec![])` means the tag is present but vacuous.
//! A [`ContractSpecification`] is built once and never mutated afterwards.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::ast::{Expr, ExprKind};
use crate::span::Span;

/// A `@throws` or `@may_throw` clause: `Type | condition`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionClause {
    /// Declared exception class; `None` when the tag named no resolvable type.
    pub exception: Option<String>,
    pub condition: Expr,
    #[serde(default)]
    pub span: Span,
}

impl ExceptionClause {
    pub fn new(exception: impl Into<String>, condition: Expr) -> Self {
        let span = condition.span;
        ExceptionClause {
            exception: Some(exception.into()),
            condition,
            span,
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// Structured contract of a single method or constructor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractSpecification {
    #[serde(default)]
    pub preconditions: Option<Vec<Expr>>,
    #[serde(default)]
    pub postconditions: Option<Vec<Expr>>,
    #[serde(default)]
    pub throws: Option<Vec<ExceptionClause>>,
    #[serde(default)]
    pub may_throw: Option<Vec<ExceptionClause>>,
    #[serde(default)]
    pub inspects: Option<Vec<Expr>>,
    #[serde(default)]
    pub mutates: Option<Vec<Expr>>,
    #[serde(default)]
    pub mutates_properties: Option<Vec<Expr>>,
    #[serde(default)]
    pub creates: Option<Vec<Expr>>,
}

fn push(list: &mut Option<Vec<Expr>>, e: Expr) {
    list.get_or_insert_with(Vec::new).push(e);
}

impl ContractSpecification {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pre(mut self, e: Expr) -> Self {
        push(&mut self.preconditions, e);
        self
    }

    pub fn post(mut self, e: Expr) -> Self {
        push(&mut self.postconditions, e);
        self
    }

    pub fn throws(mut self, clause: ExceptionClause) -> Self {
        self.throws.get_or_insert_with(Vec::new).push(clause);
        self
    }

    pub fn may_throw(mut self, clause: ExceptionClause) -> Self {
        self.may_throw.get_or_insert_with(Vec::new).push(clause);
        self
    }

    pub fn inspects(mut self, e: Expr) -> Self {
        push(&mut self.inspects, e);
        self
    }

    pub fn mutates(mut self, e: Expr) -> Self {
        push(&mut self.mutates, e);
        self
    }

    pub fn mutates_properties(mut self, e: Expr) -> Self {
        push(&mut self.mutates_properties, e);
        self
    }

    pub fn creates(mut self, e: Expr) -> Self {
        push(&mut self.creates, e);
        self
    }

    /// Whether any of `inspects`, `mutates`, `mutates_properties` or `creates`
    /// was written.
    pub fn has_effect_clauses(&self) -> bool {
        self.inspects.is_some()
            || self.mutates.is_some()
            || self.mutates_properties.is_some()
            || self.creates.is_some()
    }

    /// Whether any pre/post/exception clause was written.
    pub fn has_behavior_clauses(&self) -> bool {
        self.preconditions.is_some()
            || self.postconditions.is_some()
            || self.throws.is_some()
            || self.may_throw.is_some()
    }

    /// Location of the first effect clause that lets the routine mutate `this`.
    pub fn mutates_this_location(&self) -> Option<Span> {
        if let Some(list) = &self.mutates {
            if let Some(e) = list.iter().find(|e| e.is_this()) {
                return Some(e.span);
            }
        }
        if let Some(list) = &self.mutates_properties {
            for e in list {
                if let ExprKind::Call { receiver, .. } = &e.kind {
                    if receiver.as_ref().map_or(true, |r| r.is_this()) {
                        return Some(e.span);
                    }
                }
            }
        }
        None
    }

    /// Location of the first effect clause that lets the routine inspect `this`.
    pub fn inspects_this_location(&self) -> Option<Span> {
        if let Some(list) = &self.inspects {
            if let Some(e) = list.iter().find(|e| e.is_this()) {
                return Some(e.span);
            }
        }
        self.mutates_this_location()
    }

    /// Render the clauses back as a doc-comment block, one tag per clause.
    pub fn render(&self) -> String {
        let mut out = String::from("/**\n");
        render_exprs(&mut out, "pre", &self.preconditions);
        render_exprs(&mut out, "post", &self.postconditions);
        render_clauses(&mut out, "throws", &self.throws);
        render_clauses(&mut out, "may_throw", &self.may_throw);
        render_exprs(&mut out, "inspects", &self.inspects);
        render_exprs(&mut out, "mutates", &self.mutates);
        render_exprs(&mut out, "mutates_properties", &self.mutates_properties);
        render_exprs(&mut out, "creates", &self.creates);
        out.push_str(" */");
        out
    }
}

fn render_exprs(out: &mut String, tag: &str, list: &Option<Vec<Expr>>) {
    let Some(list) = list else { return };
    if list.is_empty() {
        let _ = writeln!(out, " * @{}", tag);
        return;
    }
    for e in list {
        let _ = writeln!(out, " * @{} | {}", tag, e);
    }
}

fn render_clauses(out: &mut String, tag: &str, list: &Option<Vec<ExceptionClause>>) {
    let Some(list) = list else { return };
    if list.is_empty() {
        let _ = writeln!(out, " * @{}", tag);
        return;
    }
    for c in list {
        let ty = c.exception.as_deref().unwrap_or("?");
        let _ = writeln!(out, " * @{} {} | {}", tag, ty, c.condition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Expr};

    fn game_character_spec() -> ContractSpecification {
        ContractSpecification::new()
            .pre(Expr::binary(BinaryOp::Ge, Expr::name("amount"), Expr::int(0)))
            .post(Expr::eq(
                Expr::call_self("getHealth", vec![]),
                Expr::binary(
                    BinaryOp::Sub,
                    Expr::old(Expr::call_self("getHealth", vec![])),
                    Expr::name("amount"),
                ),
            ))
            .mutates(Expr::this().at(Span::new(40, 44)))
    }

    #[test]
    fn none_and_empty_are_distinct() {
        let absent = ContractSpecification::new();
        let vacuous = ContractSpecification {
            inspects: Some(vec![]),
            ..Default::default()
        };
        assert!(!absent.has_effect_clauses());
        assert!(vacuous.has_effect_clauses());
    }

    #[test]
    fn this_locations() {
        let spec = game_character_spec();
        assert_eq!(spec.mutates_this_location(), Some(Span::new(40, 44)));
        assert_eq!(spec.inspects_this_location(), Some(Span::new(40, 44)));

        let props = ContractSpecification::new()
            .mutates_properties(Expr::call_self("getArea", vec![]).at(Span::new(7, 16)));
        assert_eq!(props.mutates_this_location(), Some(Span::new(7, 16)));

        let other = ContractSpecification::new()
            .mutates_properties(Expr::call(Expr::name("shape"), "getArea", vec![]));
        assert_eq!(other.mutates_this_location(), None);
    }

    #[test]
    fn render_tags_in_order() {
        let spec = game_character_spec().throws(ExceptionClause::new(
            "IllegalArgumentException",
            Expr::binary(BinaryOp::Lt, Expr::name("amount"), Expr::int(0)),
        ));
        assert_eq!(
            spec.render(),
            "/**\n * @pre | amount >= 0\n * @post | getHealth() == (old(getHealth()) - amount)\n * @throws IllegalArgumentException | amount < 0\n * @mutates | this\n */"
        );
    }
}
