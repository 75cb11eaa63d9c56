//! Clause resolution: type checking, purity and visibility of every clause.
//!
//! [`ClauseResolver::resolve_program`] first validates the class hierarchy
//! (a broken hierarchy aborts resolution) and then checks each user class
//! independently. For every clause expression:
//!
//! 1. the purity pass ([`purity::side_effects`]) rejects assignments,
//!    increments, `throw` and `try`, including inside lambda bodies;
//! 2. the typing rules ([`rules::ClauseTyper`]) check it against the scope of
//!    its routine, with the clause visibility rule of [`visibility`].
//!
//! Errors are grouped per class, so a class with a broken contract can be
//! excluded from lowering while the others still compile.

pub mod diagnostics;
pub mod purity;
pub mod rules;
pub mod scope;
pub mod visibility;

pub use diagnostics::{ClassDiagnostics, ContractError};
pub use rules::is_assignable;
pub use scope::ClauseKind;
pub use visibility::{is_visible, ClauseVisibility};

use covenant_core::{ClassDecl, Expr, MethodDecl, Program, Type};
use tracing::debug;

use rules::ClauseTyper;
use scope::RoutineContext;

pub struct ClauseResolver<'p> {
    program: &'p Program,
}

impl<'p> ClauseResolver<'p> {
    pub fn new(program: &'p Program) -> Self {
        ClauseResolver { program }
    }

    /// Resolve every user class. Classes without errors are omitted from the result.
    pub fn resolve_program(&self) -> Result<Vec<ClassDiagnostics>, ContractError> {
        self.program
            .validate()
            .map_err(|e| ContractError::Hierarchy {
                reason: e.to_string(),
            })?;
        let mut diagnostics = Vec::new();
        for class in self.program.user_classes() {
            let errors = self.resolve_class(class);
            if !errors.is_empty() {
                debug!(class = %class.name, errors = errors.len(), "contract errors");
                diagnostics.push(ClassDiagnostics {
                    class: class.name.clone(),
                    errors,
                });
            }
        }
        Ok(diagnostics)
    }

    pub fn resolve_class(&self, class: &ClassDecl) -> Vec<ContractError> {
        let mut errors = Vec::new();
        let ctx = RoutineContext::invariant(class);
        for invariant in &class.invariants {
            self.clause(&ctx, ClauseKind::Invariant, &[], invariant, &mut errors, boolean);
        }
        for routine in class.constructors.iter().chain(class.methods.iter()) {
            errors.extend(self.resolve_routine(class, routine));
        }
        errors
    }

    pub fn resolve_routine(&self, class: &ClassDecl, routine: &MethodDecl) -> Vec<ContractError> {
        let mut errors = Vec::new();
        let Some(spec) = &routine.spec else {
            return errors;
        };
        let ctx = RoutineContext::routine(class, routine);
        let params = &routine.params;

        for e in spec.preconditions.iter().flatten() {
            self.clause(&ctx, ClauseKind::Precondition, params, e, &mut errors, boolean);
        }
        for e in spec.postconditions.iter().flatten() {
            self.clause(&ctx, ClauseKind::Postcondition, params, e, &mut errors, boolean);
        }
        for (kind, clauses) in [
            (ClauseKind::Throws, &spec.throws),
            (ClauseKind::MayThrow, &spec.may_throw),
        ] {
            for clause in clauses.iter().flatten() {
                let mut typer = ClauseTyper::new(self.program, &ctx, kind, params);
                typer.exception_type(clause);
                errors.extend(typer.into_errors());
                self.clause(&ctx, kind, params, &clause.condition, &mut errors, boolean);
            }
        }
        for (kind, list) in [
            (ClauseKind::Inspects, &spec.inspects),
            (ClauseKind::Mutates, &spec.mutates),
            (ClauseKind::Creates, &spec.creates),
        ] {
            for e in list.iter().flatten() {
                self.clause(&ctx, kind, params, e, &mut errors, |t, e| t.effect_target(e));
            }
        }
        for e in spec.mutates_properties.iter().flatten() {
            self.clause(
                &ctx,
                ClauseKind::MutatesProperties,
                params,
                e,
                &mut errors,
                |t, e| t.property(e),
            );
        }
        errors
    }

    /// Purity first; typing only runs on clauses without side effects.
    fn clause(
        &self,
        ctx: &RoutineContext<'_>,
        kind: ClauseKind,
        params: &[covenant_core::Param],
        e: &Expr,
        errors: &mut Vec<ContractError>,
        check: impl FnOnce(&mut ClauseTyper<'_>, &Expr),
    ) {
        let impure = purity::side_effects(e);
        if !impure.is_empty() {
            errors.extend(impure);
            return;
        }
        let mut typer = ClauseTyper::new(self.program, ctx, kind, params);
        check(&mut typer, e);
        errors.extend(typer.into_errors());
    }
}

fn boolean(typer: &mut ClauseTyper<'_>, e: &Expr) {
    typer.expect(e, &Type::Boolean)
}
