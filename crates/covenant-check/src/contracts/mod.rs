//! Contract lowering.
//!
//! [`ContractCompiler::compile`] resolves every clause of a program, drops the
//! classes whose contracts do not resolve (and their subclasses), and rewrites
//! the routines of the remaining classes into guarded bodies that the
//! interpreter can execute directly. The result is an ordinary [`Program`]:
//! contracts become `assert` statements, closures and a handful of
//! [`Intrinsic`](covenant_core::Intrinsic) hooks into the effect runtime.

pub mod names;
pub mod old;
pub mod synth;
pub mod throws;

use std::collections::HashSet;

use covenant_core::Program;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::resolve::{ClassDiagnostics, ClauseResolver, ContractError};
use synth::Synthesizer;

pub const PRECONDITION_FAILED: &str = "Precondition does not hold";
pub const POSTCONDITION_FAILED: &str = "Postcondition does not hold";
pub const INVARIANT_FAILED: &str = "Invariant does not hold";
pub const THROWS_NOT_THROWN: &str =
    "@throws condition holds but specified exception type not thrown";
pub const EXCEPTION_NOT_SPECIFIED: &str =
    "The thrown exception was not specified in the formal specification";
/// Raised when an invariant calls back into a non-private method of its subject.
pub const INVARIANT_REENTRANCY: &str =
    "Invariants cannot call non-private methods of the object they constrain";
/// Name under which the undeclared-exception notice is logged.
pub const LOGGER_NAME: &str = "covenant";

/// Classification of an assertion failure raised by lowered code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationKind {
    Precondition,
    Postcondition,
    Invariant,
    UnsatisfiedThrows,
    Permission,
    /// A plain `assert` of user code, or any other assertion.
    Assertion,
}

impl ViolationKind {
    /// Classify an `AssertionError` by its message.
    pub fn classify(message: &str) -> ViolationKind {
        match message {
            PRECONDITION_FAILED => ViolationKind::Precondition,
            POSTCONDITION_FAILED => ViolationKind::Postcondition,
            INVARIANT_FAILED | INVARIANT_REENTRANCY => ViolationKind::Invariant,
            THROWS_NOT_THROWN => ViolationKind::UnsatisfiedThrows,
            m if m.starts_with("This code does not have permission") => ViolationKind::Permission,
            _ => ViolationKind::Assertion,
        }
    }
}

/// Configuration for contract lowering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Generate `<Class>$invariants` helpers and call them on normal exit.
    pub check_invariants: bool,
    /// Open a permission frame around routines that declare effect clauses.
    pub effect_frames: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            check_invariants: true,
            effect_frames: true,
        }
    }
}

/// Output of [`ContractCompiler::compile`].
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Built-in classes plus every class that compiled.
    pub program: Program,
    /// One entry per excluded class.
    pub diagnostics: Vec<ClassDiagnostics>,
}

impl CompileResult {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Every error, in class order.
    pub fn errors(&self) -> impl Iterator<Item = &ContractError> {
        self.diagnostics.iter().flat_map(|d| d.errors.iter())
    }
}

pub struct ContractCompiler {
    options: CompileOptions,
}

impl ContractCompiler {
    pub fn new(options: CompileOptions) -> Self {
        ContractCompiler { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn compile(&self, program: &Program) -> CompileResult {
        let mut diagnostics = match ClauseResolver::new(program).resolve_program() {
            Ok(d) => d,
            Err(e) => {
                debug!(error = %e, "program rejected");
                return CompileResult {
                    program: Program::new(),
                    diagnostics: vec![ClassDiagnostics {
                        class: String::new(),
                        errors: vec![e],
                    }],
                };
            }
        };

        let mut excluded: HashSet<String> =
            diagnostics.iter().map(|d| d.class.clone()).collect();
        for class in program.user_classes() {
            if excluded.contains(&class.name) {
                continue;
            }
            let broken = program
                .superclass_chain(&class.name)
                .into_iter()
                .skip(1)
                .find(|c| excluded.contains(&c.name))
                .map(|c| c.name.clone());
            if let Some(ancestor) = broken {
                excluded.insert(class.name.clone());
                diagnostics.push(ClassDiagnostics {
                    class: class.name.clone(),
                    errors: vec![ContractError::Hierarchy {
                        reason: format!("superclass {} was excluded", ancestor),
                    }],
                });
            }
        }

        let synthesizer = Synthesizer::new(program, &self.options);
        let mut lowered = Program::new();
        for class in program.classes.values() {
            if class.builtin {
                lowered.classes.insert(class.name.clone(), class.clone());
            } else if !excluded.contains(&class.name) {
                lowered
                    .classes
                    .insert(class.name.clone(), synthesizer.lower_class(class));
            }
        }
        info!(
            classes = lowered.user_classes().count(),
            excluded = excluded.len(),
            "contracts compiled"
        );
        CompileResult {
            program: lowered,
            diagnostics,
        }
    }
}

impl Default for ContractCompiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_core::{ClassDecl, Expr, FieldDecl, MethodDecl, Modifiers, Span, Type};

    #[test]
    fn violation_messages_classify() {
        assert_eq!(
            ViolationKind::classify(PRECONDITION_FAILED),
            ViolationKind::Precondition
        );
        assert_eq!(
            ViolationKind::classify(THROWS_NOT_THROWN),
            ViolationKind::UnsatisfiedThrows
        );
        assert_eq!(
            ViolationKind::classify("This code does not have permission to mutate this object."),
            ViolationKind::Permission
        );
        assert_eq!(ViolationKind::classify("boom"), ViolationKind::Assertion);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: CompileOptions = serde_json::from_str(r#"{"effect_frames": false}"#).unwrap();
        assert!(opts.check_invariants);
        assert!(!opts.effect_frames);
    }

    #[test]
    fn broken_class_and_its_subclasses_are_excluded() {
        let mut p = Program::new();
        p.add_class(
            ClassDecl::new("Base")
                .field(FieldDecl::new("x", Type::Int, Modifiers::public()))
                .invariant(Expr::name("missing").at(Span::new(0, 7))),
        )
        .unwrap();
        p.add_class(ClassDecl::new("Derived").extends("Base")).unwrap();
        p.add_class(ClassDecl::new("Other").method(MethodDecl::method(
            "f",
            Modifiers::public(),
            vec![],
            Type::Void,
            vec![],
        )))
        .unwrap();

        let result = ContractCompiler::default().compile(&p);
        let excluded: Vec<&str> = result.diagnostics.iter().map(|d| d.class.as_str()).collect();
        assert_eq!(excluded, vec!["Base", "Derived"]);
        assert!(result.program.class("Base").is_none());
        assert!(result.program.class("Derived").is_none());
        assert!(result.program.class("Other").is_some());
        assert!(result.program.class("Object").is_some());
    }

    #[test]
    fn hierarchy_errors_reject_every_class() {
        let mut p = Program::new();
        p.add_class(ClassDecl::new("A").extends("B")).unwrap();
        p.add_class(ClassDecl::new("B").extends("A")).unwrap();
        let result = ContractCompiler::default().compile(&p);
        assert!(!result.is_clean());
        assert_eq!(result.program.user_classes().count(), 0);
        assert!(matches!(
            result.errors().next(),
            Some(ContractError::Hierarchy { .. })
        ));
    }
}
