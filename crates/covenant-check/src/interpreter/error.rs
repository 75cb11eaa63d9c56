//! Errors surfaced by the interpreter.
//!
//! Two different things can go wrong while running a lowered program. The
//! interpreted program can throw an exception nobody catches, which includes
//! every contract violation ([`UncaughtException`]). The interpreter itself can
//! also hit a condition the resolver should have ruled out, such as an unknown
//! method ([`RuntimeError`]). The two never mix.

use covenant_core::Span;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contracts::ViolationKind;

/// Faults of the interpreter, as opposed to exceptions of the program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum RuntimeError {
    #[error("invalid program: {reason}")]
    InvalidProgram { reason: String },

    #[error("unknown class '{name}'")]
    UnknownClass { name: String },

    #[error("class '{class}' has no method {method}/{arity}")]
    UnknownMethod {
        class: String,
        method: String,
        arity: usize,
    },

    #[error("class '{class}' has no constructor with {arity} arguments")]
    UnknownConstructor { class: String, arity: usize },

    #[error("unknown name '{name}' at {span}")]
    UnknownName { name: String, span: Span },

    #[error("'{class}' has no field '{field}' at {span}")]
    UnknownField {
        class: String,
        field: String,
        span: Span,
    },

    #[error("type mismatch at {span}: expected {expected}, got {found}")]
    TypeMismatch {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("cannot instantiate '{class}'")]
    NotInstantiable { class: String },

    #[error("call depth limit ({limit}) exceeded")]
    CallDepthExceeded { limit: usize },

    #[error("internal error: {message}")]
    Internal { message: String },
}

/// An exception that propagated out of the entry routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncaughtException {
    pub class: String,
    /// `class` followed by its superclasses.
    pub lineage: Vec<String>,
    pub message: Option<String>,
    pub cause: Option<Box<UncaughtException>>,
    /// Span of the expression or clause that raised it.
    pub span: Span,
    /// Interpreted call stack at allocation, innermost first.
    pub stack: Vec<String>,
    /// Set for `AssertionError`s.
    pub kind: Option<ViolationKind>,
}

impl UncaughtException {
    /// Whether the exception is an instance of `class`.
    pub fn is(&self, class: &str) -> bool {
        self.lineage.iter().any(|c| c == class)
    }

    pub fn violation(&self) -> Option<ViolationKind> {
        self.kind
    }
}

impl std::fmt::Display for UncaughtException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.class)?;
        if let Some(m) = &self.message {
            write!(f, ": {}", m)?;
        }
        write!(f, " (at {})", self.span)?;
        if let Some(cause) = &self.cause {
            write!(f, "; caused by {}", cause)?;
        }
        Ok(())
    }
}

/// Outcome of a failed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum ExecError {
    #[error("uncaught exception: {0}")]
    Uncaught(UncaughtException),

    #[error(transparent)]
    Fault(#[from] RuntimeError),
}

impl ExecError {
    pub fn uncaught(&self) -> Option<&UncaughtException> {
        match self {
            ExecError::Uncaught(e) => Some(e),
            ExecError::Fault(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assertion(message: &str, cause: Option<UncaughtException>) -> UncaughtException {
        UncaughtException {
            class: "AssertionError".into(),
            lineage: vec!["AssertionError".into(), "Error".into(), "Throwable".into()],
            message: Some(message.into()),
            cause: cause.map(Box::new),
            span: Span::new(4, 9),
            stack: vec!["Account.withdraw".into()],
            kind: Some(ViolationKind::classify(message)),
        }
    }

    #[test]
    fn display_includes_cause_chain() {
        let inner = UncaughtException {
            class: "ArithmeticException".into(),
            lineage: vec!["ArithmeticException".into()],
            message: None,
            cause: None,
            span: Span::new(1, 2),
            stack: vec![],
            kind: None,
        };
        let e = assertion(
            "@throws condition holds but specified exception type not thrown",
            Some(inner),
        );
        assert_eq!(
            e.to_string(),
            "AssertionError: @throws condition holds but specified exception type not thrown \
             (at 4..9); caused by ArithmeticException (at 1..2)"
        );
        assert!(e.is("Error"));
        assert!(!e.is("RuntimeException"));
        assert_eq!(e.violation(), Some(ViolationKind::UnsatisfiedThrows));
    }

    #[test]
    fn exec_error_roundtrips_through_json() {
        let err = ExecError::Uncaught(assertion("Precondition does not hold", None));
        let json = serde_json::to_string(&err).unwrap();
        let back: ExecError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
        let fault: ExecError = RuntimeError::CallDepthExceeded { limit: 8 }.into();
        assert!(fault.uncaught().is_none());
        assert_eq!(fault.to_string(), "call depth limit (8) exceeded");
    }
}
