//! Compile-time contract errors.
//!
//! Every variant except [`ContractError::Hierarchy`] is pinned to the span of
//! the offending sub-expression, so a tool can underline exactly the part of a
//! clause that failed to resolve.

use covenant_core::Span;
use serde::{Deserialize, Serialize};

/// A clause that failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ContractError {
    #[error("type mismatch at {span}: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("unknown name '{name}' at {span}")]
    UnknownName { name: String, span: Span },

    #[error("type '{class}' has no field '{field}' (at {span})")]
    UnknownField {
        class: String,
        field: String,
        span: Span,
    },

    #[error("type '{class}' has no method '{method}' taking {arity} argument(s) (at {span})")]
    UnknownMethod {
        class: String,
        method: String,
        arity: usize,
        span: Span,
    },

    #[error("unknown class '{name}' at {span}")]
    UnknownClass { name: String, span: Span },

    /// Assignment, increment, `throw` or `try` inside a clause.
    #[error("{construct} is not allowed in a specification clause (at {span})")]
    SideEffect { construct: String, span: Span },

    #[error("the field '{field}' is not visible in this specification clause (at {span})")]
    FieldNotVisible { field: String, span: Span },

    #[error("the method '{method}' is not visible in this specification clause (at {span})")]
    MethodNotVisible { method: String, span: Span },

    #[error("the constructor of '{class}' is not visible in this specification clause (at {span})")]
    ConstructorNotVisible { class: String, span: Span },

    #[error("the type '{class}' is not visible in this specification clause (at {span})")]
    TypeNotVisible { class: String, span: Span },

    #[error("old(...) is only allowed in postconditions and @throws conditions (at {span})")]
    OldOutsidePostcondition { span: Span },

    #[error("old(...) cannot be nested (at {span})")]
    NestedOld { span: Span },

    #[error("'result' is not allowed here (at {span})")]
    ResultNotAllowed { span: Span },

    #[error("'this' is not available in a static routine (at {span})")]
    ThisInStatic { span: Span },

    #[error("a @mutates_properties entry must be a method call (at {span})")]
    MutatesPropertiesNotCall { span: Span },

    #[error("a @mutates_properties entry must not pass arguments (at {span})")]
    MutatesPropertiesWithArguments { span: Span },

    /// The exception type of a `@throws`/`@may_throw` tag is missing or is not a `Throwable`.
    #[error("invalid exception type {} (at {span})", .name.as_deref().unwrap_or("<missing>"))]
    InvalidExceptionType { name: Option<String>, span: Span },

    #[error("an effect clause must denote an object, found {found} (at {span})")]
    NotReference { found: String, span: Span },

    #[error("spread is not allowed here (at {span})")]
    SpreadNotAllowed { span: Span },

    /// A lowering-only node appeared in source.
    #[error("compiler-internal construct in a specification clause (at {span})")]
    InternalConstruct { span: Span },

    #[error("class hierarchy error: {reason}")]
    Hierarchy { reason: String },
}

impl ContractError {
    /// Location of the offending sub-expression.
    pub fn span(&self) -> Span {
        match self {
            ContractError::TypeMismatch { span, .. }
            | ContractError::UnknownName { span, .. }
            | ContractError::UnknownField { span, .. }
            | ContractError::UnknownMethod { span, .. }
            | ContractError::UnknownClass { span, .. }
            | ContractError::SideEffect { span, .. }
            | ContractError::FieldNotVisible { span, .. }
            | ContractError::MethodNotVisible { span, .. }
            | ContractError::ConstructorNotVisible { span, .. }
            | ContractError::TypeNotVisible { span, .. }
            | ContractError::OldOutsidePostcondition { span }
            | ContractError::NestedOld { span }
            | ContractError::ResultNotAllowed { span }
            | ContractError::ThisInStatic { span }
            | ContractError::MutatesPropertiesNotCall { span }
            | ContractError::MutatesPropertiesWithArguments { span }
            | ContractError::InvalidExceptionType { span, .. }
            | ContractError::NotReference { span, .. }
            | ContractError::SpreadNotAllowed { span }
            | ContractError::InternalConstruct { span } => *span,
            ContractError::Hierarchy { .. } => Span::default(),
        }
    }

    /// Whether this is one of the "not visible" errors.
    pub fn is_visibility_error(&self) -> bool {
        matches!(
            self,
            ContractError::FieldNotVisible { .. }
                | ContractError::MethodNotVisible { .. }
                | ContractError::ConstructorNotVisible { .. }
                | ContractError::TypeNotVisible { .. }
        )
    }
}

/// All errors reported for one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDiagnostics {
    pub class: String,
    pub errors: Vec<ContractError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_accessor() {
        let err = ContractError::FieldNotVisible {
            field: "health".into(),
            span: Span::new(12, 18),
        };
        assert_eq!(err.span(), Span::new(12, 18));
        assert!(err.is_visibility_error());
        assert_eq!(
            ContractError::Hierarchy {
                reason: "cycle".into()
            }
            .span(),
            Span::default()
        );
    }

    #[test]
    fn missing_exception_type_message() {
        let err = ContractError::InvalidExceptionType {
            name: None,
            span: Span::new(0, 4),
        };
        assert_eq!(err.to_string(), "invalid exception type <missing> (at 0..4)");
    }

    #[test]
    fn diagnostics_serialize() {
        let diag = ClassDiagnostics {
            class: "GameCharacter".into(),
            errors: vec![ContractError::SideEffect {
                construct: "assignment".into(),
                span: Span::new(3, 9),
            }],
        };
        let json = serde_json::to_string(&diag).unwrap();
        let back: ClassDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(diag, back);
    }
}
