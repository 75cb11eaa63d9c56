//! Visibility of symbols referenced from specification clauses.
//!
//! Clauses are part of a routine's public contract, so they follow their own
//! rule instead of the ordinary access rules: a clause of a public routine of a
//! public class may only mention public symbols, while a clause of a private
//! routine may mention anything.

use covenant_core::{Access, Modifiers};

/// Where a clause is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseVisibility {
    /// Modifiers of the routine (or `private` for class invariants).
    pub modifiers: Modifiers,
    /// Package of the declaring class.
    pub package: String,
    pub class_is_public: bool,
}

impl ClauseVisibility {
    pub fn new(modifiers: Modifiers, package: impl Into<String>, class_is_public: bool) -> Self {
        ClauseVisibility {
            modifiers,
            package: package.into(),
            class_is_public,
        }
    }

    /// Whether a symbol with `target` modifiers declared in `target_package`
    /// may be referenced.
    pub fn allows(&self, target: &Modifiers, target_package: &str) -> bool {
        is_visible(
            &self.modifiers,
            &self.package,
            self.class_is_public,
            target,
            target_package,
        )
    }
}

pub fn is_visible(
    context: &Modifiers,
    context_package: &str,
    context_class_is_public: bool,
    target: &Modifiers,
    target_package: &str,
) -> bool {
    if target.access == Access::Public {
        return true;
    }
    if context.access == Access::Public && context_class_is_public {
        return false;
    }
    if context.access == Access::Private {
        return true;
    }
    if target.access == Access::Private {
        return false;
    }
    if target_package != context_package {
        return false;
    }
    !(context.access == Access::Protected && target.access != Access::Protected)
}
