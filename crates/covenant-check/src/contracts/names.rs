//! Names of the locals and helpers introduced by the lowering.
//!
//! Names that start with a space cannot be written in source, so they never
//! collide with user identifiers.

use covenant_core::Expr;

/// Local holding the postcondition closure of a routine.
pub const POST_VAR: &str = " $post";
/// First parameter of the postcondition closure: the returned value.
pub const RESULT_PARAM: &str = " $result";
/// Second parameter of the postcondition closure: the thrown exception, or null.
pub const EXCEPTION_PARAM: &str = " $exception";
/// Local holding a returned value while the postconditions run.
pub const RETURN_VAR: &str = " $ret";
/// Set once the body completed normally.
pub const COMPLETED_VAR: &str = " $completed";
/// `may_throw` dispatch: the first holding clause accepted the exception.
pub const AUTHORIZED_VAR: &str = " $authorized";
/// `may_throw` dispatch: the first holding clause rejected the exception and
/// the notice was already logged.
pub const NOTICED_VAR: &str = " $noticed";
/// `throws` dispatch: a holding clause matched the exception.
pub const MATCHED_VAR: &str = " $matched";
/// `throws` dispatch: a holding clause did not match the exception.
pub const UNMATCHED_VAR: &str = " $unmatched";
/// Catch parameter of an old-value capture.
pub const CAPTURE_FAILURE_PARAM: &str = "$exception";
/// Element binding of a desugared spread.
pub const SPREAD_ELEMENT: &str = "spread$element";
/// Local that binds the return value inside postconditions.
pub const RESULT_LOCAL: &str = "result";

/// Characters that cannot appear in a lowered identifier, with their look-alikes.
const SUBSTITUTIONS: [(char, char); 5] = [
    ('.', '\u{2024}'),
    (';', '\u{204F}'),
    ('[', '\u{298B}'),
    (']', '\u{298C}'),
    ('/', '\u{2AFD}'),
];

/// Replace reserved characters with their look-alike code points.
pub fn normalize(source: &str) -> String {
    source
        .chars()
        .map(|c| {
            SUBSTITUTIONS
                .iter()
                .find(|(from, _)| *from == c)
                .map_or(c, |(_, to)| *to)
        })
        .collect()
}

/// Name of the local that captures `old(inner)`.
pub fn old_value_name(inner: &Expr) -> String {
    normalize(&Expr::old(inner.clone()).to_string())
}

/// Selector of a synthesized helper: `name$suffix` for the first routine of a
/// name, `name$k$suffix` for the k-th overload after it.
pub fn selector(name: &str, overload: usize, suffix: &str) -> String {
    if overload == 0 {
        format!("{}${}", name, suffix)
    } else {
        format!("{}${}${}", name, overload, suffix)
    }
}

/// Name of the private method that checks the invariants of `class`.
pub fn invariants_method(class: &str) -> String {
    format!("{}$invariants", class)
}
