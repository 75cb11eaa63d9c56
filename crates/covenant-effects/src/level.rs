use std::fmt;

use serde::{Deserialize, Serialize};

/// Access a frame grants on one `(object, class)` pair.
///
/// Totally ordered: `None < Inspect < Mutate`, and `Mutate` implies `Inspect`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PermissionLevel {
    #[default]
    None,
    Inspect,
    Mutate,
}

impl PermissionLevel {
    pub fn is_less_than(self, other: PermissionLevel) -> bool {
        self < other
    }

    /// Whether holding `self` satisfies a requirement of `required`.
    pub fn satisfies(self, required: PermissionLevel) -> bool {
        self >= required
    }

    /// Message of the assertion raised when `self` is required but missing.
    pub fn denial_message(self) -> &'static str {
        match self {
            PermissionLevel::Mutate => "This code does not have permission to mutate this object.",
            _ => "This code does not have permission to inspect this object.",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::None => write!(f, "none"),
            PermissionLevel::Inspect => write!(f, "inspect"),
            PermissionLevel::Mutate => write!(f, "mutate"),
        }
    }
}
