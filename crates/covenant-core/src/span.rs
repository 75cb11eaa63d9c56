//! Source spans pinning clauses and sub-expressions to their location.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` in the declaring compilation unit.
///
/// Synthesized nodes reuse the span of the clause they were derived from, so
/// run-time failures can be attributed to the clause that produced them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub const fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_join_covers_both() {
        let joined = Span::new(4, 9).to(Span::new(1, 6));
        assert_eq!(joined, Span::new(1, 9));
    }

    #[test]
    fn span_display() {
        assert_eq!(format!("{}", Span::new(3, 17)), "3..17");
    }

    #[test]
    fn default_span_is_empty() {
        assert!(Span::default().is_empty());
        assert!(!Span::new(0, 1).is_empty());
    }
}
