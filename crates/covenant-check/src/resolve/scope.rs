use covenant_core::{ClassDecl, MethodDecl, Modifiers, Type};

use super::visibility::ClauseVisibility;

/// The tag a clause was written under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    Precondition,
    Postcondition,
    Throws,
    MayThrow,
    Inspects,
    Mutates,
    MutatesProperties,
    Creates,
    Invariant,
}

impl ClauseKind {
    pub fn allows_old(self) -> bool {
        matches!(self, ClauseKind::Postcondition | ClauseKind::Throws)
    }

    pub fn allows_result(self) -> bool {
        matches!(self, ClauseKind::Postcondition | ClauseKind::Creates)
    }

    /// Clauses whose entries may be `...collection`.
    pub fn allows_spread(self) -> bool {
        matches!(
            self,
            ClauseKind::Inspects | ClauseKind::Mutates | ClauseKind::Creates
        )
    }
}

/// The routine (or class, for invariants) a clause belongs to.
pub struct RoutineContext<'a> {
    pub class: &'a ClassDecl,
    pub is_static: bool,
    /// `Void` for constructors and invariants.
    pub return_type: Type,
    pub visibility: ClauseVisibility,
}

impl<'a> RoutineContext<'a> {
    pub fn routine(class: &'a ClassDecl, routine: &MethodDecl) -> Self {
        RoutineContext {
            class,
            is_static: routine.modifiers.is_static,
            return_type: if routine.is_constructor() {
                Type::Void
            } else {
                routine.return_type.clone()
            },
            visibility: ClauseVisibility::new(
                routine.modifiers,
                class.package.clone(),
                class.modifiers.is_public(),
            ),
        }
    }

    /// Invariants are checked as if written in a private instance routine.
    pub fn invariant(class: &'a ClassDecl) -> Self {
        RoutineContext {
            class,
            is_static: false,
            return_type: Type::Void,
            visibility: ClauseVisibility::new(
                Modifiers::private(),
                class.package.clone(),
                class.modifiers.is_public(),
            ),
        }
    }
}

/// Lexical scopes of locals visible to a clause: routine parameters at the
/// bottom, lambda parameters and lambda-body locals above.
#[derive(Debug, Default)]
pub struct Scope {
    frames: Vec<Vec<(String, Type)>>,
}

impl Scope {
    pub fn new() -> Self {
        Scope {
            frames: vec![Vec::new()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn bind(&mut self, name: impl Into<String>, ty: Type) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push((name.into(), ty));
        }
    }

    /// Innermost binding of `name`.
    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.frames
            .iter()
            .rev()
            .flat_map(|f| f.iter().rev())
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }
}
