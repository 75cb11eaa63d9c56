//! Core error types for covenant-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of building and validating a [`Program`](crate::Program).

use thiserror::Error;

/// Core errors produced by the covenant-core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A class name was declared twice.
    #[error("duplicate class: '{name}'")]
    DuplicateClass { name: String },

    /// A class name was not found in the program.
    #[error("unknown class: '{name}'")]
    UnknownClass { name: String },

    /// A class extends a class that does not exist.
    #[error("class '{class}' extends unknown class '{superclass}'")]
    UnknownSuperclass { class: String, superclass: String },

    /// The `extends` relation is cyclic.
    #[error("inheritance cycle through class '{class}'")]
    InheritanceCycle { class: String },

    /// Two routines of a class share a name and arity.
    #[error("duplicate member '{member}' in class '{class}'")]
    DuplicateMember { class: String, member: String },

    /// A peer or representation annotation names a field that does not exist.
    #[error("class '{class}' annotates unknown field '{field}'")]
    UnknownAnnotatedField { class: String, field: String },

    /// A program fixture could not be decoded.
    #[error("malformed program: {reason}")]
    Malformed { reason: String },
}
