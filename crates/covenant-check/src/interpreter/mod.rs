//! Tree-walking interpreter for lowered programs.
//!
//! The interpreter runs a [`Program`](covenant_core::Program) with just enough
//! semantics for contracts to be observable: exceptions,
//! closures, arrays, constructors chained through `super(...)`, and every
//! field access checked against the permission frames of the effect runtime.
//!
//! Contract violations surface as uncaught `AssertionError`s
//! ([`ExecError::Uncaught`]), classified by [`ViolationKind`](crate::ViolationKind).
//! Problems with the interpreted program itself (an unknown method, a type
//! mismatch) are [`RuntimeError`]s.

mod error;
mod eval;
mod logging;
mod state;
mod trace;
mod value;

pub use error::{ExecError, RuntimeError, UncaughtException};
pub use logging::{DiagnosticSink, LogRecord, LoggerRegistry, RecordingSink};
pub use state::{Interpreter, InterpreterConfig};
pub use trace::{TraceEntry, TraceOutcome};
pub use value::{ArrayObject, Closure, HeapObject, ThrowSite, Value};
