//! Contract resolution, lowering and interpretation.
//!
//! - [`resolve`] type-checks every clause of a [`Program`](covenant_core::Program)
//!   and reports purity and visibility violations.
//! - [`contracts`] lowers contracted routines into guarded bodies.
//! - [`interpreter`] executes lowered programs against the effect-permission
//!   runtime of `covenant-effects`.

pub mod contracts;
pub mod interpreter;
pub mod resolve;

pub use contracts::{CompileOptions, CompileResult, ContractCompiler, ViolationKind};
pub use interpreter::{
    ExecError, Interpreter, InterpreterConfig, RuntimeError, UncaughtException, Value,
};
pub use resolve::{ClassDiagnostics, ClauseResolver, ContractError};
