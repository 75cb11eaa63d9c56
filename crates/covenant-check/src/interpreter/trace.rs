//! Execution trace recording.
//!
//! When [`InterpreterConfig::trace_enabled`](super::InterpreterConfig) is set,
//! the interpreter records one [`TraceEntry`] per routine invocation, in the
//! order the invocations complete.

use serde::{Deserialize, Serialize};

/// How a traced invocation ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TraceOutcome {
    /// Rendered return value (`void` for void routines).
    Returned(String),
    /// Class of the exception that escaped the routine.
    Threw(String),
    /// An interpreter fault aborted the run.
    Faulted,
}

/// One routine invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// `Class.method` of the invoked routine.
    pub routine: String,
    /// Rendered arguments.
    pub args: Vec<String>,
    /// Call depth, 1 for the entry routine.
    pub depth: usize,
    pub outcome: TraceOutcome,
}
