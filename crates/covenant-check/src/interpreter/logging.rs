//! Named diagnostic sinks.
//!
//! Lowered code reports undeclared exceptions through a logger it looks up by
//! name at the moment of the report. Nothing has to be registered: with no
//! sink under that name the report goes to `tracing` instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use covenant_core::Span;
use serde::{Deserialize, Serialize};
use tracing::error;

/// One reported diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub logger: String,
    pub message: String,
    pub span: Span,
    /// Interpreted call stack at the report, innermost first.
    pub stack: Vec<String>,
}

/// Receiver of diagnostics logged by lowered code.
pub trait DiagnosticSink: Send + Sync {
    fn log(&self, record: LogRecord);
}

/// Sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<LogRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn log(&self, record: LogRecord) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record);
    }
}

/// Sinks by logger name.
#[derive(Default, Clone)]
pub struct LoggerRegistry {
    sinks: HashMap<String, Arc<dyn DiagnosticSink>>,
}

impl LoggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sink` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, sink: Arc<dyn DiagnosticSink>) {
        self.sinks.insert(name.into(), sink);
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn DiagnosticSink>> {
        self.sinks.get(name).cloned()
    }

    /// Deliver `record` to its logger, or to `tracing` if none is registered.
    pub fn emit(&self, record: LogRecord) {
        match self.lookup(&record.logger) {
            Some(sink) => sink.log(record),
            None => error!(
                logger = %record.logger,
                span = %record.span,
                "{}",
                record.message
            ),
        }
    }
}
