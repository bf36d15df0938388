//! [`RecordingLogger`] for asserting on handler log output.

use std::sync::{Arc, Mutex, PoisonError};

use outfitter_contracts::{LogLevel, Logger};
use serde_json::{Map, Value};

/// One recorded log event
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub fields: Map<String, Value>,
}

/// Logger that keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingLogger {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// As a shareable trait object, keeping `self` for assertions.
    pub fn shared(&self) -> Arc<dyn Logger> {
        Arc::new(self.clone())
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages logged at `level`.
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level)
            .map(|r| r.message)
            .collect()
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: LogLevel, message: &str, fields: &Map<String, Value>) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogRecord {
                level,
                message: message.to_string(),
                fields: fields.clone(),
            });
    }
}
