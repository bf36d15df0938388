//! Server-to-client notifications: progress and forwarded log messages

use std::sync::{Arc, PoisonError, RwLock};

use outfitter_contracts::{LogLevel, Logger, ProgressSink, ProgressUpdate, number_value};
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;

use crate::protocol::JsonRpcNotification;

/// Handle for sending notifications on the connection's outgoing stream
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    tx: Option<mpsc::UnboundedSender<String>>,
}

impl Notifier {
    /// Notifier paired with the receiver the transport drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Notifier that drops everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn notify(&self, method: &str, params: Value) {
        let Some(tx) = &self.tx else {
            return;
        };
        match serde_json::to_string(&JsonRpcNotification::new(method, params)) {
            Ok(line) => {
                if tx.send(line).is_err() {
                    tracing::debug!(method, "Notification dropped: transport closed");
                }
            }
            Err(e) => tracing::warn!(method, error = %e, "Failed to encode notification"),
        }
    }

    /// Raw line sender, used by the transport for responses.
    pub(crate) fn sender(&self) -> Option<&mpsc::UnboundedSender<String>> {
        self.tx.as_ref()
    }
}

/// Client-selected minimum level for `notifications/message`
///
/// `None` until the client calls `logging/setLevel`.
#[derive(Debug, Clone, Default)]
pub struct ClientLogLevel(Arc<RwLock<Option<LogLevel>>>);

impl ClientLogLevel {
    pub fn get(&self) -> Option<LogLevel> {
        *self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, level: LogLevel) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(level);
    }
}

/// Parse an MCP (syslog-style) level name.
pub fn parse_client_level(level: &str) -> Option<LogLevel> {
    match level {
        "debug" => Some(LogLevel::Debug),
        "info" | "notice" => Some(LogLevel::Info),
        "warning" => Some(LogLevel::Warn),
        "error" | "critical" | "alert" | "emergency" => Some(LogLevel::Error),
        _ => None,
    }
}

fn client_level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace | LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warning",
        LogLevel::Error => "error",
    }
}

/// Logger that writes through `inner` and also forwards to the client
pub struct McpLogger {
    inner: Arc<dyn Logger>,
    name: String,
    level: ClientLogLevel,
    notifier: Notifier,
}

impl McpLogger {
    pub fn new(inner: Arc<dyn Logger>, name: impl Into<String>, level: ClientLogLevel, notifier: Notifier) -> Self {
        Self {
            inner,
            name: name.into(),
            level,
            notifier,
        }
    }
}

impl Logger for McpLogger {
    fn log(&self, level: LogLevel, message: &str, fields: &Map<String, Value>) {
        self.inner.log(level, message, fields);

        let Some(min) = self.level.get() else {
            return;
        };
        if level < min {
            return;
        }
        let data = if fields.is_empty() {
            Value::String(message.to_string())
        } else {
            let mut data = fields.clone();
            data.insert("message".into(), Value::String(message.to_string()));
            Value::Object(data)
        };
        self.notifier.notify(
            "notifications/message",
            json!({"level": client_level_name(level), "logger": self.name, "data": data}),
        );
    }
}

/// Progress sink bound to one request's `progressToken`
pub struct ProgressReporter {
    token: Value,
    notifier: Notifier,
}

impl ProgressReporter {
    pub fn new(token: Value, notifier: Notifier) -> Self {
        Self { token, notifier }
    }
}

impl ProgressSink for ProgressReporter {
    fn report(&self, update: ProgressUpdate) {
        let mut params = Map::new();
        params.insert("progressToken".into(), self.token.clone());
        params.insert(
            "progress".into(),
            number_value(update.progress).unwrap_or(Value::Null),
        );
        if let Some(total) = update.total.and_then(number_value) {
            params.insert("total".into(), total);
        }
        if let Some(message) = update.message {
            params.insert("message".into(), Value::String(message));
        }
        self.notifier.notify("notifications/progress", Value::Object(params));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outfitter_contracts::{LoggerConfig, create_logger};
    use pretty_assertions::assert_eq;

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(line) = rx.try_recv() {
            out.push(serde_json::from_str(&line).unwrap());
        }
        out
    }

    fn logger(level: &ClientLogLevel, notifier: Notifier) -> McpLogger {
        let inner = create_logger(LoggerConfig::new("test").level(None));
        McpLogger::new(inner, "outfitter", level.clone(), notifier)
    }

    #[test]
    fn test_nothing_forwarded_before_set_level() {
        let (notifier, mut rx) = Notifier::channel();
        let level = ClientLogLevel::default();
        logger(&level, notifier).error("boom");
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_forwards_at_or_above_level() {
        let (notifier, mut rx) = Notifier::channel();
        let level = ClientLogLevel::default();
        level.set(LogLevel::Warn);
        let logger = logger(&level, notifier);
        logger.info("quiet");
        logger.warn("careful");

        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["method"], "notifications/message");
        assert_eq!(
            sent[0]["params"],
            json!({"level": "warning", "logger": "outfitter", "data": "careful"})
        );
    }

    #[test]
    fn test_progress_notification_shape() {
        let (notifier, mut rx) = Notifier::channel();
        let reporter = ProgressReporter::new(json!("tok"), notifier);
        reporter.report(ProgressUpdate::new(1.0).total(3.0).message("2 remaining"));
        reporter.report(ProgressUpdate::new(0.5));

        let sent = drain(&mut rx);
        assert_eq!(
            sent[0]["params"],
            json!({"progressToken": "tok", "progress": 1, "total": 3, "message": "2 remaining"})
        );
        assert_eq!(sent[1]["params"], json!({"progressToken": "tok", "progress": 0.5}));
    }

    #[test]
    fn test_disabled_notifier_drops_silently() {
        Notifier::disabled().notify("notifications/progress", json!({}));
    }

    #[test]
    fn test_parse_client_level() {
        assert_eq!(parse_client_level("notice"), Some(LogLevel::Info));
        assert_eq!(parse_client_level("critical"), Some(LogLevel::Error));
        assert_eq!(parse_client_level("warning"), Some(LogLevel::Warn));
        assert_eq!(parse_client_level("verbose"), None);
    }
}
