//! Per-invocation handler context
//!
//! A [`HandlerContext`] is built by a surface binder immediately before a
//! handler runs and dropped when it returns. It is cheap to clone and
//! read-only once built.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::EnvSnapshot;
use crate::error::{OutfitterError, Result};
use crate::logging::{Logger, LoggerConfig, create_logger};

/// One progress report from a running handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressUpdate {
    pub fn new(progress: f64) -> Self {
        Self {
            progress,
            total: None,
            message: None,
        }
    }

    pub fn total(mut self, total: f64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Receiver for progress reports, supplied by the surface
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Ambient capabilities handed to every handler
#[derive(Clone)]
pub struct HandlerContext {
    request_id: String,
    cwd: PathBuf,
    env: Arc<EnvSnapshot>,
    logger: Arc<dyn Logger>,
    signal: Option<CancellationToken>,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl HandlerContext {
    pub fn builder() -> HandlerContextBuilder {
        HandlerContextBuilder::default()
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    pub fn signal(&self) -> Option<&CancellationToken> {
        self.signal.as_ref()
    }

    /// `true` once the surrounding invocation has been aborted.
    pub fn is_cancelled(&self) -> bool {
        self.signal.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Return a [`CancelledError`](crate::ErrorKind::Cancelled) if the
    /// invocation has been aborted.
    ///
    /// Long-running handlers call this between units of work.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(OutfitterError::cancelled("Operation cancelled")
                .with_context("requestId", self.request_id.clone()))
        } else {
            Ok(())
        }
    }

    /// Whether the surface will deliver progress reports anywhere.
    pub fn has_progress(&self) -> bool {
        self.progress.is_some()
    }

    /// Forward a progress report to the surface. A no-op when the caller did
    /// not ask for progress.
    pub fn report_progress(&self, update: ProgressUpdate) {
        if let Some(sink) = &self.progress {
            sink.report(update);
        }
    }
}

impl fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerContext")
            .field("request_id", &self.request_id)
            .field("cwd", &self.cwd)
            .field("env_vars", &self.env.len())
            .field("cancellable", &self.signal.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Builder for [`HandlerContext`]
#[derive(Default)]
pub struct HandlerContextBuilder {
    request_id: Option<String>,
    cwd: Option<PathBuf>,
    env: Option<Arc<EnvSnapshot>>,
    logger: Option<Arc<dyn Logger>>,
    signal: Option<CancellationToken>,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl HandlerContextBuilder {
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, env: impl Into<Arc<EnvSnapshot>>) -> Self {
        self.env = Some(env.into());
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Finish the context.
    ///
    /// Missing pieces get defaults: a fresh v4 request id, the process
    /// working directory, an empty environment, and a tracing logger bound to
    /// the request id.
    pub fn build(self) -> HandlerContext {
        let request_id = self
            .request_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let cwd = self
            .cwd
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let logger = self.logger.unwrap_or_else(|| {
            create_logger(LoggerConfig::new("handler").field("requestId", request_id.clone()))
        });

        HandlerContext {
            request_id,
            cwd,
            env: self.env.unwrap_or_default(),
            logger,
            signal: self.signal,
            progress: self.progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<ProgressUpdate>>);

    impl ProgressSink for Collect {
        fn report(&self, update: ProgressUpdate) {
            self.0.lock().unwrap().push(update);
        }
    }

    #[test]
    fn generates_request_id_when_missing() {
        let a = HandlerContext::builder().build();
        let b = HandlerContext::builder().build();
        assert_ne!(a.request_id(), b.request_id());
        assert!(Uuid::parse_str(a.request_id()).is_ok());
    }

    #[test]
    fn keeps_supplied_request_id() {
        let ctx = HandlerContext::builder().request_id("abc").build();
        assert_eq!(ctx.request_id(), "abc");
    }

    #[test]
    fn env_lookup() {
        let mut env = EnvSnapshot::new();
        env.insert("HOME".into(), "/home/kit".into());
        let ctx = HandlerContext::builder().env(env).build();
        assert_eq!(ctx.env_var("HOME"), Some("/home/kit"));
        assert_eq!(ctx.env_var("MISSING"), None);
    }

    #[test]
    fn cancellation_is_observable() {
        let token = CancellationToken::new();
        let ctx = HandlerContext::builder().signal(token.clone()).build();
        assert!(ctx.check_cancelled().is_ok());

        token.cancel();
        assert!(ctx.is_cancelled());
        let err = ctx.check_cancelled().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Cancelled);
        assert_eq!(err.exit_code(), 130);
    }

    #[test]
    fn no_signal_is_never_cancelled() {
        let ctx = HandlerContext::builder().build();
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn progress_reaches_sink() {
        let sink = Arc::new(Collect::default());
        let ctx = HandlerContext::builder().progress(sink.clone()).build();
        assert!(ctx.has_progress());

        ctx.report_progress(ProgressUpdate::new(1.0).total(3.0).message("step 1"));
        let seen = sink.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].total, Some(3.0));
    }

    #[test]
    fn progress_without_sink_is_noop() {
        let ctx = HandlerContext::builder().build();
        assert!(!ctx.has_progress());
        ctx.report_progress(ProgressUpdate::new(1.0));
    }
}
