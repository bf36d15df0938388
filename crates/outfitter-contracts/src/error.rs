//! Error taxonomy shared by every surface
//!
//! Every expected failure is an [`OutfitterError`]: a tagged kind, a
//! human-readable message, and optional diagnostic context. The kind fixes the
//! [`ErrorCategory`], and the category fixes the CLI exit code and HTTP status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result type for handlers, validators, and binders
pub type Result<T, E = OutfitterError> = std::result::Result<T, E>;

/// Closed set of failure classifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    Permission,
    Timeout,
    RateLimit,
    Network,
    Internal,
    Auth,
    Cancelled,
}

impl ErrorCategory {
    /// Every category, in exit-code order.
    pub const ALL: [ErrorCategory; 10] = [
        ErrorCategory::Validation,
        ErrorCategory::NotFound,
        ErrorCategory::Conflict,
        ErrorCategory::Permission,
        ErrorCategory::Timeout,
        ErrorCategory::RateLimit,
        ErrorCategory::Network,
        ErrorCategory::Internal,
        ErrorCategory::Auth,
        ErrorCategory::Cancelled,
    ];

    /// Process exit code for this category.
    pub const fn exit_code(self) -> i32 {
        match self {
            ErrorCategory::Validation => 1,
            ErrorCategory::NotFound => 2,
            ErrorCategory::Conflict => 3,
            ErrorCategory::Permission => 4,
            ErrorCategory::Timeout => 5,
            ErrorCategory::RateLimit => 6,
            ErrorCategory::Network => 7,
            ErrorCategory::Internal => 8,
            ErrorCategory::Auth => 9,
            ErrorCategory::Cancelled => 130,
        }
    }

    /// HTTP status code for this category.
    pub const fn http_status(self) -> u16 {
        match self {
            ErrorCategory::Validation => 400,
            ErrorCategory::NotFound => 404,
            ErrorCategory::Conflict => 409,
            ErrorCategory::Permission => 403,
            ErrorCategory::Timeout => 504,
            ErrorCategory::RateLimit => 429,
            ErrorCategory::Network => 502,
            ErrorCategory::Internal => 500,
            ErrorCategory::Auth => 401,
            ErrorCategory::Cancelled => 499,
        }
    }

    /// Whether a caller may retry automatically.
    ///
    /// `rate_limit` is not included: callers should wait for the
    /// `retryAfterSeconds` hint instead.
    pub const fn is_retryable(self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Timeout)
    }

    /// Stable snake_case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Conflict => "conflict",
            ErrorCategory::Permission => "permission",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Network => "network",
            ErrorCategory::Internal => "internal",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCategory {
    type Err = OutfitterError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ErrorCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| OutfitterError::validation(format!("Unknown error category: {s}")))
    }
}

/// Kind-specific error payload, discriminated by `_tag`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_tag")]
pub enum ErrorKind {
    #[serde(rename = "ValidationError", rename_all = "camelCase")]
    Validation {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },

    #[serde(rename = "AmbiguousError", rename_all = "camelCase")]
    Ambiguous {
        #[serde(default)]
        candidates: Vec<String>,
    },

    #[serde(rename = "NotFoundError", rename_all = "camelCase")]
    NotFound {
        resource_type: String,
        resource_id: String,
    },

    #[serde(rename = "AlreadyExistsError", rename_all = "camelCase")]
    AlreadyExists {
        resource_type: String,
        resource_id: String,
    },

    #[serde(rename = "ConflictError")]
    Conflict,

    #[serde(rename = "PermissionError")]
    Permission,

    #[serde(rename = "TimeoutError", rename_all = "camelCase")]
    Timeout { operation: String, timeout_ms: u64 },

    #[serde(rename = "RateLimitError", rename_all = "camelCase")]
    RateLimit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_after_seconds: Option<u64>,
    },

    #[serde(rename = "NetworkError")]
    Network,

    #[serde(rename = "InternalError")]
    Internal,

    #[serde(rename = "AuthError", rename_all = "camelCase")]
    Auth {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    #[serde(rename = "CancelledError")]
    Cancelled,
}

impl ErrorKind {
    /// The `_tag` discriminant.
    pub const fn tag(&self) -> &'static str {
        match self {
            ErrorKind::Validation { .. } => "ValidationError",
            ErrorKind::Ambiguous { .. } => "AmbiguousError",
            ErrorKind::NotFound { .. } => "NotFoundError",
            ErrorKind::AlreadyExists { .. } => "AlreadyExistsError",
            ErrorKind::Conflict => "ConflictError",
            ErrorKind::Permission => "PermissionError",
            ErrorKind::Timeout { .. } => "TimeoutError",
            ErrorKind::RateLimit { .. } => "RateLimitError",
            ErrorKind::Network => "NetworkError",
            ErrorKind::Internal => "InternalError",
            ErrorKind::Auth { .. } => "AuthError",
            ErrorKind::Cancelled => "CancelledError",
        }
    }

    /// The category this kind belongs to.
    pub const fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::Validation { .. } | ErrorKind::Ambiguous { .. } => {
                ErrorCategory::Validation
            }
            ErrorKind::NotFound { .. } => ErrorCategory::NotFound,
            ErrorKind::AlreadyExists { .. } | ErrorKind::Conflict => ErrorCategory::Conflict,
            ErrorKind::Permission => ErrorCategory::Permission,
            ErrorKind::Timeout { .. } => ErrorCategory::Timeout,
            ErrorKind::RateLimit { .. } => ErrorCategory::RateLimit,
            ErrorKind::Network => ErrorCategory::Network,
            ErrorKind::Internal => ErrorCategory::Internal,
            ErrorKind::Auth { .. } => ErrorCategory::Auth,
            ErrorKind::Cancelled => ErrorCategory::Cancelled,
        }
    }
}

/// A typed, categorized failure
///
/// Constructed at the failure site and never mutated afterwards except through
/// the consuming `with_*` builders.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct OutfitterError {
    kind: ErrorKind,
    message: String,
    context: Option<Map<String, Value>>,
}

impl OutfitterError {
    /// Create an error from an explicit kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation { field: None }, message)
    }

    /// Validation failure attributed to a single input field.
    pub fn validation_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Validation {
                field: Some(field.into()),
            },
            message,
        )
    }

    pub fn ambiguous(message: impl Into<String>, candidates: Vec<String>) -> Self {
        Self::new(ErrorKind::Ambiguous { candidates }, message)
    }

    /// `"{resource_type} not found: {resource_id}"`
    pub fn not_found(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        let resource_type = resource_type.into();
        let resource_id = resource_id.into();
        let message = format!("{resource_type} not found: {resource_id}");
        Self::new(
            ErrorKind::NotFound {
                resource_type,
                resource_id,
            },
            message,
        )
    }

    pub fn already_exists(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        let resource_type = resource_type.into();
        let resource_id = resource_id.into();
        let message = format!("{resource_type} already exists: {resource_id}");
        Self::new(
            ErrorKind::AlreadyExists {
                resource_type,
                resource_id,
            },
            message,
        )
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permission, message)
    }

    /// `"{operation} timed out after {timeout_ms}ms"`
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        let operation = operation.into();
        let message = format!("{operation} timed out after {timeout_ms}ms");
        Self::new(
            ErrorKind::Timeout {
                operation,
                timeout_ms,
            },
            message,
        )
    }

    pub fn rate_limited(message: impl Into<String>, retry_after_seconds: Option<u64>) -> Self {
        Self::new(
            ErrorKind::RateLimit {
                retry_after_seconds,
            },
            message,
        )
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth { reason: None }, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Attach one diagnostic key/value pair.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> Option<&Map<String, Value>> {
        self.context.as_ref()
    }

    pub fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    pub fn http_status(&self) -> u16 {
        self.category().http_status()
    }

    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Server-supplied wait hint for rate-limited failures.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match &self.kind {
            ErrorKind::RateLimit {
                retry_after_seconds,
            } => *retry_after_seconds,
            _ => None,
        }
    }

    /// Wire representation used by envelopes and tool results.
    pub fn serialize_error(&self) -> SerializedError {
        SerializedError {
            kind: self.kind.clone(),
            category: self.category(),
            message: self.message.clone(),
            code: self.exit_code(),
            context: self.context.clone(),
        }
    }
}

impl From<SerializedError> for OutfitterError {
    fn from(value: SerializedError) -> Self {
        Self {
            kind: value.kind,
            message: value.message,
            context: value.context,
        }
    }
}

/// JSON shape of an [`OutfitterError`]
///
/// `{ "_tag", "category", "message", "code", "context"?, ...kind fields }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedError {
    #[serde(flatten)]
    pub kind: ErrorKind,
    pub category: ErrorCategory,
    pub message: String,
    pub code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

/// Converts foreign errors into [`InternalError`](ErrorKind::Internal) at a boundary
pub trait ResultExt<T> {
    /// Map the error to an internal error with `message`, keeping the source
    /// text under `context.cause`.
    fn or_internal(self, message: impl Into<String>) -> Result<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn or_internal(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| OutfitterError::internal(message).with_context("cause", e.to_string()))
    }
}

/// Configuration errors raised while declaring actions and building registries
///
/// These are programming mistakes in the action set and surface at startup,
/// never during dispatch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    #[error("Duplicate action id: {id}")]
    DuplicateAction { id: String },

    #[error("Invalid input schema: {message}")]
    InvalidSchema { message: String },

    #[error("Invalid flag string '{flags}': {reason}")]
    InvalidFlags { flags: String, reason: String },

    #[error("Invalid command spec '{spec}': {reason}")]
    InvalidCommand { spec: String, reason: String },
}
