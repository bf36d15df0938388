//! Error types for the MCP server

use outfitter_contracts::{OutfitterError, SpecError};
use thiserror::Error;

/// Result type alias for MCP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or running the MCP server
///
/// Handler failures never show up here; they are reported to the client as
/// tool results with `isError: true`.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed action declaration
    #[error(transparent)]
    Spec(#[from] SpecError),

    /// Two actions project to the same tool name
    #[error("tool name '{name}' is used by both {first} and {second}")]
    DuplicateTool {
        name: String,
        first: String,
        second: String,
    },

    #[error("resource '{uri}' is registered twice")]
    DuplicateResource { uri: String },

    #[error("prompt '{name}' is registered twice")]
    DuplicatePrompt { name: String },

    /// Malformed URI template
    #[error("invalid URI template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// Transport failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A background transport task stopped unexpectedly
    #[error("transport task failed: {0}")]
    Transport(String),
}

impl From<Error> for OutfitterError {
    fn from(err: Error) -> Self {
        OutfitterError::internal(err.to_string())
    }
}
