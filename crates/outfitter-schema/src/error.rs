//! Error types for outfitter-schema

use std::path::PathBuf;

use outfitter_contracts::{OutfitterError, SpecError};

/// Result type for outfitter-schema operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating or persisting manifests
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("Surface snapshot not found: {}", path.display())]
    SnapshotNotFound { path: PathBuf },

    #[error("Invalid surface snapshot {}: {source}", path.display())]
    InvalidSnapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<Error> for OutfitterError {
    fn from(err: Error) -> Self {
        match &err {
            Error::SnapshotNotFound { path } => {
                OutfitterError::not_found("surface snapshot", path.display().to_string())
            }
            Error::InvalidSnapshot { path, .. } => OutfitterError::validation(err.to_string())
                .with_context("path", path.display().to_string()),
            Error::Io { path, source } => OutfitterError::internal(err.to_string())
                .with_context("path", path.display().to_string())
                .with_context("cause", source.to_string()),
            Error::Spec(_) | Error::Json(_) => OutfitterError::internal(err.to_string()),
        }
    }
}
