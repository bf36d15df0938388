//! Error types for outfitter-cli

use outfitter_contracts::{OutfitterError, SpecError};

/// Result type for building the command tree
pub type Result<T> = std::result::Result<T, CliError>;

/// Configuration errors found while compiling actions into a command tree
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Malformed action declaration
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("Group '{group}' has two base actions: {first} and {second}")]
    DuplicateBase {
        group: String,
        first: String,
        second: String,
    },

    #[error("Command '{name}' is declared twice under {parent}")]
    DuplicateCommand { name: String, parent: String },

    #[error("Group '{name}' collides with a top-level command of the same name")]
    GroupCollision { name: String },
}

impl From<CliError> for OutfitterError {
    fn from(err: CliError) -> Self {
        OutfitterError::internal(err.to_string())
    }
}
