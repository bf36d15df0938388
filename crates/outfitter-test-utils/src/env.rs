//! Environment snapshot helpers.

use outfitter_contracts::EnvSnapshot;

/// Build an [`EnvSnapshot`] from literal pairs.
///
/// Tests never touch the real process environment; binders take the snapshot
/// explicitly.
pub fn env_from(pairs: &[(&str, &str)]) -> EnvSnapshot {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
