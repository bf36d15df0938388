//! Surface drift detection between two manifests

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::manifest::{ActionManifest, ActionManifestEntry};

/// An action present in both manifests whose projection changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedAction {
    pub id: String,
    /// Top-level entry fields that differ (`description`, `cli`, ...)
    pub fields: Vec<String>,
}

/// A manifest-level field that changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataChange {
    pub field: String,
    pub from: Value,
    pub to: Value,
}

/// Result of comparing a committed manifest with the live one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceDiff {
    pub has_changes: bool,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<ModifiedAction>,
    pub metadata_changes: Vec<MetadataChange>,
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn entry_fields(entry: &ActionManifestEntry) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([
        ("description", to_value(&entry.description)),
        ("surfaces", to_value(&entry.surfaces)),
        ("input", entry.input.clone()),
        ("cli", to_value(&entry.cli)),
        ("mcp", to_value(&entry.mcp)),
    ])
}

/// Compare `committed` against `live`.
///
/// `generatedAt` is ignored; every other manifest field is compared.
/// Added actions keep live order, removed actions keep committed order.
pub fn diff_surface_maps(committed: &ActionManifest, live: &ActionManifest) -> SurfaceDiff {
    let added: Vec<String> = live
        .actions
        .iter()
        .filter(|a| committed.action(&a.id).is_none())
        .map(|a| a.id.clone())
        .collect();

    let removed: Vec<String> = committed
        .actions
        .iter()
        .filter(|a| live.action(&a.id).is_none())
        .map(|a| a.id.clone())
        .collect();

    let modified: Vec<ModifiedAction> = live
        .actions
        .iter()
        .filter_map(|new| {
            let old = committed.action(&new.id)?;
            let (old, new_fields) = (entry_fields(old), entry_fields(new));
            let fields: Vec<String> = new_fields
                .iter()
                .filter(|(name, value)| old.get(*name) != Some(*value))
                .map(|(name, _)| name.to_string())
                .collect();
            (!fields.is_empty()).then(|| ModifiedAction {
                id: new.id.clone(),
                fields,
            })
        })
        .collect();

    let metadata = [
        ("version", to_value(&committed.version), to_value(&live.version)),
        ("surfaces", to_value(&committed.surfaces), to_value(&live.surfaces)),
        ("errors", to_value(&committed.errors), to_value(&live.errors)),
        (
            "outputModes",
            to_value(&committed.output_modes),
            to_value(&live.output_modes),
        ),
    ];
    let metadata_changes: Vec<MetadataChange> = metadata
        .into_iter()
        .filter(|(_, from, to)| from != to)
        .map(|(field, from, to)| MetadataChange {
            field: field.to_string(),
            from,
            to,
        })
        .collect();

    let has_changes = !added.is_empty()
        || !removed.is_empty()
        || !modified.is_empty()
        || !metadata_changes.is_empty();

    SurfaceDiff {
        has_changes,
        added,
        removed,
        modified,
        metadata_changes,
    }
}
