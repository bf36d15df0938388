//! Manifest and schema introspection for Outfitter action registries
//!
//! - [`generate_manifest`] projects a registry into an [`ActionManifest`]
//! - [`diff_surface_maps`] compares a committed manifest with the live one
//! - [`write_snapshot`] / [`read_snapshot`] persist manifests for CI drift checks

pub mod diff;
pub mod error;
pub mod manifest;
pub mod snapshot;

pub use diff::{MetadataChange, ModifiedAction, SurfaceDiff, diff_surface_maps};
pub use error::{Error, Result};
pub use manifest::{
    ActionManifest, ActionManifestEntry, CliManifest, CliOptionManifest, ErrorCategoryInfo,
    MANIFEST_VERSION, ManifestOptions, McpManifest, OUTPUT_MODES, error_table, generate_manifest,
    manifest_entry,
};
pub use snapshot::{DEFAULT_SURFACE_PATH, read_snapshot, write_snapshot};
