//! Committed surface snapshots

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Error, Result};
use crate::manifest::ActionManifest;

pub use outfitter_contracts::config::DEFAULT_SURFACE_PATH;

/// Write `manifest` to `path` as pretty JSON with a trailing newline,
/// creating parent directories as needed.
pub fn write_snapshot(path: &Path, manifest: &ActionManifest) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| Error::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut content = serde_json::to_string_pretty(manifest)?;
    content.push('\n');
    fs::write(path, content).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(path = %path.display(), actions = manifest.actions.len(), "Wrote surface snapshot");
    Ok(())
}

/// Read a snapshot written by [`write_snapshot`].
pub fn read_snapshot(path: &Path) -> Result<ActionManifest> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(source) if source.kind() == ErrorKind::NotFound => {
            return Err(Error::SnapshotNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(Error::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&content).map_err(|source| Error::InvalidSnapshot {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{ManifestOptions, generate_manifest};
    use outfitter_contracts::ActionRegistry;

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SURFACE_PATH);
        let manifest = generate_manifest(&ActionRegistry::new(), ManifestOptions::default()).unwrap();

        write_snapshot(&path, &manifest).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("}\n"));

        assert_eq!(read_snapshot(&path).unwrap(), manifest);
    }

    #[test]
    fn missing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_snapshot(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, Error::SnapshotNotFound { .. }));
    }

    #[test]
    fn corrupt_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surface.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            read_snapshot(&path),
            Err(Error::InvalidSnapshot { .. })
        ));
    }
}
