//! Artifact bundle discovery
//!
//! A bundle is a POM plus the three files that share its base name:
//! `<base>.jar`, `<base>-sources.jar` and `<base>-javadoc.jar`.

use crate::core::error::PublishError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DESCRIPTOR_EXTENSION: &str = "pom";

/// Four co-located files published as one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactBundle {
    pub base_name: String,
    pub descriptor: PathBuf,
    pub binary: PathBuf,
    pub sources: PathBuf,
    pub javadoc: PathBuf,
}

impl ArtifactBundle {
    /// Build a bundle from its descriptor, requiring every companion file
    pub fn from_descriptor(descriptor: &Path) -> Result<Self, PublishError> {
        let base_name = descriptor
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PublishError::IncompleteBundle {
                descriptor: descriptor.to_path_buf(),
                missing: "a valid base name".to_string(),
            })?
            .to_string();
        let dir = descriptor.parent().unwrap_or_else(|| Path::new("."));

        let binary = dir.join(format!("{}.jar", base_name));
        let sources = dir.join(format!("{}-sources.jar", base_name));
        let javadoc = dir.join(format!("{}-javadoc.jar", base_name));

        let missing: Vec<String> = [&binary, &sources, &javadoc]
            .iter()
            .filter(|p| !p.is_file())
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();

        if !missing.is_empty() {
            return Err(PublishError::IncompleteBundle {
                descriptor: descriptor.to_path_buf(),
                missing: missing.join(", "),
            });
        }

        Ok(Self {
            base_name,
            descriptor: descriptor.to_path_buf(),
            binary,
            sources,
            javadoc,
        })
    }
}

/// Discover every bundle under `root`, sorted by path
///
/// Returned paths are absolute.
pub fn discover_bundles(root: &Path) -> Result<Vec<ArtifactBundle>, PublishError> {
    // Bundle paths are handed to tools running in another directory
    let root = &std::path::absolute(root)?;
    if !root.is_dir() {
        return Err(PublishError::BundleRootMissing {
            path: root.to_path_buf(),
        });
    }

    let mut bundles = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();

        if entry.file_type().is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(DESCRIPTOR_EXTENSION)
        {
            bundles.push(ArtifactBundle::from_descriptor(path)?);
        }
    }

    if bundles.is_empty() {
        return Err(PublishError::NoBundles {
            root: root.to_path_buf(),
        });
    }

    tracing::debug!("Discovered {} bundle(s) under {}", bundles.len(), root.display());
    Ok(bundles)
}
