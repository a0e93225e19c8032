//! Unit manifest parsing
//!
//! Handles parsing `unit.toml` manifests that describe a library unit.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::unit::registry::store::LibraryUnit;
use crate::unit::traits::UnitError;

/// File name a unit manifest is expected under
pub const MANIFEST_FILE: &str = "unit.toml";

/// Remote library a unit depends on, fetched before registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRef {
    /// Unit name the fetched tree registers under
    pub name: String,
    /// Repository address (URL or local path)
    pub url: String,
    /// Optional revision (branch, tag or commit)
    #[serde(default, rename = "rev")]
    pub revision: Option<String>,
}

/// Unit manifest (unit.toml structure)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitManifest {
    /// Unit name
    pub name: String,
    /// Units this one imports, in declaration order
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Source files relative to the manifest directory
    #[serde(default)]
    pub sources: Vec<String>,
    /// Remote libraries to fetch
    #[serde(default, rename = "remote")]
    pub remotes: Vec<RemoteRef>,
}

impl UnitManifest {
    /// Load manifest from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, UnitError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            UnitError::InvalidManifest(format!(
                "Failed to read manifest file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        Self::parse(&contents)
    }

    /// Parse manifest TOML
    pub fn parse(contents: &str) -> Result<Self, UnitError> {
        let manifest: UnitManifest = toml::from_str(contents).map_err(|e| {
            UnitError::InvalidManifest(format!("Failed to parse manifest TOML: {}", e))
        })?;

        if manifest.name.trim().is_empty() {
            return Err(UnitError::InvalidManifest(
                "Unit name cannot be empty".to_string(),
            ));
        }

        Ok(manifest)
    }

    /// Convert to a registrable unit rooted at `unit_dir`
    ///
    /// Remote dependencies count as declared dependencies, after the local ones.
    pub fn to_unit(&self, unit_dir: &Path) -> LibraryUnit {
        let sources: Vec<PathBuf> = self.sources.iter().map(|s| unit_dir.join(s)).collect();
        let dependencies = self
            .dependencies
            .iter()
            .cloned()
            .chain(self.remotes.iter().map(|r| r.name.clone()));

        LibraryUnit::new(self.name.clone(), unit_dir, dependencies).with_sources(sources)
    }
}
