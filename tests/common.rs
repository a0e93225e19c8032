//! Shared fixtures for integration tests
//!
//! Builds throwaway module trees: unit directories, `unit.toml` manifests and
//! fake artifacts under a build root.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use modlink::unit::registry::MANIFEST_FILE;
use modlink::{ArtifactLayout, Registry, UnitArtifacts};

/// Isolated module tree with a build root
pub struct ModuleTree {
    pub temp_dir: TempDir,
    pub mods_dir: PathBuf,
    pub layout: ArtifactLayout,
}

impl ModuleTree {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let mods_dir = temp_dir.path().join("mods");
        std::fs::create_dir_all(&mods_dir)?;
        let layout = ArtifactLayout::new(temp_dir.path().join("build"));

        Ok(Self {
            temp_dir,
            mods_dir,
            layout,
        })
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create `mods/<name>` and return it
    pub fn unit_dir(&self, name: &str) -> PathBuf {
        let dir = self.mods_dir.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Write a manifest for `name` under `mods/<relative>`
    pub fn write_manifest(&self, relative: &str, name: &str, deps: &[&str]) -> PathBuf {
        let dir = self.mods_dir.join(relative);
        std::fs::create_dir_all(&dir).unwrap();
        let deps = deps
            .iter()
            .map(|d| format!("\"{}\"", d))
            .collect::<Vec<_>>()
            .join(", ");
        std::fs::write(
            dir.join(MANIFEST_FILE),
            format!("name = \"{}\"\ndependencies = [{}]\n", name, deps),
        )
        .unwrap();
        dir
    }

    /// Register `name` at `mods/<name>` without building it
    pub fn register(&self, registry: &mut Registry, name: &str, deps: &[&str]) {
        let dir = self.unit_dir(name);
        registry.register(name, &dir, deps.iter().copied()).unwrap();
    }

    /// Write artifacts for `name` at its layout location and record them
    pub fn build(&self, registry: &mut Registry, name: &str) -> UnitArtifacts {
        let artifacts = write_artifacts(&self.layout, name);
        registry.record_artifacts(name, artifacts.clone()).unwrap();
        artifacts
    }
}

/// Write empty object and interface files where `layout` expects them
pub fn write_artifacts(layout: &ArtifactLayout, name: &str) -> UnitArtifacts {
    let artifacts = layout.expected(name);
    std::fs::create_dir_all(layout.unit_dir(name)).unwrap();
    std::fs::write(&artifacts.object, b"").unwrap();
    std::fs::write(&artifacts.interface, b"").unwrap();
    artifacts
}

pub fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
