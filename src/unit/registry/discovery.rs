//! Unit discovery
//!
//! Scans module roots for `unit.toml` manifests and registers the units they
//! describe.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::unit::registry::manifest::{UnitManifest, MANIFEST_FILE};
use crate::unit::registry::store::{canonical_source_root, Registry};
use crate::unit::traits::UnitError;
use crate::unit::validation::{ManifestValidator, ValidationResult};

/// Discovered unit information
#[derive(Debug, Clone)]
pub struct DiscoveredUnit {
    /// Canonical unit directory (the manifest's directory)
    pub directory: PathBuf,
    /// Unit manifest
    pub manifest: UnitManifest,
}

/// Manifest scanner
pub struct UnitDiscovery {
    /// Directories never descended into (e.g. the artifact build root)
    skip_dirs: Vec<PathBuf>,
    validator: ManifestValidator,
}

impl UnitDiscovery {
    pub fn new() -> Self {
        Self {
            skip_dirs: Vec::new(),
            validator: ManifestValidator::new(),
        }
    }

    /// Do not descend into `dir`
    pub fn skip_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        if let Ok(canonical) = fs::canonicalize(dir.as_ref()) {
            self.skip_dirs.push(canonical);
        }
        self
    }

    /// Discover all units under the given roots
    ///
    /// Missing roots are skipped. Invalid or unreadable manifests are logged
    /// and skipped.
    pub fn discover<P: AsRef<Path>>(&self, roots: &[P]) -> Vec<DiscoveredUnit> {
        let mut units = Vec::new();

        for root in roots {
            let root = root.as_ref();
            if !root.is_dir() {
                debug!("Module root {:?} does not exist, skipping", root);
                continue;
            }
            info!("Discovering units in {:?}", root);
            self.scan_dir(root, &mut units);
        }

        info!("Discovered {} units", units.len());
        units
    }

    fn scan_dir(&self, dir: &Path, units: &mut Vec<DiscoveredUnit>) {
        let manifest_path = dir.join(MANIFEST_FILE);
        if manifest_path.is_file() {
            if let Some(unit) = self.load(dir, &manifest_path) {
                units.push(unit);
            }
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read directory {:?}: {}", dir, e);
                return;
            }
        };

        let mut subdirs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter(|path| {
                !path
                    .file_name()
                    .map_or(false, |n| n.to_string_lossy().starts_with('.'))
            })
            .collect();
        // read_dir order is platform-defined
        subdirs.sort();

        for subdir in subdirs {
            let skipped = fs::canonicalize(&subdir)
                .map(|c| self.skip_dirs.contains(&c))
                .unwrap_or(true);
            if skipped {
                debug!("Not descending into {:?}", subdir);
                continue;
            }
            self.scan_dir(&subdir, units);
        }
    }

    fn load(&self, dir: &Path, manifest_path: &Path) -> Option<DiscoveredUnit> {
        let manifest = match UnitManifest::from_file(manifest_path) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Failed to parse manifest {:?}: {}", manifest_path, e);
                return None;
            }
        };

        if let ValidationResult::Invalid(errors) = self.validator.validate(&manifest) {
            warn!(
                "Skipping unit {} in {:?}: {}",
                manifest.name,
                dir,
                errors.join("; ")
            );
            return None;
        }

        let directory = match canonical_source_root(dir) {
            Ok(directory) => directory,
            Err(e) => {
                warn!("{}", e);
                return None;
            }
        };

        debug!("Found unit {} in {:?}", manifest.name, directory);
        Some(DiscoveredUnit {
            directory,
            manifest,
        })
    }

    /// Discover units under `roots` and register them in discovery order
    ///
    /// Stops at the first registration conflict.
    pub fn register_all<P: AsRef<Path>>(
        &self,
        registry: &mut Registry,
        roots: &[P],
    ) -> Result<Vec<String>, UnitError> {
        let mut names = Vec::new();
        for discovered in self.discover(roots) {
            let unit = discovered.manifest.to_unit(&discovered.directory);
            names.push(unit.name.clone());
            registry.register_unit(unit)?;
        }
        Ok(names)
    }
}

impl Default for UnitDiscovery {
    fn default() -> Self {
        Self::new()
    }
}
