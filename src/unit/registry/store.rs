//! Unit registry
//!
//! Owned catalog of registered library units, keyed by name. Units are kept
//! in an arena in registration order with a name index beside it; the order
//! is only used for stable listing.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::unit::artifact::{ArtifactLayout, UnitArtifacts};
use crate::unit::traits::UnitError;

/// Registry shared between threads (single writer, many readers)
pub type SharedRegistry = Arc<RwLock<Registry>>;

/// What happens when a name is registered again from a different source root
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationPolicy {
    /// Conflicting source roots are a configuration error
    #[default]
    Strict,
    /// The later registration replaces the earlier one
    LastWriteWins,
}

/// One registered, independently compiled library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryUnit {
    /// Unique name, the resolution key
    pub name: String,
    /// Canonical (absolute, symlink-resolved) source tree
    pub source_root: PathBuf,
    /// Names of units this one imports, in declaration order, without repeats
    pub dependencies: Vec<String>,
    /// Source files, absolute
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    /// Artifacts reported by the compiler, if built
    #[serde(default)]
    pub artifacts: Option<UnitArtifacts>,
}

impl LibraryUnit {
    pub fn new<I, S>(name: impl Into<String>, source_root: impl Into<PathBuf>, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let dependencies = dependencies
            .into_iter()
            .map(Into::into)
            .filter(|dep: &String| seen.insert(dep.clone()))
            .collect();

        Self {
            name: name.into(),
            source_root: source_root.into(),
            dependencies,
            sources: Vec::new(),
            artifacts: None,
        }
    }

    pub fn with_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.sources = sources;
        self
    }

    /// Compiled object and interface descriptor both exist
    pub fn artifact_ready(&self) -> bool {
        self.artifacts.as_ref().map_or(false, UnitArtifacts::exist)
    }
}

/// Canonicalize a unit source root
pub fn canonical_source_root(path: &Path) -> Result<PathBuf, UnitError> {
    std::fs::canonicalize(path).map_err(|e| UnitError::InvalidSourceRoot {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Catalog of library units
#[derive(Debug, Default)]
pub struct Registry {
    units: Vec<LibraryUnit>,
    index: HashMap<String, usize>,
    policy: RegistrationPolicy,
}

impl Registry {
    /// Create an empty registry with the strict policy
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: RegistrationPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> RegistrationPolicy {
        self.policy
    }

    /// Register a unit from its name, source root and declared dependencies
    ///
    /// The source root is canonicalized; dependencies need not be registered yet.
    pub fn register<I, S>(
        &mut self,
        name: &str,
        source_root: impl AsRef<Path>,
        dependencies: I,
    ) -> Result<(), UnitError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let root = canonical_source_root(source_root.as_ref())?;
        self.insert(LibraryUnit::new(name, root, dependencies))
    }

    /// Register a fully described unit (source root is canonicalized here)
    pub fn register_unit(&mut self, mut unit: LibraryUnit) -> Result<(), UnitError> {
        unit.source_root = canonical_source_root(&unit.source_root)?;
        self.insert(unit)
    }

    fn insert(&mut self, unit: LibraryUnit) -> Result<(), UnitError> {
        if unit.name.is_empty() {
            return Err(UnitError::InvalidManifest(
                "Unit name cannot be empty".to_string(),
            ));
        }

        let Some(&slot) = self.index.get(&unit.name) else {
            debug!(
                "Registered unit {} at {:?} (deps: {:?})",
                unit.name, unit.source_root, unit.dependencies
            );
            self.index.insert(unit.name.clone(), self.units.len());
            self.units.push(unit);
            return Ok(());
        };

        let existing = &mut self.units[slot];
        if existing.source_root == unit.source_root {
            // Same identity: the unit reconfigured itself, keep what was built
            debug!("Unit {} re-registered from the same source root", unit.name);
            existing.dependencies = unit.dependencies;
            if !unit.sources.is_empty() {
                existing.sources = unit.sources;
            }
            if unit.artifacts.is_some() {
                existing.artifacts = unit.artifacts;
            }
            return Ok(());
        }

        match self.policy {
            RegistrationPolicy::Strict => Err(UnitError::DuplicateRegistration {
                name: unit.name,
                existing: existing.source_root.clone(),
                attempted: unit.source_root,
            }),
            RegistrationPolicy::LastWriteWins => {
                warn!(
                    "Unit {} re-registered from {:?}, replacing {:?}",
                    unit.name, unit.source_root, existing.source_root
                );
                *existing = unit;
                Ok(())
            }
        }
    }

    /// Look up a unit by name
    pub fn lookup(&self, name: &str) -> Result<&LibraryUnit, UnitError> {
        self.get(name).ok_or_else(|| UnitError::unknown(name))
    }

    pub fn get(&self, name: &str) -> Option<&LibraryUnit> {
        self.index.get(name).map(|&slot| &self.units[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered names in registration order
    pub fn all_names(&self) -> Vec<String> {
        self.units.iter().map(|u| u.name.clone()).collect()
    }

    /// Registered units in registration order
    pub fn units(&self) -> impl Iterator<Item = &LibraryUnit> {
        self.units.iter()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Record the artifacts the compiler produced for a unit
    pub fn record_artifacts(&mut self, name: &str, artifacts: UnitArtifacts) -> Result<(), UnitError> {
        let slot = *self.index.get(name).ok_or_else(|| UnitError::unknown(name))?;
        debug!("Recorded artifacts for {}: {:?}", name, artifacts);
        self.units[slot].artifacts = Some(artifacts);
        Ok(())
    }

    /// Pick up artifacts already present in `layout` for every unit without any
    ///
    /// Returns the number of units that became ready.
    pub fn refresh_artifacts(&mut self, layout: &ArtifactLayout) -> usize {
        let mut found = 0;
        for unit in self.units.iter_mut().filter(|u| !u.artifact_ready()) {
            if let Some(artifacts) = layout.locate(&unit.name) {
                unit.artifacts = Some(artifacts);
                found += 1;
            }
        }
        if found > 0 {
            info!("Found existing artifacts for {} units", found);
        }
        found
    }

    /// Wrap into a [`SharedRegistry`]
    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn unit_dirs(names: &[&str]) -> (TempDir, Vec<PathBuf>) {
        let temp_dir = TempDir::new().unwrap();
        let dirs = names
            .iter()
            .map(|n| {
                let dir = temp_dir.path().join(n);
                std::fs::create_dir_all(&dir).unwrap();
                dir
            })
            .collect();
        (temp_dir, dirs)
    }

    #[test]
    fn test_register_and_lookup() {
        let (_tmp, dirs) = unit_dirs(&["core", "util"]);
        let mut registry = Registry::new();
        registry.register("Core", &dirs[0], Vec::<String>::new()).unwrap();
        registry.register("Util", &dirs[1], ["Core"]).unwrap();

        let util = registry.lookup("Util").unwrap();
        assert_eq!(util.dependencies, vec!["Core"]);
        assert_eq!(util.source_root, std::fs::canonicalize(&dirs[1]).unwrap());
        assert_eq!(registry.all_names(), vec!["Core", "Util"]);
        assert!(matches!(
            registry.lookup("Missing"),
            Err(UnitError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn test_forward_references_allowed() {
        let (_tmp, dirs) = unit_dirs(&["app"]);
        let mut registry = Registry::new();
        registry.register("App", &dirs[0], ["NotYet"]).unwrap();
        assert!(!registry.contains("NotYet"));
    }

    #[test]
    fn test_duplicate_dependencies_collapsed() {
        let (_tmp, dirs) = unit_dirs(&["app"]);
        let mut registry = Registry::new();
        registry.register("App", &dirs[0], ["B", "A", "B"]).unwrap();
        assert_eq!(registry.lookup("App").unwrap().dependencies, vec!["B", "A"]);
    }

    #[test]
    fn test_conflicting_root_rejected_when_strict() {
        let (_tmp, dirs) = unit_dirs(&["one", "two"]);
        let mut registry = Registry::new();
        registry.register("Lib", &dirs[0], Vec::<String>::new()).unwrap();

        let err = registry.register("Lib", &dirs[1], Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, UnitError::DuplicateRegistration { ref name, .. } if name == "Lib"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_identical_root_is_idempotent() {
        let (_tmp, dirs) = unit_dirs(&["one"]);
        let mut registry = Registry::new();
        registry.register("Lib", &dirs[0], ["Core"]).unwrap();
        registry.register("Lib", &dirs[0], ["Core"]).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("Lib").unwrap().dependencies, vec!["Core"]);
    }

    #[test]
    fn test_symlinked_root_is_same_identity() {
        let (tmp, dirs) = unit_dirs(&["real"]);
        let link = tmp.path().join("link");
        #[cfg(unix)]
        std::os::unix::fs::symlink(&dirs[0], &link).unwrap();
        #[cfg(not(unix))]
        return;

        let mut registry = Registry::new();
        registry.register("Lib", &dirs[0], Vec::<String>::new()).unwrap();
        registry.register("Lib", &link, Vec::<String>::new()).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_last_write_wins_replaces() {
        let (_tmp, dirs) = unit_dirs(&["one", "two"]);
        let mut registry = Registry::with_policy(RegistrationPolicy::LastWriteWins);
        registry.register("Lib", &dirs[0], Vec::<String>::new()).unwrap();
        registry.register("Lib", &dirs[1], ["Core"]).unwrap();

        let lib = registry.lookup("Lib").unwrap();
        assert_eq!(lib.source_root, std::fs::canonicalize(&dirs[1]).unwrap());
        assert_eq!(lib.dependencies, vec!["Core"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_missing_source_root_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = Registry::new();
        let err = registry
            .register("Lib", temp_dir.path().join("absent"), Vec::<String>::new())
            .unwrap_err();
        assert!(matches!(err, UnitError::InvalidSourceRoot { .. }));
    }

    #[test]
    fn test_artifact_readiness_follows_disk() {
        let (tmp, dirs) = unit_dirs(&["lib"]);
        let layout = ArtifactLayout::new(tmp.path().join("build"));
        let mut registry = Registry::new();
        registry.register("Lib", &dirs[0], Vec::<String>::new()).unwrap();
        assert!(!registry.lookup("Lib").unwrap().artifact_ready());
        assert_eq!(registry.refresh_artifacts(&layout), 0);

        let expected = layout.expected("Lib");
        std::fs::create_dir_all(layout.unit_dir("Lib")).unwrap();
        std::fs::write(&expected.object, b"obj").unwrap();
        std::fs::write(&expected.interface, b"iface").unwrap();

        assert_eq!(registry.refresh_artifacts(&layout), 1);
        assert!(registry.lookup("Lib").unwrap().artifact_ready());

        std::fs::remove_file(&expected.object).unwrap();
        assert!(!registry.lookup("Lib").unwrap().artifact_ready());
    }

    #[test]
    fn test_record_artifacts_unknown_unit() {
        let mut registry = Registry::new();
        let err = registry
            .record_artifacts("Ghost", UnitArtifacts::new("a.o", "a.swiftmodule"))
            .unwrap_err();
        assert_eq!(err, UnitError::unknown("Ghost"));
    }
}
