//! Unit artifacts
//!
//! A unit is consumable once its compiled object and interface descriptor
//! exist. [`ArtifactLayout`] knows where the build places them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::ArtifactLayoutConfig;

/// Paths of the artifacts produced for one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitArtifacts {
    /// Compiled object (or static archive)
    pub object: PathBuf,
    /// Interface descriptor consumers compile against
    pub interface: PathBuf,
}

impl UnitArtifacts {
    pub fn new(object: impl Into<PathBuf>, interface: impl Into<PathBuf>) -> Self {
        Self {
            object: object.into(),
            interface: interface.into(),
        }
    }

    /// Both files are present on disk
    pub fn exist(&self) -> bool {
        self.object.is_file() && self.interface.exists()
    }

    /// Directory holding the interface descriptor, used as a search path
    pub fn interface_dir(&self) -> PathBuf {
        self.interface
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.interface.clone())
    }
}

/// Where the build writes each unit's artifacts
///
/// `<build_root>/<name>/<name>.<object_extension>` and
/// `<build_root>/<name>/<name>.<interface_extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    build_root: PathBuf,
    object_extension: String,
    interface_extension: String,
}

impl ArtifactLayout {
    pub fn new<P: AsRef<Path>>(build_root: P) -> Self {
        let defaults = ArtifactLayoutConfig::default();
        Self {
            build_root: build_root.as_ref().to_path_buf(),
            object_extension: defaults.object_extension,
            interface_extension: defaults.interface_extension,
        }
    }

    /// Build a layout from config, resolving a relative build root against `base_dir`
    pub fn from_config(config: &ArtifactLayoutConfig, base_dir: &Path) -> Self {
        Self {
            build_root: base_dir.join(&config.build_root),
            object_extension: config.object_extension.clone(),
            interface_extension: config.interface_extension.clone(),
        }
    }

    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    /// Output directory of a unit
    pub fn unit_dir(&self, name: &str) -> PathBuf {
        self.build_root.join(name)
    }

    /// Expected artifact paths of a unit, whether or not they exist yet
    pub fn expected(&self, name: &str) -> UnitArtifacts {
        let dir = self.unit_dir(name);
        UnitArtifacts {
            object: dir.join(format!("{}.{}", name, self.object_extension)),
            interface: dir.join(format!("{}.{}", name, self.interface_extension)),
        }
    }

    /// Artifacts of a unit if the build already produced them
    pub fn locate(&self, name: &str) -> Option<UnitArtifacts> {
        let artifacts = self.expected(name);
        if artifacts.exist() {
            Some(artifacts)
        } else {
            debug!("No artifacts for {} under {:?}", name, self.unit_dir(name));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_expected_paths() {
        let layout = ArtifactLayout::new("/build");
        let artifacts = layout.expected("Util");
        assert_eq!(artifacts.object, PathBuf::from("/build/Util/Util.o"));
        assert_eq!(artifacts.interface, PathBuf::from("/build/Util/Util.swiftmodule"));
        assert_eq!(artifacts.interface_dir(), PathBuf::from("/build/Util"));
    }

    #[test]
    fn test_locate_requires_both_files() {
        let temp_dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(temp_dir.path());
        let expected = layout.expected("Util");
        std::fs::create_dir_all(layout.unit_dir("Util")).unwrap();

        std::fs::write(&expected.object, b"obj").unwrap();
        assert!(layout.locate("Util").is_none());

        std::fs::write(&expected.interface, b"iface").unwrap();
        assert_eq!(layout.locate("Util"), Some(expected));
    }
}
