//! Manifest validation framework
//!
//! Validates unit manifests for structure and dependency declarations.

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::unit::registry::manifest::{RemoteRef, UnitManifest};

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Manifest is valid
    Valid,
    /// Manifest is invalid with specific errors
    Invalid(Vec<String>),
}

/// Manifest validator
pub struct ManifestValidator {
    /// Maximum unit name length
    max_name_len: usize,
}

impl ManifestValidator {
    /// Create a new manifest validator
    pub fn new() -> Self {
        Self { max_name_len: 64 }
    }

    /// Validate a unit manifest
    pub fn validate(&self, manifest: &UnitManifest) -> ValidationResult {
        let mut errors = Vec::new();

        if !self.is_valid_name(&manifest.name) {
            errors.push(format!(
                "Invalid unit name: {} (must be alphanumeric with dashes/underscores)",
                manifest.name
            ));
        }

        if let Err(dep_errors) = self.validate_dependencies(manifest) {
            errors.extend(dep_errors);
        }

        if let Err(remote_errors) = self.validate_remotes(&manifest.remotes) {
            errors.extend(remote_errors);
        }

        if manifest.sources.is_empty() {
            debug!("Unit {} declares no sources", manifest.name);
        }

        if errors.is_empty() {
            debug!("Manifest validation passed for unit: {}", manifest.name);
            ValidationResult::Valid
        } else {
            warn!(
                "Manifest validation failed for unit {}: {:?}",
                manifest.name, errors
            );
            ValidationResult::Invalid(errors)
        }
    }

    /// Validate unit name format
    #[inline]
    pub fn is_valid_name(&self, name: &str) -> bool {
        if name.is_empty() || name.len() > self.max_name_len {
            return false;
        }

        // Must start with alphanumeric
        if !name.chars().next().map_or(false, |c| c.is_alphanumeric()) {
            return false;
        }

        name.chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    }

    /// Validate declared dependencies, local and remote together
    fn validate_dependencies(&self, manifest: &UnitManifest) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        let declared = manifest
            .dependencies
            .iter()
            .chain(manifest.remotes.iter().map(|r| &r.name));

        for dep in declared {
            if dep == &manifest.name {
                errors.push(format!("Unit {} depends on itself", manifest.name));
            } else if !self.is_valid_name(dep) {
                errors.push(format!("Invalid dependency name: {}", dep));
            }

            if !seen.insert(dep.as_str()) {
                errors.push(format!("Dependency declared twice: {}", dep));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate remote references
    fn validate_remotes(&self, remotes: &[RemoteRef]) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        for remote in remotes {
            if remote.url.trim().is_empty() {
                errors.push(format!("Remote {} has no url", remote.name));
            }
            if remote.revision.as_deref().map_or(false, |r| r.starts_with('-')) {
                errors.push(format!("Remote {} revision must not start with '-'", remote.name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for ManifestValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(name: &str, deps: &[&str]) -> UnitManifest {
        UnitManifest {
            name: name.to_string(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            sources: vec!["lib.swift".to_string()],
            remotes: Vec::new(),
        }
    }

    #[test]
    fn test_valid_manifest() {
        let validator = ManifestValidator::new();
        assert_eq!(
            validator.validate(&manifest("Util", &["Core", "my-strings_2"])),
            ValidationResult::Valid
        );
    }

    #[test]
    fn test_name_rules() {
        let validator = ManifestValidator::new();
        assert!(validator.is_valid_name("Core"));
        assert!(validator.is_valid_name("zephyr_sys-2"));
        assert!(!validator.is_valid_name("-leading"));
        assert!(!validator.is_valid_name("has space"));
        assert!(!validator.is_valid_name("a/b"));
        assert!(!validator.is_valid_name(&"x".repeat(65)));
    }

    #[test]
    fn test_self_and_duplicate_dependencies() {
        let validator = ManifestValidator::new();
        match validator.validate(&manifest("Util", &["Util", "Core", "Core"])) {
            ValidationResult::Invalid(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors[0].contains("depends on itself"));
                assert!(errors[1].contains("declared twice"));
            }
            ValidationResult::Valid => panic!("expected invalid manifest"),
        }
    }

    #[test]
    fn test_remote_without_url() {
        let validator = ManifestValidator::new();
        let mut m = manifest("App", &[]);
        m.remotes.push(RemoteRef {
            name: "Json".to_string(),
            url: " ".to_string(),
            revision: None,
        });
        assert!(matches!(validator.validate(&m), ValidationResult::Invalid(_)));
    }

    #[test]
    fn test_option_like_revision_rejected() {
        let validator = ManifestValidator::new();
        let mut m = manifest("App", &[]);
        m.remotes.push(RemoteRef {
            name: "Json".to_string(),
            url: "https://example.com/json.git".to_string(),
            revision: Some("--upload-pack=evil".to_string()),
        });
        match validator.validate(&m) {
            ValidationResult::Invalid(errors) => {
                assert_eq!(errors, vec!["Remote Json revision must not start with '-'"]);
            }
            ValidationResult::Valid => panic!("expected invalid manifest"),
        }

        m.remotes[0].revision = Some("v1.2.0".to_string());
        assert_eq!(validator.validate(&m), ValidationResult::Valid);
    }
}
