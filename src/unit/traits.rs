//! Unit system errors and collaborator interfaces
//!
//! Defines the error taxonomy shared by the registry, resolver and assembler,
//! and the trait through which the external compiler is driven.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::unit::artifact::UnitArtifacts;

/// Errors raised by the unit system
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("Duplicate registration of unit '{name}': already registered from {existing:?}, attempted {attempted:?}")]
    DuplicateRegistration {
        name: String,
        existing: PathBuf,
        attempted: PathBuf,
    },

    #[error("Cyclic dependency: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    #[error("Unknown dependency: {name}{}", requester_suffix(.required_by))]
    UnknownDependency {
        name: String,
        required_by: Option<String>,
    },

    #[error("Artifact not ready for unit: {0}")]
    ArtifactNotReady(String),

    #[error("Invalid source root {path:?}: {reason}")]
    InvalidSourceRoot { path: PathBuf, reason: String },

    #[error("Invalid unit manifest: {0}")]
    InvalidManifest(String),

    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Compilation of unit '{unit}' failed: {reason}")]
    CompileFailed { unit: String, reason: String },
}

fn requester_suffix(required_by: &Option<String>) -> String {
    required_by
        .as_ref()
        .map(|r| format!(" (required by {r})"))
        .unwrap_or_default()
}

impl UnitError {
    /// Whether this error must abort the calling consumer's configuration
    ///
    /// Only [`UnitError::ArtifactNotReady`] is soft: it is absorbed as
    /// exclusion from the visible set.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, UnitError::ArtifactNotReady(_))
    }

    /// Shorthand for an unknown name with no known requester
    pub fn unknown(name: impl Into<String>) -> Self {
        UnitError::UnknownDependency {
            name: name.into(),
            required_by: None,
        }
    }
}

/// Everything the compiler collaborator needs to build one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRequest {
    /// Unit being compiled
    pub unit: String,
    /// Canonical source root of the unit
    pub source_root: PathBuf,
    /// Source files, absolute
    pub sources: Vec<PathBuf>,
    /// Interface search paths, dependencies first
    pub search_paths: Vec<PathBuf>,
    /// Units to link against, dependencies first
    pub link_units: Vec<String>,
    /// Directory the produced object and interface descriptor go into
    pub output_dir: PathBuf,
}

/// Compiler invocation collaborator
///
/// Implemented by the host build system. Given a [`CompileRequest`], it
/// produces the unit's object file and interface descriptor and reports
/// their paths; those paths become the unit's readiness evidence.
#[async_trait]
pub trait UnitCompiler: Send + Sync {
    /// Compile one unit
    async fn compile(&self, request: &CompileRequest) -> Result<UnitArtifacts, UnitError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_display_joins_path() {
        let err = UnitError::CyclicDependency(vec!["A".into(), "B".into(), "A".into()]);
        assert_eq!(err.to_string(), "Cyclic dependency: A -> B -> A");
    }

    #[test]
    fn test_unknown_dependency_display() {
        assert_eq!(UnitError::unknown("Y").to_string(), "Unknown dependency: Y");

        let err = UnitError::UnknownDependency {
            name: "Y".into(),
            required_by: Some("X".into()),
        };
        assert_eq!(err.to_string(), "Unknown dependency: Y (required by X)");
    }

    #[test]
    fn test_only_artifact_not_ready_is_soft() {
        assert!(!UnitError::ArtifactNotReady("Util".into()).is_fatal());
        assert!(UnitError::CyclicDependency(vec![]).is_fatal());
        assert!(UnitError::unknown("X").is_fatal());
        assert!(UnitError::FetchFailed("offline".into()).is_fatal());
    }
}
