//! Configuration management for modlink
//!
//! Handles configuration loading (TOML or JSON), defaults and environment
//! overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::unit::registry::RegistrationPolicy;
use crate::utils::{env_bool, env_opt};

/// Artifact layout configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLayoutConfig {
    /// Root directory unit artifacts are written under
    #[serde(default = "default_build_root")]
    pub build_root: String,

    /// Extension of the compiled object
    #[serde(default = "default_object_extension")]
    pub object_extension: String,

    /// Extension of the interface descriptor
    #[serde(default = "default_interface_extension")]
    pub interface_extension: String,
}

fn default_build_root() -> String {
    "build/units".to_string()
}

fn default_object_extension() -> String {
    "o".to_string()
}

fn default_interface_extension() -> String {
    "swiftmodule".to_string()
}

impl Default for ArtifactLayoutConfig {
    fn default() -> Self {
        Self {
            build_root: default_build_root(),
            object_extension: default_object_extension(),
            interface_extension: default_interface_extension(),
        }
    }
}

/// Remote fetch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Directory remote libraries are checked out into
    #[serde(default = "default_checkout_dir")]
    pub checkout_dir: String,

    /// Git executable
    #[serde(default = "default_git_binary")]
    pub git_binary: String,
}

fn default_checkout_dir() -> String {
    "build/_deps".to_string()
}

fn default_git_binary() -> String {
    "git".to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            checkout_dir: default_checkout_dir(),
            git_binary: default_git_binary(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "modlink::unit=debug"); RUST_LOG wins when set
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (needs the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Modlink configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModlinkConfig {
    /// Module roots of the consumer (relative ones resolve against `base_dir`)
    #[serde(default)]
    pub module_roots: Vec<String>,

    /// Directory relative paths resolve against
    #[serde(default)]
    pub base_dir: Option<String>,

    /// Unit visible to every consumer; `None` disables the special case
    #[serde(default = "default_core_runtime")]
    pub core_runtime: Option<String>,

    /// Behaviour on re-registration from a different source root
    #[serde(default)]
    pub registration: RegistrationPolicy,

    /// Artifact layout
    #[serde(default)]
    pub artifacts: ArtifactLayoutConfig,

    /// Remote fetching
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Logging
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

fn default_core_runtime() -> Option<String> {
    Some("Core".to_string())
}

impl Default for ModlinkConfig {
    fn default() -> Self {
        Self {
            module_roots: Vec::new(),
            base_dir: None,
            core_runtime: default_core_runtime(),
            registration: RegistrationPolicy::default(),
            artifacts: ArtifactLayoutConfig::default(),
            fetch: FetchConfig::default(),
            logging: None,
        }
    }
}

impl ModlinkConfig {
    /// Load configuration from TOML file
    ///
    /// A missing `base_dir` defaults to the file's directory.
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ModlinkConfig = toml::from_str(&content)?;
        Ok(config.anchored_at(path))
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ModlinkConfig = serde_json::from_str(&content)?;
        Ok(config.anchored_at(path))
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load by extension: `.json` is JSON, anything else TOML
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    fn anchored_at(mut self, path: &Path) -> Self {
        if self.base_dir.is_none() {
            self.base_dir = path
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .filter(|p| !p.is_empty());
        }
        self
    }

    /// Apply `MODLINK_*` environment overrides
    ///
    /// - `MODLINK_MODULE_ROOTS`: extra roots, platform path-list syntax
    /// - `MODLINK_CORE_RUNTIME`: core runtime name, empty disables it
    /// - `MODLINK_STRICT`: strict registration when true, last-write-wins otherwise
    pub fn apply_env_overrides(&mut self) {
        if let Some(roots) = env_opt("MODLINK_MODULE_ROOTS") {
            for root in std::env::split_paths(&roots) {
                if !root.as_os_str().is_empty() {
                    self.module_roots.push(root.to_string_lossy().into_owned());
                }
            }
        }

        if let Some(core) = env_opt("MODLINK_CORE_RUNTIME") {
            self.core_runtime = Some(core).filter(|c| !c.is_empty());
        }

        if env_opt("MODLINK_STRICT").is_some() {
            self.registration = if env_bool("MODLINK_STRICT") {
                RegistrationPolicy::Strict
            } else {
                RegistrationPolicy::LastWriteWins
            };
        }

        debug!("Configuration after environment overrides: {:?}", self);
    }

    /// Core runtime name, treating an empty name as disabled
    pub fn core_runtime_name(&self) -> Option<String> {
        self.core_runtime.clone().filter(|c| !c.is_empty())
    }

    /// Directory relative paths resolve against
    pub fn base_dir(&self) -> PathBuf {
        match &self.base_dir {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}
