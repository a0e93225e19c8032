//! Scope filtering
//!
//! Decides which registered units a consumer can see: those whose source
//! root lies under one of the consumer's module roots and whose artifacts
//! are already built. The core runtime unit is always visible.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};
use tracing::{debug, info};

use crate::unit::registry::store::Registry;
use crate::unit::traits::UnitError;

/// Path-prefix containment on canonical paths
///
/// Both sides get a trailing separator so `/mods/foo` is not inside `/mods/fo`.
pub fn is_within(path: &Path, root: &Path) -> bool {
    with_trailing_separator(path)
        .as_encoded_bytes()
        .starts_with(with_trailing_separator(root).as_encoded_bytes())
}

/// Separator-terminated raw OS string, never lossy text
fn with_trailing_separator(path: &Path) -> OsString {
    let mut s = path.as_os_str().to_os_string();
    if !s.as_encoded_bytes().ends_with(MAIN_SEPARATOR_STR.as_bytes()) {
        s.push(MAIN_SEPARATOR_STR);
    }
    s
}

/// Scope filter over a registry snapshot
pub struct ScopeFilter<'a> {
    registry: &'a Registry,
    /// Directory relative module roots are resolved against
    base_dir: PathBuf,
    /// Unit visible to every consumer regardless of roots
    core_runtime: Option<String>,
}

impl<'a> ScopeFilter<'a> {
    /// Create a filter resolving relative roots against `base_dir`
    pub fn new<P: AsRef<Path>>(registry: &'a Registry, base_dir: P) -> Self {
        Self {
            registry,
            base_dir: base_dir.as_ref().to_path_buf(),
            core_runtime: None,
        }
    }

    /// Name the always-visible core runtime unit
    pub fn with_core_runtime(mut self, core_runtime: Option<String>) -> Self {
        self.core_runtime = core_runtime;
        self
    }

    /// Canonicalize and deduplicate module roots
    ///
    /// Roots that do not exist are skipped; module roots are often optional.
    pub fn canonical_roots<P: AsRef<Path>>(&self, module_roots: &[P]) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut roots = Vec::new();

        for root in module_roots {
            let joined = self.base_dir.join(root.as_ref());
            match std::fs::canonicalize(&joined) {
                Ok(canonical) => {
                    if seen.insert(canonical.clone()) {
                        roots.push(canonical);
                    }
                }
                Err(e) => {
                    debug!("Skipping module root {:?}: {}", joined, e);
                }
            }
        }

        roots
    }

    /// Names of units visible to a consumer with the given module roots
    ///
    /// The core runtime comes first when registered; the rest follow
    /// registration order.
    pub fn visible_units<P: AsRef<Path>>(
        &self,
        module_roots: &[P],
        exclude_self: Option<&str>,
    ) -> Vec<String> {
        let roots = self.canonical_roots(module_roots);
        let mut visible = Vec::new();

        let core = self
            .core_runtime
            .as_deref()
            .filter(|core| Some(*core) != exclude_self);
        if let Some(core) = core {
            match self.registry.get(core) {
                Some(unit) => {
                    if !unit.artifact_ready() {
                        debug!("Core runtime {} is visible but not built yet", core);
                    }
                    visible.push(unit.name.clone());
                }
                None => debug!("Core runtime {} is not registered", core),
            }
        }

        for unit in self.registry.units() {
            if Some(unit.name.as_str()) == exclude_self
                || Some(unit.name.as_str()) == self.core_runtime.as_deref()
            {
                continue;
            }
            if !roots.iter().any(|root| is_within(&unit.source_root, root)) {
                continue;
            }
            if !unit.artifact_ready() {
                let soft = UnitError::ArtifactNotReady(unit.name.clone());
                debug!("Excluding {}: {}", unit.name, soft);
                continue;
            }
            visible.push(unit.name.clone());
        }

        info!(
            "{} units visible from {} module roots",
            visible.len(),
            roots.len()
        );
        visible
    }
}
