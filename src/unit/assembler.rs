//! Search-path and link assembly
//!
//! Turns a resolved build order into the interface search paths and link
//! inputs handed to the compiler. Both lists are index-aligned and keep
//! dependencies before dependents.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::unit::artifact::ArtifactLayout;
use crate::unit::registry::Registry;
use crate::unit::traits::UnitError;

/// Compiler and linker inputs for a consumer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPlan {
    /// Interface descriptor directories, dependencies first
    pub search_paths: Vec<PathBuf>,
    /// Units to link, dependencies first
    pub link_units: Vec<String>,
}

impl LinkPlan {
    pub fn len(&self) -> usize {
        self.link_units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.link_units.is_empty()
    }
}

/// Assembles [`LinkPlan`]s from resolved orders
pub struct LinkAssembler<'a> {
    registry: &'a Registry,
    /// Fallback for units without recorded artifacts
    layout: Option<ArtifactLayout>,
    /// Placed first whenever present in the order
    core_runtime: Option<String>,
    /// Units the consumer already gets some other way
    implicit: HashSet<String>,
}

impl<'a> LinkAssembler<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            layout: None,
            core_runtime: None,
            implicit: HashSet::new(),
        }
    }

    /// Use `layout` to locate interface directories of units not built yet
    pub fn with_layout(mut self, layout: ArtifactLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_core_runtime(mut self, core_runtime: Option<String>) -> Self {
        self.core_runtime = core_runtime;
        self
    }

    /// Leave `name` out of the plan
    pub fn with_implicit(mut self, name: impl Into<String>) -> Self {
        self.implicit.insert(name.into());
        self
    }

    /// Assemble the plan for `order`
    ///
    /// Repeated names are kept at their first position.
    pub fn assemble<S: AsRef<str>>(&self, order: &[S]) -> Result<LinkPlan, UnitError> {
        let mut seen = HashSet::new();
        let mut names: Vec<&str> = order
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| !self.implicit.contains(*name))
            .filter(|name| seen.insert(*name))
            .collect();

        // Hoisting is only order-safe for a core runtime with no dependencies
        if let Some(core) = self.core_runtime.as_deref() {
            if let Some(pos) = names.iter().position(|n| *n == core) {
                if self.registry.lookup(core)?.dependencies.is_empty() {
                    let core = names.remove(pos);
                    names.insert(0, core);
                } else {
                    warn!("Core runtime {} has dependencies, keeping its resolved position", core);
                }
            }
        }

        let mut plan = LinkPlan::default();
        for name in names {
            plan.search_paths.push(self.interface_dir(name)?);
            plan.link_units.push(name.to_string());
        }

        debug!("Assembled link plan: {:?}", plan.link_units);
        Ok(plan)
    }

    fn interface_dir(&self, name: &str) -> Result<PathBuf, UnitError> {
        let unit = self.registry.lookup(name)?;
        if let Some(artifacts) = &unit.artifacts {
            return Ok(artifacts.interface_dir());
        }
        self.layout
            .as_ref()
            .map(|layout| layout.expected(name).interface_dir())
            .ok_or_else(|| UnitError::ArtifactNotReady(name.to_string()))
    }
}
