//! Consumer configuration and build driving
//!
//! Runs the whole pipeline for one consumer (scope filter, resolver,
//! assembler) and drives the compiler collaborator unit by unit.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::ModlinkConfig;
use crate::unit::artifact::{ArtifactLayout, UnitArtifacts};
use crate::unit::assembler::LinkAssembler;
use crate::unit::registry::{Registry, ResolutionState, Resolver, ScopeFilter};
use crate::unit::traits::{CompileRequest, UnitCompiler, UnitError};

/// Everything a consumer needs before invoking the compiler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    /// Consumer name, if it is a named unit
    pub consumer: Option<String>,
    /// Units visible from the consumer's module roots
    pub visible: Vec<String>,
    /// Build order over visible units, declared dependencies and their closures
    pub order: Vec<String>,
    /// Interface search paths, index-aligned with `link_units`
    pub search_paths: Vec<PathBuf>,
    /// Link inputs, dependencies first
    pub link_units: Vec<String>,
}

/// One consumer's view of the registry
pub struct Consumer<'a> {
    registry: &'a Registry,
    base_dir: PathBuf,
    module_roots: Vec<PathBuf>,
    core_runtime: Option<String>,
    layout: Option<ArtifactLayout>,
    name: Option<String>,
    dependencies: Vec<String>,
}

impl<'a> Consumer<'a> {
    pub fn new<P: AsRef<Path>>(registry: &'a Registry, base_dir: P) -> Self {
        Self {
            registry,
            base_dir: base_dir.as_ref().to_path_buf(),
            module_roots: Vec::new(),
            core_runtime: None,
            layout: None,
            name: None,
            dependencies: Vec::new(),
        }
    }

    /// Consumer set up from configuration: roots, core runtime and layout
    pub fn from_config(registry: &'a Registry, config: &ModlinkConfig) -> Self {
        let base_dir = config.base_dir();
        let layout = ArtifactLayout::from_config(&config.artifacts, &base_dir);
        Self::new(registry, &base_dir)
            .with_module_roots(config.module_roots.iter().map(PathBuf::from))
            .with_core_runtime(config.core_runtime_name())
            .with_layout(layout)
    }

    pub fn with_module_roots<I: IntoIterator<Item = PathBuf>>(mut self, roots: I) -> Self {
        self.module_roots.extend(roots);
        self
    }

    pub fn with_core_runtime(mut self, core_runtime: Option<String>) -> Self {
        self.core_runtime = core_runtime;
        self
    }

    pub fn with_layout(mut self, layout: ArtifactLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Name of the consuming unit; it is excluded from its own scope
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Dependencies the consumer declares beyond what it discovers
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(dependencies.into_iter().map(Into::into));
        self
    }

    /// Compute the consumer's build plan
    pub fn plan(&self) -> Result<BuildPlan, UnitError> {
        let visible = ScopeFilter::new(self.registry, &self.base_dir)
            .with_core_runtime(self.core_runtime.clone())
            .visible_units(&self.module_roots, self.name.as_deref());

        let mut requested: Vec<&str> = visible.iter().map(String::as_str).collect();
        requested.extend(self.dependencies.iter().map(String::as_str));
        if let Some(own) = self.name.as_deref().and_then(|n| self.registry.get(n)) {
            requested.extend(own.dependencies.iter().map(String::as_str));
        }
        let mut seen = HashSet::new();
        requested.retain(|name| seen.insert(*name));

        let resolver = Resolver::new(self.registry);
        let mut state = match self.name.as_deref() {
            Some(name) => ResolutionState::for_consumer(name),
            None => ResolutionState::new(),
        };
        for name in &requested {
            resolver.visit(name, self.name.as_deref(), &mut state)?;
        }
        let order = state.into_order();

        let mut assembler =
            LinkAssembler::new(self.registry).with_core_runtime(self.core_runtime.clone());
        if let Some(layout) = &self.layout {
            assembler = assembler.with_layout(layout.clone());
        }
        let link = assembler.assemble(&order)?;

        info!(
            "Planned {}: {} visible, {} to link",
            self.name.as_deref().unwrap_or("consumer"),
            visible.len(),
            link.len()
        );

        Ok(BuildPlan {
            consumer: self.name.clone(),
            visible,
            order,
            search_paths: link.search_paths,
            link_units: link.link_units,
        })
    }
}

/// Drives the compiler collaborator over registered units
pub struct Builder<'c> {
    compiler: &'c dyn UnitCompiler,
    layout: ArtifactLayout,
    core_runtime: Option<String>,
}

impl<'c> Builder<'c> {
    pub fn new(compiler: &'c dyn UnitCompiler, layout: ArtifactLayout) -> Self {
        Self {
            compiler,
            layout,
            core_runtime: None,
        }
    }

    /// Every unit other than the core runtime implicitly depends on it
    pub fn with_core_runtime(mut self, core_runtime: Option<String>) -> Self {
        self.core_runtime = core_runtime;
        self
    }

    /// Request for compiling `name` against its already-resolved dependencies
    pub fn compile_request(&self, registry: &Registry, name: &str) -> Result<CompileRequest, UnitError> {
        let unit = registry.lookup(name)?;
        let resolver = Resolver::new(registry);
        let mut deps = match self.implicit_core(registry, name)? {
            Some(core) => resolver.resolve_all(&[core, name])?,
            None => resolver.resolve(name)?,
        };
        deps.retain(|dep| dep != name);

        let link = LinkAssembler::new(registry)
            .with_layout(self.layout.clone())
            .with_core_runtime(self.core_runtime.clone())
            .assemble(&deps)?;

        Ok(CompileRequest {
            unit: name.to_string(),
            source_root: unit.source_root.clone(),
            sources: unit.sources.clone(),
            search_paths: link.search_paths,
            link_units: link.link_units,
            output_dir: self.layout.unit_dir(name),
        })
    }

    /// Core runtime implied for `name`; never for the core itself or anything it needs
    fn implicit_core<'r>(&'r self, registry: &Registry, name: &str) -> Result<Option<&'r str>, UnitError> {
        let Some(core) = self
            .core_runtime
            .as_deref()
            .filter(|core| *core != name && registry.contains(core))
        else {
            return Ok(None);
        };
        let below = Resolver::new(registry).resolve_dependencies(core)?;
        Ok((!below.iter().any(|dep| dep == name)).then_some(core))
    }

    /// Compile one unit whose dependencies are all built
    pub async fn build_unit(&self, registry: &mut Registry, name: &str) -> Result<UnitArtifacts, UnitError> {
        let request = self.compile_request(registry, name)?;
        for dep in &request.link_units {
            if !registry.lookup(dep)?.artifact_ready() {
                return Err(UnitError::ArtifactNotReady(dep.clone()));
            }
        }

        debug!("Compiling {} with {:?}", name, request.link_units);
        let artifacts = self.compiler.compile(&request).await?;
        if !artifacts.exist() {
            return Err(UnitError::CompileFailed {
                unit: name.to_string(),
                reason: format!("reported artifacts missing: {:?}", artifacts),
            });
        }

        registry.record_artifacts(name, artifacts.clone())?;
        info!("Built unit {}", name);
        Ok(artifacts)
    }

    /// Compile `name` and every unit it needs that is not built yet, in order
    ///
    /// Returns the units that were compiled.
    pub async fn build_with_dependencies(
        &self,
        registry: &mut Registry,
        name: &str,
    ) -> Result<Vec<String>, UnitError> {
        let order = match self.implicit_core(registry, name)? {
            Some(core) => Resolver::new(registry).resolve_all(&[core, name])?,
            None => Resolver::new(registry).resolve(name)?,
        };

        let mut built = Vec::new();
        for unit in order {
            if registry.lookup(&unit)?.artifact_ready() {
                debug!("{} already built", unit);
                continue;
            }
            self.build_unit(registry, &unit).await?;
            built.push(unit);
        }
        Ok(built)
    }
}
