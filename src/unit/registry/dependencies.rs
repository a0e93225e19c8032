//! Unit dependency resolution
//!
//! Orders the transitive dependencies of a unit so every dependency comes
//! before its dependents. Depth-first over an explicit frame stack, so graph
//! depth is bounded by memory rather than the thread stack. Dependencies are
//! walked in declaration order so the result is reproducible.

use std::collections::HashSet;
use tracing::debug;

use crate::unit::registry::store::{LibraryUnit, Registry};
use crate::unit::traits::UnitError;

/// Working state of one top-level resolution request
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolutionState {
    /// Build order produced so far
    resolved: Vec<String>,
    resolved_set: HashSet<String>,
    /// Units on the current path, outermost first
    visiting: Vec<String>,
    visiting_set: HashSet<String>,
}

impl ResolutionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for a consumer that is itself on the path
    ///
    /// Any unit depending back on `consumer` is then reported as a cycle.
    pub fn for_consumer(consumer: &str) -> Self {
        let mut state = Self::default();
        state.enter(consumer);
        state
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        self.resolved_set.contains(name)
    }

    pub fn is_visiting(&self, name: &str) -> bool {
        self.visiting_set.contains(name)
    }

    /// Order resolved so far
    pub fn resolved(&self) -> &[String] {
        &self.resolved
    }

    pub fn into_order(self) -> Vec<String> {
        self.resolved
    }

    fn enter(&mut self, name: &str) {
        self.visiting.push(name.to_string());
        self.visiting_set.insert(name.to_string());
    }

    fn finish(&mut self) {
        if let Some(name) = self.visiting.pop() {
            self.visiting_set.remove(&name);
            self.resolved_set.insert(name.clone());
            self.resolved.push(name);
        }
    }

    /// The whole current path plus the unit that closed the loop
    fn cycle_through(&self, name: &str) -> Vec<String> {
        let mut cycle = self.visiting.clone();
        cycle.push(name.to_string());
        cycle
    }
}

/// Dependency resolver over a registry snapshot
///
/// Holds no state between requests; the registry may grow in between.
pub struct Resolver<'a> {
    registry: &'a Registry,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Build order of `name` and all its transitive dependencies, `name` last
    pub fn resolve(&self, name: &str) -> Result<Vec<String>, UnitError> {
        let mut state = ResolutionState::new();
        self.visit(name, None, &mut state)?;
        debug!("Resolved {}: {:?}", name, state.resolved());
        Ok(state.into_order())
    }

    /// Build order of the dependencies of `name`, without `name` itself
    pub fn resolve_dependencies(&self, name: &str) -> Result<Vec<String>, UnitError> {
        let mut order = self.resolve(name)?;
        order.retain(|n| n != name);
        Ok(order)
    }

    /// One build order covering several units and their closures
    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<String>, UnitError> {
        let mut state = ResolutionState::new();
        for name in names {
            self.visit(name.as_ref(), None, &mut state)?;
        }
        debug!("Resolved {} units: {:?}", names.len(), state.resolved());
        Ok(state.into_order())
    }

    /// Visit one unit, extending `state`
    ///
    /// On error the state is left mid-walk and must be discarded.
    pub fn visit(
        &self,
        name: &str,
        required_by: Option<&str>,
        state: &mut ResolutionState,
    ) -> Result<(), UnitError> {
        if state.is_resolved(name) {
            return Ok(());
        }

        // Each frame is a unit on the path and the index of its next dependency
        let mut frames: Vec<(&'a LibraryUnit, usize)> = Vec::new();
        frames.push((self.enter(name, required_by, state)?, 0));

        while let Some(frame) = frames.last_mut() {
            let unit: &'a LibraryUnit = frame.0;
            let Some(dep) = unit.dependencies.get(frame.1) else {
                frames.pop();
                state.finish();
                continue;
            };
            frame.1 += 1;

            if state.is_resolved(dep) {
                continue;
            }
            frames.push((self.enter(dep, Some(unit.name.as_str()), state)?, 0));
        }

        Ok(())
    }

    fn enter(
        &self,
        name: &str,
        required_by: Option<&str>,
        state: &mut ResolutionState,
    ) -> Result<&'a LibraryUnit, UnitError> {
        if state.is_visiting(name) {
            let cycle = state.cycle_through(name);
            debug!("Cycle detected: {:?}", cycle);
            return Err(UnitError::CyclicDependency(cycle));
        }
        state.enter(name);

        self.registry
            .get(name)
            .ok_or_else(|| UnitError::UnknownDependency {
                name: name.to_string(),
                required_by: required_by.map(str::to_string),
            })
    }
}
