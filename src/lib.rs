//! Modlink - library-unit registry and build-ordering engine
//!
//! This crate keeps the catalog of independently compiled library units in a
//! modular ecosystem and answers the questions a consumer (an application or
//! another library) asks at configuration time:
//!
//! 1. Which registered units are in scope for me? ([`unit::registry::ScopeFilter`])
//! 2. In which order must they be built and linked? ([`unit::registry::Resolver`])
//! 3. Which interface search paths and link inputs does that give me?
//!    ([`unit::assembler::LinkAssembler`])
//!
//! ## Design Principles
//!
//! 1. **No hidden global state**: the [`Registry`] is an owned value passed by
//!    reference; hosts that need sharing wrap it in [`SharedRegistry`]
//! 2. **Identity by name**: one unit per name, no version solving
//! 3. **Fail loudly on contradictions**: cycles, unknown names and conflicting
//!    registrations abort; units that are merely not built yet are excluded
//! 4. **Collaborators at the edges**: compiling and fetching are traits
//!    ([`UnitCompiler`], [`unit::fetch::Fetcher`])

pub mod config;
pub mod unit;
pub mod utils;

// Re-export config module
pub use config::*;

pub use unit::artifact::{ArtifactLayout, UnitArtifacts};
pub use unit::assembler::{LinkAssembler, LinkPlan};
pub use unit::consumer::{BuildPlan, Builder, Consumer};
pub use unit::registry::{
    LibraryUnit, RegistrationPolicy, Registry, Resolver, ScopeFilter, SharedRegistry,
};
pub use unit::traits::{CompileRequest, UnitCompiler, UnitError};
