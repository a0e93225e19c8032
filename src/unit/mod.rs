//! Library-unit system
//!
//! Registration, discovery, scope filtering, dependency resolution and
//! search-path/link assembly for independently compiled library units.
//!
//! ## Flow
//!
//! - A unit registers itself (directly or through a discovered `unit.toml`)
//! - A consumer filters the registry down to the units visible from its module roots
//! - The resolver orders the transitive closure, dependencies first
//! - The assembler turns that order into interface search paths and link inputs
//! - The compiler collaborator consumes the result

pub mod artifact;
pub mod assembler;
pub mod consumer;
pub mod fetch;
pub mod registry;
pub mod traits;
pub mod validation;

pub use traits::{CompileRequest, UnitCompiler, UnitError};
