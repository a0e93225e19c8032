//! Unit validation framework
//!
//! Provides manifest validation: naming, dependency declarations and
//! remote references.

pub mod manifest_validator;

pub use manifest_validator::{ManifestValidator, ValidationResult};
