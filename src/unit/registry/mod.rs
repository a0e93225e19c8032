//! Unit registry and discovery
//!
//! Handles unit registration, manifest discovery, scope filtering and
//! dependency resolution.

pub mod dependencies;
pub mod discovery;
pub mod manifest;
pub mod scope;
pub mod store;

pub use dependencies::{ResolutionState, Resolver};
pub use discovery::{DiscoveredUnit, UnitDiscovery};
pub use manifest::{RemoteRef, UnitManifest, MANIFEST_FILE};
pub use scope::{is_within, ScopeFilter};
pub use store::{canonical_source_root, LibraryUnit, RegistrationPolicy, Registry, SharedRegistry};
