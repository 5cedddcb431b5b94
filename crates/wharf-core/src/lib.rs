//! Core types for Wharf.
//!
//! This crate holds the pieces shared by every Wharf subsystem: the error
//! taxonomy, the version/range model, project manifest types, and path
//! helpers. It deliberately carries no resolution, store, or linking logic.

pub mod core;
pub mod package;

pub use crate::core::error::{WharfError, WharfResult};
pub use crate::core::version::{parse_constraint, parse_range, Version, VersionConstraint};
pub use crate::package::manifest::{DependencyField, Importer, ProjectManifest};
