//! Project manifest types.

pub mod manifest;

pub use manifest::{DependencyField, Importer, ProjectManifest};
