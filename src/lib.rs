//! Wharf: content-addressed package installation.
//!
//! This crate provides the main Wharf library, re-exporting core
//! functionality from `wharf-core` and organizing the install pipeline:
//! resolution, lockfile reconciliation, the shared content store and the
//! module-tree linker.

pub use wharf_core::{
    parse_constraint, parse_range, DependencyField, Importer, ProjectManifest, Version,
    VersionConstraint, WharfError, WharfResult,
};

/// Core module re-exported for convenience.
pub mod core {
    pub use wharf_core::core::*;

    /// Path conventions re-exported from wharf-core.
    pub mod path {
        pub use wharf_core::core::path::*;
    }
}

/// Install configuration.
pub mod config;

/// Dependency injection infrastructure.
pub mod di;

/// The install pipeline orchestrator.
pub mod install;

/// Module-tree linking.
pub mod linker;

/// Lockfile model, migration and reconciliation.
pub mod lockfile;

/// Registry client.
pub mod registry;

/// Dependency resolution.
pub mod resolver;

/// The shared content-addressable store.
pub mod store;
