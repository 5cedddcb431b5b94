//! Lockfile model: durable snapshot of a resolved dependency graph.
//!
//! The document lives at the project root (`wharf-lock.yaml`) with a cached
//! copy per virtual store directory. Reads migrate the legacy single-importer
//! shape and gate on `lockfileVersion`; writes are atomic and preserve the
//! reconciliation insertion order to keep diffs small.

pub mod read;
pub mod sync;
pub mod types;
pub mod write;

pub use read::{read_current_lockfile, read_wanted_lockfile, ReadOptions};
pub use sync::{reconcile, ChangeSet, ReconcileOptions};
pub use types::{
    create_lockfile_object, ImporterSnapshot, Lockfile, PackageSnapshot, ResolutionSnapshot,
    CURRENT_LOCKFILE, LOCKFILE_VERSION, WANTED_LOCKFILE,
};
pub use write::{write_current_lockfile, write_wanted_lockfile};
