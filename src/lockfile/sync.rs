//! Reconciliation of a freshly resolved graph against the existing lockfile.

use crate::lockfile::types::{
    ImporterSnapshot, Lockfile, PackageSnapshot, ResolutionSnapshot, LOCKFILE_VERSION,
};
use crate::resolver::graph::{DependencyGraph, ResolutionKind};
use indexmap::IndexMap;
use wharf_core::{Importer, WharfError, WharfResult};

/// What reconciliation found: package identities that appeared or vanished,
/// and importers whose recorded snapshot differs. Drives the linker's
/// filesystem work and write-avoidance on an unchanged lockfile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Package keys new to the resolved graph
    pub added: Vec<String>,
    /// Package keys present in the existing lockfile but no longer resolved
    pub removed: Vec<String>,
    /// Importer ids whose snapshot changed
    pub changed_importers: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed_importers.is_empty()
    }
}

/// Reconciliation options
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Fail instead of producing a lockfile that differs from the existing one
    pub frozen: bool,
    /// Format version stamped on the reconciled lockfile
    pub lockfile_version: f64,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            frozen: false,
            lockfile_version: LOCKFILE_VERSION,
        }
    }
}

/// Reconcile the existing lockfile with a freshly resolved graph.
///
/// Entries whose resolved identity is unchanged keep their resolution
/// metadata (integrity hashes in particular) without recomputation, while
/// their dependency maps are rebuilt from the graph so they always point at
/// keys the reconciled document actually contains. New identities get fresh
/// entries; vanished ones are dropped. In frozen mode a non-empty change set
/// is a hard failure and nothing is produced.
pub fn reconcile(
    existing: Option<&Lockfile>,
    graph: &DependencyGraph,
    importers: &[Importer],
    opts: &ReconcileOptions,
) -> WharfResult<(Lockfile, ChangeSet)> {
    let mut lockfile = Lockfile {
        lockfile_version: opts.lockfile_version,
        importers: IndexMap::new(),
        packages: IndexMap::new(),
    };
    let mut change_set = ChangeSet::default();

    for importer in importers {
        let snapshot = importer_snapshot(graph, importer);
        let existing_snapshot = existing.and_then(|l| l.importers.get(&importer.id));
        if existing_snapshot != Some(&snapshot) {
            change_set.changed_importers.push(importer.id.clone());
        }
        lockfile.importers.insert(importer.id.clone(), snapshot);
    }

    for (id, node) in graph.nodes() {
        let key = node.pkg.key();
        let reused = existing.and_then(|l| l.packages.get(&key));
        match reused {
            Some(existing_snapshot) => {
                // Keep the persisted resolution metadata, but rebuild the
                // dependency maps: a forced update can bump a transitive
                // dependency while this entry's own version stays put.
                let mut snapshot = package_snapshot(graph, id);
                snapshot.resolution = existing_snapshot.resolution.clone();
                lockfile.packages.insert(key, snapshot);
            }
            None => {
                change_set.added.push(key.clone());
                lockfile.packages.insert(key, package_snapshot(graph, id));
            }
        }
    }

    if let Some(existing) = existing {
        for key in existing.packages.keys() {
            if !lockfile.packages.contains_key(key) {
                change_set.removed.push(key.clone());
            }
        }
    }

    if opts.frozen && !change_set.is_empty() {
        return Err(WharfError::FrozenLockfile {
            added: change_set.added.len(),
            removed: change_set.removed.len(),
            changed: change_set.changed_importers.len(),
        });
    }

    Ok((lockfile, change_set))
}

fn importer_snapshot(graph: &DependencyGraph, importer: &Importer) -> ImporterSnapshot {
    let mut snapshot = ImporterSnapshot::default();
    for (_, name, range) in importer.manifest.all_dependencies() {
        snapshot.specifiers.insert(name.to_string(), range.to_string());
    }
    for edge in graph.importer_edges(&importer.id) {
        let Some(field) = edge.field else { continue };
        let node = graph.node(edge.to);
        snapshot
            .field_mut(field)
            .insert(edge.name.clone(), dependency_value(&edge.name, node));
    }
    snapshot
}

fn package_snapshot(
    graph: &DependencyGraph,
    id: crate::resolver::graph::NodeId,
) -> PackageSnapshot {
    let node = graph.node(id);
    let mut snapshot = PackageSnapshot {
        resolution: ResolutionSnapshot {
            integrity: node.integrity.clone(),
            tarball: match &node.pkg.kind {
                ResolutionKind::Tarball { url } => Some(url.clone()),
                _ => None,
            },
            path: match &node.pkg.kind {
                ResolutionKind::Local { path } => Some(path.clone()),
                _ => None,
            },
        },
        dependencies: IndexMap::new(),
        peer_dependencies: node.peer_dependencies.clone(),
    };
    for edge in graph.dependencies_of(id) {
        let target = graph.node(edge.to);
        snapshot
            .dependencies
            .insert(edge.name.clone(), dependency_value(&edge.name, target));
    }
    snapshot
}

/// The value recorded for a resolved dependency: the exact version, or an
/// `npm:real-name@version` marker when the visible name is an alias.
fn dependency_value(visible_name: &str, node: &crate::resolver::graph::PackageNode) -> String {
    if node.pkg.name != visible_name {
        format!("npm:{}@{}", node.pkg.name, node.pkg.version)
    } else {
        node.pkg.version.to_string()
    }
}
