//! The install pipeline: resolve, reconcile, fetch, link, persist.
//!
//! Each phase hands a value to the next; nothing is written to disk until
//! reconciliation has succeeded, so a frozen-lockfile violation or a
//! resolution failure leaves the project untouched.

use crate::config::InstallConfig;
use crate::di::{MetadataSource, PackageFetcher};
use crate::linker::Linker;
use crate::lockfile::{
    read_wanted_lockfile, reconcile, write_current_lockfile, write_wanted_lockfile, ChangeSet,
    ReadOptions, ReconcileOptions, CURRENT_LOCKFILE, LOCKFILE_VERSION,
};
use crate::resolver::graph::DependencyGraph;
use crate::resolver::{LockedVersions, ResolveOptions, Resolver};
use crate::store::{ContentStore, StoreEntry};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use wharf_core::{Importer, WharfResult};

/// What an install run did
#[derive(Debug)]
pub struct InstallReport {
    pub change_set: ChangeSet,
    /// Non-fatal findings (unmet peers, skipped optional dependencies)
    pub warnings: Vec<String>,
    /// Packages fetched into the store this run
    pub packages_fetched: usize,
}

/// Orchestrates a full install for a set of importers
pub struct Installer {
    config: InstallConfig,
    metadata: Arc<dyn MetadataSource>,
    fetcher: Arc<dyn PackageFetcher>,
    store: Arc<ContentStore>,
}

impl Installer {
    pub fn new(
        config: InstallConfig,
        metadata: Arc<dyn MetadataSource>,
        fetcher: Arc<dyn PackageFetcher>,
    ) -> WharfResult<Self> {
        let store = Arc::new(ContentStore::new(config.store_dir()?)?);
        Ok(Self {
            config,
            metadata,
            fetcher,
            store,
        })
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Run the full pipeline for the given importers.
    pub async fn install(&self, importers: &[Importer]) -> WharfResult<InstallReport> {
        let existing = read_wanted_lockfile(
            &self.config.root,
            &ReadOptions {
                wanted_version: Some(LOCKFILE_VERSION),
                ignore_incompatible: self.config.ignore_incompatible_lockfile,
            },
        )?;

        let locked = match (&existing, self.config.force_update) {
            (Some(lockfile), false) => LockedVersions::from_lockfile(lockfile),
            _ => LockedVersions::new(),
        };

        let resolver = Resolver::with_options(
            Arc::clone(&self.metadata),
            ResolveOptions {
                force_update: self.config.force_update,
                max_concurrent: self.config.max_concurrent_fetches,
            },
        );
        let graph = resolver.resolve(importers, &locked).await?;

        let (lockfile, change_set) = reconcile(
            existing.as_ref(),
            &graph,
            importers,
            &ReconcileOptions {
                frozen: self.config.frozen_lockfile,
                lockfile_version: LOCKFILE_VERSION,
            },
        )?;

        let (entries, packages_fetched) = self.ensure_store_entries(&graph).await?;

        let linker = Linker::new(self.config.virtual_store_dir(), self.config.hoisted);
        let mut modules_dirs = Vec::with_capacity(importers.len());
        for importer in importers {
            let modules_dir = self.config.modules_dir_for(&importer.id);
            linker.link_importer(&modules_dir, &graph, &importer.id, &entries)?;
            modules_dirs.push(modules_dir);
        }
        linker.remove_stale(&modules_dirs, &change_set.removed)?;

        let virtual_store_dir = self.config.virtual_store_dir();
        if !change_set.is_empty() || existing.is_none() {
            write_wanted_lockfile(&self.config.root, &lockfile)?;
            write_current_lockfile(&virtual_store_dir, &lockfile)?;
        } else if !virtual_store_dir.join(CURRENT_LOCKFILE).is_file() {
            write_current_lockfile(&virtual_store_dir, &lockfile)?;
        }

        tracing::debug!(
            added = change_set.added.len(),
            removed = change_set.removed.len(),
            fetched = packages_fetched,
            "install finished"
        );

        Ok(InstallReport {
            change_set,
            warnings: graph.warnings.clone(),
            packages_fetched,
        })
    }

    /// Materialize a store entry for every node, bounded-concurrently.
    async fn ensure_store_entries(
        &self,
        graph: &DependencyGraph,
    ) -> WharfResult<(HashMap<String, StoreEntry>, usize)> {
        let mut entries = HashMap::new();
        let mut fetched = 0usize;
        let mut join_set: JoinSet<WharfResult<(String, bool, StoreEntry)>> = JoinSet::new();

        for (_, node) in graph.nodes() {
            while join_set.len() >= self.config.max_concurrent_fetches {
                if let Some(result) = join_set.join_next().await {
                    collect_entry(result, &mut entries, &mut fetched)?;
                }
            }
            let store = Arc::clone(&self.store);
            let fetcher = Arc::clone(&self.fetcher);
            let pkg = node.pkg.clone();
            let integrity = node.integrity.clone();
            join_set.spawn(async move {
                let key = pkg.key();
                let content_key = ContentStore::content_key(&pkg, integrity.as_deref());
                let was_cached = store.contains(&content_key);
                let entry = store
                    .ensure(&pkg, integrity.as_deref(), fetcher.as_ref())
                    .await?;
                Ok((key, !was_cached, entry))
            });
        }

        while let Some(result) = join_set.join_next().await {
            collect_entry(result, &mut entries, &mut fetched)?;
        }

        Ok((entries, fetched))
    }
}

fn collect_entry(
    result: Result<WharfResult<(String, bool, StoreEntry)>, tokio::task::JoinError>,
    entries: &mut HashMap<String, StoreEntry>,
    fetched: &mut usize,
) -> WharfResult<()> {
    let (key, was_fetched, entry) =
        result.map_err(|e| wharf_core::WharfError::Store(format!("fetch task failed: {}", e)))??;
    if was_fetched {
        *fetched += 1;
    }
    entries.insert(key, entry);
    Ok(())
}
