//! Dependency resolution.
//!
//! Turns declared ranges into a [`DependencyGraph`](graph::DependencyGraph):
//! breadth-first over the transitive closure, preferring currently-locked
//! versions when they still satisfy, deduplicating onto shared nodes where a
//! single concrete version satisfies every requesting range, and matching
//! peer ranges against the consumer's ancestor chain.

pub mod graph;

use crate::di::traits::{MetadataSource, PackageMetadata, VersionMetadata};
use crate::lockfile::types::Lockfile;
use graph::{DependencyGraph, EdgeSource, NodeId, PackageRef, ResolutionKind};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use wharf_core::{
    parse_range, DependencyField, Importer, Version, VersionConstraint, WharfError, WharfResult,
};

/// Versions pinned by an existing lockfile, used as stability preferences:
/// a locked version that still satisfies the requested range wins over a
/// newer candidate.
#[derive(Debug, Clone, Default)]
pub struct LockedVersions {
    by_name: HashMap<String, Vec<Version>>,
}

impl LockedVersions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the locked versions recorded in a lockfile's packages section
    pub fn from_lockfile(lockfile: &Lockfile) -> Self {
        let mut locked = Self::new();
        for key in lockfile.packages.keys() {
            if let Some((name, version)) = split_package_key(key) {
                if let Ok(version) = Version::parse(version) {
                    locked.insert(name, version);
                }
            }
        }
        locked
    }

    /// Collect the resolved versions of an existing graph
    pub fn from_graph(graph: &DependencyGraph) -> Self {
        let mut locked = Self::new();
        for (_, node) in graph.nodes() {
            locked.insert(&node.pkg.name, node.pkg.version.clone());
        }
        locked
    }

    pub fn insert(&mut self, name: &str, version: Version) {
        self.by_name.entry(name.to_string()).or_default().push(version);
    }

    /// The highest locked version of `name` satisfying the constraint
    fn best_matching(&self, name: &str, constraint: &VersionConstraint) -> Option<&Version> {
        self.by_name
            .get(name)?
            .iter()
            .filter(|v| v.satisfies(constraint))
            .max()
    }
}

/// Split a `name@version` identity key (tolerates scoped `@scope/name`)
pub fn split_package_key(key: &str) -> Option<(&str, &str)> {
    let at = key.rfind('@')?;
    if at == 0 {
        return None;
    }
    Some((&key[..at], &key[at + 1..]))
}

/// Resolution options
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Ignore locked preferences and always pick the highest satisfying version
    pub force_update: bool,
    /// Concurrency bound for metadata prefetch
    pub max_concurrent: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            force_update: false,
            max_concurrent: 16,
        }
    }
}

/// Resolves declared ranges into a dependency graph
pub struct Resolver {
    metadata: Arc<dyn MetadataSource>,
    opts: ResolveOptions,
}

/// One pending range to resolve
struct WorkItem {
    source: EdgeSource,
    importer_id: String,
    /// Consumer chain, nearest ancestor last (peer matching scope)
    ancestors: Vec<NodeId>,
    /// The name the consumer sees
    name: String,
    /// The registry name (differs from `name` when aliased)
    real_name: String,
    range: String,
    field: Option<DependencyField>,
    optional: bool,
}

impl Resolver {
    pub fn new(metadata: Arc<dyn MetadataSource>) -> Self {
        Self::with_options(metadata, ResolveOptions::default())
    }

    pub fn with_options(metadata: Arc<dyn MetadataSource>, opts: ResolveOptions) -> Self {
        Self { metadata, opts }
    }

    /// Resolve every importer's declared ranges into a single graph.
    ///
    /// The resolver touches no filesystem state. Metadata lookups are
    /// dispatched concurrently per frontier wave, but candidate selection is
    /// decided purely by version comparison, so the resulting graph is
    /// identical regardless of response arrival order.
    pub async fn resolve(
        &self,
        importers: &[Importer],
        locked: &LockedVersions,
    ) -> WharfResult<DependencyGraph> {
        let mut graph = DependencyGraph::new();
        let mut metadata_cache: HashMap<String, PackageMetadata> = HashMap::new();
        let mut visited: HashSet<(EdgeSource, String)> = HashSet::new();
        let mut alias_targets: HashMap<String, String> = HashMap::new();

        let mut queue: Vec<WorkItem> = Vec::new();
        for importer in importers {
            for (field, name, specifier) in importer.manifest.all_dependencies() {
                queue.push(make_work_item(
                    EdgeSource::Importer(importer.id.clone()),
                    &importer.id,
                    Vec::new(),
                    name,
                    specifier,
                    Some(field),
                    field == DependencyField::OptionalDependencies,
                ));
            }
        }

        while !queue.is_empty() {
            self.prefetch_metadata(&queue, &mut metadata_cache).await?;

            let mut next_queue: Vec<WorkItem> = Vec::new();
            for item in queue {
                if !visited.insert((item.source.clone(), item.name.clone())) {
                    continue;
                }

                if item.name != item.real_name {
                    check_alias(&mut alias_targets, &item.name, &item.real_name)?;
                }

                let constraint = parse_range(&item.range)?;
                let Some(meta) = metadata_cache.get(&item.real_name) else {
                    // Prefetch only tolerates a missing document when every
                    // requester is optional.
                    graph.warnings.push(format!(
                        "Skipping optional dependency {}@{}: no metadata available",
                        item.name, item.range
                    ));
                    continue;
                };

                let selected = self.select_version(&graph, locked, meta, &item, &constraint);
                let node_id = match selected {
                    Selection::Existing(id) => id,
                    Selection::New(version_meta) => {
                        let version_meta = version_meta.clone();
                        let id = self.add_resolved_node(&mut graph, &item, &version_meta);
                        self.match_peers(&mut graph, &item, id);
                        for (dep_name, dep_range) in &version_meta.dependencies {
                            next_queue.push(make_work_item(
                                EdgeSource::Node(id),
                                &item.importer_id,
                                chain(&item.ancestors, id),
                                dep_name,
                                dep_range,
                                None,
                                false,
                            ));
                        }
                        for (dep_name, dep_range) in &version_meta.optional_dependencies {
                            next_queue.push(make_work_item(
                                EdgeSource::Node(id),
                                &item.importer_id,
                                chain(&item.ancestors, id),
                                dep_name,
                                dep_range,
                                None,
                                true,
                            ));
                        }
                        id
                    }
                    Selection::None => {
                        if item.optional {
                            graph.warnings.push(format!(
                                "Skipping optional dependency {}@{}: no satisfying version",
                                item.name, item.range
                            ));
                            continue;
                        }
                        return Err(WharfError::Resolution {
                            importer: item.importer_id,
                            package: item.name,
                            range: item.range,
                        });
                    }
                };

                graph.add_edge(
                    item.source.clone(),
                    node_id,
                    item.name.clone(),
                    item.range.clone(),
                    item.field,
                )?;
            }
            queue = next_queue;
        }

        Ok(graph)
    }

    /// Fetch metadata documents for every name in the frontier that is not
    /// cached yet, concurrently but bounded. A lookup failure aborts the
    /// resolve unless every requester of that name is optional, in which
    /// case the name is simply left out of the cache.
    async fn prefetch_metadata(
        &self,
        queue: &[WorkItem],
        cache: &mut HashMap<String, PackageMetadata>,
    ) -> WharfResult<()> {
        let mut pending: Vec<(String, bool)> = Vec::new();
        for item in queue {
            if cache.contains_key(&item.real_name) {
                continue;
            }
            match pending.iter_mut().find(|(name, _)| name == &item.real_name) {
                Some((_, required)) => *required |= !item.optional,
                None => pending.push((item.real_name.clone(), !item.optional)),
            }
        }

        let mut join_set = JoinSet::new();
        let mut collect =
            |cache: &mut HashMap<String, PackageMetadata>,
             result: Result<(String, bool, WharfResult<PackageMetadata>), tokio::task::JoinError>|
             -> WharfResult<()> {
                let (name, required, meta) = result
                    .map_err(|e| WharfError::Package(format!("Metadata task panicked: {}", e)))?;
                match meta {
                    Ok(meta) => {
                        cache.insert(name, meta);
                    }
                    Err(e) if required => return Err(e),
                    Err(e) => {
                        tracing::debug!("no metadata for optional dependency {}: {}", name, e);
                    }
                }
                Ok(())
            };

        for (name, required) in pending {
            if join_set.len() >= self.opts.max_concurrent {
                if let Some(result) = join_set.join_next().await {
                    collect(cache, result)?;
                }
            }
            let metadata = Arc::clone(&self.metadata);
            join_set.spawn(async move {
                let meta = metadata.package_metadata(&name).await;
                (name, required, meta)
            });
        }
        while let Some(result) = join_set.join_next().await {
            collect(cache, result)?;
        }
        Ok(())
    }

    /// Pick the version for a work item: locked preference first, then an
    /// already-resolved node whose version satisfies (dedup), then the
    /// highest satisfying candidate.
    fn select_version<'m>(
        &self,
        graph: &DependencyGraph,
        locked: &LockedVersions,
        meta: &'m PackageMetadata,
        item: &WorkItem,
        constraint: &VersionConstraint,
    ) -> Selection<'m> {
        if !self.opts.force_update {
            if let Some(version) = locked.best_matching(&item.real_name, constraint) {
                if let Some((id, _)) = graph.node_by_key(&format!("{}@{}", item.real_name, version))
                {
                    return Selection::Existing(id);
                }
                if let Some(version_meta) = meta.version(version) {
                    return Selection::New(version_meta);
                }
                // Locked version no longer published; fall through.
            }
        }

        let reusable = graph
            .nodes_named(&item.real_name)
            .iter()
            .filter(|&&id| graph.node(id).pkg.version.satisfies(constraint))
            .max_by(|&&a, &&b| graph.node(a).pkg.version.cmp(&graph.node(b).pkg.version));
        if let Some(&id) = reusable {
            return Selection::Existing(id);
        }

        match meta.highest_matching(constraint) {
            Some(version_meta) => Selection::New(version_meta),
            None => Selection::None,
        }
    }

    fn add_resolved_node(
        &self,
        graph: &mut DependencyGraph,
        item: &WorkItem,
        version_meta: &VersionMetadata,
    ) -> NodeId {
        let kind = if item.name != item.real_name {
            ResolutionKind::Alias {
                alias: item.name.clone(),
            }
        } else if let Some(url) = &version_meta.tarball {
            ResolutionKind::Tarball { url: url.clone() }
        } else {
            ResolutionKind::Registry
        };
        graph.add_node(
            PackageRef {
                name: item.real_name.clone(),
                version: version_meta.version.clone(),
                kind,
            },
            version_meta.integrity.clone(),
            version_meta.peer_dependencies.clone(),
        )
    }

    /// Match a freshly resolved node's peer ranges against its ancestor
    /// chain. Unmet peers become warnings, never hard failures.
    fn match_peers(&self, graph: &mut DependencyGraph, item: &WorkItem, id: NodeId) {
        let peers: Vec<(String, String)> = graph
            .node(id)
            .peer_dependencies
            .iter()
            .map(|(n, r)| (n.clone(), r.clone()))
            .collect();

        for (peer_name, peer_range) in peers {
            let found = item
                .ancestors
                .iter()
                .rev()
                .copied()
                .find(|&a| graph.node(a).pkg.name == peer_name)
                .or_else(|| {
                    graph
                        .importer_edges(&item.importer_id)
                        .find(|e| e.name == peer_name)
                        .map(|e| e.to)
                });

            let Some(found_id) = found else {
                graph.warnings.push(format!(
                    "{} requires a peer of {}@{} but none was installed",
                    graph.node(id).pkg,
                    peer_name,
                    peer_range
                ));
                continue;
            };

            let satisfied = parse_range(&peer_range)
                .map(|c| graph.node(found_id).pkg.version.satisfies(&c))
                .unwrap_or(false);
            if satisfied {
                // The range was just checked, so the edge invariant holds.
                let _ = graph.add_edge(
                    EdgeSource::Node(id),
                    found_id,
                    peer_name,
                    peer_range,
                    None,
                );
            } else {
                let found_version = graph.node(found_id).pkg.version.clone();
                graph.warnings.push(format!(
                    "{} requires a peer of {}@{} but {} was installed",
                    graph.node(id).pkg,
                    peer_name,
                    peer_range,
                    found_version
                ));
            }
        }
    }
}

enum Selection<'m> {
    Existing(NodeId),
    New(&'m VersionMetadata),
    None,
}

fn chain(ancestors: &[NodeId], id: NodeId) -> Vec<NodeId> {
    let mut chain = ancestors.to_vec();
    chain.push(id);
    chain
}

/// Build a work item, decoding `npm:real-name@range` alias specifiers
fn make_work_item(
    source: EdgeSource,
    importer_id: &str,
    ancestors: Vec<NodeId>,
    name: &str,
    specifier: &str,
    field: Option<DependencyField>,
    optional: bool,
) -> WorkItem {
    let (real_name, range) = match split_alias(specifier) {
        Some((real, range)) => (real.to_string(), range.to_string()),
        None => (name.to_string(), specifier.to_string()),
    };
    WorkItem {
        source,
        importer_id: importer_id.to_string(),
        ancestors,
        name: name.to_string(),
        real_name,
        range,
        field,
        optional,
    }
}

/// Decode an `npm:real-name@range` alias specifier
fn split_alias(specifier: &str) -> Option<(&str, &str)> {
    let rest = specifier.strip_prefix("npm:")?;
    match split_package_key(rest) {
        Some((name, range)) => Some((name, range)),
        None => Some((rest, "*")),
    }
}

fn check_alias(
    alias_targets: &mut HashMap<String, String>,
    alias: &str,
    real_name: &str,
) -> WharfResult<()> {
    if let Some(existing) = alias_targets.get(alias) {
        if existing != real_name {
            return Err(WharfError::AliasConflict {
                alias: alias.to_string(),
                first: existing.clone(),
                second: real_name.to_string(),
            });
        }
    } else {
        alias_targets.insert(alias.to_string(), real_name.to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::mocks::MockMetadataSource;
    use crate::di::traits::VersionMetadata;
    use wharf_core::ProjectManifest;

    fn importer(deps: &[(&str, &str)]) -> Importer {
        let mut manifest = ProjectManifest::default();
        manifest.name = "root".to_string();
        for (name, range) in deps {
            manifest
                .dependencies
                .insert((*name).to_string(), (*range).to_string());
        }
        Importer::root(manifest)
    }

    fn resolver(source: MockMetadataSource) -> Resolver {
        Resolver::new(Arc::new(source))
    }

    #[tokio::test]
    async fn test_resolves_transitive_dependencies() {
        let source = MockMetadataSource::new();
        source.add_version("a", "1.0.0", &[("b", "^2.0.0")]);
        source.add_version("b", "2.1.0", &[]);

        let graph = resolver(source)
            .resolve(&[importer(&[("a", "^1.0.0")])], &LockedVersions::new())
            .await
            .unwrap();

        assert_eq!(graph.node_count(), 2);
        let keys: Vec<String> = graph.keys().collect();
        assert_eq!(keys, vec!["a@1.0.0", "b@2.1.0"]);
        assert_eq!(graph.reachable_from(".").len(), 2);
    }

    #[tokio::test]
    async fn test_metadata_requested_once_per_package() {
        let source = Arc::new(MockMetadataSource::new());
        source.add_version("a", "1.0.0", &[("shared", "^1.0.0")]);
        source.add_version("b", "1.0.0", &[("shared", "^1.0.0")]);
        source.add_version("shared", "1.4.0", &[]);

        Resolver::new(source.clone())
            .resolve(
                &[importer(&[("a", "^1.0.0"), ("b", "^1.0.0")])],
                &LockedVersions::new(),
            )
            .await
            .unwrap();

        // Two consumers of shared, one document fetched per name
        assert_eq!(source.lookup_count(), 3);
    }

    #[tokio::test]
    async fn test_overlapping_ranges_share_one_node() {
        let source = MockMetadataSource::new();
        source.add_version("a", "1.0.0", &[("shared", "^1.1.0")]);
        source.add_version("b", "1.0.0", &[("shared", "^1.0.0")]);
        source.add_version("shared", "1.0.5", &[]);
        source.add_version("shared", "1.2.0", &[]);

        let graph = resolver(source)
            .resolve(
                &[importer(&[("a", "^1.0.0"), ("b", "^1.0.0")])],
                &LockedVersions::new(),
            )
            .await
            .unwrap();

        // One concrete version (1.2.0) satisfies both ranges.
        assert_eq!(graph.nodes_named("shared").len(), 1);
        let (_, node) = graph.node_by_key("shared@1.2.0").unwrap();
        assert_eq!(node.pkg.version, Version::new(1, 2, 0));
    }

    #[tokio::test]
    async fn test_conflicting_ranges_keep_nested_nodes() {
        let source = MockMetadataSource::new();
        source.add_version("a", "1.0.0", &[("shared", "^1.0.0")]);
        source.add_version("b", "1.0.0", &[("shared", "^2.0.0")]);
        source.add_version("shared", "1.9.0", &[]);
        source.add_version("shared", "2.3.0", &[]);

        let graph = resolver(source)
            .resolve(
                &[importer(&[("a", "^1.0.0"), ("b", "^1.0.0")])],
                &LockedVersions::new(),
            )
            .await
            .unwrap();

        assert_eq!(graph.nodes_named("shared").len(), 2);
        assert!(graph.node_by_key("shared@1.9.0").is_some());
        assert!(graph.node_by_key("shared@2.3.0").is_some());
    }

    #[tokio::test]
    async fn test_prefers_locked_version_when_satisfying() {
        let source = MockMetadataSource::new();
        source.add_version("a", "1.2.0", &[]);
        source.add_version("a", "1.5.0", &[]);

        let mut locked = LockedVersions::new();
        locked.insert("a", Version::new(1, 2, 0));

        let graph = resolver(source)
            .resolve(&[importer(&[("a", "^1.0.0")])], &locked)
            .await
            .unwrap();

        assert!(graph.node_by_key("a@1.2.0").is_some());
    }

    #[tokio::test]
    async fn test_forced_update_ignores_locked_version() {
        let source = MockMetadataSource::new();
        source.add_version("a", "1.2.0", &[]);
        source.add_version("a", "1.5.0", &[]);

        let mut locked = LockedVersions::new();
        locked.insert("a", Version::new(1, 2, 0));

        let resolver = Resolver::with_options(
            Arc::new(source),
            ResolveOptions {
                force_update: true,
                ..Default::default()
            },
        );
        let graph = resolver
            .resolve(&[importer(&[("a", "^1.0.0")])], &locked)
            .await
            .unwrap();

        assert!(graph.node_by_key("a@1.5.0").is_some());
    }

    #[tokio::test]
    async fn test_locked_version_outside_range_is_ignored() {
        let source = MockMetadataSource::new();
        source.add_version("a", "2.0.0", &[]);

        let mut locked = LockedVersions::new();
        locked.insert("a", Version::new(1, 2, 0));

        let graph = resolver(source)
            .resolve(&[importer(&[("a", "^2.0.0")])], &locked)
            .await
            .unwrap();

        assert!(graph.node_by_key("a@2.0.0").is_some());
    }

    #[tokio::test]
    async fn test_no_satisfying_version_fails_with_context() {
        let source = MockMetadataSource::new();
        source.add_version("a", "1.0.0", &[]);

        let err = resolver(source)
            .resolve(&[importer(&[("a", "^3.0.0")])], &LockedVersions::new())
            .await
            .unwrap_err();

        match err {
            WharfError::Resolution {
                importer,
                package,
                range,
            } => {
                assert_eq!(importer, ".");
                assert_eq!(package, "a");
                assert_eq!(range, "^3.0.0");
            }
            other => panic!("expected Resolution error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_peer_dependency_matched_against_ancestors() {
        let source = MockMetadataSource::new();
        source.add_version("react", "17.0.2", &[]);
        let mut plugin = VersionMetadata::new(Version::parse("1.0.0").unwrap());
        plugin
            .peer_dependencies
            .insert("react".to_string(), ">=16.0.0".to_string());
        source.add("plugin", plugin);

        let graph = resolver(source)
            .resolve(
                &[importer(&[("react", "^17.0.0"), ("plugin", "^1.0.0")])],
                &LockedVersions::new(),
            )
            .await
            .unwrap();

        assert!(graph.warnings.is_empty());
        let (plugin_id, _) = graph.node_by_key("plugin@1.0.0").unwrap();
        let peer_edge: Vec<_> = graph.dependencies_of(plugin_id).collect();
        assert_eq!(peer_edge.len(), 1);
        assert_eq!(peer_edge[0].name, "react");
    }

    #[tokio::test]
    async fn test_unmet_peer_is_warning_not_failure() {
        let source = MockMetadataSource::new();
        let mut plugin = VersionMetadata::new(Version::parse("1.0.0").unwrap());
        plugin
            .peer_dependencies
            .insert("react".to_string(), ">=16.0.0".to_string());
        source.add("plugin", plugin);

        let graph = resolver(source)
            .resolve(&[importer(&[("plugin", "^1.0.0")])], &LockedVersions::new())
            .await
            .unwrap();

        assert_eq!(graph.warnings.len(), 1);
        assert!(graph.warnings[0].contains("react"));
    }

    #[tokio::test]
    async fn test_alias_specifier_resolves_real_package() {
        let source = MockMetadataSource::new();
        source.add_version("string-width", "4.2.3", &[]);

        let graph = resolver(source)
            .resolve(
                &[importer(&[("string-width-cjs", "npm:string-width@^4.2.0")])],
                &LockedVersions::new(),
            )
            .await
            .unwrap();

        let (id, node) = graph.node_by_key("string-width@4.2.3").unwrap();
        assert_eq!(
            node.pkg.kind,
            ResolutionKind::Alias {
                alias: "string-width-cjs".to_string()
            }
        );
        let edge = graph.importer_edges(".").find(|e| e.to == id).unwrap();
        assert_eq!(edge.name, "string-width-cjs");
    }

    #[tokio::test]
    async fn test_conflicting_alias_fails() {
        let source = MockMetadataSource::new();
        source.add_version("left", "1.0.0", &[("widget", "npm:real-b@^1.0.0")]);
        source.add_version("real-a", "1.0.0", &[]);
        source.add_version("real-b", "1.0.0", &[]);

        let err = resolver(source)
            .resolve(
                &[importer(&[
                    ("widget", "npm:real-a@^1.0.0"),
                    ("left", "^1.0.0"),
                ])],
                &LockedVersions::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, WharfError::AliasConflict { .. }));
    }

    #[tokio::test]
    async fn test_circular_dependencies_terminate() {
        let source = MockMetadataSource::new();
        source.add_version("a", "1.0.0", &[("b", "^1.0.0")]);
        source.add_version("b", "1.0.0", &[("a", "^1.0.0")]);

        let graph = resolver(source)
            .resolve(&[importer(&[("a", "^1.0.0")])], &LockedVersions::new())
            .await
            .unwrap();

        assert_eq!(graph.node_count(), 2);
        let (a, _) = graph.node_by_key("a@1.0.0").unwrap();
        let (b, _) = graph.node_by_key("b@1.0.0").unwrap();
        assert!(graph.dependencies_of(a).any(|e| e.to == b));
        assert!(graph.dependencies_of(b).any(|e| e.to == a));
    }

    #[tokio::test]
    async fn test_resolution_is_deterministic() {
        for _ in 0..3 {
            let source = MockMetadataSource::new();
            source.add_version("a", "1.0.0", &[("c", "^1.0.0"), ("d", "^1.0.0")]);
            source.add_version("b", "1.0.0", &[("d", "^1.0.0"), ("c", "^1.0.0")]);
            source.add_version("c", "1.1.0", &[]);
            source.add_version("d", "1.1.0", &[]);
            let importers = [importer(&[("a", "^1.0.0"), ("b", "^1.0.0")])];

            let first = resolver(source)
                .resolve(&importers, &LockedVersions::new())
                .await
                .unwrap();

            let source = MockMetadataSource::new();
            source.add_version("a", "1.0.0", &[("c", "^1.0.0"), ("d", "^1.0.0")]);
            source.add_version("b", "1.0.0", &[("d", "^1.0.0"), ("c", "^1.0.0")]);
            source.add_version("c", "1.1.0", &[]);
            source.add_version("d", "1.1.0", &[]);
            let second = resolver(source)
                .resolve(&importers, &LockedVersions::new())
                .await
                .unwrap();

            let first_keys: Vec<String> = first.keys().collect();
            let second_keys: Vec<String> = second.keys().collect();
            assert_eq!(first_keys, second_keys);
            assert_eq!(first.edges().len(), second.edges().len());
        }
    }

    #[tokio::test]
    async fn test_missing_optional_dependency_is_skipped() {
        let source = MockMetadataSource::new();
        let mut a = VersionMetadata::new(Version::parse("1.0.0").unwrap());
        a.optional_dependencies
            .insert("fsevents".to_string(), "^2.0.0".to_string());
        source.add("a", a);
        source.add_version("fsevents", "1.0.0", &[]);

        let graph = resolver(source)
            .resolve(&[importer(&[("a", "^1.0.0")])], &LockedVersions::new())
            .await
            .unwrap();

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.warnings.len(), 1);
    }
}
