//! Arena-based dependency graph.
//!
//! Nodes live in a flat table indexed by `NodeId`; edges are explicit
//! `(source, target)` pairs carrying the requested range. Cyclic and peer
//! relationships are expressible without ownership cycles.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use wharf_core::{parse_range, DependencyField, Version, WharfError, WharfResult};

/// How a package was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionKind {
    /// A registry version
    Registry,
    /// A direct archive URL
    Tarball { url: String },
    /// A local path
    Local { path: String },
    /// An aliased registry package; the visible name differs from this one
    Alias { alias: String },
}

/// Identity of a resolvable unit. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub name: String,
    pub version: Version,
    pub kind: ResolutionKind,
}

impl PackageRef {
    pub fn registry(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            kind: ResolutionKind::Registry,
        }
    }

    /// The stable identity key, `name@version`
    pub fn key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

pub type NodeId = usize;

/// Node in the dependency graph
#[derive(Debug, Clone)]
pub struct PackageNode {
    pub pkg: PackageRef,
    /// Expected content integrity, carried into the store on fetch
    pub integrity: Option<String>,
    /// Peer ranges this package declares (matched, not resolved)
    pub peer_dependencies: IndexMap<String, String>,
}

/// Where an edge originates: a project root or another node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeSource {
    Importer(String),
    Node(NodeId),
}

/// A directed dependency edge `(consumer -> dependency, requested range)`
#[derive(Debug, Clone)]
pub struct Edge {
    pub from: EdgeSource,
    pub to: NodeId,
    /// The name the consumer sees (differs from the target's name for aliases)
    pub name: String,
    pub range: String,
    /// The manifest grouping this edge came from (importer edges only)
    pub field: Option<DependencyField>,
}

/// Directed dependency graph of resolved package nodes
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<PackageNode>,
    index: HashMap<String, NodeId>,
    by_name: HashMap<String, Vec<NodeId>>,
    edges: Vec<Edge>,
    /// Non-fatal findings (unmet peer dependencies)
    pub warnings: Vec<String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node for a resolved identity, or return the existing node if
    /// the same identity is already present.
    pub fn add_node(
        &mut self,
        pkg: PackageRef,
        integrity: Option<String>,
        peer_dependencies: IndexMap<String, String>,
    ) -> NodeId {
        let key = pkg.key();
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.nodes.len();
        self.by_name.entry(pkg.name.clone()).or_default().push(id);
        self.index.insert(key, id);
        self.nodes.push(PackageNode {
            pkg,
            integrity,
            peer_dependencies,
        });
        id
    }

    /// Add an edge, enforcing that the target version satisfies the range.
    pub fn add_edge(
        &mut self,
        from: EdgeSource,
        to: NodeId,
        name: impl Into<String>,
        range: impl Into<String>,
        field: Option<DependencyField>,
    ) -> WharfResult<()> {
        let range = range.into();
        let target = self
            .nodes
            .get(to)
            .ok_or_else(|| WharfError::Package(format!("No node with id {} in graph", to)))?;
        let constraint = parse_range(&range)?;
        if !target.pkg.version.satisfies(&constraint) {
            return Err(WharfError::Package(format!(
                "Edge range '{}' is not satisfied by {}",
                range, target.pkg
            )));
        }
        self.edges.push(Edge {
            from,
            to,
            name: name.into(),
            range,
            field,
        });
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> &PackageNode {
        &self.nodes[id]
    }

    pub fn node_by_key(&self, key: &str) -> Option<(NodeId, &PackageNode)> {
        self.index.get(key).map(|&id| (id, &self.nodes[id]))
    }

    /// Every node id carrying the given package name
    pub fn nodes_named(&self, name: &str) -> &[NodeId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &PackageNode)> {
        self.nodes.iter().enumerate()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether an edge from `from` with the given visible name exists
    pub fn has_edge(&self, from: &EdgeSource, name: &str) -> bool {
        self.edges.iter().any(|e| &e.from == from && e.name == name)
    }

    /// Outgoing dependency edges of one node, in insertion order
    pub fn dependencies_of(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges
            .iter()
            .filter(move |e| e.from == EdgeSource::Node(id))
    }

    /// Direct-dependency edges of an importer, in insertion order
    pub fn importer_edges<'a>(&'a self, importer_id: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| match &e.from {
            EdgeSource::Importer(id) => id == importer_id,
            EdgeSource::Node(_) => false,
        })
    }

    /// All node ids reachable from an importer, breadth-first, deduplicated
    pub fn reachable_from(&self, importer_id: &str) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<NodeId> = self
            .importer_edges(importer_id)
            .map(|e| e.to)
            .collect();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            for edge in self.dependencies_of(id) {
                queue.push_back(edge.to);
            }
        }
        order
    }

    /// All resolved identity keys, in node insertion order
    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.nodes.iter().map(|n| n.pkg.key())
    }
}
