//! Materializes a resolved graph as a module tree on disk.
//!
//! The default layout is isolated: every package gets a private directory
//! under the virtual store (`packages_modules/.wharf/<key>/packages_modules`)
//! holding a link to its store contents plus links to its own dependencies.
//! Project module directories then link only the direct dependencies, so a
//! package can never reach something it did not declare. The hoisted layout
//! flattens everything into the project module directory instead,
//! first-writer-wins, for tooling that expects a flat tree.

use crate::resolver::graph::{DependencyGraph, NodeId};
use crate::store::StoreEntry;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use wharf_core::core::path::ensure_dir;
use wharf_core::{WharfError, WharfResult};

/// Name of the per-package module directory inside a virtual store entry
const MODULES_DIR_NAME: &str = "packages_modules";

/// A package identity key made filesystem-safe
pub fn fs_safe_key(key: &str) -> String {
    key.replace('/', "+")
}

/// The link sites created for one importer, keyed by package identity
#[derive(Debug, Default)]
pub struct LinkedTree {
    pub sites: IndexMap<String, Vec<PathBuf>>,
}

impl LinkedTree {
    fn record(&mut self, key: &str, site: PathBuf) {
        self.sites.entry(key.to_string()).or_default().push(site);
    }

    pub fn site_count(&self) -> usize {
        self.sites.values().map(Vec::len).sum()
    }
}

/// Links store entries into module directories
pub struct Linker {
    virtual_store_dir: PathBuf,
    hoisted: bool,
}

impl Linker {
    pub fn new(virtual_store_dir: PathBuf, hoisted: bool) -> Self {
        Self {
            virtual_store_dir,
            hoisted,
        }
    }

    /// The private module directory of one package inside the virtual store
    pub fn virtual_modules_dir(&self, key: &str) -> PathBuf {
        self.virtual_store_dir
            .join(fs_safe_key(key))
            .join(MODULES_DIR_NAME)
    }

    /// Link everything reachable from one importer into its module
    /// directory.
    ///
    /// Individual link failures do not abort the pass; every node is
    /// attempted and the failures are reported together at the end.
    pub fn link_importer(
        &self,
        modules_dir: &Path,
        graph: &DependencyGraph,
        importer_id: &str,
        entries: &HashMap<String, StoreEntry>,
    ) -> WharfResult<LinkedTree> {
        ensure_dir(modules_dir)?;

        let mut tree = LinkedTree::default();
        let mut failures: Vec<String> = Vec::new();
        let mut attempted = 0usize;

        let reachable = graph.reachable_from(importer_id);

        if self.hoisted {
            // Flat layout: breadth-first order decides conflicts, so direct
            // dependencies always win over transitive ones. Sites take the
            // consuming edge's name, so an aliased package surfaces under
            // the name its consumers declared, not its real name.
            let mut visible_names: HashMap<NodeId, Vec<String>> = HashMap::new();
            for edge in graph.importer_edges(importer_id) {
                push_visible_name(&mut visible_names, edge.to, &edge.name);
            }
            for &id in &reachable {
                for edge in graph.dependencies_of(id) {
                    push_visible_name(&mut visible_names, edge.to, &edge.name);
                }
            }
            for &id in &reachable {
                let node = graph.node(id);
                let key = node.pkg.key();
                let Some(entry) = entries.get(&key) else {
                    attempted += 1;
                    failures.push(format!("{}: no store entry", key));
                    continue;
                };
                for name in visible_names.remove(&id).unwrap_or_default() {
                    attempted += 1;
                    let site = module_link_path(modules_dir, &name);
                    if site_exists(&site) {
                        continue;
                    }
                    match place_link(&entry.contents_dir(), &site) {
                        Ok(()) => tree.record(&key, site),
                        Err(e) => failures.push(format!("{}: {}", key, e)),
                    }
                }
            }
        } else {
            // Pass one: each package's private directory gets its contents
            for &id in &reachable {
                let node = graph.node(id);
                let key = node.pkg.key();
                attempted += 1;
                let Some(entry) = entries.get(&key) else {
                    failures.push(format!("{}: no store entry", key));
                    continue;
                };
                let virtual_dir = self.virtual_modules_dir(&key);
                let site = module_link_path(&virtual_dir, &node.pkg.name);
                match replace_link(&entry.contents_dir(), &site) {
                    Ok(()) => tree.record(&key, site),
                    Err(e) => failures.push(format!("{}: {}", key, e)),
                }
            }

            // Pass two: dependency links between private directories
            for &id in &reachable {
                let node = graph.node(id);
                let key = node.pkg.key();
                let virtual_dir = self.virtual_modules_dir(&key);
                for edge in graph.dependencies_of(id) {
                    let target = graph.node(edge.to);
                    let target_dir = self.virtual_modules_dir(&target.pkg.key());
                    let target_path = module_link_path(&target_dir, &target.pkg.name);
                    let site = module_link_path(&virtual_dir, &edge.name);
                    attempted += 1;
                    match replace_link(&target_path, &site) {
                        Ok(()) => tree.record(&target.pkg.key(), site),
                        Err(e) => failures.push(format!("{} -> {}: {}", key, edge.name, e)),
                    }
                }
            }

            // Pass three: the importer's direct dependencies
            for edge in graph.importer_edges(importer_id) {
                let target = graph.node(edge.to);
                let target_dir = self.virtual_modules_dir(&target.pkg.key());
                let target_path = module_link_path(&target_dir, &target.pkg.name);
                let site = module_link_path(modules_dir, &edge.name);
                attempted += 1;
                match replace_link(&target_path, &site) {
                    Ok(()) => tree.record(&target.pkg.key(), site),
                    Err(e) => failures.push(format!("{}: {}", edge.name, e)),
                }
            }
        }

        if failures.is_empty() {
            Ok(tree)
        } else {
            Err(WharfError::Link {
                failed: failures.len(),
                total: attempted,
                details: failures.join("; "),
            })
        }
    }

    /// Unlink what a set of removed package identities left behind: their
    /// virtual store directories, and any module links now dangling. Store
    /// contents are never touched here.
    pub fn remove_stale(&self, modules_dirs: &[PathBuf], removed_keys: &[String]) -> WharfResult<()> {
        for key in removed_keys {
            let dir = self.virtual_store_dir.join(fs_safe_key(key));
            if dir.symlink_metadata().is_ok() {
                tracing::debug!(key = %key, "removing virtual store entry");
                fs::remove_dir_all(&dir)?;
            }
        }
        for modules_dir in modules_dirs {
            remove_dangling_links(modules_dir)?;
        }
        Ok(())
    }
}

fn push_visible_name(names: &mut HashMap<NodeId, Vec<String>>, id: NodeId, name: &str) {
    let list = names.entry(id).or_default();
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

/// The link site for a package name inside a module directory, creating
/// the scope directory for `@scope/name` packages.
fn module_link_path(modules_dir: &Path, name: &str) -> PathBuf {
    match name.split_once('/') {
        Some((scope, rest)) => modules_dir.join(scope).join(rest),
        None => modules_dir.join(name),
    }
}

fn site_exists(site: &Path) -> bool {
    site.symlink_metadata().is_ok()
}

/// Create a link, replacing whatever currently occupies the site
fn replace_link(target: &Path, site: &Path) -> WharfResult<()> {
    if site_exists(site) {
        remove_link_or_dir(site)?;
    }
    place_link(target, site)
}

fn place_link(target: &Path, site: &Path) -> WharfResult<()> {
    if let Some(parent) = site.parent() {
        ensure_dir(parent)?;
    }
    create_dir_link(target, site)
}

/// Remove a symlink, junction, or directory at a link site
fn remove_link_or_dir(path: &Path) -> WharfResult<()> {
    #[cfg(unix)]
    {
        if let Ok(metadata) = fs::symlink_metadata(path) {
            if metadata.file_type().is_symlink() {
                fs::remove_file(path)?;
                return Ok(());
            }
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;

        if let Ok(metadata) = fs::symlink_metadata(path) {
            // FILE_ATTRIBUTE_REPARSE_POINT = 0x400
            if metadata.file_attributes() & 0x400 != 0 {
                fs::remove_dir(path)?;
                return Ok(());
            }
        }
    }

    if path.is_dir() {
        fs::remove_dir_all(path)?;
    } else if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Create a directory link (symlink on Unix, junction on Windows)
fn create_dir_link(target: &Path, site: &Path) -> WharfResult<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, site).map_err(|e| {
            WharfError::Link {
                failed: 1,
                total: 1,
                details: format!(
                    "Failed to link {} -> {}: {}",
                    site.display(),
                    target.display(),
                    e
                ),
            }
        })?;
    }

    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_dir(target, site).map_err(|e| WharfError::Link {
            failed: 1,
            total: 1,
            details: format!(
                "Failed to link {} -> {}: {}",
                site.display(),
                target.display(),
                e
            ),
        })?;
    }

    #[cfg(not(any(unix, windows)))]
    {
        copy_dir_all(target, site)?;
    }

    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn copy_dir_all(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &dst.join(entry.file_name()))?;
        } else {
            fs::copy(entry.path(), dst.join(entry.file_name()))?;
        }
    }
    Ok(())
}

/// Remove symlinks in a module directory whose targets no longer exist
fn remove_dangling_links(modules_dir: &Path) -> WharfResult<()> {
    if !modules_dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(modules_dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if name.starts_with('@') && path.is_dir() && !is_symlink(&path) {
            remove_dangling_links(&path)?;
            if fs::read_dir(&path)?.next().is_none() {
                fs::remove_dir(&path)?;
            }
            continue;
        }
        if is_symlink(&path) && !path.exists() {
            tracing::debug!(site = %path.display(), "removing dangling link");
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}
