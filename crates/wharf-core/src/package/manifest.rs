use crate::core::error::{WharfError, WharfResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// The manifest filename looked up in each project root
pub const MANIFEST_NAME: &str = "package.yaml";

/// The fixed set of dependency groupings a manifest may declare.
///
/// Modeled as an enumerable set so that code iterating "all dependency
/// fields" never works with dynamically keyed lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyField {
    Dependencies,
    DevDependencies,
    OptionalDependencies,
    PeerDependencies,
}

impl DependencyField {
    /// All dependency fields, in serialization order.
    pub const ALL: [DependencyField; 4] = [
        DependencyField::Dependencies,
        DependencyField::DevDependencies,
        DependencyField::OptionalDependencies,
        DependencyField::PeerDependencies,
    ];

    /// The camel-cased key used in manifests and lockfiles.
    pub fn key(&self) -> &'static str {
        match self {
            DependencyField::Dependencies => "dependencies",
            DependencyField::DevDependencies => "devDependencies",
            DependencyField::OptionalDependencies => "optionalDependencies",
            DependencyField::PeerDependencies => "peerDependencies",
        }
    }
}

impl fmt::Display for DependencyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A project manifest: the declared dependency ranges of one importer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManifest {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dev_dependencies: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub optional_dependencies: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub peer_dependencies: IndexMap<String, String>,
}

impl ProjectManifest {
    /// Load a manifest from a project root directory
    pub fn load(project_root: &Path) -> WharfResult<Self> {
        let path = project_root.join(MANIFEST_NAME);
        let content = fs::read_to_string(&path).map_err(|e| {
            WharfError::Package(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let manifest: ProjectManifest = serde_yaml::from_str(&content)?;
        Ok(manifest)
    }

    /// Save the manifest to a project root directory
    pub fn save(&self, project_root: &Path) -> WharfResult<()> {
        let path = project_root.join(MANIFEST_NAME);
        let content = serde_yaml::to_string(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Get the specifier map for one dependency field
    pub fn field(&self, field: DependencyField) -> &IndexMap<String, String> {
        match field {
            DependencyField::Dependencies => &self.dependencies,
            DependencyField::DevDependencies => &self.dev_dependencies,
            DependencyField::OptionalDependencies => &self.optional_dependencies,
            DependencyField::PeerDependencies => &self.peer_dependencies,
        }
    }

    /// Get the mutable specifier map for one dependency field
    pub fn field_mut(&mut self, field: DependencyField) -> &mut IndexMap<String, String> {
        match field {
            DependencyField::Dependencies => &mut self.dependencies,
            DependencyField::DevDependencies => &mut self.dev_dependencies,
            DependencyField::OptionalDependencies => &mut self.optional_dependencies,
            DependencyField::PeerDependencies => &mut self.peer_dependencies,
        }
    }

    /// Remove a dependency from whichever field declares it.
    /// Returns the removed range, if any field carried the name.
    pub fn remove_dependency(&mut self, name: &str) -> Option<String> {
        for field in DependencyField::ALL {
            // shift_remove keeps the remaining declaration order intact
            if let Some(range) = self.field_mut(field).shift_remove(name) {
                return Some(range);
            }
        }
        None
    }

    /// Iterate all declared (field, name, range) triples in field order
    pub fn all_dependencies(&self) -> impl Iterator<Item = (DependencyField, &str, &str)> {
        DependencyField::ALL.into_iter().flat_map(move |field| {
            self.field(field)
                .iter()
                .map(move |(name, range)| (field, name.as_str(), range.as_str()))
        })
    }
}

/// A project root participating in resolution, identified by a stable
/// relative path key (`.` for the root project).
#[derive(Debug, Clone)]
pub struct Importer {
    pub id: String,
    pub manifest: ProjectManifest,
}

impl Importer {
    pub fn new(id: impl Into<String>, manifest: ProjectManifest) -> Self {
        Self {
            id: id.into(),
            manifest,
        }
    }

    /// The conventional importer id for a single-project install
    pub fn root(manifest: ProjectManifest) -> Self {
        Self::new(".", manifest)
    }
}
