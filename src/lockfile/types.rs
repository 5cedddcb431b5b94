use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use wharf_core::DependencyField;

/// The lockfile format version written by this release.
/// Integer part is the breaking component; fractional bumps stay readable.
pub const LOCKFILE_VERSION: f64 = 5.1;

/// The wanted lockfile, one per project root
pub const WANTED_LOCKFILE: &str = "wharf-lock.yaml";

/// The cached copy kept in each virtual store directory
pub const CURRENT_LOCKFILE: &str = "lock.yaml";

/// One importer's slice of the lockfile: its declared specifiers and the
/// exact version each dependency field resolved to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImporterSnapshot {
    #[serde(default)]
    pub specifiers: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dev_dependencies: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub optional_dependencies: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub peer_dependencies: IndexMap<String, String>,
}

impl ImporterSnapshot {
    /// Get the resolved-versions map for one dependency field
    pub fn field(&self, field: DependencyField) -> &IndexMap<String, String> {
        match field {
            DependencyField::Dependencies => &self.dependencies,
            DependencyField::DevDependencies => &self.dev_dependencies,
            DependencyField::OptionalDependencies => &self.optional_dependencies,
            DependencyField::PeerDependencies => &self.peer_dependencies,
        }
    }

    pub fn field_mut(&mut self, field: DependencyField) -> &mut IndexMap<String, String> {
        match field {
            DependencyField::Dependencies => &mut self.dependencies,
            DependencyField::DevDependencies => &mut self.dev_dependencies,
            DependencyField::OptionalDependencies => &mut self.optional_dependencies,
            DependencyField::PeerDependencies => &mut self.peer_dependencies,
        }
    }
}

/// How a locked package's contents are obtained and verified
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tarball: Option<String>,

    /// Relative path, for locally resolved packages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// One resolved package in the packages section, keyed by `name@version`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSnapshot {
    #[serde(default)]
    pub resolution: ResolutionSnapshot,

    /// Resolved dependency versions (name -> exact version). Aliased
    /// dependencies use `npm:real-name@version` values.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, String>,

    /// Declared peer ranges, kept for re-validation on later installs
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub peer_dependencies: IndexMap<String, String>,
}

/// In-memory representation of the lockfile document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lockfile {
    pub lockfile_version: f64,

    #[serde(default)]
    pub importers: IndexMap<String, ImporterSnapshot>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub packages: IndexMap<String, PackageSnapshot>,
}

impl Lockfile {
    /// The breaking (integer) component of the format version
    pub fn major_version(&self) -> i64 {
        self.lockfile_version.floor() as i64
    }
}

/// Create a fresh lockfile with one empty entry per importer id
pub fn create_lockfile_object(importer_ids: &[&str], lockfile_version: Option<f64>) -> Lockfile {
    let mut importers = IndexMap::new();
    for &id in importer_ids {
        importers.insert(id.to_string(), ImporterSnapshot::default());
    }
    Lockfile {
        lockfile_version: lockfile_version.unwrap_or(LOCKFILE_VERSION),
        importers,
        packages: IndexMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_lockfile_object() {
        let lockfile = create_lockfile_object(&[".", "packages/app"], None);
        assert_eq!(lockfile.lockfile_version, LOCKFILE_VERSION);
        assert_eq!(lockfile.importers.len(), 2);
        assert!(lockfile.importers["."].specifiers.is_empty());
        assert!(lockfile.packages.is_empty());
    }

    #[test]
    fn test_create_lockfile_object_with_explicit_version() {
        let lockfile = create_lockfile_object(&["."], Some(4.0));
        assert_eq!(lockfile.lockfile_version, 4.0);
        assert_eq!(lockfile.major_version(), 4);
    }

    #[test]
    fn test_major_version_floors() {
        let lockfile = create_lockfile_object(&["."], Some(5.9));
        assert_eq!(lockfile.major_version(), 5);
    }

    #[test]
    fn test_serializes_camel_case_top_level() {
        let lockfile = create_lockfile_object(&["."], None);
        let yaml = serde_yaml::to_string(&lockfile).unwrap();
        assert!(yaml.contains("lockfileVersion"));
        assert!(yaml.contains("importers"));
    }
}
