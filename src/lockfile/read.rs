use crate::lockfile::types::{
    ImporterSnapshot, Lockfile, PackageSnapshot, CURRENT_LOCKFILE, WANTED_LOCKFILE,
};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use wharf_core::{DependencyField, WharfError, WharfResult};

/// Options for lockfile reads
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// The format version the caller expects; `None` skips the gate
    pub wanted_version: Option<f64>,
    /// Treat an incompatible document as absent instead of failing
    pub ignore_incompatible: bool,
}

/// The on-disk document shape, including the legacy single-importer layout
/// (flat top-level specifier/dependency fields, no importers map).
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLockfile {
    lockfile_version: f64,

    #[serde(default)]
    importers: IndexMap<String, ImporterSnapshot>,

    #[serde(default)]
    packages: IndexMap<String, PackageSnapshot>,

    // Legacy fields, migrated into importers["."] on read
    #[serde(default)]
    specifiers: Option<IndexMap<String, String>>,
    #[serde(default)]
    dependencies: Option<IndexMap<String, String>>,
    #[serde(default)]
    dev_dependencies: Option<IndexMap<String, String>>,
    #[serde(default)]
    optional_dependencies: Option<IndexMap<String, String>>,
    #[serde(default)]
    peer_dependencies: Option<IndexMap<String, String>>,
}

impl RawLockfile {
    fn take_field(&mut self, field: DependencyField) -> Option<IndexMap<String, String>> {
        match field {
            DependencyField::Dependencies => self.dependencies.take(),
            DependencyField::DevDependencies => self.dev_dependencies.take(),
            DependencyField::OptionalDependencies => self.optional_dependencies.take(),
            DependencyField::PeerDependencies => self.peer_dependencies.take(),
        }
    }

    /// Convert into the importers shape, folding the legacy flat fields
    /// into a synthetic root importer. The legacy shape is never written
    /// back; only reads understand it.
    fn migrate(mut self) -> Lockfile {
        if let Some(specifiers) = self.specifiers.take() {
            let mut root = ImporterSnapshot {
                specifiers,
                ..Default::default()
            };
            for field in DependencyField::ALL {
                if let Some(map) = self.take_field(field) {
                    *root.field_mut(field) = map;
                }
            }
            self.importers.insert(".".to_string(), root);
        }
        Lockfile {
            lockfile_version: self.lockfile_version,
            importers: self.importers,
            packages: self.packages,
        }
    }
}

/// Read the wanted lockfile from a project root
pub fn read_wanted_lockfile(
    project_root: &Path,
    opts: &ReadOptions,
) -> WharfResult<Option<Lockfile>> {
    read_lockfile(&project_root.join(WANTED_LOCKFILE), opts)
}

/// Read the cached lockfile copy from a virtual store directory
pub fn read_current_lockfile(
    virtual_store_dir: &Path,
    opts: &ReadOptions,
) -> WharfResult<Option<Lockfile>> {
    read_lockfile(&virtual_store_dir.join(CURRENT_LOCKFILE), opts)
}

fn read_lockfile(path: &Path, opts: &ReadOptions) -> WharfResult<Option<Lockfile>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        // A missing lockfile is not an error; it just means "resolve from scratch"
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let raw: RawLockfile = serde_yaml::from_str(&content)?;
    let lockfile = raw.migrate();

    let Some(wanted) = opts.wanted_version else {
        return Ok(Some(lockfile));
    };

    if lockfile.major_version() == wanted.floor() as i64 {
        if lockfile.lockfile_version > wanted {
            tracing::warn!(
                path = %path.display(),
                "Lockfile was generated by a newer version of wharf; it is \
                 compatible but may get downgraded to version {}",
                wanted
            );
        }
        return Ok(Some(lockfile));
    }

    if opts.ignore_incompatible {
        tracing::warn!(
            path = %path.display(),
            "Ignoring incompatible lockfile (version {}, wanted {})",
            lockfile.lockfile_version,
            wanted
        );
        return Ok(None);
    }

    Err(WharfError::LockfileBreakingChange {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_wanted(dir: &Path, content: &str) {
        fs::write(dir.join(WANTED_LOCKFILE), content).unwrap();
    }

    fn opts(wanted: f64, ignore: bool) -> ReadOptions {
        ReadOptions {
            wanted_version: Some(wanted),
            ignore_incompatible: ignore,
        }
    }

    #[test]
    fn test_absent_lockfile_is_none_not_error() {
        let temp = TempDir::new().unwrap();
        let result = read_wanted_lockfile(temp.path(), &opts(5.0, false)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_reads_current_shape() {
        let temp = TempDir::new().unwrap();
        write_wanted(
            temp.path(),
            r#"
lockfileVersion: 5.1
importers:
  .:
    specifiers:
      lodash: ^4.0.0
    dependencies:
      lodash: 4.17.21
packages:
  lodash@4.17.21:
    resolution:
      integrity: "blake3:abc123"
"#,
        );

        let lockfile = read_wanted_lockfile(temp.path(), &opts(5.0, false))
            .unwrap()
            .unwrap();
        assert_eq!(lockfile.importers["."].specifiers["lodash"], "^4.0.0");
        assert_eq!(
            lockfile.packages["lodash@4.17.21"]
                .resolution
                .integrity
                .as_deref(),
            Some("blake3:abc123")
        );
    }

    #[test]
    fn test_legacy_shape_migrates_to_root_importer() {
        let temp = TempDir::new().unwrap();
        write_wanted(
            temp.path(),
            r#"
lockfileVersion: 5.0
specifiers:
  lodash: ^4.0.0
dependencies:
  lodash: 4.17.21
devDependencies:
  jest: 29.0.0
"#,
        );

        let lockfile = read_wanted_lockfile(temp.path(), &opts(5.0, false))
            .unwrap()
            .unwrap();

        let root = &lockfile.importers["."];
        assert_eq!(root.specifiers["lodash"], "^4.0.0");
        assert_eq!(root.dependencies["lodash"], "4.17.21");
        assert_eq!(root.dev_dependencies["jest"], "29.0.0");

        // The migrated document re-serializes without top-level legacy fields
        let yaml = serde_yaml::to_string(&lockfile).unwrap();
        assert!(yaml.contains("importers"));
        assert!(!yaml.contains("\nspecifiers:"));
        assert!(!yaml.contains("\ndependencies:"));
    }

    #[test]
    fn test_incompatible_major_fails_by_default() {
        let temp = TempDir::new().unwrap();
        write_wanted(temp.path(), "lockfileVersion: 6.0\nimporters: {}\n");

        let err = read_wanted_lockfile(temp.path(), &opts(5.0, false)).unwrap_err();
        match err {
            WharfError::LockfileBreakingChange { path } => {
                assert!(path.ends_with(WANTED_LOCKFILE));
            }
            other => panic!("expected LockfileBreakingChange, got {:?}", other),
        }
    }

    #[test]
    fn test_incompatible_major_ignored_when_requested() {
        let temp = TempDir::new().unwrap();
        write_wanted(temp.path(), "lockfileVersion: 6.0\nimporters: {}\n");

        let result = read_wanted_lockfile(temp.path(), &opts(5.0, true)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_newer_minor_is_accepted() {
        let temp = TempDir::new().unwrap();
        write_wanted(temp.path(), "lockfileVersion: 5.1\nimporters: {}\n");

        let lockfile = read_wanted_lockfile(temp.path(), &opts(5.0, false))
            .unwrap()
            .unwrap();
        assert_eq!(lockfile.lockfile_version, 5.1);
    }

    #[test]
    fn test_no_wanted_version_skips_gate() {
        let temp = TempDir::new().unwrap();
        write_wanted(temp.path(), "lockfileVersion: 9.0\nimporters: {}\n");

        let lockfile = read_wanted_lockfile(temp.path(), &ReadOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(lockfile.lockfile_version, 9.0);
    }
}
