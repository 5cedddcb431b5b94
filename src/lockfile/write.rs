use crate::lockfile::types::{Lockfile, CURRENT_LOCKFILE, WANTED_LOCKFILE};
use std::fs;
use std::path::Path;
use wharf_core::core::path::ensure_dir;
use wharf_core::WharfResult;

/// Write the wanted lockfile into a project root
pub fn write_wanted_lockfile(project_root: &Path, lockfile: &Lockfile) -> WharfResult<()> {
    write_lockfile(&project_root.join(WANTED_LOCKFILE), lockfile)
}

/// Write the cached lockfile copy into a virtual store directory
pub fn write_current_lockfile(virtual_store_dir: &Path, lockfile: &Lockfile) -> WharfResult<()> {
    ensure_dir(virtual_store_dir)?;
    write_lockfile(&virtual_store_dir.join(CURRENT_LOCKFILE), lockfile)
}

/// Serialize and write atomically: the document lands under a temporary
/// name in the same directory and is renamed into place, so a crash can
/// never leave a half-written lockfile behind.
fn write_lockfile(path: &Path, lockfile: &Lockfile) -> WharfResult<()> {
    let content = serde_yaml::to_string(lockfile)?;
    let tmp = path.with_extension("yaml.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lockfile::read::{read_wanted_lockfile, ReadOptions};
    use crate::lockfile::types::create_lockfile_object;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read_roundtrip() {
        let temp = TempDir::new().unwrap();
        let mut lockfile = create_lockfile_object(&["."], None);
        lockfile.importers["."]
            .specifiers
            .insert("lodash".to_string(), "^4.0.0".to_string());
        lockfile.importers["."]
            .dependencies
            .insert("lodash".to_string(), "4.17.21".to_string());

        write_wanted_lockfile(temp.path(), &lockfile).unwrap();
        let read_back = read_wanted_lockfile(temp.path(), &ReadOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(read_back, lockfile);
    }

    #[test]
    fn test_write_is_stable_under_noop_cycle() {
        let temp = TempDir::new().unwrap();
        let mut lockfile = create_lockfile_object(&["."], None);
        // Insertion order deliberately not alphabetical
        lockfile.importers["."]
            .specifiers
            .insert("zebra".to_string(), "^2.0.0".to_string());
        lockfile.importers["."]
            .specifiers
            .insert("alpha".to_string(), "^1.0.0".to_string());

        write_wanted_lockfile(temp.path(), &lockfile).unwrap();
        let first = fs::read_to_string(temp.path().join(WANTED_LOCKFILE)).unwrap();

        let read_back = read_wanted_lockfile(temp.path(), &ReadOptions::default())
            .unwrap()
            .unwrap();
        write_wanted_lockfile(temp.path(), &read_back).unwrap();
        let second = fs::read_to_string(temp.path().join(WANTED_LOCKFILE)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let temp = TempDir::new().unwrap();
        let lockfile = create_lockfile_object(&["."], None);
        write_wanted_lockfile(temp.path(), &lockfile).unwrap();

        let names: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![WANTED_LOCKFILE.to_string()]);
    }

    #[test]
    fn test_write_current_creates_virtual_store_dir() {
        let temp = TempDir::new().unwrap();
        let vsd = temp.path().join("packages_modules").join(".wharf");
        let lockfile = create_lockfile_object(&["."], None);

        write_current_lockfile(&vsd, &lockfile).unwrap();
        assert!(vsd.join(CURRENT_LOCKFILE).is_file());
    }
}
