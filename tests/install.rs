//! End-to-end install pipeline tests against in-memory collaborators.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use wharf::config::InstallConfig;
use wharf::di::mocks::{MockMetadataSource, MockPackageFetcher};
use wharf::di::{MetadataSource, PackageFetcher};
use wharf::install::Installer;
use wharf::lockfile::WANTED_LOCKFILE;
use wharf::{Importer, ProjectManifest, WharfError};

struct World {
    project: TempDir,
    store: TempDir,
    metadata: Arc<MockMetadataSource>,
    fetcher: Arc<MockPackageFetcher>,
}

impl World {
    fn new() -> Self {
        Self {
            project: TempDir::new().unwrap(),
            store: TempDir::new().unwrap(),
            metadata: Arc::new(MockMetadataSource::new()),
            fetcher: Arc::new(MockPackageFetcher::new()),
        }
    }

    fn config(&self) -> InstallConfig {
        let mut config = InstallConfig::new(self.project.path().to_path_buf());
        config.store_dir = Some(self.store.path().to_path_buf());
        config
    }

    fn installer_with(&self, config: InstallConfig) -> Installer {
        Installer::new(
            config,
            Arc::clone(&self.metadata) as Arc<dyn MetadataSource>,
            Arc::clone(&self.fetcher) as Arc<dyn PackageFetcher>,
        )
        .unwrap()
    }

    fn installer(&self) -> Installer {
        self.installer_with(self.config())
    }

    fn modules(&self) -> PathBuf {
        self.project.path().join("packages_modules")
    }
}

fn importer(id: &str, deps: &[(&str, &str)]) -> Importer {
    let mut manifest = ProjectManifest::default();
    manifest.name = id.replace('/', "-");
    for (name, range) in deps {
        manifest
            .dependencies
            .insert((*name).to_string(), (*range).to_string());
    }
    Importer::new(id, manifest)
}

#[tokio::test]
async fn install_builds_isolated_tree_with_shared_transitive_dep() {
    let world = World::new();
    world.metadata.add_version("left", "1.0.0", &[("shared", "^3.0.0")]);
    world.metadata.add_version("right", "1.0.0", &[("shared", "^3.1.0")]);
    world.metadata.add_version("shared", "3.2.0", &[]);

    let report = world
        .installer()
        .install(&[importer(
            ".",
            &[("left", "^1.0.0"), ("right", "^1.0.0")],
        )])
        .await
        .unwrap();

    // One shared node satisfies both ranges
    assert_eq!(report.change_set.added.len(), 3);
    assert_eq!(world.fetcher.fetch_count(), 3);

    // Both parents reach shared through their private directories
    for parent in ["left", "right"] {
        let linked = world.modules().join(parent).join("lib").join("main.txt");
        assert!(linked.exists(), "{} not linked", parent);
    }
    assert!(world.modules().join("shared").symlink_metadata().is_err());
}

#[tokio::test]
async fn workspace_importers_share_one_store_and_lockfile() {
    let world = World::new();
    world.metadata.add_version("dep", "1.0.0", &[]);

    // Two importers in one project, both wanting the same package
    fs::create_dir_all(world.project.path().join("packages/app")).unwrap();
    let importers = [
        importer(".", &[("dep", "^1.0.0")]),
        importer("packages/app", &[("dep", "^1.0.0")]),
    ];

    let report = world.installer().install(&importers).await.unwrap();

    // Fetched once, linked into both importers
    assert_eq!(world.fetcher.fetch_count(), 1);
    assert!(world.modules().join("dep").exists());
    assert!(world
        .project
        .path()
        .join("packages/app/packages_modules/dep")
        .exists());

    // One lockfile holds both importer sections
    assert_eq!(report.change_set.added, vec!["dep@1.0.0"]);
    let content =
        fs::read_to_string(world.project.path().join(WANTED_LOCKFILE)).unwrap();
    assert!(content.contains("packages/app"));
}

#[tokio::test]
async fn hoisted_layout_exposes_transitive_deps_at_top_level() {
    let world = World::new();
    world.metadata.add_version("a", "1.0.0", &[("b", "^1.0.0")]);
    world.metadata.add_version("b", "1.4.0", &[]);

    let mut config = world.config();
    config.hoisted = true;
    world
        .installer_with(config)
        .install(&[importer(".", &[("a", "^1.0.0")])])
        .await
        .unwrap();

    assert!(world.modules().join("a").exists());
    assert!(world.modules().join("b").exists());
}

#[tokio::test]
async fn frozen_install_succeeds_when_lockfile_matches() {
    let world = World::new();
    world.metadata.add_version("a", "1.0.0", &[]);
    let importers = [importer(".", &[("a", "^1.0.0")])];

    world.installer().install(&importers).await.unwrap();

    let mut config = world.config();
    config.frozen_lockfile = true;
    let report = world
        .installer_with(config)
        .install(&importers)
        .await
        .unwrap();

    assert!(report.change_set.is_empty());
}

#[tokio::test]
async fn frozen_install_rejects_new_dependency() {
    let world = World::new();
    world.metadata.add_version("a", "1.0.0", &[]);
    world.metadata.add_version("extra", "1.0.0", &[]);

    world
        .installer()
        .install(&[importer(".", &[("a", "^1.0.0")])])
        .await
        .unwrap();
    let before = fs::read_to_string(world.project.path().join(WANTED_LOCKFILE)).unwrap();

    let mut config = world.config();
    config.frozen_lockfile = true;
    let err = world
        .installer_with(config)
        .install(&[importer(".", &[("a", "^1.0.0"), ("extra", "^1.0.0")])])
        .await
        .unwrap_err();

    assert!(matches!(err, WharfError::FrozenLockfile { .. }));
    let after = fs::read_to_string(world.project.path().join(WANTED_LOCKFILE)).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn legacy_lockfile_pins_versions_through_migration() {
    let world = World::new();
    world.metadata.add_version("a", "1.0.0", &[]);
    world.metadata.add_version("a", "1.9.0", &[]);

    // A legacy single-importer document pinning the older version
    fs::write(
        world.project.path().join(WANTED_LOCKFILE),
        "lockfileVersion: 5.0\n\
         specifiers:\n  a: ^1.0.0\n\
         dependencies:\n  a: 1.0.0\n\
         packages:\n  a@1.0.0:\n    resolution:\n      integrity: null\n",
    )
    .unwrap();

    world
        .installer()
        .install(&[importer(".", &[("a", "^1.0.0")])])
        .await
        .unwrap();

    let content = fs::read_to_string(world.project.path().join(WANTED_LOCKFILE)).unwrap();
    assert!(content.contains("a@1.0.0"));
    assert!(!content.contains("a@1.9.0"));
    // The rewritten document uses the importers shape
    assert!(content.contains("importers"));
}

#[tokio::test]
async fn incompatible_lockfile_fails_unless_ignored() {
    let world = World::new();
    world.metadata.add_version("a", "1.0.0", &[]);
    fs::write(
        world.project.path().join(WANTED_LOCKFILE),
        "lockfileVersion: 9.0\nimporters: {}\n",
    )
    .unwrap();
    let importers = [importer(".", &[("a", "^1.0.0")])];

    let err = world.installer().install(&importers).await.unwrap_err();
    assert!(matches!(err, WharfError::LockfileBreakingChange { .. }));

    let mut config = world.config();
    config.ignore_incompatible_lockfile = true;
    world
        .installer_with(config)
        .install(&importers)
        .await
        .unwrap();
    let content = fs::read_to_string(world.project.path().join(WANTED_LOCKFILE)).unwrap();
    assert!(content.contains("a@1.0.0"));
}

#[tokio::test]
async fn unmet_peer_dependency_surfaces_as_warning_not_error() {
    let world = World::new();
    let mut meta =
        wharf::di::VersionMetadata::new(wharf::Version::parse("1.0.0").unwrap());
    meta.peer_dependencies
        .insert("react".to_string(), ">=16.0.0".to_string());
    world.metadata.add("ui-kit", meta);

    let report = world
        .installer()
        .install(&[importer(".", &[("ui-kit", "^1.0.0")])])
        .await
        .unwrap();

    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("react")));
    assert!(world.modules().join("ui-kit").exists());
}
