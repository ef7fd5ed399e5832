//! Integration tests for the filesystem scanner
//!
//! Scans real directories created in a temp dir, then types and validates
//! them with the PCDM profile.

use ipm_core::profile::pcdm;
use ipm_core::tree::checksum_file;
use ipm_core::{
    EngineConfig, FileKind, FilesystemScanner, InMemoryObjectStore, ProfileCatalog, ProfileEngine,
    ScannerConfig, TreeSource,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ==================== Test Helper Functions ====================

/// archive/
///   letters/
///     letter-01/ {scan.tif, notes.txt}
///   .git/ {HEAD}
fn create_archive(root: &Path) {
    let letter = root.join("archive/letters/letter-01");
    fs::create_dir_all(&letter).unwrap();
    fs::write(letter.join("scan.tif"), b"not really a tiff").unwrap();
    fs::write(letter.join("notes.txt"), b"hello world").unwrap();
    fs::create_dir_all(root.join("archive/.git")).unwrap();
    fs::write(root.join("archive/.git/HEAD"), b"ref: refs/heads/main").unwrap();
}

fn engine() -> ProfileEngine<InMemoryObjectStore> {
    let catalog = ProfileCatalog::builtin().unwrap();
    ProfileEngine::from_config(&catalog, &EngineConfig::default(), InMemoryObjectStore::new()).unwrap()
}

// ==================== Tests ====================

/// Test: Scanned tree mirrors the directory layout, hidden entries skipped
#[test]
fn test_scan_mirrors_layout() {
    let temp = TempDir::new().unwrap();
    create_archive(temp.path());

    let tree = FilesystemScanner::default()
        .build_tree(&temp.path().join("archive"))
        .unwrap();

    assert_eq!(tree.len(), 5);
    let root = tree.root().unwrap();
    assert_eq!(tree.node(root).unwrap().name, "archive");
    assert!(tree.find_by_path(".git").is_none());

    let letter = tree.find_by_path("letters/letter-01").unwrap();
    let names: Vec<_> = tree
        .children(letter)
        .iter()
        .map(|c| tree.node(*c).unwrap().name.clone())
        .collect();
    assert_eq!(names, vec!["notes.txt", "scan.tif"]);
}

/// Test: File metadata is captured
#[test]
fn test_file_metadata() {
    let temp = TempDir::new().unwrap();
    create_archive(temp.path());

    let tree = FilesystemScanner::default()
        .build_tree(&temp.path().join("archive"))
        .unwrap();
    let notes = tree.find_by_path("letters/letter-01/notes.txt").unwrap();
    let info = tree.node(notes).unwrap().file_info.clone().unwrap();

    assert_eq!(info.kind, FileKind::RegularFile);
    assert_eq!(info.size, 11);
    assert_eq!(info.checksum.as_deref(), Some("0d4a1185"));
    assert!(info.modified.is_some());
    assert_eq!(
        checksum_file(&info.path).unwrap(),
        "0d4a1185".to_string()
    );

    let letters = tree.find_by_path("letters").unwrap();
    let dir = tree.node(letters).unwrap().file_info.clone().unwrap();
    assert_eq!(dir.kind, FileKind::Directory);
    assert_eq!(dir.size, 0);
    assert!(dir.checksum.is_none());
}

/// Test: Scanner options from the config are honoured
#[test]
fn test_scanner_options() {
    let temp = TempDir::new().unwrap();
    create_archive(temp.path());

    let scanner = FilesystemScanner::new(ScannerConfig {
        include_hidden: true,
        follow_links: false,
        checksums: false,
    });
    let tree = scanner.build_tree(&temp.path().join("archive")).unwrap();

    assert_eq!(tree.len(), 7);
    assert!(tree.find_by_path(".git/HEAD").is_some());
    let scan = tree.find_by_path("letters/letter-01/scan.tif").unwrap();
    assert!(tree.node(scan).unwrap().file_info.as_ref().unwrap().checksum.is_none());
}

/// Test: Scanning a missing path fails with a scan error
#[test]
fn test_scan_missing_path() {
    let temp = TempDir::new().unwrap();
    let err = FilesystemScanner::default()
        .build_tree(&temp.path().join("nope"))
        .unwrap_err();
    assert!(err.to_string().contains("path not found"));
}

/// Test: Scan, assign and validate end to end
#[test]
fn test_scan_assign_validate() {
    let temp = TempDir::new().unwrap();
    create_archive(temp.path());
    let mut tree = FilesystemScanner::default()
        .build_tree(&temp.path().join("archive"))
        .unwrap();
    let mut engine = engine();

    let report = engine.assign_tree(&mut tree).unwrap();
    assert_eq!(report.typed(), 5);

    let label = |path: &str| {
        let id = tree.find_by_path(path).unwrap();
        let t = tree.node(id).unwrap().node_type.unwrap();
        engine.profile().node_type(t).label.clone()
    };
    assert_eq!(label(""), "AdministrativeSet");
    assert_eq!(label("letters"), "Collection");
    assert_eq!(label("letters/letter-01"), "Object");
    assert_eq!(label("letters/letter-01/scan.tif"), "File");

    let root = tree.root().unwrap();
    assert!(engine.validate_tree(&tree, root));
    assert_eq!(tree.profile(), Some(pcdm::PROFILE_ID));
}

/// Test: Scanning a single file yields a root that no PCDM type accepts
#[test]
fn test_scan_single_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("lonely.txt");
    fs::write(&path, b"x").unwrap();

    let mut tree = FilesystemScanner::default().build_tree(&path).unwrap();
    assert_eq!(tree.len(), 1);

    let mut engine = engine();
    assert!(engine.assign_tree(&mut tree).is_err());
    assert!(!engine.validate_tree(&tree, tree.root().unwrap()));
}

/// Test: Config file drives both scanner and engine
#[test]
fn test_config_file_round_trip() {
    let temp = TempDir::new().unwrap();
    create_archive(temp.path());
    let config_path = temp.path().join("ipm.yaml");
    fs::write(
        &config_path,
        "apiVersion: ipm/v1\nkind: EngineConfig\nmetadata:\n  name: reading-room\nspec:\n  profile: PCDM\n  scanner:\n    includeHidden: false\n    checksums: false\n",
    )
    .unwrap();

    let config = EngineConfig::load(&config_path).unwrap();
    let scanner = FilesystemScanner::new(config.spec.scanner.clone());
    let mut tree = scanner.build_tree(&temp.path().join("archive")).unwrap();
    let catalog = ProfileCatalog::builtin().unwrap();
    let mut engine = ProfileEngine::from_config(&catalog, &config, InMemoryObjectStore::new()).unwrap();

    engine.assign_tree(&mut tree).unwrap();
    assert!(engine.validate_tree(&tree, tree.root().unwrap()));
}
