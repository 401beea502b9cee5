// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use crate::lock::{LockChangeKind, LockFile, generate_lock, verify_lock};
use crate::{ComposedEnvironment, EnvSpec, ResolvedPackage, SnapshotPin, compose_specs};

fn package(reference: &str, attr_path: &str, version: &str) -> ResolvedPackage {
    let store_path = PathBuf::from(format!("/pinenv/store/abc-{attr_path}-{version}"));
    ResolvedPackage {
        reference: reference.parse().unwrap(),
        attr_path: attr_path.to_string(),
        version: version.to_string(),
        bin_dirs: vec![store_path.join("bin")],
        store_path,
        dependencies: Vec::new(),
    }
}

fn pin() -> SnapshotPin {
    "rev:0123456789abcdef".parse().unwrap()
}

struct Project {
    tmp: TempDir,
    composed: ComposedEnvironment,
}

#[fixture]
fn project() -> Project {
    let tmp = TempDir::new().unwrap();
    let spec_path = tmp.path().join(".pinenv.yaml");
    std::fs::write(
        &spec_path,
        "api: pinenv/v0\npin: rev:0123456789abcdef\npackages:\n  - cowsay\n  - lolcat\n",
    )
    .unwrap();
    let spec = EnvSpec::load(&spec_path).unwrap();
    let composed = compose_specs(&[spec]);
    Project { tmp, composed }
}

fn resolved() -> Vec<ResolvedPackage> {
    vec![
        package("cowsay", "cowsay", "3.04"),
        package("lolcat", "lolcat", "100.0.1"),
    ]
}

#[rstest]
fn test_generate_lock(project: Project) {
    let lock = generate_lock(&project.composed, &resolved(), Some(&pin())).unwrap();
    assert_eq!(lock.sources.len(), 1);
    assert_eq!(lock.sources[0].sha256.len(), 64);
    assert_eq!(lock.pin, Some(pin()));
    assert_eq!(lock.packages.len(), 2);
    assert_eq!(lock.packages[0].reference, "cowsay");
    assert_eq!(lock.packages[1].version, "100.0.1");
}

#[rstest]
fn test_lock_save_and_load(project: Project) {
    let lock = generate_lock(&project.composed, &resolved(), Some(&pin())).unwrap();
    let path = project.tmp.path().join(crate::PINENV_LOCK_FILENAME);
    lock.save(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("api: pinenv/v0/lock"));
    assert!(text.contains("pin: 0123456789abcdef"));
    assert_eq!(LockFile::load(&path).unwrap(), lock);
}

#[rstest]
fn test_load_invalid_lock(project: Project) {
    let path = project.tmp.path().join(crate::PINENV_LOCK_FILENAME);
    std::fs::write(&path, "api: nope\n").unwrap();
    assert!(matches!(
        LockFile::load(&path),
        Err(crate::Error::InvalidLockFile { .. })
    ));
}

#[rstest]
fn test_verify_unchanged_lock(project: Project) {
    let lock = generate_lock(&project.composed, &resolved(), Some(&pin())).unwrap();
    let changes = verify_lock(&lock, &project.composed, &resolved(), Some(&pin())).unwrap();
    assert!(changes.is_empty(), "unexpected changes: {changes:?}");
}

#[rstest]
fn test_verify_detects_source_change(project: Project) {
    let lock = generate_lock(&project.composed, &resolved(), Some(&pin())).unwrap();
    std::fs::write(
        &project.composed.source_files[0],
        "api: pinenv/v0\npackages:\n  - cowsay\n",
    )
    .unwrap();

    let changes = verify_lock(&lock, &project.composed, &resolved(), Some(&pin())).unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].kind, LockChangeKind::SourceFileChanged);
}

#[rstest]
fn test_verify_detects_removed_source(project: Project) {
    let lock = generate_lock(&project.composed, &resolved(), Some(&pin())).unwrap();
    let empty = ComposedEnvironment::default();
    let changes = verify_lock(&lock, &empty, &resolved(), Some(&pin())).unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].kind, LockChangeKind::SourceFileRemoved);
}

#[rstest]
fn test_verify_detects_pin_change(project: Project) {
    let lock = generate_lock(&project.composed, &resolved(), Some(&pin())).unwrap();
    let other: SnapshotPin = "rev:fedcba9876543210".parse().unwrap();
    let changes = verify_lock(&lock, &project.composed, &resolved(), Some(&other)).unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].kind, LockChangeKind::PinChanged);
    assert_eq!(changes[0].actual.as_deref(), Some("fedcba9876543210"));
}

#[rstest]
fn test_verify_detects_package_changes(project: Project) {
    let lock = generate_lock(&project.composed, &resolved(), Some(&pin())).unwrap();
    let current = vec![
        package("cowsay", "cowsay", "3.05"),
        package("python3", "python312", "3.12.4"),
    ];

    let changes = verify_lock(&lock, &project.composed, &current, Some(&pin())).unwrap();
    let kinds: Vec<_> = changes.iter().map(|c| (c.kind, c.reference.as_str())).collect();
    assert_eq!(
        kinds,
        vec![
            (LockChangeKind::PackageChanged, "cowsay"),
            (LockChangeKind::PackageRemoved, "lolcat"),
            (LockChangeKind::PackageAdded, "python3"),
        ]
    );
}
