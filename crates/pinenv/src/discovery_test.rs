// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

fn create_spec_file(dir: &Path, content: &str) {
    let path = dir.join(PINENV_FILENAME);
    std::fs::write(path, content).expect("Failed to write spec file");
}

#[rstest]
fn test_discover_single_spec() {
    let tmp = TempDir::new().unwrap();
    create_spec_file(
        tmp.path(),
        r#"
api: pinenv/v0
packages:
  - cowsay
"#,
    );

    let options = DiscoveryOptions::default();
    let specs = discover_specs(tmp.path(), &options).expect("Should discover spec");

    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].packages, vec!["cowsay"]);
}

#[rstest]
fn test_inherit_false_stops_discovery() {
    let tmp = TempDir::new().unwrap();
    let child = tmp.path().join("child");
    std::fs::create_dir(&child).unwrap();

    create_spec_file(tmp.path(), "packages: [parent-pkg]\n");
    create_spec_file(&child, "packages: [child-pkg]\n");

    let options = DiscoveryOptions::default();
    let specs = discover_specs(&child, &options).expect("Should discover spec");

    // Should only find child spec since inherit defaults to false
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].packages, vec!["child-pkg"]);
}

#[rstest]
fn test_inherit_true_walks_up() {
    let tmp = TempDir::new().unwrap();
    let child = tmp.path().join("child");
    std::fs::create_dir(&child).unwrap();

    create_spec_file(tmp.path(), "inherit: false\npackages: [parent-pkg]\n");
    create_spec_file(&child, "inherit: true\npackages: [child-pkg]\n");

    let options = DiscoveryOptions::default();
    let specs = discover_specs(&child, &options).expect("Should discover specs");

    // Parent comes first in composition order
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].packages, vec!["parent-pkg"]);
    assert_eq!(specs[1].packages, vec!["child-pkg"]);
}

#[rstest]
fn test_force_inherit_option() {
    let tmp = TempDir::new().unwrap();
    let child = tmp.path().join("child");
    std::fs::create_dir(&child).unwrap();

    create_spec_file(tmp.path(), "packages: [parent-pkg]\n");
    create_spec_file(&child, "packages: [child-pkg]\n");

    let options = DiscoveryOptions {
        force_inherit: true,
        ..Default::default()
    };
    let specs = discover_specs(&child, &options).expect("Should discover specs");
    assert_eq!(specs.len(), 2);
}

#[rstest]
fn test_no_inherit_option() {
    let tmp = TempDir::new().unwrap();
    let child = tmp.path().join("child");
    std::fs::create_dir(&child).unwrap();

    create_spec_file(tmp.path(), "packages: [parent-pkg]\n");
    create_spec_file(&child, "inherit: true\npackages: [child-pkg]\n");

    let options = DiscoveryOptions {
        no_inherit: true,
        ..Default::default()
    };
    let specs = discover_specs(&child, &options).expect("Should discover spec");

    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].packages, vec!["child-pkg"]);
}

#[rstest]
fn test_not_found_error() {
    let tmp = TempDir::new().unwrap();

    let options = DiscoveryOptions::default();
    let result = discover_specs(tmp.path(), &options);

    match result {
        Err(Error::NotFoundInTree(_)) => {}
        other => panic!("Expected NotFoundInTree, got: {other:?}"),
    }
}

#[rstest]
fn test_local_override() {
    let tmp = TempDir::new().unwrap();
    create_spec_file(tmp.path(), "packages: [main-pkg]\n");
    std::fs::write(
        tmp.path().join(PINENV_LOCAL_FILENAME),
        "packages: [local-pkg]\n",
    )
    .unwrap();

    let options = DiscoveryOptions::default();
    let specs = discover_specs(tmp.path(), &options).expect("Should discover specs");

    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].packages, vec!["main-pkg"]);
    assert_eq!(specs[1].packages, vec!["local-pkg"]);
}

#[rstest]
fn test_relative_includes_load_first() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("base.pinenv.yaml"), "packages: [base-pkg]\n").unwrap();
    create_spec_file(
        tmp.path(),
        "includes: [base.pinenv.yaml]\npackages: [project-pkg]\n",
    );

    let specs = discover_specs(tmp.path(), &DiscoveryOptions::default()).unwrap();
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].packages, vec!["base-pkg"]);
    assert_eq!(specs[1].packages, vec!["project-pkg"]);
}

#[rstest]
fn test_circular_include_detected() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("a.pinenv.yaml"), "includes: [b.pinenv.yaml]\n").unwrap();
    std::fs::write(tmp.path().join("b.pinenv.yaml"), "includes: [a.pinenv.yaml]\n").unwrap();
    create_spec_file(tmp.path(), "includes: [a.pinenv.yaml]\n");

    let result = discover_specs(tmp.path(), &DiscoveryOptions::default());
    assert!(matches!(result, Err(Error::CircularInclude(_))));
}

#[rstest]
fn test_shared_include_is_not_circular() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("common.pinenv.yaml"), "packages: [common]\n").unwrap();
    std::fs::write(
        tmp.path().join("a.pinenv.yaml"),
        "includes: [common.pinenv.yaml]\n",
    )
    .unwrap();
    create_spec_file(
        tmp.path(),
        "includes: [a.pinenv.yaml, common.pinenv.yaml]\n",
    );

    let specs = discover_specs(tmp.path(), &DiscoveryOptions::default()).unwrap();
    assert_eq!(specs.len(), 4);
}

#[rstest]
fn test_load_spec_file_missing() {
    let tmp = TempDir::new().unwrap();
    let result = load_spec_file(tmp.path().join("nope.yaml"));
    assert!(matches!(result, Err(Error::NotFoundAtPath(_))));
}

#[rstest]
fn test_discover_named_spec_file() {
    let tmp = TempDir::new().unwrap();
    create_spec_file(tmp.path(), "packages: [from_default]\n");
    let custom = tmp.path().join("custom.yaml");
    std::fs::write(&custom, "packages: [from_custom]\n").unwrap();

    let specs = discover_specs(&custom, &DiscoveryOptions::default()).unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].packages, vec!["from_custom"]);
    assert_eq!(specs[0].source_path.as_deref(), Some(custom.as_path()));
}

#[rstest]
fn test_named_spec_file_with_local_override_and_includes() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("base.pinenv.yaml"), "packages: [base-pkg]\n").unwrap();
    let custom = tmp.path().join("custom.yaml");
    std::fs::write(&custom, "includes: [base.pinenv.yaml]\npackages: [custom-pkg]\n").unwrap();
    std::fs::write(
        tmp.path().join(PINENV_LOCAL_FILENAME),
        "packages: [local-pkg]\n",
    )
    .unwrap();

    let specs = discover_specs(&custom, &DiscoveryOptions::default()).unwrap();
    let packages: Vec<_> = specs.iter().map(|s| s.packages.clone()).collect();
    assert_eq!(
        packages,
        vec![
            vec!["base-pkg".to_string()],
            vec!["custom-pkg".to_string()],
            vec!["local-pkg".to_string()],
        ]
    );
}

#[rstest]
fn test_missing_start_path_is_not_found() {
    let tmp = TempDir::new().unwrap();
    create_spec_file(tmp.path(), "packages: [from_default]\n");

    let result = discover_specs(tmp.path().join("custom.yaml"), &DiscoveryOptions::default());
    assert!(matches!(result, Err(Error::NotFoundAtPath(_))));
}

#[rstest]
fn test_spec_directory() {
    let tmp = TempDir::new().unwrap();
    let custom = tmp.path().join("custom.yaml");
    std::fs::write(&custom, "packages: []\n").unwrap();

    assert_eq!(spec_directory(&custom), tmp.path());
    assert_eq!(spec_directory(tmp.path()), tmp.path());
}
