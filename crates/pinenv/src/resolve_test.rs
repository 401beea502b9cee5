// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

use rstest::{fixture, rstest};

use super::*;
use crate::parse;

#[fixture]
fn universe() -> PackageUniverse {
    let yaml = r#"
store_root: /nix/store
packages:
  cowsay:
    version: "3.04"
    store_path: /nix/store/aaa-cowsay-3.04
  lolcat:
    version: "100.0.1"
    store_path: /nix/store/bbb-lolcat-100.0.1
  python311:
    pname: python3
    version: "3.11.9"
  python312:
    pname: python3
    version: "3.12.4"
  python3Packages.xmljson:
    version: "0.2.1"
  python3Packages.requests:
    version: "2.31.0"
  python3Packages.requests_2_28:
    pname: requests
    version: "2.28.2"
  perlPackages.ack:
    version: "3.7.0"
"#;
    PackageUniverse::from_yaml("rev:0123456789".parse().unwrap(), yaml).unwrap()
}

fn spec(packages: &[&str]) -> EnvironmentSpec {
    EnvironmentSpec::default()
        .with_packages(packages, crate::DEFAULT_UNIVERSE_ROOT)
        .unwrap()
}

#[rstest]
fn test_resolve_cowsay_lolcat(universe: PackageUniverse) {
    let resolved = resolve(&spec(&["cowsay", "lolcat"]), &universe).expect("Should resolve");
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0].store_path, PathBuf::from("/nix/store/aaa-cowsay-3.04"));
    assert_eq!(resolved[0].bin_dirs, vec![PathBuf::from("/nix/store/aaa-cowsay-3.04/bin")]);
    assert_eq!(resolved[1].attr_path, "lolcat");
}

#[rstest]
fn test_resolve_is_deterministic(universe: PackageUniverse) {
    let spec = spec(&["python3Packages.xmljson", "ack", "python3@3.12"]);
    let first = resolve(&spec, &universe).unwrap();
    let second = resolve(&spec, &universe).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_yaml::to_string(&first).unwrap(),
        serde_yaml::to_string(&second).unwrap()
    );
}

#[rstest]
fn test_package_not_found(universe: PackageUniverse) {
    let result = resolve(&spec(&["doesnotexist"]), &universe);
    match result {
        Err(Error::PackageNotFound { reference, .. }) => assert_eq!(reference, "doesnotexist"),
        other => panic!("Expected PackageNotFound, got: {other:?}"),
    }
}

#[rstest]
fn test_not_found_suggests_similar(universe: PackageUniverse) {
    match resolve(&spec(&["cow"]), &universe) {
        Err(Error::PackageNotFound { similar, .. }) => assert_eq!(similar, vec!["cowsay"]),
        other => panic!("Expected PackageNotFound, got: {other:?}"),
    }
}

#[rstest]
fn test_resolution_is_atomic(universe: PackageUniverse) {
    let result = resolve(&spec(&["cowsay", "doesnotexist", "lolcat"]), &universe);
    assert!(matches!(result, Err(Error::PackageNotFound { .. })));
}

#[rstest]
fn test_bare_name_across_attrs_is_ambiguous(universe: PackageUniverse) {
    match resolve(&spec(&["python3"]), &universe) {
        Err(Error::AmbiguousReference { candidates, .. }) => {
            assert_eq!(candidates, vec!["python311", "python312"])
        }
        other => panic!("Expected AmbiguousReference, got: {other:?}"),
    }
}

#[rstest]
fn test_version_constraint_disambiguates(universe: PackageUniverse) {
    let resolved = resolve(&spec(&["python3@3.11"]), &universe).unwrap();
    assert_eq!(resolved[0].attr_path, "python311");
    assert_eq!(resolved[0].version, "3.11.9");
}

#[rstest]
fn test_bare_name_matches_nested_attr(universe: PackageUniverse) {
    let resolved = resolve(&spec(&["ack"]), &universe).unwrap();
    assert_eq!(resolved[0].attr_path, "perlPackages.ack");
}

#[rstest]
fn test_exact_attr_path_wins(universe: PackageUniverse) {
    // `requests_2_28` would also match by name, but the exact path wins
    let resolved = resolve(&spec(&["pkgs.python3Packages.requests"]), &universe).unwrap();
    assert_eq!(resolved[0].attr_path, "python3Packages.requests");
}

#[rstest]
fn test_partial_attr_match_with_versions_is_ambiguous(universe: PackageUniverse) {
    // the exact entry satisfies `@2`, so no name matching happens
    let resolved = resolve(&spec(&["python3Packages.requests@2"]), &universe).unwrap();
    assert_eq!(resolved[0].attr_path, "python3Packages.requests");

    // a partial path matching several versions is never guessed
    match resolve(&spec(&["python3Packages.req"]), &universe) {
        Err(Error::AmbiguousReference { candidates, .. }) => assert_eq!(
            candidates,
            vec!["python3Packages.requests", "python3Packages.requests_2_28"]
        ),
        other => panic!("Expected AmbiguousReference, got: {other:?}"),
    }
}

#[rstest]
fn test_dotted_version_fallback(universe: PackageUniverse) {
    let resolved = resolve(&spec(&["python3Packages.requests@2.28"]), &universe).unwrap();
    assert_eq!(resolved[0].attr_path, "python3Packages.requests_2_28");
}

#[rstest]
fn test_duplicate_requests_keep_first_position(universe: PackageUniverse) {
    let resolved = resolve(&spec(&["lolcat", "cowsay", "pkgs.lolcat"]), &universe).unwrap();
    let attrs: Vec<_> = resolved.iter().map(|p| p.attr_path.as_str()).collect();
    assert_eq!(attrs, vec!["lolcat", "cowsay"]);
}

#[rstest]
fn test_empty_spec_resolves_to_nothing(universe: PackageUniverse) {
    let spec = parse("").unwrap();
    assert!(resolve(&spec, &universe).unwrap().is_empty());
}
