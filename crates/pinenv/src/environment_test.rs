// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::path::PathBuf;

use rstest::rstest;

use crate::environment::{escape_value, generate_startup_script, join_path, split_path};
use crate::materialize::{MaterializeOptions, build_session};
use crate::EnvironmentSpec;

fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[rstest]
#[case("/usr/bin:/bin", vec!["/usr/bin", "/bin"])]
#[case("/usr/bin::/bin:", vec!["/usr/bin", "/bin"])]
#[case("", vec![])]
fn test_split_path(#[case] value: &str, #[case] expected: Vec<&str>) {
    let expected: Vec<PathBuf> = expected.into_iter().map(PathBuf::from).collect();
    assert_eq!(split_path(value), expected);
}

#[test]
fn test_join_path() {
    let dirs = vec![PathBuf::from("/a/bin"), PathBuf::from("/b/bin")];
    assert_eq!(join_path(&dirs).unwrap(), "/a/bin:/b/bin");
    assert!(join_path(&[PathBuf::from("/bad:dir")]).is_err());
}

#[rstest]
#[case("plain", "plain")]
#[case("value with $dollar", "value with \\$dollar")]
#[case("\"quoted\"", "\\\"quoted\\\"")]
#[case("back`tick`\\", "back\\`tick\\`\\\\")]
fn test_escape_value(#[case] value: &str, #[case] expected: &str) {
    assert_eq!(escape_value(value), expected);
}

#[test]
fn test_generate_startup_script() {
    let previous = vars(&[("HOME", "/home/user"), ("FOO", "old"), ("GONE", "x")]);
    let spec = EnvironmentSpec {
        pure: true,
        variables: vars(&[("FOO", "new $value")]),
        ..Default::default()
    };
    let session = build_session(&[], &spec, &previous, &MaterializeOptions::default()).unwrap();

    let script = generate_startup_script(&session, &previous, Some("echo ready"));

    assert!(script.starts_with("# generated by pinenv\n"));
    assert!(script.contains("unset GONE\n"));
    assert!(script.contains("export FOO=\"new \\$value\"\n"));
    assert!(script.contains("export PINENV_ACTIVE=\"1\"\n"));
    // unchanged variables are left alone
    assert!(!script.contains("HOME"));
    assert!(script.ends_with("echo ready\n"));
}

#[test]
fn test_generate_startup_script_without_hook() {
    let previous = vars(&[("PATH", "/usr/bin")]);
    let session = build_session(
        &[],
        &EnvironmentSpec::default(),
        &previous,
        &MaterializeOptions::default(),
    )
    .unwrap();
    let script = generate_startup_script(&session, &previous, None);
    assert!(!script.contains("activation hook"));
    assert!(!script.contains("unset"));
}

#[test]
fn test_startup_script_skips_unassignable_names() {
    let previous = vars(&[("BASH_FUNC_foo%%", "() {  echo foo\n}"), ("GONE", "x")]);
    let spec = EnvironmentSpec {
        pure: true,
        variables: vars(&[("FOO", "bar")]),
        ..Default::default()
    };
    let session = build_session(&[], &spec, &previous, &MaterializeOptions::default()).unwrap();

    let script = generate_startup_script(&session, &previous, None);
    assert!(!script.contains("BASH_FUNC"));
    assert!(script.contains("unset GONE\n"));
    assert!(script.contains("export FOO=\"bar\"\n"));
}

#[cfg(unix)]
#[test]
fn test_startup_script_runs_under_sh() {
    let previous = vars(&[("BASH_FUNC_foo%%", "() {  echo foo\n}"), ("GONE", "x")]);
    let spec = EnvironmentSpec {
        pure: true,
        variables: vars(&[("FOO", "bar")]),
        ..Default::default()
    };
    let session = build_session(&[], &spec, &previous, &MaterializeOptions::default()).unwrap();
    let script = generate_startup_script(&session, &previous, None);

    let output = std::process::Command::new("/bin/sh")
        .arg("-c")
        .arg(format!("{script}echo \"reached $FOO\""))
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "reached bar\n");
}
