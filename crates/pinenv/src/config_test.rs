// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

fn env(pairs: &[(&str, &str)]) -> config::Map<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[rstest]
fn test_defaults() {
    let config = load_config_from(None, Some(env(&[]))).unwrap();
    assert_eq!(config.store.fetch_timeout(), Duration::from_secs(30));
    assert!(config.store.mirror.ends_with("pinenv/universes"));
    assert!(config.environment.keep.is_empty());
    assert_eq!(config.environment.shell, None);
}

#[rstest]
fn test_load_from_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.yaml");
    std::fs::write(
        &path,
        "store:\n  mirror: /srv/universes\nenvironment:\n  keep: [SSH_AUTH_SOCK]\n  shell: /bin/zsh\n",
    )
    .unwrap();

    let config = load_config_from(Some(&path), Some(env(&[]))).unwrap();
    assert_eq!(config.store.mirror, PathBuf::from("/srv/universes"));
    assert_eq!(config.store.fetch_timeout_secs, 30);
    assert_eq!(config.environment.keep, vec!["SSH_AUTH_SOCK"]);
    assert_eq!(config.environment.shell, Some(PathBuf::from("/bin/zsh")));
}

#[rstest]
fn test_environment_overrides_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.yaml");
    std::fs::write(&path, "store:\n  mirror: /srv/universes\n  fetch_timeout_secs: 5\n").unwrap();

    let config = load_config_from(
        Some(&path),
        Some(env(&[
            ("PINENV_STORE__FETCH_TIMEOUT_SECS", "60"),
            ("PINENV_ENVIRONMENT__KEEP", "SSH_AUTH_SOCK,DISPLAY"),
            // unrelated pinenv variables are ignored
            ("PINENV_DEPTH", "2"),
        ])),
    )
    .unwrap();
    assert_eq!(config.store.mirror, PathBuf::from("/srv/universes"));
    assert_eq!(config.store.fetch_timeout_secs, 60);
    assert_eq!(config.environment.keep, vec!["SSH_AUTH_SOCK", "DISPLAY"]);
}

#[rstest]
fn test_missing_explicit_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = load_config_from(Some(&tmp.path().join("missing.yaml")), Some(env(&[])));
    assert!(matches!(result, Err(crate::Error::Config(_))));
}

#[rstest]
#[case(Some("/bin/fish"), Some("/bin/zsh"), "/bin/fish")]
#[case(None, Some("/bin/zsh"), "/bin/zsh")]
#[case(None, None, "/bin/sh")]
fn test_shell_fallback(
    #[case] configured: Option<&str>,
    #[case] host_shell: Option<&str>,
    #[case] expected: &str,
) {
    let environment = EnvironmentConfig {
        shell: configured.map(PathBuf::from),
        ..Default::default()
    };
    let host: BTreeMap<String, String> = host_shell
        .map(|s| ("SHELL".to_string(), s.to_string()))
        .into_iter()
        .collect();
    assert_eq!(environment.shell(&host), PathBuf::from(expected));
}

#[rstest]
#[case(Some("/bin/bash"), "/bin/bash")]
#[case(None, "/bin/sh")]
fn test_hook_shell_ignores_host_shell(#[case] configured: Option<&str>, #[case] expected: &str) {
    let environment = EnvironmentConfig {
        shell: configured.map(PathBuf::from),
        ..Default::default()
    };
    assert_eq!(environment.hook_shell(), PathBuf::from(expected));
}
