// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! User configuration for pinenv.
//!
//! Settings are layered: built-in defaults, then the yaml config file, then
//! `PINENV_*` environment variables using `__` for nesting, eg:
//! `PINENV_STORE__FETCH_TIMEOUT_SECS=60`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::Result;

#[cfg(test)]
#[path = "./config_test.rs"]
mod config_test;

/// Points at an alternate config file.
pub const CONFIG_PATH_VAR: &str = "PINENV_CONFIG";

const ENV_PREFIX: &str = "PINENV";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const FALLBACK_SHELL: &str = "/bin/sh";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub environment: EnvironmentConfig,
}

/// Where pinned universes come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one `<pin-hash>.yaml` per universe.
    pub mirror: PathBuf,
    pub fetch_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let mirror = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("pinenv")
            .join("universes");
        Self {
            mirror,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl StoreConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Host variables retained in every pure environment.
    pub keep: Vec<String>,
    /// Shell used for interactive sessions and activation hooks.
    pub shell: Option<PathBuf>,
}

impl EnvironmentConfig {
    /// The configured shell, else `$SHELL` from the given environment, else `/bin/sh`.
    pub fn shell(&self, host: &BTreeMap<String, String>) -> PathBuf {
        self.shell
            .clone()
            .or_else(|| host.get("SHELL").filter(|s| !s.is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(FALLBACK_SHELL))
    }

    /// The shell that runs activation hooks.
    ///
    /// Hooks are POSIX scripts, so `$SHELL` is not consulted.
    pub fn hook_shell(&self) -> PathBuf {
        self.shell
            .clone()
            .unwrap_or_else(|| PathBuf::from(FALLBACK_SHELL))
    }
}

/// The default location of the user config file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pinenv").join("config.yaml"))
}

/// Load configuration from the user's config file and process environment.
///
/// A file named by `PINENV_CONFIG` must exist; the default file is optional.
pub fn load_config() -> Result<Config> {
    match std::env::var_os(CONFIG_PATH_VAR) {
        Some(path) => load_config_from(Some(Path::new(&path)), None),
        None => {
            let default = default_config_path().filter(|p| p.exists());
            load_config_from(default.as_deref(), None)
        }
    }
}

/// Load configuration from an explicit file and environment.
///
/// When `env` is `None` the process environment is read.
pub fn load_config_from(
    file: Option<&Path>,
    env: Option<config::Map<String, String>>,
) -> Result<Config> {
    let mut builder = config::Config::builder();

    if let Some(path) = file {
        tracing::debug!(?path, "loading config file");
        builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("environment.keep")
            .source(env),
    );

    let config = builder.build()?.try_deserialize()?;
    Ok(config)
}
