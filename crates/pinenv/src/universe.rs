// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! The package universe named by a snapshot pin.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::SnapshotPin;

#[cfg(test)]
#[path = "./universe_test.rs"]
mod universe_test;

/// Store prefix used when a universe does not declare one.
pub const DEFAULT_STORE_ROOT: &str = "/pinenv/store";

/// Length of the hash part of derived store path names.
const STORE_HASH_LEN: usize = 32;

fn default_store_root() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_ROOT)
}

fn default_bin_dirs() -> Vec<String> {
    vec!["bin".to_string()]
}

/// Whether a path stays inside the directory it is joined onto.
fn is_store_relative(dir: &str) -> bool {
    Path::new(dir)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Metadata for one package definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackageMeta {
    /// Package name, defaults to the last attribute path segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pname: Option<String>,

    pub version: String,

    /// Content-addressed location, derived from the pin when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,

    /// Directories under the store path that contribute to PATH.
    #[serde(default = "default_bin_dirs")]
    pub bin_dirs: Vec<String>,

    /// Attribute paths of runtime dependencies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

/// Raw on-disk layout of a universe file.
#[derive(Debug, Deserialize, Serialize)]
struct UniverseFile {
    #[serde(default = "default_store_root")]
    store_root: PathBuf,
    #[serde(default)]
    packages: BTreeMap<String, PackageMeta>,
}

/// An immutable catalog of package definitions for one pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUniverse {
    pin: SnapshotPin,
    store_root: PathBuf,
    packages: BTreeMap<String, PackageMeta>,
}

impl PackageUniverse {
    pub fn new(pin: SnapshotPin, packages: BTreeMap<String, PackageMeta>) -> Self {
        Self {
            pin,
            store_root: default_store_root(),
            packages,
        }
    }

    pub fn with_store_root<P: Into<PathBuf>>(mut self, store_root: P) -> Self {
        self.store_root = store_root.into();
        self
    }

    /// Parse a universe from YAML content published for the given pin.
    pub fn from_yaml(pin: SnapshotPin, yaml: &str) -> crate::Result<Self> {
        let file: UniverseFile =
            serde_yaml::from_str(yaml).map_err(|e| crate::Error::UnresolvablePin {
                pin: pin.to_string(),
                reason: format!("invalid universe data: {e}"),
            })?;
        for (attr, meta) in &file.packages {
            attr.parse::<crate::AttrPath>()
                .map_err(|reason| crate::Error::UnresolvablePin {
                    pin: pin.to_string(),
                    reason,
                })?;
            if let Some(dir) = meta.bin_dirs.iter().find(|dir| !is_store_relative(dir)) {
                return Err(crate::Error::UnresolvablePin {
                    pin: pin.to_string(),
                    reason: format!("{attr}: bin dir '{dir}' must be relative to the store path"),
                });
            }
        }
        Ok(Self {
            pin,
            store_root: file.store_root,
            packages: file.packages,
        })
    }

    pub fn pin(&self) -> &SnapshotPin {
        &self.pin
    }

    pub fn get(&self, attr_path: &str) -> Option<&PackageMeta> {
        self.packages.get(attr_path)
    }

    /// All entries in attribute path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PackageMeta)> {
        self.packages.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// The package name of an entry.
    pub fn pname<'a>(&self, attr_path: &'a str, meta: &'a PackageMeta) -> &'a str {
        meta.pname
            .as_deref()
            .unwrap_or_else(|| attr_path.rsplit('.').next().unwrap_or(attr_path))
    }

    /// The store path of an entry, derived from the pin when not published.
    pub fn store_path(&self, attr_path: &str, meta: &PackageMeta) -> PathBuf {
        if let Some(path) = &meta.store_path {
            return path.clone();
        }

        let mut hasher = Sha256::new();
        hasher.update(self.pin.cache_key().as_bytes());
        hasher.update([0]);
        hasher.update(attr_path.as_bytes());
        hasher.update([0]);
        hasher.update(meta.version.as_bytes());
        let encoded = BASE32_NOPAD.encode(&hasher.finalize()).to_ascii_lowercase();
        let hash = &encoded[..STORE_HASH_LEN];

        self.store_root.join(format!(
            "{hash}-{}-{}",
            self.pname(attr_path, meta),
            meta.version
        ))
    }
}
