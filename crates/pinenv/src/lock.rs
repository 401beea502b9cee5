// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Lock file structures and helpers for pinenv.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{ComposedEnvironment, Error, ResolvedPackage, Result, SnapshotPin};

#[cfg(test)]
#[path = "./lock_test.rs"]
mod lock_test;

/// Lock file API version.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub enum LockApiVersion {
    #[serde(rename = "pinenv/v0/lock")]
    V0,
}

/// Lock file structure capturing sources, the pin and resolved packages.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LockFile {
    pub api: LockApiVersion,
    pub generated: GenerationMetadata,
    pub sources: Vec<SourceFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<SnapshotPin>,
    #[serde(default)]
    pub packages: Vec<LockedPackage>,
}

/// Metadata about when and where the lock was generated.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GenerationMetadata {
    pub timestamp: DateTime<Utc>,
    pub pinenv_version: String,
    pub hostname: String,
}

/// Source spec file tracked by the lock.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub sha256: String,
    pub mtime: DateTime<Utc>,
}

/// Resolved package in the locked environment.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LockedPackage {
    /// The request as written in the spec.
    pub reference: String,
    pub attr_path: String,
    pub version: String,
    pub store_path: PathBuf,
}

impl From<&ResolvedPackage> for LockedPackage {
    fn from(package: &ResolvedPackage) -> Self {
        Self {
            reference: package.reference.to_string(),
            attr_path: package.attr_path.clone(),
            version: package.version.clone(),
            store_path: package.store_path.clone(),
        }
    }
}

impl LockedPackage {
    fn describe(&self) -> String {
        format!("{}-{} ({})", self.attr_path, self.version, self.store_path.display())
    }
}

impl LockFile {
    /// Read and parse a lock file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|error| Error::ReadFailed {
            path: path.to_path_buf(),
            error,
        })?;
        serde_yaml::from_str(&yaml).map_err(|err| Error::InvalidLockFile {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Write the lock file as yaml.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).map_err(|err| Error::InvalidLockFile {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        std::fs::write(path, yaml)?;
        Ok(())
    }
}

fn hash_file(path: &Path) -> Result<String> {
    let content = std::fs::read(path).map_err(|error| Error::ReadFailed {
        path: path.to_path_buf(),
        error,
    })?;
    Ok(format!("{:x}", Sha256::digest(&content)))
}

fn modified_time(path: &Path) -> Result<DateTime<Utc>> {
    let metadata = std::fs::metadata(path)?;
    Ok(metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .and_then(|d| DateTime::from_timestamp(d.as_secs() as i64, 0))
        .unwrap_or_else(Utc::now))
}

/// Generate a lock file from a composed environment and its resolution.
pub fn generate_lock(
    composed: &ComposedEnvironment,
    resolved: &[ResolvedPackage],
    pin: Option<&SnapshotPin>,
) -> Result<LockFile> {
    let mut sources = Vec::with_capacity(composed.source_files.len());
    for path in &composed.source_files {
        sources.push(SourceFile {
            path: path.clone(),
            sha256: hash_file(path)?,
            mtime: modified_time(path)?,
        });
    }

    Ok(LockFile {
        api: LockApiVersion::V0,
        generated: GenerationMetadata {
            timestamp: Utc::now(),
            pinenv_version: env!("CARGO_PKG_VERSION").to_string(),
            hostname: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string()),
        },
        sources,
        pin: pin.cloned(),
        packages: resolved.iter().map(LockedPackage::from).collect(),
    })
}

/// Verify a lock file against the current environment.
///
/// Returns every difference found; an empty list means the lock is current.
pub fn verify_lock(
    lock: &LockFile,
    composed: &ComposedEnvironment,
    resolved: &[ResolvedPackage],
    pin: Option<&SnapshotPin>,
) -> Result<Vec<LockChange>> {
    let mut changes = Vec::new();

    for source in &lock.sources {
        if !composed.source_files.contains(&source.path) || !source.path.exists() {
            changes.push(LockChange {
                kind: LockChangeKind::SourceFileRemoved,
                reference: source.path.display().to_string(),
                expected: Some(source.sha256.clone()),
                actual: None,
            });
            continue;
        }

        let actual = hash_file(&source.path)?;
        if actual != source.sha256 {
            changes.push(LockChange {
                kind: LockChangeKind::SourceFileChanged,
                reference: source.path.display().to_string(),
                expected: Some(source.sha256.clone()),
                actual: Some(actual),
            });
        }
    }

    for path in &composed.source_files {
        if !lock.sources.iter().any(|s| &s.path == path) {
            changes.push(LockChange {
                kind: LockChangeKind::SourceFileAdded,
                reference: path.display().to_string(),
                expected: None,
                actual: Some(hash_file(path)?),
            });
        }
    }

    if lock.pin.as_ref() != pin {
        changes.push(LockChange {
            kind: LockChangeKind::PinChanged,
            reference: "pin".to_string(),
            expected: lock.pin.as_ref().map(ToString::to_string),
            actual: pin.map(ToString::to_string),
        });
    }

    let current: BTreeMap<String, LockedPackage> = resolved
        .iter()
        .map(LockedPackage::from)
        .map(|p| (p.reference.clone(), p))
        .collect();

    for locked in &lock.packages {
        match current.get(&locked.reference) {
            None => changes.push(LockChange {
                kind: LockChangeKind::PackageRemoved,
                reference: locked.reference.clone(),
                expected: Some(locked.describe()),
                actual: None,
            }),
            Some(actual) if actual != locked => changes.push(LockChange {
                kind: LockChangeKind::PackageChanged,
                reference: locked.reference.clone(),
                expected: Some(locked.describe()),
                actual: Some(actual.describe()),
            }),
            Some(_) => {}
        }
    }

    for package in resolved {
        let reference = package.reference.to_string();
        if !lock.packages.iter().any(|p| p.reference == reference) {
            changes.push(LockChange {
                kind: LockChangeKind::PackageAdded,
                reference,
                expected: None,
                actual: Some(LockedPackage::from(package).describe()),
            });
        }
    }

    Ok(changes)
}

/// A single detected change between lock and current environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockChange {
    pub kind: LockChangeKind,
    pub reference: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

/// Types of lock mismatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockChangeKind {
    PinChanged,
    PackageChanged,
    PackageAdded,
    PackageRemoved,
    SourceFileChanged,
    SourceFileAdded,
    SourceFileRemoved,
}
