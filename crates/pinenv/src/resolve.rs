// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Resolution of package references against a pinned universe.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{EnvironmentSpec, Error, PackageMeta, PackageRef, PackageUniverse, Result};

#[cfg(test)]
#[path = "./resolve_test.rs"]
mod resolve_test;

/// Upper bound on suggestions attached to a not-found error.
const MAX_SUGGESTIONS: usize = 5;

/// A package reference bound to a concrete universe entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPackage {
    /// The request as written in the spec.
    pub reference: PackageRef,
    /// The universe entry it resolved to.
    pub attr_path: String,
    pub version: String,
    pub store_path: PathBuf,
    /// Directories contributing to PATH, most preferred first.
    pub bin_dirs: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl ResolvedPackage {
    fn new(
        reference: &PackageRef,
        attr_path: &str,
        meta: &PackageMeta,
        universe: &PackageUniverse,
    ) -> Self {
        let store_path = universe.store_path(attr_path, meta);
        let bin_dirs = meta
            .bin_dirs
            .iter()
            .map(|dir| store_path.join(dir))
            .collect();
        Self {
            reference: reference.clone(),
            attr_path: attr_path.to_string(),
            version: meta.version.clone(),
            store_path,
            bin_dirs,
            dependencies: meta.dependencies.clone(),
        }
    }
}

/// Resolve every package in the spec, in order.
///
/// Resolution is all or nothing: the first failing reference fails the
/// whole environment and nothing partial is returned.
pub fn resolve(
    spec: &EnvironmentSpec,
    universe: &PackageUniverse,
) -> Result<Vec<ResolvedPackage>> {
    let mut resolved: Vec<ResolvedPackage> = Vec::with_capacity(spec.packages.len());
    let mut seen = HashSet::new();

    for reference in &spec.packages {
        let package = resolve_one(reference, universe)?;
        if !seen.insert(package.attr_path.clone()) {
            tracing::debug!(%reference, attr = %package.attr_path, "duplicate package request");
            continue;
        }
        tracing::debug!(%reference, store_path = %package.store_path.display(), "resolved");
        resolved.push(package);
    }

    Ok(resolved)
}

/// Resolve a single reference.
pub fn resolve_one(
    reference: &PackageRef,
    universe: &PackageUniverse,
) -> Result<ResolvedPackage> {
    let attr = reference.attr_path().to_string();

    // exact attribute paths always win over name matches
    if let Some(meta) = universe.get(&attr) {
        if reference.accepts(&meta.version) {
            return Ok(ResolvedPackage::new(reference, &attr, meta, universe));
        }
    }

    let candidates: Vec<(&str, &PackageMeta)> = universe
        .iter()
        .filter(|(key, _)| *key != attr)
        .filter(|(key, meta)| is_name_match(reference, key, universe.pname(key, meta)))
        .filter(|(_, meta)| reference.accepts(&meta.version))
        .collect();

    match candidates.as_slice() {
        [] => Err(Error::PackageNotFound {
            reference: reference.to_string(),
            similar: similar_entries(reference, universe),
        }),
        [(key, meta)] => Ok(ResolvedPackage::new(reference, key, meta, universe)),
        many => Err(Error::AmbiguousReference {
            reference: reference.to_string(),
            candidates: many.iter().map(|(key, _)| key.to_string()).collect(),
        }),
    }
}

/// Whether a universe entry is a name-level (non exact) match for a reference.
fn is_name_match(reference: &PackageRef, key: &str, pname: &str) -> bool {
    let path = reference.attr_path();
    let name = path.name();
    let (parent, last) = match key.rsplit_once('.') {
        Some((parent, last)) => (Some(parent), last),
        None => (None, key),
    };

    if path.is_bare() {
        return last == name || pname == name;
    }

    // a dotted reference only matches variants under the same parent,
    // eg: `python3Packages.xmljson` vs `python3Packages.xmljson_0_2`
    let wanted_parent = path.parent().join(".");
    parent == Some(wanted_parent.as_str()) && (last.starts_with(name) || pname == name)
}

fn similar_entries(reference: &PackageRef, universe: &PackageUniverse) -> Vec<String> {
    let needle = reference.name().to_ascii_lowercase();
    universe
        .iter()
        .map(|(key, _)| key)
        .filter(|key| {
            let key = key.to_ascii_lowercase();
            key.contains(&needle) || (key.len() >= 3 && needle.contains(&key))
        })
        .take(MAX_SUGGESTIONS)
        .map(String::from)
        .collect()
}
