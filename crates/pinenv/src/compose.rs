// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Composition logic for merging multiple specs into a single environment.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::EnvSpec;

#[cfg(test)]
#[path = "./compose_test.rs"]
mod compose_test;

/// Composed environment from multiple specs.
#[derive(Debug, Clone, Default)]
pub struct ComposedEnvironment {
    /// Package requests, most specific spec first.
    pub packages: Vec<String>,

    /// Merged variables (later specs win).
    pub variables: BTreeMap<String, String>,

    /// Hooks in composition order.
    pub hooks: Vec<String>,

    /// Set when any contributing spec asks for purity.
    pub pure: bool,

    /// Union of retained variable names, in first-seen order.
    pub keep: Vec<String>,

    /// Snapshot pin (last spec wins if set).
    pub pin: Option<String>,

    /// Universe root (last spec wins if set).
    pub root: Option<String>,

    /// Source files that contributed to this composition.
    pub source_files: Vec<PathBuf>,
}

impl ComposedEnvironment {
    /// Create a new empty composed environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the environment requests any packages.
    pub fn has_packages(&self) -> bool {
        !self.packages.is_empty()
    }

    /// Get the number of source files.
    pub fn source_count(&self) -> usize {
        self.source_files.len()
    }
}

/// Compose multiple specs into a single environment.
///
/// Specs are processed in order, with later specs layering on top of earlier
/// ones: their packages shadow earlier packages and their variables win.
pub fn compose_specs(specs: &[EnvSpec]) -> ComposedEnvironment {
    let mut composed = ComposedEnvironment::default();

    for spec in specs {
        // Packages: later specs go in front so they take PATH precedence
        let mut packages = spec.packages.clone();
        packages.extend(composed.packages.drain(..));
        composed.packages = packages;

        composed
            .variables
            .extend(spec.variables.iter().map(|(k, v)| (k.clone(), v.clone())));

        if let Some(hook) = &spec.hook {
            composed.hooks.push(hook.clone());
        }

        composed.pure |= spec.pure;

        for name in &spec.keep {
            if !composed.keep.contains(name) {
                composed.keep.push(name.clone());
            }
        }

        if let Some(pin) = &spec.pin {
            if let Some(previous) = composed.pin.as_ref().filter(|p| *p != pin) {
                tracing::debug!(%previous, %pin, "later spec overrides pin");
            }
            composed.pin = Some(pin.clone());
        }

        if spec.root.is_some() {
            composed.root = spec.root.clone();
        }

        // Track source file
        if let Some(path) = &spec.source_path {
            composed.source_files.push(path.clone());
        }
    }

    composed
}
