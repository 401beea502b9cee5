// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Spec file parsing and data types for .pinenv.yaml files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::SpecLocation;
use crate::package::DEFAULT_UNIVERSE_ROOT;
use crate::{ComposedEnvironment, Error, PackageRef, SnapshotPin};

#[cfg(test)]
#[path = "./spec_test.rs"]
mod spec_test;

/// API version for spec files.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum ApiVersion {
    #[default]
    #[serde(rename = "pinenv/v0")]
    V0,
}

/// Helper for two-stage deserialization to determine API version first.
#[derive(Deserialize)]
struct ApiVersionMapping {
    #[serde(default)]
    api: ApiVersion,
}

/// One environment spec as written in a .pinenv.yaml file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnvSpec {
    /// API version identifier.
    #[serde(default)]
    pub api: ApiVersion,

    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// In-tree inheritance control.
    /// When false (default), stops walking up directory tree.
    #[serde(default)]
    pub inherit: bool,

    /// Other spec files composed before this one.
    /// Relative paths are resolved relative to this file's directory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,

    /// Root that attribute paths may be written relative to (default `pkgs`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    /// Package requests, earliest takes PATH precedence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,

    /// Environment variables injected into the session.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,

    /// Host variables retained when `pure` is set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keep: Vec<String>,

    /// Shell fragment run once on activation, stored verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,

    /// Discard inherited host variables except the allowlist.
    #[serde(default)]
    pub pure: bool,

    /// Snapshot the packages are resolved against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,

    /// Path to the file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

fn yaml_error(error: serde_yaml::Error) -> Error {
    let (line, column) = match error.location() {
        Some(loc) => (Some(loc.line()), Some(loc.column())),
        None => (None, None),
    };
    Error::spec_syntax(
        SpecLocation {
            line,
            column,
            ..Default::default()
        },
        error.to_string(),
    )
}

/// Whether a name can be used as an environment variable.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl EnvSpec {
    /// Parse spec from YAML string.
    pub fn from_yaml<S: Into<String>>(yaml: S) -> crate::Result<Self> {
        let yaml = yaml.into();

        // Stage 1: Parse to get API version
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).map_err(yaml_error)?;
        // an empty document is an empty spec
        if value.is_null() {
            return Ok(Self::default());
        }

        let with_version: ApiVersionMapping = serde_yaml::from_value(value).map_err(yaml_error)?;

        // Stage 2: Deserialize based on version. Values carry no position,
        // so reparse the text to keep line numbers in errors.
        match with_version.api {
            ApiVersion::V0 => serde_yaml::from_str(&yaml).map_err(yaml_error),
        }
    }

    /// Load spec from file path.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;

        let mut spec = Self::from_yaml(yaml).map_err(|e| match e {
            Error::SpecSyntax { location, message } => Error::SpecSyntax {
                location: location.with_file(Some(path.to_path_buf())),
                message,
            },
            other => other,
        })?;
        spec.source_path = Some(path.to_path_buf());
        spec.validate()?;
        Ok(spec)
    }

    fn location<S: Into<String>>(&self, field: S) -> SpecLocation {
        SpecLocation::field(field).with_file(self.source_path.clone())
    }

    /// Validate field contents that the YAML schema alone cannot express.
    pub fn validate(&self) -> crate::Result<()> {
        for name in self.variables.keys() {
            if !is_valid_identifier(name) {
                return Err(Error::spec_syntax(
                    self.location(format!("variables.{name}")),
                    format!("'{name}' is not a valid variable name"),
                ));
            }
        }

        for (i, name) in self.keep.iter().enumerate() {
            if !is_valid_identifier(name) {
                return Err(Error::spec_syntax(
                    self.location(format!("keep[{i}]")),
                    format!("'{name}' is not a valid variable name"),
                ));
            }
        }

        for (i, package) in self.packages.iter().enumerate() {
            if let Err(err) = package.parse::<PackageRef>() {
                return Err(Error::spec_syntax(
                    self.location(format!("packages[{i}]")),
                    err.to_string(),
                ));
            }
        }

        if let Some(root) = &self.root {
            if root.is_empty() || root.contains('.') {
                return Err(Error::spec_syntax(
                    self.location("root"),
                    format!("'{root}' must be a single attribute name"),
                ));
            }
        }

        if let Some(pin) = &self.pin {
            if let Err(err) = pin.parse::<SnapshotPin>() {
                return Err(Error::spec_syntax(self.location("pin"), err.to_string()));
            }
        }

        Ok(())
    }
}

/// A validated, normalized environment ready for resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvironmentSpec {
    /// Requested packages, earlier entries shadow later ones.
    pub packages: Vec<PackageRef>,
    pub variables: BTreeMap<String, String>,
    pub hook: Option<String>,
    pub pure: bool,
    /// Extra host variables retained under `pure`.
    pub keep: Vec<String>,
    pub pin: Option<SnapshotPin>,
}

impl EnvironmentSpec {
    /// Normalize a composed environment into a resolvable spec.
    pub fn from_composed(composed: &ComposedEnvironment) -> crate::Result<Self> {
        let root = composed.root.as_deref().unwrap_or(DEFAULT_UNIVERSE_ROOT);

        let mut packages = Vec::with_capacity(composed.packages.len());
        for (i, package) in composed.packages.iter().enumerate() {
            let parsed: PackageRef = package.parse().map_err(|e: Error| {
                Error::spec_syntax(SpecLocation::field(format!("packages[{i}]")), e.to_string())
            })?;
            packages.push(parsed.normalized(root));
        }

        for name in composed.variables.keys().chain(composed.keep.iter()) {
            if !is_valid_identifier(name) {
                return Err(Error::spec_syntax(
                    SpecLocation::field(format!("variables.{name}")),
                    format!("'{name}' is not a valid variable name"),
                ));
            }
        }

        let pin = match &composed.pin {
            Some(pin) => Some(pin.parse().map_err(|e: Error| {
                Error::spec_syntax(SpecLocation::field("pin"), e.to_string())
            })?),
            None => None,
        };

        let hook = if composed.hooks.is_empty() {
            None
        } else {
            Some(composed.hooks.join("\n"))
        };

        Ok(Self {
            packages,
            variables: composed.variables.clone(),
            hook,
            pure: composed.pure,
            keep: composed.keep.clone(),
            pin,
        })
    }

    /// Replace the package list, eg: from a command line override.
    pub fn with_packages<I, S>(mut self, packages: I, root: &str) -> crate::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Vec::new();
        for (i, package) in packages.into_iter().enumerate() {
            let package: PackageRef = package.as_ref().parse().map_err(|e: Error| {
                Error::spec_syntax(SpecLocation::field(format!("packages[{i}]")), e.to_string())
            })?;
            parsed.push(package.normalized(root));
        }
        self.packages = parsed;
        Ok(self)
    }
}

/// Parse a single spec document into a normalized environment spec.
pub fn parse(raw: &str) -> crate::Result<EnvironmentSpec> {
    let spec = EnvSpec::from_yaml(raw)?;
    spec.validate()?;
    let composed = crate::compose_specs(std::slice::from_ref(&spec));
    EnvironmentSpec::from_composed(&composed)
}
