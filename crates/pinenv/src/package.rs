// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Package references as written in the `packages:` list of a spec.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

#[cfg(test)]
#[path = "./package_test.rs"]
mod package_test;

/// Default root that attribute paths may be written relative to.
pub const DEFAULT_UNIVERSE_ROOT: &str = "pkgs";

/// A dotted attribute path, eg: `python3Packages.xmljson`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttrPath(Vec<String>);

impl AttrPath {
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The final segment, which is the package's name.
    pub fn name(&self) -> &str {
        // construction guarantees at least one segment
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// Everything but the final segment, empty for bare names.
    pub fn parent(&self) -> &[String] {
        &self.0[..self.0.len().saturating_sub(1)]
    }

    pub fn is_bare(&self) -> bool {
        self.0.len() == 1
    }

    /// Strip a leading `root.` segment so the path is relative to the universe.
    pub fn relative_to(&self, root: &str) -> AttrPath {
        if self.0.len() > 1 && self.0[0] == root {
            AttrPath(self.0[1..].to_vec())
        } else {
            self.clone()
        }
    }
}

impl FromStr for AttrPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("attribute path is empty".to_string());
        }
        let mut segments = Vec::new();
        for segment in s.split('.') {
            if segment.is_empty() {
                return Err(format!("attribute path '{s}' has an empty segment"));
            }
            if let Some(bad) = segment.chars().find(|c| !is_attr_char(*c)) {
                return Err(format!("invalid character {bad:?} in attribute path '{s}'"));
            }
            segments.push(segment.to_string());
        }
        Ok(AttrPath(segments))
    }
}

impl TryFrom<String> for AttrPath {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AttrPath> for String {
    fn from(value: AttrPath) -> Self {
        value.to_string()
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

fn is_attr_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '\'' | '+')
}

/// A version prefix constraint, eg: `3.11` matches `3.11` and `3.11.4`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionConstraint(String);

impl VersionConstraint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, version: &str) -> bool {
        match version.strip_prefix(self.0.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A requested package: `attr.path[@version]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageRef {
    attr_path: AttrPath,
    version: Option<VersionConstraint>,
}

impl PackageRef {
    pub fn new(attr_path: AttrPath, version: Option<VersionConstraint>) -> Self {
        Self { attr_path, version }
    }

    pub fn name(&self) -> &str {
        self.attr_path.name()
    }

    pub fn attr_path(&self) -> &AttrPath {
        &self.attr_path
    }

    pub fn version(&self) -> Option<&VersionConstraint> {
        self.version.as_ref()
    }

    /// Whether a universe entry's version satisfies this reference.
    pub fn accepts(&self, version: &str) -> bool {
        self.version.as_ref().is_none_or(|v| v.matches(version))
    }

    /// Rewrite the attribute path relative to the given universe root.
    pub fn normalized(&self, root: &str) -> PackageRef {
        PackageRef {
            attr_path: self.attr_path.relative_to(root),
            version: self.version.clone(),
        }
    }
}

impl FromStr for PackageRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (path, version) = match s.split_once('@') {
            Some((path, version)) => {
                if version.is_empty() {
                    return Err(Error::ValidationFailed(format!(
                        "empty version constraint in package '{s}'"
                    )));
                }
                if version.contains(char::is_whitespace) || version.contains('@') {
                    return Err(Error::ValidationFailed(format!(
                        "invalid version constraint '{version}' in package '{s}'"
                    )));
                }
                (path, Some(VersionConstraint(version.to_string())))
            }
            None => (s, None),
        };
        let attr_path = path.parse().map_err(Error::ValidationFailed)?;
        Ok(PackageRef { attr_path, version })
    }
}

impl TryFrom<String> for PackageRef {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PackageRef> for String {
    fn from(value: PackageRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.attr_path, version),
            None => write!(f, "{}", self.attr_path),
        }
    }
}
