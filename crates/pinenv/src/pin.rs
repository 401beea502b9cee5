// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Snapshot pins: fixed, content-addressed references to a package universe.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

#[cfg(test)]
#[path = "./pin_test.rs"]
mod pin_test;

const SHA256_MARKER: &str = "#sha256=";

/// A fixed reference to one package universe.
///
/// Two pins with the same hash always name the same universe, so the hash
/// alone is used as the pin's identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SnapshotPin {
    /// A source revision, eg: a commit hash.
    Revision { rev: String },
    /// A tarball location plus the sha256 of its content.
    Tarball { url: String, sha256: String },
}

impl SnapshotPin {
    /// The content hash that identifies this pin.
    pub fn hash(&self) -> &str {
        match self {
            SnapshotPin::Revision { rev } => rev,
            SnapshotPin::Tarball { sha256, .. } => sha256,
        }
    }

    /// Key used for caching universes fetched for this pin.
    pub fn cache_key(&self) -> String {
        match self {
            SnapshotPin::Revision { rev } => format!("rev:{rev}"),
            SnapshotPin::Tarball { sha256, .. } => format!("sha256:{sha256}"),
        }
    }
}

fn parse_hex(value: &str, min: usize, max: usize) -> Option<String> {
    let len_ok = (min..=max).contains(&value.len());
    if len_ok && value.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(value.to_ascii_lowercase())
    } else {
        None
    }
}

impl FromStr for SnapshotPin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((url, hash)) = s.split_once(SHA256_MARKER) {
            if url.is_empty() {
                return Err(Error::ValidationFailed(format!("pin '{s}' has no url")));
            }
            let sha256 = parse_hex(hash, 64, 64).ok_or_else(|| {
                Error::ValidationFailed(format!("pin '{s}' must carry a 64 character sha256"))
            })?;
            return Ok(SnapshotPin::Tarball {
                url: url.to_string(),
                sha256,
            });
        }

        let rev = s.strip_prefix("rev:").unwrap_or(s);
        match parse_hex(rev, 7, 64) {
            Some(rev) => Ok(SnapshotPin::Revision { rev }),
            None if s.contains("://") => Err(Error::ValidationFailed(format!(
                "tarball pin '{s}' is missing '{SHA256_MARKER}<hash>'"
            ))),
            None => Err(Error::ValidationFailed(format!(
                "pin '{s}' is neither a revision hash nor a url{SHA256_MARKER}<hash> pair"
            ))),
        }
    }
}

impl TryFrom<String> for SnapshotPin {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SnapshotPin> for String {
    fn from(value: SnapshotPin) -> Self {
        value.to_string()
    }
}

impl fmt::Display for SnapshotPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotPin::Revision { rev } => f.write_str(rev),
            SnapshotPin::Tarball { url, sha256 } => write!(f, "{url}{SHA256_MARKER}{sha256}"),
        }
    }
}
