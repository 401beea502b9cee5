// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Discovery of .pinenv.yaml files from a starting directory.

use std::path::{Path, PathBuf};

use crate::{EnvSpec, Error, PINENV_FILENAME, PINENV_LOCAL_FILENAME};

#[cfg(test)]
#[path = "./discovery_test.rs"]
mod discovery_test;

/// Options for discovery behavior.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Disable in-tree inheritance (from --no-inherit or PINENV_NO_INHERIT).
    pub no_inherit: bool,

    /// Enable in-tree inheritance (from --inherit or PINENV_INHERIT).
    pub force_inherit: bool,

    /// Additional includes from CLI (from --include flags).
    pub cli_includes: Vec<String>,

    /// Additional includes from environment (from PINENV_INCLUDE).
    pub env_includes: Vec<String>,
}

/// Chain of spec files currently being expanded, to catch include cycles.
#[derive(Default)]
struct Ancestry(Vec<PathBuf>);

impl Ancestry {
    fn push(&mut self, path: &Path) -> crate::Result<()> {
        let key = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if self.0.contains(&key) {
            return Err(Error::CircularInclude(key));
        }
        self.0.push(key);
        Ok(())
    }

    fn pop(&mut self) {
        self.0.pop();
    }
}

/// Discover all applicable .pinenv.yaml files.
///
/// The start path is either a directory to discover from or a spec file
/// to load directly. A named spec file does not walk parent directories;
/// the local override next to it still applies.
///
/// Returns specs in composition order (earlier specs are layered first).
pub fn discover_specs<P: AsRef<Path>>(
    start_path: P,
    options: &DiscoveryOptions,
) -> crate::Result<Vec<EnvSpec>> {
    let mut specs = Vec::new();

    // CLI includes first, then environment includes
    for include_path in options.cli_includes.iter().chain(&options.env_includes) {
        let path = resolve_include_path(include_path, None)?;
        specs.push(EnvSpec::load(&path)?);
    }

    let start = resolve_start_path(start_path.as_ref());
    if !start.exists() {
        return Err(Error::NotFoundAtPath(start));
    }
    let spec_dir = if start.is_file() {
        tracing::debug!(path = %start.display(), "loading named spec file");
        specs.push(EnvSpec::load(&start)?);
        spec_directory(&start)
    } else {
        specs.extend(discover_in_tree(&start, options)?);
        start
    };

    let mut all_specs = Vec::new();
    for spec in specs {
        expand_includes(spec, &mut Ancestry::default(), &mut all_specs)?;
    }

    let local_path = spec_dir.join(PINENV_LOCAL_FILENAME);
    if local_path.is_file() {
        tracing::debug!(path = %local_path.display(), "loading local override");
        all_specs.push(EnvSpec::load(&local_path)?);
    }

    Ok(all_specs)
}

/// Load a single spec file, expanding its includes.
pub fn load_spec_file<P: AsRef<Path>>(path: P) -> crate::Result<Vec<EnvSpec>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::NotFoundAtPath(path.to_path_buf()));
    }
    let mut specs = Vec::new();
    expand_includes(EnvSpec::load(path)?, &mut Ancestry::default(), &mut specs)?;
    Ok(specs)
}

/// The directory that holds the spec files for a start path.
///
/// This is the path itself for a directory and the parent for a file.
pub fn spec_directory<P: AsRef<Path>>(start_path: P) -> PathBuf {
    let start = start_path.as_ref();
    if start.is_file() {
        match start.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    } else {
        start.to_path_buf()
    }
}

/// Resolve starting path, preferring $PWD to preserve symlinks.
fn resolve_start_path(start_path: &Path) -> PathBuf {
    if start_path.is_absolute() {
        start_path.to_owned()
    } else {
        match std::env::var("PWD").ok() {
            Some(pwd) => PathBuf::from(pwd).join(start_path),
            None => std::env::current_dir()
                .unwrap_or_default()
                .join(start_path),
        }
    }
}

fn should_inherit(spec: &EnvSpec, options: &DiscoveryOptions) -> bool {
    if options.force_inherit {
        true
    } else if options.no_inherit {
        false
    } else {
        spec.inherit
    }
}

/// Discover specs in directory tree (walking up parents).
fn discover_in_tree(start: &Path, options: &DiscoveryOptions) -> crate::Result<Vec<EnvSpec>> {
    let mut specs = Vec::new();
    let mut current = start.to_path_buf();

    let start_spec_path = current.join(PINENV_FILENAME);
    if start_spec_path.is_file() {
        let spec = EnvSpec::load(&start_spec_path)?;
        let inherit = should_inherit(&spec, options);
        specs.push(spec);
        if !inherit {
            return Ok(specs);
        }
    } else if options.no_inherit {
        return Err(Error::NotFoundAtPath(current));
    }

    while current.pop() {
        let spec_path = current.join(PINENV_FILENAME);
        if !spec_path.is_file() {
            continue;
        }

        let spec = EnvSpec::load(&spec_path)?;
        let keep_walking = spec.inherit;
        specs.insert(0, spec); // Parents go first
        if !keep_walking {
            break;
        }
    }

    if specs.is_empty() {
        return Err(Error::NotFoundInTree(start.to_path_buf()));
    }

    Ok(specs)
}

/// Resolve include path to absolute canonical path.
fn resolve_include_path(include: &str, base_dir: Option<&Path>) -> crate::Result<PathBuf> {
    let path = if include.starts_with('~') {
        let home = dirs::home_dir().ok_or_else(|| {
            Error::ValidationFailed("Cannot resolve ~ without HOME".to_string())
        })?;
        let rel = include.strip_prefix("~/").unwrap_or(include);
        home.join(rel)
    } else if Path::new(include).is_absolute() {
        PathBuf::from(include)
    } else {
        let base = base_dir.ok_or_else(|| {
            Error::ValidationFailed(format!(
                "Cannot resolve relative include '{include}' without base directory"
            ))
        })?;
        base.join(include)
    };

    dunce::canonicalize(&path).map_err(|e| Error::IncludeNotFound {
        path: path.clone(),
        error: e,
    })
}

/// Push a spec's includes (depth first) and then the spec itself.
fn expand_includes(
    spec: EnvSpec,
    ancestry: &mut Ancestry,
    out: &mut Vec<EnvSpec>,
) -> crate::Result<()> {
    let Some(source) = spec.source_path.clone() else {
        out.push(spec);
        return Ok(());
    };
    ancestry.push(&source)?;

    let base_dir = source.parent();
    for include in &spec.includes {
        let path = resolve_include_path(include, base_dir)?;
        expand_includes(EnvSpec::load(&path)?, ancestry, out)?;
    }

    ancestry.pop();
    out.push(spec);
    Ok(())
}
