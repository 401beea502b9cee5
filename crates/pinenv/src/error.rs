// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for pinenv operations.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

/// Convenience Result type with pinenv Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Where in a spec a syntax or validation problem was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecLocation {
    pub file: Option<PathBuf>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    /// Field path within the spec, eg: `variables.FOO` or `packages[2]`.
    pub field: Option<String>,
}

impl SpecLocation {
    pub fn field<S: Into<String>>(field: S) -> Self {
        Self {
            field: Some(field.into()),
            ..Default::default()
        }
    }

    pub fn with_file(mut self, file: Option<PathBuf>) -> Self {
        if self.file.is_none() {
            self.file = file;
        }
        self
    }
}

impl fmt::Display for SpecLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote = false;
        if let Some(file) = &self.file {
            write!(f, "{}", file.display())?;
            wrote = true;
        }
        if let Some(line) = self.line {
            if wrote {
                f.write_str(":")?;
            }
            write!(f, "{line}")?;
            if let Some(column) = self.column {
                write!(f, ":{column}")?;
            }
            wrote = true;
        }
        if let Some(field) = &self.field {
            if wrote {
                f.write_str(" ")?;
            }
            write!(f, "[{field}]")?;
            wrote = true;
        }
        if !wrote {
            f.write_str("<input>")?;
        }
        Ok(())
    }
}

/// Errors that can occur during pinenv operations.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// No .pinenv.yaml found in directory tree
    #[error("No .pinenv.yaml found in {0:?} or any parent directory")]
    #[diagnostic(
        code(pinenv::not_found_in_tree),
        help("Create a .pinenv.yaml file with 'pinenv init' or specify a path with -f")
    )]
    NotFoundInTree(PathBuf),

    /// .pinenv.yaml not found at specified path
    #[error(".pinenv.yaml not found at {0:?}")]
    #[diagnostic(code(pinenv::not_found_at_path))]
    NotFoundAtPath(PathBuf),

    /// Malformed spec input, rejected before any resolution begins
    #[error("Invalid environment spec at {location}: {message}")]
    #[diagnostic(
        code(pinenv::spec_syntax),
        help("Check YAML syntax and ensure 'api: pinenv/v0' is present")
    )]
    SpecSyntax {
        location: SpecLocation,
        message: String,
    },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(pinenv::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Include file not found
    #[error("Include file not found: {path:?}")]
    #[diagnostic(
        code(pinenv::include_not_found),
        help("Check that the include path is correct and the file exists")
    )]
    IncludeNotFound {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Circular include detected
    #[error("Circular include detected: {0:?}")]
    #[diagnostic(
        code(pinenv::circular_include),
        help("Remove the circular reference in your includes")
    )]
    CircularInclude(PathBuf),

    /// Validation error
    #[error("Validation failed: {0}")]
    #[diagnostic(code(pinenv::validation_failed))]
    ValidationFailed(String),

    /// A requested package has no match in the pinned universe
    #[error("Package not found: {reference}")]
    #[diagnostic(
        code(pinenv::package_not_found),
        help("{}", suggestion_message(similar))
    )]
    PackageNotFound {
        reference: String,
        similar: Vec<String>,
    },

    /// A bare name matched more than one attribute path
    #[error("Ambiguous package reference '{reference}' matches: {}", .candidates.join(", "))]
    #[diagnostic(
        code(pinenv::ambiguous_reference),
        help("{}", ambiguity_message(candidates))
    )]
    AmbiguousReference {
        reference: String,
        candidates: Vec<String>,
    },

    /// The pinned universe could not be located or failed verification
    #[error("Unable to resolve pin {pin}: {reason}")]
    #[diagnostic(code(pinenv::unresolvable_pin))]
    UnresolvablePin { pin: String, reason: String },

    /// Fetching a pinned universe did not finish in time
    #[error("Timed out after {timeout:?} fetching pin {pin}")]
    #[diagnostic(
        code(pinenv::fetch_timeout),
        help("Increase store.fetch_timeout_secs or check the snapshot mirror")
    )]
    FetchTimeout { pin: String, timeout: Duration },

    /// The activation hook exited unsuccessfully
    #[error("Activation hook failed with exit code {exit_code}")]
    #[diagnostic(code(pinenv::hook_failed))]
    HookFailed { exit_code: i32 },

    /// Sessions were exited out of stack order
    #[error("Invalid session order: expected {expected}, got {actual}")]
    #[diagnostic(
        code(pinenv::invalid_session_order),
        help("Sessions must be exited in the reverse order they were entered")
    )]
    InvalidSessionOrder { expected: String, actual: String },

    /// Lock file could not be parsed
    #[error("Invalid lock file {path:?}: {message}")]
    #[diagnostic(
        code(pinenv::invalid_lock),
        help("Regenerate it with 'pinenv lock --force'")
    )]
    InvalidLockFile { path: PathBuf, message: String },

    /// Configuration loading error
    #[error(transparent)]
    #[diagnostic(code(pinenv::config_error))]
    Config(#[from] config::ConfigError),

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(pinenv::io_error))]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The process exit code used when this error ends a command.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::NotFoundInTree(_)
            | Error::NotFoundAtPath(_)
            | Error::SpecSyntax { .. }
            | Error::ReadFailed { .. }
            | Error::IncludeNotFound { .. }
            | Error::CircularInclude(_)
            | Error::ValidationFailed(_)
            | Error::InvalidLockFile { .. } => 2,
            Error::PackageNotFound { .. } => 3,
            Error::AmbiguousReference { .. } => 4,
            Error::UnresolvablePin { .. } => 5,
            Error::FetchTimeout { .. } => 6,
            Error::HookFailed { .. } => 7,
            Error::InvalidSessionOrder { .. } => 8,
            Error::Config(_) | Error::Io(_) => 1,
        }
    }

    pub(crate) fn spec_syntax<S: Into<String>>(location: SpecLocation, message: S) -> Self {
        Error::SpecSyntax {
            location,
            message: message.into(),
        }
    }
}

fn suggestion_message(similar: &[String]) -> String {
    if similar.is_empty() {
        "Check that the package name is correct for this pin".to_string()
    } else {
        format!("Did you mean one of: {}?", similar.join(", "))
    }
}

fn ambiguity_message(candidates: &[String]) -> String {
    match candidates.first() {
        Some(first) => format!("Use a full attribute path or a version constraint, eg: {first}"),
        None => "Use a full attribute path or a version constraint".to_string(),
    }
}
