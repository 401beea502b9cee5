// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! pinenv - Pinned Declarative Environment Resolver
//!
//! This crate provides the core library for resolving declarative environment
//! specs (`.pinenv.yaml`) against a pinned package universe and materializing
//! them into nested, restorable sessions.
//!
//! # Overview
//!
//! A spec names packages by attribute path, environment variables, an optional
//! activation hook and a purity flag. Given the same pin, the same spec always
//! produces the same set of store paths and the same environment.
//!
//! 1. [`discover_specs`] and [`compose_specs`] collect spec files.
//! 2. [`EnvironmentSpec::from_composed`] validates and normalizes them.
//! 3. [`SnapshotStore::lookup`] fetches the pinned [`PackageUniverse`].
//! 4. [`resolve`] binds each [`PackageRef`] to a universe entry.
//! 5. [`materialize`] builds a [`Session`] and runs the hook.
//! 6. [`SessionController`] enters and exits sessions in stack order.
//!
//! # Example
//!
//! ```yaml
//! # .pinenv.yaml
//! api: pinenv/v0
//! description: "My project environment"
//!
//! pin: 9f2b1c0d4e5a
//!
//! packages:
//!   - cowsay
//!   - pkgs.python3Packages.xmljson
//!   - python3@3.11
//!
//! variables:
//!   EDITOR: vim
//!
//! pure: true
//! keep: [SSH_AUTH_SOCK]
//!
//! hook: |
//!   echo "welcome"
//! ```

pub mod compose;
pub mod config;
pub mod discovery;
pub mod environment;
pub mod error;
pub mod lock;
pub mod materialize;
pub mod package;
pub mod pin;
pub mod resolve;
pub mod session;
pub mod spec;
pub mod store;
pub mod universe;

pub use compose::{ComposedEnvironment, compose_specs};
pub use crate::config::{Config, load_config};
pub use discovery::{DiscoveryOptions, discover_specs, load_spec_file, spec_directory};
pub use environment::{generate_startup_script, host_environment};
pub use error::{Error, Result, SpecLocation};
pub use lock::{LockChange, LockChangeKind, LockFile, generate_lock, verify_lock};
pub use materialize::{
    CommandExecutor, HookOutcome, MaterializeOptions, Materialized, ShellExecutor, build_session,
    materialize,
};
pub use package::{AttrPath, DEFAULT_UNIVERSE_ROOT, PackageRef, VersionConstraint};
pub use pin::SnapshotPin;
pub use resolve::{ResolvedPackage, resolve};
pub use session::{EnvState, Session, SessionController, SessionHandle, SessionId};
pub use spec::{ApiVersion, EnvSpec, EnvironmentSpec, parse};
pub use store::{Fetcher, MirrorFetcher, SnapshotStore};
pub use universe::{PackageMeta, PackageUniverse};

/// Well-known filename for environment specs.
pub const PINENV_FILENAME: &str = ".pinenv.yaml";

/// Well-known filename for local overrides.
pub const PINENV_LOCAL_FILENAME: &str = ".pinenv.local.yaml";

/// Well-known filename for lock files.
pub const PINENV_LOCK_FILENAME: &str = ".pinenv.lock.yaml";
