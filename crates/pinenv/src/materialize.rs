// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Materialization of resolved packages into a session environment.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::environment::{join_path, split_path};
use crate::session::{EnvState, SessionController, SessionId};
use crate::{EnvironmentSpec, Error, ResolvedPackage, Result, Session};

#[cfg(test)]
#[path = "./materialize_test.rs"]
mod materialize_test;

/// Host variables retained in every pure environment.
pub const DEFAULT_ALLOWLIST: &[&str] = &["HOME", "TERM"];

/// Set to `1` inside a materialized environment.
pub const ACTIVE_VAR: &str = "PINENV_ACTIVE";

/// Process-level nesting depth of pinenv environments.
pub const DEPTH_VAR: &str = "PINENV_DEPTH";

const PATH_VAR: &str = "PATH";

/// Runs activation hooks in a shell context.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `script` with exactly the given environment and report its exit code.
    async fn run(&self, script: &str, env: &BTreeMap<String, String>) -> Result<i32>;
}

/// Executes hooks with `<shell> -c <script>`.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: PathBuf,
}

impl ShellExecutor {
    pub fn new<P: Into<PathBuf>>(shell: P) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new("/bin/sh")
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn run(&self, script: &str, env: &BTreeMap<String, String>) -> Result<i32> {
        let status = tokio::process::Command::new(&self.shell)
            .arg("-c")
            .arg(script)
            .env_clear()
            .envs(env)
            .status()
            .await?;
        // killed by a signal
        Ok(status.code().unwrap_or(-1))
    }
}

/// Options for materialization beyond the spec itself.
#[derive(Debug, Clone, Default)]
pub struct MaterializeOptions {
    /// Extra host variables retained under purity (eg: from config).
    pub keep: Vec<String>,
    /// Session this one will be entered on top of.
    pub parent: Option<SessionId>,
    /// Depth of the parent session, 0 when top level.
    pub parent_depth: usize,
}

impl MaterializeOptions {
    /// Target the current top of a controller's stack.
    pub fn nested_in(mut self, controller: &SessionController) -> Self {
        self.parent = controller.current_id();
        self.parent_depth = controller.depth();
        self
    }
}

/// What happened to the activation hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    NotRun,
    Succeeded,
    Failed { exit_code: i32 },
}

/// A materialized session plus the outcome of its hook.
///
/// A failed hook does not undo the session; callers decide whether it is fatal.
#[derive(Debug)]
pub struct Materialized {
    pub session: Session,
    pub hook: HookOutcome,
}

impl Materialized {
    pub fn hook_result(&self) -> Result<()> {
        match self.hook {
            HookOutcome::Failed { exit_code } => Err(Error::HookFailed { exit_code }),
            HookOutcome::NotRun | HookOutcome::Succeeded => Ok(()),
        }
    }
}

fn is_retained(name: &str, spec: &EnvironmentSpec, options: &MaterializeOptions) -> bool {
    DEFAULT_ALLOWLIST.contains(&name)
        || spec.keep.iter().any(|k| k == name)
        || options.keep.iter().any(|k| k == name)
}

/// Compute the session for a resolved package set without running anything.
pub fn build_session(
    resolved: &[ResolvedPackage],
    spec: &EnvironmentSpec,
    base_env: &BTreeMap<String, String>,
    options: &MaterializeOptions,
) -> Result<Session> {
    let mut variables: BTreeMap<String, String> = if spec.pure {
        base_env
            .iter()
            .filter(|(name, _)| is_retained(name, spec, options))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    } else {
        base_env.clone()
    };

    // an explicit PATH in the spec replaces the inherited one
    let base_path = spec
        .variables
        .get(PATH_VAR)
        .or_else(|| variables.get(PATH_VAR))
        .map(|p| split_path(p))
        .unwrap_or_default();

    variables.extend(spec.variables.iter().map(|(k, v)| (k.clone(), v.clone())));

    let mut active_path: Vec<PathBuf> = Vec::new();
    for dir in resolved.iter().flat_map(|p| p.bin_dirs.iter()) {
        if !active_path.contains(dir) {
            active_path.push(dir.clone());
        }
    }
    let own = active_path.len();
    for dir in base_path {
        if !active_path[..own].contains(&dir) {
            active_path.push(dir);
        }
    }

    if active_path.is_empty() {
        variables.remove(PATH_VAR);
    } else {
        variables.insert(PATH_VAR.to_string(), join_path(&active_path)?);
    }

    let outer_depth = base_env
        .get(DEPTH_VAR)
        .and_then(|d| d.parse::<usize>().ok())
        .unwrap_or(0);
    variables.insert(ACTIVE_VAR.to_string(), "1".to_string());
    variables.insert(DEPTH_VAR.to_string(), (outer_depth + 1).to_string());

    Ok(Session::new(
        options.parent,
        options.parent_depth + 1,
        EnvState {
            variables,
            path: active_path,
        },
        resolved.to_vec(),
    ))
}

/// Build the session and run the spec's hook once inside it.
///
/// Nothing here is retried: pinned inputs make a repeated attempt fail the
/// same way.
pub async fn materialize(
    resolved: &[ResolvedPackage],
    spec: &EnvironmentSpec,
    base_env: &BTreeMap<String, String>,
    options: &MaterializeOptions,
    executor: &dyn CommandExecutor,
) -> Result<Materialized> {
    let session = build_session(resolved, spec, base_env, options)?;
    tracing::info!(
        session = %session.id(),
        packages = session.packages().len(),
        pure = spec.pure,
        "materialized environment"
    );

    let hook = match &spec.hook {
        None => HookOutcome::NotRun,
        Some(hook) => match executor.run(hook, session.effective_variables()).await {
            Ok(0) => HookOutcome::Succeeded,
            Ok(exit_code) => {
                tracing::warn!(exit_code, "activation hook failed");
                HookOutcome::Failed { exit_code }
            }
            Err(err) => {
                tracing::warn!(%err, "activation hook could not be started");
                HookOutcome::Failed { exit_code: -1 }
            }
        },
    };

    Ok(Materialized { session, hook })
}
