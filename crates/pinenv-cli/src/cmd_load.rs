// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `pinenv load` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use pinenv::{MaterializeOptions, SessionController, ShellExecutor};

use crate::prepare::{prepare, resolve_packages};

#[cfg(test)]
#[path = "./cmd_load_test.rs"]
mod cmd_load_test;

/// Enter the environment and run a command
#[derive(Debug, Args)]
pub struct CmdLoad {
    #[clap(flatten)]
    pub discovery: crate::DiscoveryFlags,

    #[clap(flatten)]
    pub store: crate::StoreFlags,

    /// Use these packages instead of those from the spec files
    #[clap(short = 'p', long = "package")]
    pub packages: Vec<String>,

    /// Start from an empty environment regardless of the spec
    #[clap(long)]
    pub pure: bool,

    /// Enter the environment even if the activation hook fails
    #[clap(long)]
    pub allow_hook_failure: bool,

    /// Show what would be loaded without entering
    #[clap(long)]
    pub dry_run: bool,

    /// Command to run (default: the configured shell)
    #[clap(last = true)]
    pub command: Vec<String>,
}

impl CmdLoad {
    pub async fn run(&mut self) -> Result<i32> {
        let config = pinenv::load_config()?;
        let prepared = prepare(&self.discovery, &self.store, &self.packages)?;
        let mut spec = prepared.spec;
        spec.pure |= self.pure;

        let resolved = resolve_packages(&spec, &config, &self.store).await?;

        if self.dry_run {
            println!("{}", "Discovered files:".bold());
            for path in &prepared.composed.source_files {
                println!("  - {}", path.display());
            }
            println!();
            println!("{} package(s):", resolved.len());
            for package in &resolved {
                println!(
                    "  - {} {}",
                    package.attr_path.green(),
                    package.store_path.display().to_string().dimmed()
                );
            }
            return Ok(0);
        }

        let mut controller = SessionController::new(pinenv::host_environment());
        let base = controller.current().variables.clone();
        let options = MaterializeOptions {
            keep: config.environment.keep.clone(),
            ..Default::default()
        }
        .nested_in(&controller);

        let executor = ShellExecutor::new(config.environment.hook_shell());
        let materialized =
            pinenv::materialize(&resolved, &spec, &base, &options, &executor).await?;
        if self.allow_hook_failure {
            if let Err(err) = materialized.hook_result() {
                tracing::warn!("continuing after failed hook: {err}");
            }
        } else {
            materialized.hook_result()?;
        }

        let handle = controller.enter(materialized.session)?;
        let variables = controller.current().variables.clone();

        let (program, args) = match self.command.split_first() {
            Some((program, args)) => (program.clone(), args.to_vec()),
            None => (
                config.environment.shell(&base).display().to_string(),
                Vec::new(),
            ),
        };

        tracing::info!(session = %handle.id(), %program, "running command in environment");
        let status = tokio::process::Command::new(&program)
            .args(&args)
            .env_clear()
            .envs(&variables)
            .status()
            .await;

        controller.exit(&handle)?;

        let status =
            status.map_err(|e| miette::miette!("Failed to run '{program}' in environment: {e}"))?;
        // a command killed by a signal has no code
        Ok(status.code().unwrap_or(1))
    }
}
