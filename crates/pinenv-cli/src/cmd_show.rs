// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `pinenv show` command.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use colored::Colorize;
use miette::Result;
use pinenv::{EnvSpec, EnvironmentSpec, MaterializeOptions, ResolvedPackage};
use serde::Serialize;

use crate::prepare::{prepare, resolve_packages};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Yaml,
    Json,
}

/// Display the discovered and resolved environment
#[derive(Debug, Args)]
pub struct CmdShow {
    #[clap(flatten)]
    discovery: crate::DiscoveryFlags,

    #[clap(flatten)]
    store: crate::StoreFlags,

    /// Use these packages instead of those from the spec files
    #[clap(short = 'p', long = "package")]
    packages: Vec<String>,

    /// Resolve packages against the pin and show store paths
    #[clap(long)]
    resolve: bool,

    /// Output format
    #[clap(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

/// Machine readable form of everything `show` prints.
#[derive(Serialize)]
struct ShowOutput<'a> {
    files: Vec<PathBuf>,
    environment: &'a EnvironmentSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<&'a [ResolvedPackage]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a [PathBuf]>,
}

impl CmdShow {
    pub async fn run(&mut self) -> Result<i32> {
        let prepared = prepare(&self.discovery, &self.store, &self.packages)?;

        let (resolved, path) = if self.resolve {
            let config = pinenv::load_config()?;
            let resolved = resolve_packages(&prepared.spec, &config, &self.store).await?;
            let options = MaterializeOptions {
                keep: config.environment.keep.clone(),
                ..Default::default()
            };
            let session = pinenv::build_session(
                &resolved,
                &prepared.spec,
                &pinenv::host_environment(),
                &options,
            )?;
            (Some(resolved), Some(session.active_path().to_vec()))
        } else {
            (None, None)
        };

        let output = ShowOutput {
            files: prepared.composed.source_files.clone(),
            environment: &prepared.spec,
            resolved: resolved.as_deref(),
            path: path.as_deref(),
        };

        match self.format {
            OutputFormat::Yaml => {
                let yaml = serde_yaml::to_string(&output)
                    .map_err(|e| miette::miette!("Failed to serialize environment: {e}"))?;
                print!("{yaml}");
            }
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&output)
                    .map_err(|e| miette::miette!("Failed to serialize environment: {e}"))?;
                println!("{json}");
            }
            OutputFormat::Table => {
                self.show_files_table(&prepared.specs);
                println!();
                self.show_environment_table(&prepared.spec);
                if let Some(resolved) = &output.resolved {
                    println!();
                    self.show_resolved_table(resolved, output.path.unwrap_or_default());
                }
            }
        }

        Ok(0)
    }

    fn show_files_table(&self, specs: &[EnvSpec]) {
        println!("{}", "Discovered Files:".bold());
        println!();

        for (i, spec) in specs.iter().enumerate() {
            let path = spec
                .source_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<unknown>".to_string());

            let inherit_marker = if spec.inherit { " [inherit]" } else { "" };
            let includes_marker = if !spec.includes.is_empty() {
                format!(" [includes: {}]", spec.includes.len())
            } else {
                String::new()
            };

            println!(
                "  {}. {}{}{}",
                i + 1,
                path.cyan(),
                inherit_marker.yellow(),
                includes_marker.blue()
            );

            if let Some(desc) = &spec.description {
                println!("     {}", desc.dimmed());
            }
        }

        println!();
        println!("Total: {} file(s)", specs.len());
    }

    fn show_environment_table(&self, spec: &EnvironmentSpec) {
        println!("{}", "Packages:".bold());
        println!();
        if spec.packages.is_empty() {
            println!("  {}", "(no packages)".dimmed());
        }
        for (i, package) in spec.packages.iter().enumerate() {
            println!("  {}. {}", i + 1, package.to_string().green());
        }

        if let Some(pin) = &spec.pin {
            println!();
            println!("{} {}", "Pin:".bold(), pin.to_string().yellow());
        }

        if spec.pure {
            println!();
            println!("{} {}", "Pure:".bold(), "yes".yellow());
            if !spec.keep.is_empty() {
                println!("  keep: {}", spec.keep.join(", "));
            }
        }

        if !spec.variables.is_empty() {
            println!();
            println!("{}", "Environment Variables:".bold());
            println!();
            for (name, value) in &spec.variables {
                println!("  {} = {}", name.cyan(), value.green());
            }
        }

        if let Some(hook) = &spec.hook {
            println!();
            println!("{}", "Hook:".bold());
            for line in hook.lines() {
                println!("  {}", line.dimmed());
            }
        }
    }

    fn show_resolved_table(&self, resolved: &[ResolvedPackage], path: &[PathBuf]) {
        println!("{}", "Resolved Packages:".bold());
        println!();
        for package in resolved {
            println!(
                "  {} {} {}",
                package.attr_path.green(),
                package.version,
                package.store_path.display().to_string().dimmed()
            );
        }

        println!();
        println!("{}", "PATH:".bold());
        for dir in path {
            println!("  {}", dir.display());
        }
    }
}
