// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `pinenv shell` command.

use std::path::PathBuf;

use clap::Args;
use miette::Result;

/// Enter an interactive shell in the environment
#[derive(Debug, Args)]
pub struct CmdShell {
    #[clap(flatten)]
    discovery: crate::DiscoveryFlags,

    #[clap(flatten)]
    store: crate::StoreFlags,

    /// Use these packages instead of those from the spec files
    #[clap(short = 'p', long = "package")]
    packages: Vec<String>,

    /// Start from an empty environment regardless of the spec
    #[clap(long)]
    pure: bool,

    /// Enter the environment even if the activation hook fails
    #[clap(long)]
    allow_hook_failure: bool,

    /// Shell to use (default: environment.shell, then $SHELL)
    #[clap(long)]
    shell: Option<PathBuf>,
}

impl CmdShell {
    pub async fn run(&mut self) -> Result<i32> {
        // an empty command makes load fall back to the configured shell
        let command = self
            .shell
            .as_ref()
            .map(|shell| vec![shell.display().to_string()])
            .unwrap_or_default();

        let mut load_cmd = super::cmd_load::CmdLoad {
            discovery: self.discovery.clone(),
            store: self.store.clone(),
            packages: self.packages.clone(),
            pure: self.pure,
            allow_hook_failure: self.allow_hook_failure,
            dry_run: false,
            command,
        };

        load_cmd.run().await
    }
}
