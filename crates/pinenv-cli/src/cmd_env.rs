// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `pinenv env` command.

use clap::Args;
use miette::Result;
use pinenv::MaterializeOptions;

use crate::prepare::{prepare, resolve_packages};

/// Print a shell script that activates the environment
///
/// Use as: eval "$(pinenv env)"
#[derive(Debug, Args)]
pub struct CmdEnv {
    #[clap(flatten)]
    discovery: crate::DiscoveryFlags,

    #[clap(flatten)]
    store: crate::StoreFlags,

    /// Use these packages instead of those from the spec files
    #[clap(short = 'p', long = "package")]
    packages: Vec<String>,

    /// Leave the activation hook out of the script
    #[clap(long)]
    no_hook: bool,
}

impl CmdEnv {
    pub async fn run(&mut self) -> Result<i32> {
        let config = pinenv::load_config()?;
        let prepared = prepare(&self.discovery, &self.store, &self.packages)?;
        let resolved = resolve_packages(&prepared.spec, &config, &self.store).await?;

        let host = pinenv::host_environment();
        let options = MaterializeOptions {
            keep: config.environment.keep.clone(),
            ..Default::default()
        };
        let session = pinenv::build_session(&resolved, &prepared.spec, &host, &options)?;

        let hook = if self.no_hook {
            None
        } else {
            prepared.spec.hook.as_deref()
        };
        print!("{}", pinenv::generate_startup_script(&session, &host, hook));
        Ok(0)
    }
}
