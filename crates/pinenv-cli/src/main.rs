// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! pinenv - Pinned Declarative Environment Resolver CLI

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use miette::Result;

mod cmd_check;
mod cmd_env;
mod cmd_init;
mod cmd_load;
mod cmd_lock;
mod cmd_shell;
mod cmd_show;
mod prepare;


use cmd_check::CmdCheck;
use cmd_env::CmdEnv;
use cmd_init::CmdInit;
use cmd_load::CmdLoad;
use cmd_lock::CmdLock;
use cmd_shell::CmdShell;
use cmd_show::CmdShow;

#[derive(Parser)]
#[clap(
    name = "pinenv",
    about = "Pinned Declarative Environment Resolver",
    version,
    long_about = "Resolve .pinenv.yaml files against a pinned package universe and enter the result"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long, global = true)]
    quiet: bool,
}

/// Where to look for spec files.
#[derive(Parser, Clone, Debug)]
pub struct DiscoveryFlags {
    /// Spec file to load, or directory to start discovery from
    #[clap(short = 'f', long, default_value = ".")]
    pub file: PathBuf,

    /// Enable in-tree discovery
    #[clap(long)]
    pub inherit: bool,

    /// Disable in-tree discovery
    #[clap(short = 'n', long)]
    pub no_inherit: bool,

    /// Additional .pinenv.yaml to include
    #[clap(short = 'i', long = "include")]
    pub includes: Vec<String>,
}

impl DiscoveryFlags {
    /// Combine the flags with PINENV_INCLUDE, PINENV_INHERIT and PINENV_NO_INHERIT.
    pub fn options(&self) -> pinenv::DiscoveryOptions {
        let env_includes = std::env::var("PINENV_INCLUDE")
            .ok()
            .map(|s| {
                s.split(':')
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        pinenv::DiscoveryOptions {
            no_inherit: self.no_inherit || env_flag("PINENV_NO_INHERIT"),
            force_inherit: self.inherit || env_flag("PINENV_INHERIT"),
            cli_includes: self.includes.clone(),
            env_includes,
        }
    }

    /// Lock file location, next to the spec files.
    pub fn lock_path(&self) -> PathBuf {
        pinenv::spec_directory(&self.file).join(pinenv::PINENV_LOCK_FILENAME)
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes" | "on"))
}

/// Where pinned universes are loaded from.
#[derive(Parser, Clone, Debug, Default)]
pub struct StoreFlags {
    /// Use this pin instead of the one in the spec
    #[clap(long, env = "PINENV_PIN")]
    pub pin: Option<pinenv::SnapshotPin>,

    /// Snapshot mirror directory (overrides store.mirror)
    #[clap(long)]
    pub mirror: Option<PathBuf>,

    /// Seconds to wait for a universe fetch (overrides store.fetch_timeout_secs)
    #[clap(long)]
    pub timeout: Option<u64>,
}

impl StoreFlags {
    pub fn mirror(&self, config: &pinenv::Config) -> PathBuf {
        self.mirror
            .clone()
            .unwrap_or_else(|| config.store.mirror.clone())
    }

    pub fn timeout(&self, config: &pinenv::Config) -> Duration {
        self.timeout
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.store.fetch_timeout())
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create a new .pinenv.yaml file
    Init(CmdInit),

    /// Display the discovered and resolved environment
    Show(CmdShow),

    /// Enter the environment and run a command
    Load(CmdLoad),

    /// Enter an interactive shell in the environment
    Shell(CmdShell),

    /// Print a shell script that activates the environment
    Env(CmdEnv),

    /// Generate or update lock file
    Lock(CmdLock),

    /// Verify environment matches lock file
    Check(CmdCheck),
}

impl Opt {
    async fn run(self) -> Result<i32> {
        // Setup logging
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();

        // Dispatch to command
        match self.cmd {
            Command::Init(mut cmd) => cmd.run().await,
            Command::Show(mut cmd) => cmd.run().await,
            Command::Load(mut cmd) => cmd.run().await,
            Command::Shell(mut cmd) => cmd.run().await,
            Command::Env(mut cmd) => cmd.run().await,
            Command::Lock(mut cmd) => cmd.run().await,
            Command::Check(mut cmd) => cmd.run().await,
        }
    }
}

/// Exit code for a failed command, taken from the library error when there is one.
fn exit_code_for(report: &miette::Report) -> i32 {
    report
        .downcast_ref::<pinenv::Error>()
        .map(pinenv::Error::exit_code)
        .unwrap_or(1)
}

#[tokio::main]
async fn main() {
    let opt = Opt::parse();
    let code = match opt.run().await {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            exit_code_for(&report)
        }
    };
    std::process::exit(code);
}
