// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Generate or update lock files for pinenv environments.

use clap::Args;
use miette::Result;

use crate::prepare::{prepare, resolve_packages};

/// Generate or update lock file
#[derive(Debug, Args)]
pub struct CmdLock {
    #[clap(flatten)]
    discovery: crate::DiscoveryFlags,

    #[clap(flatten)]
    store: crate::StoreFlags,

    /// Update existing lock file
    #[clap(long)]
    update: bool,

    /// Force regeneration even if up-to-date
    #[clap(long)]
    force: bool,

    /// Verify lock is current (exit 1 if not)
    #[clap(long)]
    check: bool,
}

impl CmdLock {
    pub async fn run(&mut self) -> Result<i32> {
        let config = pinenv::load_config()?;
        let prepared = prepare(&self.discovery, &self.store, &[])?;
        let resolved = resolve_packages(&prepared.spec, &config, &self.store).await?;

        // the lock file sits next to the spec files
        let lock_path = self.discovery.lock_path();

        if self.check {
            if !lock_path.exists() {
                eprintln!("No lock file found at {lock_path:?}");
                return Ok(2);
            }

            let lock = pinenv::LockFile::load(&lock_path)?;
            let changes = pinenv::verify_lock(
                &lock,
                &prepared.composed,
                &resolved,
                prepared.spec.pin.as_ref(),
            )?;

            if !changes.is_empty() {
                eprintln!("Lock file is out of date:");
                for change in &changes {
                    eprintln!("  - {:?}: {}", change.kind, change.reference);
                }
                return Ok(1);
            }

            println!("Lock file is up to date");
            return Ok(0);
        }

        if lock_path.exists() && !self.update && !self.force {
            return Err(miette::miette!(
                "Lock file already exists at {:?}. Use --update or --force",
                lock_path
            ));
        }

        if lock_path.exists() && self.update && !self.force {
            let lock = pinenv::LockFile::load(&lock_path)?;
            let changes = pinenv::verify_lock(
                &lock,
                &prepared.composed,
                &resolved,
                prepared.spec.pin.as_ref(),
            )?;
            if changes.is_empty() {
                println!("Lock file is already up to date: {lock_path:?}");
                return Ok(0);
            }
        }

        let lock =
            pinenv::generate_lock(&prepared.composed, &resolved, prepared.spec.pin.as_ref())?;
        lock.save(&lock_path)?;
        println!("Generated lock file: {lock_path:?}");

        Ok(0)
    }
}
