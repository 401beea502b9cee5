// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Verify that the current environment matches the lock file.

use clap::Args;
use miette::Result;
use pinenv::LockChangeKind;

use crate::prepare::{prepare, resolve_packages};

/// Verify environment matches lock file
#[derive(Debug, Args)]
pub struct CmdCheck {
    #[clap(flatten)]
    discovery: crate::DiscoveryFlags,

    #[clap(flatten)]
    store: crate::StoreFlags,

    /// Exit with error on mismatch
    #[clap(long)]
    strict: bool,
}

impl CmdCheck {
    pub async fn run(&mut self) -> Result<i32> {
        let config = pinenv::load_config()?;
        let prepared = prepare(&self.discovery, &self.store, &[])?;

        let lock_path = self.discovery.lock_path();
        if !lock_path.exists() {
            if self.strict {
                return Err(miette::miette!("No lock file found at {:?}", lock_path));
            }
            println!("Warning: No lock file found");
            return Ok(2);
        }

        let lock = pinenv::LockFile::load(&lock_path)?;
        let resolved = resolve_packages(&prepared.spec, &config, &self.store).await?;
        let changes = pinenv::verify_lock(
            &lock,
            &prepared.composed,
            &resolved,
            prepared.spec.pin.as_ref(),
        )?;

        if changes.is_empty() {
            println!("✓ Environment matches lock file");
            return Ok(0);
        }

        if self.strict {
            eprintln!("Error: Environment differs from lock file:");
        } else {
            println!("Warning: Environment differs from lock file:");
        }

        for change in &changes {
            match change.kind {
                LockChangeKind::PackageChanged => {
                    println!("  - Package '{}' resolves differently", change.reference);
                    if let (Some(exp), Some(act)) = (&change.expected, &change.actual) {
                        println!("    Expected: {exp}");
                        println!("    Actual:   {act}");
                    }
                }
                LockChangeKind::PinChanged => {
                    println!(
                        "  - Pin changed from {} to {}",
                        change.expected.as_deref().unwrap_or("<none>"),
                        change.actual.as_deref().unwrap_or("<none>")
                    );
                }
                LockChangeKind::SourceFileChanged => {
                    println!("  - Source file '{}' was modified", change.reference);
                }
                _ => {
                    println!("  - {:?}: {}", change.kind, change.reference);
                }
            }
        }

        if self.strict {
            return Ok(1);
        }

        println!("\nRun 'pinenv lock --update' to update the lock file");
        Ok(0)
    }
}
