// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Snapshot store: pinned package universes, fetched once and cached by pin hash.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;

use crate::{Error, PackageUniverse, Result, SnapshotPin};

#[cfg(test)]
#[path = "./store_test.rs"]
mod store_test;

/// Retrieves the universe data named by a pin.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, pin: &SnapshotPin) -> Result<PackageUniverse>;
}

/// Reads universes from a local mirror directory laid out as `<hash>.yaml`.
#[derive(Debug, Clone)]
pub struct MirrorFetcher {
    root: PathBuf,
}

impl MirrorFetcher {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the universe file for a pin.
    pub fn path_for(&self, pin: &SnapshotPin) -> PathBuf {
        self.root.join(format!("{}.yaml", pin.hash()))
    }
}

#[async_trait]
impl Fetcher for MirrorFetcher {
    async fn fetch(&self, pin: &SnapshotPin) -> Result<PackageUniverse> {
        let path = self.path_for(pin);
        tracing::debug!(path = %path.display(), %pin, "reading universe from mirror");

        let content = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::UnresolvablePin {
                pin: pin.to_string(),
                reason: format!("{}: {e}", path.display()),
            })?;

        if let SnapshotPin::Tarball { sha256, .. } = pin {
            let actual = format!("{:x}", Sha256::digest(&content));
            if &actual != sha256 {
                return Err(Error::UnresolvablePin {
                    pin: pin.to_string(),
                    reason: format!("content hash mismatch, got sha256 {actual}"),
                });
            }
        }

        let yaml = String::from_utf8(content).map_err(|e| Error::UnresolvablePin {
            pin: pin.to_string(),
            reason: format!("universe is not valid utf-8: {e}"),
        })?;
        PackageUniverse::from_yaml(pin.clone(), &yaml)
    }
}

type UniverseCell = Arc<OnceCell<Arc<PackageUniverse>>>;

/// Content-addressed catalog of package universes.
///
/// Lookups for the same pin share one cache cell, so concurrent first
/// lookups converge on a single fetch. A failed fetch leaves the cell empty.
pub struct SnapshotStore {
    fetcher: Arc<dyn Fetcher>,
    cache: DashMap<String, UniverseCell>,
    fetches: AtomicUsize,
}

impl SnapshotStore {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            cache: DashMap::new(),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Store backed by a local mirror directory.
    pub fn with_mirror<P: Into<PathBuf>>(root: P) -> Self {
        Self::new(Arc::new(MirrorFetcher::new(root)))
    }

    /// Look up the universe for a pin, fetching it at most once.
    pub async fn lookup(
        &self,
        pin: &SnapshotPin,
        timeout: Duration,
    ) -> Result<Arc<PackageUniverse>> {
        let key = pin.cache_key();
        // clone the cell out so the map shard is not locked across the await
        let cell = self
            .cache
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        if let Some(universe) = cell.get() {
            tracing::debug!(%key, "snapshot cache hit");
            return Ok(universe.clone());
        }

        let init = cell.get_or_try_init(|| async {
            tracing::info!(%pin, "fetching snapshot");
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.fetcher.fetch(pin).await.map(Arc::new)
        });

        match tokio::time::timeout(timeout, init).await {
            Ok(result) => result.cloned(),
            Err(_) => Err(Error::FetchTimeout {
                pin: pin.to_string(),
                timeout,
            }),
        }
    }

    /// Whether a universe for this pin is already cached.
    pub fn is_cached(&self, pin: &SnapshotPin) -> bool {
        self.cache
            .get(&pin.cache_key())
            .is_some_and(|cell| cell.initialized())
    }

    /// Number of fetches that have been started by this store.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("cached", &self.cache.len())
            .field("fetches", &self.fetch_count())
            .finish()
    }
}
