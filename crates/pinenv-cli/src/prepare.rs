// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Discovery, composition and resolution shared by the commands.

use miette::Result;
use pinenv::{ComposedEnvironment, EnvSpec, EnvironmentSpec, Error, ResolvedPackage};

use crate::{DiscoveryFlags, StoreFlags};

/// The discovered specs and the environment they describe.
pub struct Prepared {
    pub specs: Vec<EnvSpec>,
    pub composed: ComposedEnvironment,
    pub spec: EnvironmentSpec,
}

/// Discover and compose spec files.
///
/// A non-empty `packages` replaces the composed package list and makes a
/// missing spec file acceptable.
pub fn prepare(
    discovery: &DiscoveryFlags,
    store: &StoreFlags,
    packages: &[String],
) -> Result<Prepared> {
    let specs = match pinenv::discover_specs(&discovery.file, &discovery.options()) {
        Ok(specs) => specs,
        Err(Error::NotFoundInTree(_) | Error::NotFoundAtPath(_)) if !packages.is_empty() => {
            tracing::debug!("no spec files found, using command line packages only");
            Vec::new()
        }
        Err(err) => return Err(err.into()),
    };

    let composed = pinenv::compose_specs(&specs);
    let mut spec = EnvironmentSpec::from_composed(&composed)?;
    if !packages.is_empty() {
        let root = composed
            .root
            .as_deref()
            .unwrap_or(pinenv::DEFAULT_UNIVERSE_ROOT);
        spec = spec.with_packages(packages, root)?;
    }
    if let Some(pin) = &store.pin {
        spec.pin = Some(pin.clone());
    }

    Ok(Prepared {
        specs,
        composed,
        spec,
    })
}

/// Fetch the pinned universe and resolve every requested package.
pub async fn resolve_packages(
    spec: &EnvironmentSpec,
    config: &pinenv::Config,
    store: &StoreFlags,
) -> Result<Vec<ResolvedPackage>> {
    if spec.packages.is_empty() {
        return Ok(Vec::new());
    }

    let pin = spec.pin.as_ref().ok_or_else(|| {
        Error::ValidationFailed(
            "packages were requested but no pin is set; add 'pin:' to the spec or pass --pin"
                .to_string(),
        )
    })?;

    let snapshots = pinenv::SnapshotStore::with_mirror(store.mirror(config));
    let universe = snapshots.lookup(pin, store.timeout(config)).await?;
    Ok(pinenv::resolve(spec, &universe)?)
}
