// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cross-Region Reference Bridge
//!
//! Certificates for edge distributions are produced by a stack in the pinned
//! edge region, while their consumers deploy to the target regions. The bridge
//! hands each consumer a [`CrossRegionReference`]: a capability handle naming
//! the producing stack and certificate, with no live connection to either.
//! Certificate material never leaves the provisioning system.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::certificates::{CertificateHandle, CertificateStack};
use crate::domain::{AwsRegion, DomainRole, Environment, Hostname, Region};
use crate::errors::{SynthesisError, SynthesisResult};

/// Read-only handle to a certificate owned by another stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrossRegionReference {
    pub handle: CertificateHandle,
    pub domain: Hostname,
    pub consumer_region: AwsRegion,
}

impl CrossRegionReference {
    /// Region the referenced certificate was provisioned in
    pub fn producer_region(&self) -> AwsRegion {
        self.handle.region
    }

    /// True when producer and consumer deploy to different regions
    pub fn crosses_regions(&self) -> bool {
        self.handle.region != self.consumer_region
    }
}

/// Export table of the edge certificate stack
///
/// Built once per synthesis from the edge stack and shared read-only by every
/// regional composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossRegionBridge {
    environment: Environment,
    exports: BTreeMap<(Region, DomainRole), (CertificateHandle, Hostname)>,
}

impl CrossRegionBridge {
    /// Index every assignment of the edge stack
    pub fn from_stack(stack: &CertificateStack) -> Self {
        let exports = stack
            .assignments()
            .map(|(region, role, record)| {
                ((region, role), (record.handle.clone(), record.domain.clone()))
            })
            .collect();

        Self {
            environment: stack.environment,
            exports,
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Hand `role`'s edge certificate to a consumer in `region`
    pub fn import(&self, region: Region, role: DomainRole) -> SynthesisResult<CrossRegionReference> {
        let (handle, domain) =
            self.exports
                .get(&(region, role))
                .ok_or(SynthesisError::CrossRegionReference {
                    region,
                    environment: self.environment,
                    role,
                })?;

        debug!(
            certificate = %handle.logical_name,
            from = %handle.region,
            to = %region.aws_region(),
            "bridging edge certificate"
        );

        Ok(CrossRegionReference {
            handle: handle.clone(),
            domain: domain.clone(),
            consumer_region: region.aws_region(),
        })
    }

    /// Every import available to `region`
    pub fn imports_for(&self, region: Region) -> SynthesisResult<BTreeMap<DomainRole, CrossRegionReference>> {
        self.exports
            .keys()
            .filter(|(r, _)| *r == region)
            .map(|(_, role)| Ok((*role, self.import(region, *role)?)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}
