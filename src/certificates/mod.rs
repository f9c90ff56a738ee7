// Copyright (c) 2025 - Cowboy AI, Inc.
//! TLS Certificates
//!
//! Certificates are requested in two kinds of stack: one edge stack pinned to
//! [`AwsRegion::EDGE`] holding every edge-placed certificate for every target
//! region, and one regional stack per target region for load balancer
//! certificates. Regional application stacks consume both through
//! [`CrossRegionReference`] handles.
//!
//! # Identity
//!
//! A [`CertificateHandle`] id is a name-based UUID over the producing stack and
//! the certificate's logical name, so resolving twice yields equal handles.

pub mod resolver;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::bridge::{CrossRegionBridge, CrossRegionReference};
use crate::composer::{
    CertificateSpec, Declaration, DependencyGraph, ResourceId, ResourceSpec, StackId, StackManifest,
};
use crate::domain::{AwsRegion, CertificatePlacement, DomainRole, Environment, HostedZoneRef, Hostname, Region};
use crate::errors::{SynthesisError, SynthesisResult};

pub use resolver::CertificateResolver;

/// Stable, provider-independent handle to a provisioned certificate
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CertificateHandle {
    pub id: Uuid,
    pub logical_name: String,
    pub stack: StackId,
    pub region: AwsRegion,
}

impl CertificateHandle {
    pub(crate) fn new(stack: &StackId, region: AwsRegion, logical_name: String) -> Self {
        let name = format!("passwordless-infra://{}/{}", stack, logical_name);
        Self {
            id: Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()),
            logical_name,
            stack: stack.clone(),
            region,
        }
    }
}

/// One requested certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub domain: Hostname,
    pub subject_alternative_names: Vec<String>,
    pub zone: HostedZoneRef,
    pub placement: CertificatePlacement,
    pub handle: CertificateHandle,
}

impl CertificateRecord {
    /// Hand this certificate to a stack deploying in `consumer_region`
    pub fn reference(&self, consumer_region: AwsRegion) -> CrossRegionReference {
        CrossRegionReference {
            handle: self.handle.clone(),
            domain: self.domain.clone(),
            consumer_region,
        }
    }

    fn declaration(&self) -> Declaration {
        Declaration::new(
            ResourceId::new(self.handle.logical_name.clone()),
            ResourceSpec::Certificate(CertificateSpec {
                domain: self.domain.clone(),
                subject_alternative_names: self.subject_alternative_names.clone(),
                validation_zone: self.zone.clone(),
            }),
        )
    }
}

/// Which (target region, role) a record serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateAssignment {
    pub region: Region,
    pub role: DomainRole,
    pub certificate: Uuid,
}

/// Certificates provisioned together in one region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateStack {
    pub id: StackId,
    pub region: AwsRegion,
    pub environment: Environment,
    pub placement: CertificatePlacement,
    records: Vec<CertificateRecord>,
    assignments: Vec<CertificateAssignment>,
}

impl CertificateStack {
    pub(crate) fn new(id: StackId, region: AwsRegion, environment: Environment, placement: CertificatePlacement) -> Self {
        Self {
            id,
            region,
            environment,
            placement,
            records: Vec::new(),
            assignments: Vec::new(),
        }
    }

    pub fn records(&self) -> &[CertificateRecord] {
        &self.records
    }

    /// Every (target region, role) with the record serving it
    pub fn assignments(&self) -> impl Iterator<Item = (Region, DomainRole, &CertificateRecord)> {
        self.assignments.iter().filter_map(move |a| {
            self.records
                .iter()
                .find(|r| r.handle.id == a.certificate)
                .map(|record| (a.region, a.role, record))
        })
    }

    /// Record serving `role` in `region`
    pub fn lookup(&self, region: Region, role: DomainRole) -> Option<&CertificateRecord> {
        self.assignments()
            .find(|(r, ro, _)| *r == region && *ro == role)
            .map(|(_, _, record)| record)
    }

    pub(crate) fn records_mut(&mut self) -> &mut Vec<CertificateRecord> {
        &mut self.records
    }

    pub(crate) fn assign(&mut self, region: Region, role: DomainRole, certificate: Uuid) {
        self.assignments.push(CertificateAssignment {
            region,
            role,
            certificate,
        });
    }

    /// Deployable form: one certificate declaration per record
    pub fn to_manifest(&self, account: &str) -> SynthesisResult<StackManifest> {
        let mut graph = DependencyGraph::new();
        for record in &self.records {
            graph.add(record.declaration())?;
        }

        Ok(StackManifest {
            id: self.id.clone(),
            region: self.region,
            account: account.to_string(),
            environment: self.environment,
            depends_on: Vec::new(),
            cross_region_references: self.region.is_edge(),
            declarations: graph.order()?,
        })
    }
}

/// Certificates one regional application stack may consume
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateSet {
    pub region: Region,
    pub environment: Environment,
    regional: BTreeMap<DomainRole, CertificateRecord>,
    edge: BTreeMap<DomainRole, CrossRegionReference>,
}

impl CertificateSet {
    pub fn new(
        region: Region,
        environment: Environment,
        regional: BTreeMap<DomainRole, CertificateRecord>,
        edge: BTreeMap<DomainRole, CrossRegionReference>,
    ) -> Self {
        Self {
            region,
            environment,
            regional,
            edge,
        }
    }

    /// Load balancer certificate for `role`, provisioned in the target region
    pub fn regional(&self, role: DomainRole) -> SynthesisResult<&CertificateRecord> {
        self.regional.get(&role).ok_or_else(|| {
            SynthesisError::configuration(format!(
                "no regional certificate for {} in {}/{}",
                role, self.region, self.environment
            ))
        })
    }

    /// Edge certificate for `role`, bridged from the edge region
    pub fn edge(&self, role: DomainRole) -> SynthesisResult<&CrossRegionReference> {
        self.edge.get(&role).ok_or(SynthesisError::CrossRegionReference {
            region: self.region,
            environment: self.environment,
            role,
        })
    }

    pub fn regional_records(&self) -> &BTreeMap<DomainRole, CertificateRecord> {
        &self.regional
    }

    pub fn edge_references(&self) -> &BTreeMap<DomainRole, CrossRegionReference> {
        &self.edge
    }
}

/// Every certificate stack of one synthesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificatePlan {
    pub environment: Environment,
    pub edge: CertificateStack,
    pub regional: BTreeMap<Region, CertificateStack>,
}

impl CertificatePlan {
    pub fn bridge(&self) -> CrossRegionBridge {
        CrossRegionBridge::from_stack(&self.edge)
    }

    /// Certificates available to the application stack in `region`
    ///
    /// # Errors
    /// - `CrossRegionReference` when an edge role was never produced for
    ///   `region`
    /// - `Configuration` when `region` has no regional certificate stack
    pub fn certificate_set(&self, region: Region) -> SynthesisResult<CertificateSet> {
        let bridge = self.bridge();
        let mut edge = BTreeMap::new();
        let mut regional = BTreeMap::new();

        for role in DomainRole::ALL {
            match role.certificate_placement() {
                Some(CertificatePlacement::Edge) => {
                    edge.insert(role, bridge.import(region, role)?);
                }
                Some(CertificatePlacement::Regional) => {
                    let record = self
                        .regional
                        .get(&region)
                        .and_then(|stack| stack.lookup(region, role))
                        .ok_or_else(|| {
                            SynthesisError::configuration(format!(
                                "no regional certificate for {} in {}/{}",
                                role, region, self.environment
                            ))
                        })?;
                    regional.insert(role, record.clone());
                }
                None => {}
            }
        }

        Ok(CertificateSet::new(region, self.environment, regional, edge))
    }

    /// Edge stack first, then regional stacks in region order
    pub fn stacks(&self) -> impl Iterator<Item = &CertificateStack> {
        std::iter::once(&self.edge).chain(self.regional.values())
    }
}
