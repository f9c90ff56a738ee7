// Copyright (c) 2025 - Cowboy AI, Inc.
//! Certificate Resolver
//!
//! Partitions certificate requests into the edge stack and per-region stacks.
//! Requests are deduplicated per (provisioning region, zone id, domain): two
//! roles resolving to the same name in the same zone share one record.

use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

use super::{CertificatePlan, CertificateRecord, CertificateSet, CertificateStack};
use crate::composer::StackId;
use crate::domain::{AwsRegion, CertificatePlacement, DomainRole, Environment, Region};
use crate::errors::SynthesisResult;
use crate::registry::{DomainRegistry, ResolvedDomain};

type CacheKey = (AwsRegion, String, String);

/// Accumulates one stack's records with the dedup cache
struct StackBuilder {
    stack: CertificateStack,
    cache: BTreeMap<CacheKey, usize>,
}

impl StackBuilder {
    fn new(id: StackId, region: AwsRegion, environment: Environment, placement: CertificatePlacement) -> Self {
        Self {
            stack: CertificateStack::new(id, region, environment, placement),
            cache: BTreeMap::new(),
        }
    }

    fn request(&mut self, region: Region, resolved: &ResolvedDomain) {
        let key = (
            self.stack.region,
            resolved.zone.id.clone(),
            resolved.domain.to_string(),
        );

        let index = match self.cache.get(&key) {
            Some(&index) => {
                debug!(role = %resolved.role, domain = %resolved.domain, "reusing certificate");
                index
            }
            None => {
                let logical_name = format!(
                    "{}-{}-{}-certificate",
                    region, self.stack.environment, resolved.role
                );
                let record = CertificateRecord {
                    domain: resolved.domain.clone(),
                    subject_alternative_names: vec![resolved.domain.wildcard()],
                    zone: resolved.zone.clone(),
                    placement: self.stack.placement,
                    handle: super::CertificateHandle::new(&self.stack.id, self.stack.region, logical_name),
                };
                debug!(
                    certificate = %record.handle.logical_name,
                    provisioned_in = %self.stack.region,
                    "requesting certificate"
                );

                let records = self.stack.records_mut();
                records.push(record);
                let index = records.len() - 1;
                self.cache.insert(key, index);
                index
            }
        };

        let id = self.stack.records()[index].handle.id;
        self.stack.assign(region, resolved.role, id);
    }

    fn finish(self) -> CertificateStack {
        self.stack
    }
}

/// Plans certificate stacks from the domain registry
#[derive(Debug, Clone, Copy)]
pub struct CertificateResolver<'a> {
    domains: &'a DomainRegistry,
}

impl<'a> CertificateResolver<'a> {
    pub fn new(domains: &'a DomainRegistry) -> Self {
        Self { domains }
    }

    /// Plan the edge stack and one regional stack per target region
    ///
    /// Every region's domains are resolved before any record is created, so a
    /// `MissingZone` error leaves nothing half-planned.
    #[instrument(level = "info", skip(self))]
    pub fn plan(&self, environment: Environment, regions: &[Region]) -> SynthesisResult<CertificatePlan> {
        let domain_sets = regions
            .iter()
            .map(|&region| self.domains.resolve(region, environment))
            .collect::<SynthesisResult<Vec<_>>>()?;

        let mut edge = StackBuilder::new(
            StackId::edge_certificates(environment),
            AwsRegion::EDGE,
            environment,
            CertificatePlacement::Edge,
        );
        let mut regional = BTreeMap::new();

        for set in &domain_sets {
            let region = set.region;
            let mut stack = StackBuilder::new(
                StackId::regional_certificates(region, environment),
                region.aws_region(),
                environment,
                CertificatePlacement::Regional,
            );

            for role in DomainRole::ALL {
                match role.certificate_placement() {
                    Some(CertificatePlacement::Edge) => edge.request(region, set.get(role)),
                    Some(CertificatePlacement::Regional) => stack.request(region, set.get(role)),
                    None => {}
                }
            }
            regional.insert(region, stack.finish());
        }

        let plan = CertificatePlan {
            environment,
            edge: edge.finish(),
            regional,
        };
        info!(
            edge_certificates = plan.edge.records().len(),
            regional_stacks = plan.regional.len(),
            "certificate plan ready"
        );
        Ok(plan)
    }

    /// Certificates for a single (region, environment) pair
    pub fn resolve_certificates(&self, region: Region, environment: Environment) -> SynthesisResult<CertificateSet> {
        self.plan(environment, &[region])?.certificate_set(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HostedZoneRef, Hostname, ZoneSelector};
    use crate::errors::SynthesisError;
    use crate::registry::DomainAttributes;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_edge_certificates_pinned() {
        let registry = DomainRegistry::standard().unwrap();
        let resolver = CertificateResolver::new(&registry);
        let set = resolver.resolve_certificates(Region::Eu, Environment::Prod).unwrap();

        for role in [DomainRole::Cdn, DomainRole::AppCdn, DomainRole::Com, DomainRole::Tracking] {
            let reference = set.edge(role).unwrap();
            assert_eq!(reference.producer_region(), AwsRegion::US_EAST_1);
            assert_eq!(reference.consumer_region, AwsRegion::EU_WEST_1);
            assert!(reference.crosses_regions());
        }
        for role in [DomainRole::Main, DomainRole::Www] {
            assert_eq!(set.regional(role).unwrap().handle.region, AwsRegion::EU_WEST_1);
        }
        assert!(set.edge(DomainRole::Email).is_err());
    }

    #[test]
    fn test_edge_stack_covers_all_regions() {
        let registry = DomainRegistry::standard().unwrap();
        let plan = CertificateResolver::new(&registry)
            .plan(Environment::Prod, &Region::all())
            .unwrap();

        assert_eq!(plan.edge.region, AwsRegion::EDGE);
        assert_eq!(plan.edge.assignments().count(), 8);
        assert_eq!(plan.regional[&Region::Us].region, AwsRegion::US_EAST_2);
        assert!(plan.certificate_set(Region::Us).is_ok());
    }

    #[test]
    fn test_wildcard_san() {
        let registry = DomainRegistry::standard().unwrap();
        let set = CertificateResolver::new(&registry)
            .resolve_certificates(Region::Eu, Environment::Prod)
            .unwrap();
        let main = set.regional(DomainRole::Main).unwrap();
        assert_eq!(main.subject_alternative_names, vec!["*.eu.passwordless.tools".to_string()]);
    }

    #[test]
    fn test_same_domain_shares_record() {
        // tracking moved onto the com name collapses into the com request
        let zone = HostedZoneRef::new("Z06750861RW0K8GN2HE9G", "passwordlesstools.com").unwrap();
        let registry = DomainRegistry::standard()
            .unwrap()
            .with_domain(
                Region::Eu,
                Environment::Prod,
                DomainRole::Tracking,
                DomainAttributes {
                    zone: ZoneSelector::Commerce,
                    domain: Hostname::new("eu.passwordlesstools.com").unwrap(),
                },
            );

        let plan = CertificateResolver::new(&registry)
            .plan(Environment::Prod, &[Region::Eu])
            .unwrap();
        assert_eq!(plan.edge.records().len(), 3);

        let com = plan.edge.lookup(Region::Eu, DomainRole::Com).unwrap();
        let tracking = plan.edge.lookup(Region::Eu, DomainRole::Tracking).unwrap();
        assert_eq!(com.handle, tracking.handle);
        assert_eq!(com.zone, zone);
    }

    #[test]
    fn test_deterministic_handles() {
        let registry = DomainRegistry::standard().unwrap();
        let resolver = CertificateResolver::new(&registry);
        assert_eq!(
            resolver.plan(Environment::Dev, &Region::all()).unwrap(),
            resolver.plan(Environment::Dev, &Region::all()).unwrap()
        );
    }

    #[test]
    fn test_missing_zone_before_any_record() {
        let registry = DomainRegistry::new()
            .with_zone(
                Environment::Prod,
                ZoneSelector::Tools,
                HostedZoneRef::new("Z0737569361XQK32FNWPX", "passwordless.tools").unwrap(),
            )
            .unwrap()
            .with_domain(
                Region::Eu,
                Environment::Prod,
                DomainRole::Main,
                DomainAttributes {
                    zone: ZoneSelector::Tools,
                    domain: Hostname::new("eu.passwordless.tools").unwrap(),
                },
            );
        let registry = DomainRole::ALL.iter().fold(registry, |registry, &role| {
            registry.with_domain(
                Region::Eu,
                Environment::Prod,
                role,
                DomainAttributes {
                    zone: if role == DomainRole::Cdn {
                        ZoneSelector::Commerce
                    } else {
                        ZoneSelector::Tools
                    },
                    domain: Hostname::new("eu.passwordless.tools").unwrap(),
                },
            )
        });

        let err = CertificateResolver::new(&registry)
            .plan(Environment::Prod, &[Region::Eu])
            .unwrap_err();
        assert!(matches!(err, SynthesisError::MissingZone { role: DomainRole::Cdn, .. }));
    }
}
