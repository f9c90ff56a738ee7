// Copyright (c) 2025 - Cowboy AI, Inc.
//! Certificate Placement Tests
//!
//! Edge-consumed certificates come from the edge region; load balancer
//! certificates come from the target region.

mod fixtures;

use passwordless_infra::certificates::CertificateResolver;
use passwordless_infra::composer::{ResourceId, ResourceSpec};
use passwordless_infra::domain::{AwsRegion, DomainRole};
use passwordless_infra::{CertificateSet, Environment, Region, SynthesisError, Synthesizer};
use pretty_assertions::assert_eq;
use test_case::test_case;

#[test_case(Region::Eu, Environment::Dev ; "eu dev")]
#[test_case(Region::Eu, Environment::Prod ; "eu prod")]
#[test_case(Region::Us, Environment::Dev ; "us dev")]
#[test_case(Region::Us, Environment::Prod ; "us prod")]
fn test_distributions_consume_edge_certificates(region: Region, environment: Environment) {
    let pair = fixtures::Pair::new(region, environment);
    let stack = pair.compose().unwrap();

    let mut distributions = 0;
    for declaration in stack.iter() {
        let certificate = match &declaration.spec {
            ResourceSpec::Distribution(spec) => &spec.certificate,
            ResourceSpec::AppService(spec) => {
                let Some(ResourceSpec::ImportedCertificate(reference)) =
                    stack.get(&spec.certificate).map(|d| &d.spec)
                else {
                    panic!("app certificate is not an import");
                };
                assert_eq!(reference.producer_region(), region.aws_region());
                continue;
            }
            _ => continue,
        };

        distributions += 1;
        let Some(ResourceSpec::ImportedCertificate(reference)) = stack.get(certificate).map(|d| &d.spec) else {
            panic!("{} certificate is not an import", declaration.id);
        };
        assert_eq!(reference.producer_region(), AwsRegion::US_EAST_1);
        assert_eq!(reference.consumer_region, region.aws_region());
    }
    assert_eq!(distributions, 4);
}

#[test_case(Region::Eu, Environment::Prod ; "eu prod")]
#[test_case(Region::Us, Environment::Dev ; "us dev")]
fn test_every_edge_certificate_is_consumed(region: Region, environment: Environment) {
    let pair = fixtures::Pair::new(region, environment);
    let stack = pair.compose().unwrap();

    let imported: Vec<_> = stack
        .iter()
        .filter_map(|d| match &d.spec {
            ResourceSpec::ImportedCertificate(reference) => Some(reference.handle.id),
            _ => None,
        })
        .collect();
    for (role, reference) in pair.certificates.edge_references() {
        assert!(imported.contains(&reference.handle.id), "{} certificate unused", role);
    }
}

#[test]
fn test_one_edge_stack_for_all_regions() {
    let environments = fixtures::environments();
    let domains = fixtures::domains();
    let app = Synthesizer::new(&environments, &domains)
        .run(&fixtures::settings(Environment::Prod, &Region::all()))
        .unwrap();

    assert_eq!(app.edge_certificates.region, AwsRegion::EDGE);
    assert_eq!(app.edge_certificates.declarations.len(), 8);
    for (manifest, region) in app.regional_certificates.iter().zip(Region::all()) {
        assert_eq!(manifest.region, region.aws_region());
        assert_eq!(manifest.declarations.len(), 2);
    }
}

#[test]
fn test_resolve_certificates_is_deterministic() {
    let registry = fixtures::domains();
    let resolver = CertificateResolver::new(&registry);
    for region in Region::all() {
        for environment in Environment::all() {
            assert_eq!(
                resolver.resolve_certificates(region, environment).unwrap(),
                resolver.resolve_certificates(region, environment).unwrap()
            );
        }
    }
}

#[test]
fn test_missing_app_cdn_certificate_is_a_cross_region_error() {
    let mut pair = fixtures::Pair::new(Region::Us, Environment::Dev);
    let mut edge = pair.certificates.edge_references().clone();
    edge.remove(&DomainRole::AppCdn);
    pair.certificates = CertificateSet::new(
        Region::Us,
        Environment::Dev,
        pair.certificates.regional_records().clone(),
        edge,
    );

    assert_eq!(
        pair.compose().unwrap_err(),
        SynthesisError::CrossRegionReference {
            region: Region::Us,
            environment: Environment::Dev,
            role: DomainRole::AppCdn,
        }
    );
}

#[test]
fn test_unplanned_region_has_no_bridge() {
    let registry = fixtures::domains();
    let plan = CertificateResolver::new(&registry)
        .plan(Environment::Prod, &[Region::Eu])
        .unwrap();

    assert!(matches!(
        plan.certificate_set(Region::Us),
        Err(SynthesisError::CrossRegionReference { region: Region::Us, .. })
    ));
    assert!(plan
        .edge
        .to_manifest(fixtures::ACCOUNT)
        .unwrap()
        .declarations
        .get(&ResourceId::new("eu-prod-app-cdn-certificate"))
        .is_some());
}
