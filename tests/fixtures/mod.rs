// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for passwordless-infra
//!
//! Registries are the checked-in tables; the account id is fixed so every
//! manifest is reproducible.
#![allow(dead_code)]

use passwordless_infra::certificates::CertificateResolver;
use passwordless_infra::composer::{OrderedDeclarationSet, StackComposer};
use passwordless_infra::{
    CertificateSet, DomainRegistry, DomainSet, Environment, EnvironmentRegistry, Region,
    SynthesisSettings,
};

pub const ACCOUNT: &str = "728247919352";

pub fn environments() -> EnvironmentRegistry {
    EnvironmentRegistry::standard().expect("environment table")
}

pub fn domains() -> DomainRegistry {
    DomainRegistry::standard().expect("domain table")
}

pub fn settings(environment: Environment, regions: &[Region]) -> SynthesisSettings {
    SynthesisSettings::new(environment, regions.to_vec(), ACCOUNT).expect("settings")
}

/// Inputs of one regional composition
pub struct Pair {
    pub region: Region,
    pub environment: Environment,
    pub environments: EnvironmentRegistry,
    pub domains: DomainSet,
    pub certificates: CertificateSet,
}

impl Pair {
    pub fn new(region: Region, environment: Environment) -> Self {
        let registry = domains();
        Self {
            region,
            environment,
            environments: environments(),
            domains: registry.resolve(region, environment).expect("domains"),
            certificates: CertificateResolver::new(&registry)
                .resolve_certificates(region, environment)
                .expect("certificates"),
        }
    }

    pub fn compose(&self) -> passwordless_infra::SynthesisResult<OrderedDeclarationSet> {
        StackComposer::new(&self.environments, ACCOUNT)
            .expect("composer")
            .compose(self.region, self.environment, &self.domains, &self.certificates)
    }
}
