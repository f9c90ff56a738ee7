// Copyright (c) 2025 - Cowboy AI, Inc.
//! Synthesis Pipeline
//!
//! One pass over the registries produces every stack of a deployment:
//!
//! ```text
//! UNSYNTHESIZED --resolve--> RESOLVED --compose--> COMPOSED --emit--> SYNTHESIZED
//! ```
//!
//! The first error aborts the pass. Nothing is returned but the error, so a
//! caller never sees a partial manifest.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use crate::certificates::CertificateResolver;
use crate::composer::{StackComposer, StackManifest};
use crate::domain::Environment;
use crate::errors::SynthesisResult;
use crate::registry::{DomainRegistry, EnvironmentRegistry};
use crate::settings::SynthesisSettings;
use crate::state_machine::{StateMachineWithHistory, SynthesisInput, SynthesisPhase, Transition};

/// Every stack of one deployment, in deploy order
#[derive(Debug, Clone, Serialize)]
pub struct SynthesizedApp {
    pub environment: Environment,
    pub edge_certificates: StackManifest,
    pub regional_certificates: Vec<StackManifest>,
    pub applications: Vec<StackManifest>,
    #[serde(skip)]
    history: Vec<Transition<SynthesisPhase, SynthesisInput>>,
}

impl SynthesizedApp {
    /// Edge certificates, then regional certificates, then applications
    pub fn stacks(&self) -> impl Iterator<Item = &StackManifest> {
        std::iter::once(&self.edge_certificates)
            .chain(self.regional_certificates.iter())
            .chain(self.applications.iter())
    }

    pub fn history(&self) -> &[Transition<SynthesisPhase, SynthesisInput>] {
        &self.history
    }

    /// Pretty-printed manifest
    pub fn to_json(&self) -> SynthesisResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Drives the pipeline over a pair of registries
#[derive(Debug, Clone, Copy)]
pub struct Synthesizer<'a> {
    environments: &'a EnvironmentRegistry,
    domains: &'a DomainRegistry,
}

impl<'a> Synthesizer<'a> {
    pub fn new(environments: &'a EnvironmentRegistry, domains: &'a DomainRegistry) -> Self {
        Self { environments, domains }
    }

    #[instrument(level = "info", skip_all, fields(environment = %settings.environment))]
    pub fn run(&self, settings: &SynthesisSettings) -> SynthesisResult<SynthesizedApp> {
        let environment = settings.environment;
        let mut phase = StateMachineWithHistory::new(SynthesisPhase::Unsynthesized);

        // Resolve: environment, domains and certificates for every region
        self.environments.resolve(environment)?;
        let plan = CertificateResolver::new(self.domains).plan(environment, &settings.regions)?;
        let domain_sets = settings
            .regions
            .iter()
            .map(|&region| self.domains.resolve(region, environment))
            .collect::<SynthesisResult<Vec<_>>>()?;
        phase.transition_with_history(SynthesisInput::Resolve, Utc::now())?;
        info!(phase = %phase.current_state(), regions = domain_sets.len(), "resolved");

        // Compose: one application stack per region
        let composer = StackComposer::new(self.environments, settings.account.clone())?;
        let applications = domain_sets
            .iter()
            .map(|domains| {
                let certificates = plan.certificate_set(domains.region)?;
                composer.compose_stack(domains.region, environment, domains, &certificates)
            })
            .collect::<SynthesisResult<Vec<_>>>()?;
        phase.transition_with_history(SynthesisInput::Compose, Utc::now())?;
        info!(phase = %phase.current_state(), stacks = applications.len(), "composed");

        // Emit: certificate stacks become manifests
        let edge_certificates = plan.edge.to_manifest(&settings.account)?;
        let regional_certificates = plan
            .regional
            .values()
            .map(|stack| stack.to_manifest(&settings.account))
            .collect::<SynthesisResult<Vec<_>>>()?;
        phase.transition_with_history(SynthesisInput::Emit, Utc::now())?;
        info!(phase = %phase.current_state(), "synthesized");

        Ok(SynthesizedApp {
            environment,
            edge_certificates,
            regional_certificates,
            applications,
            history: phase.history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Region;

    fn settings(environment: Environment) -> SynthesisSettings {
        SynthesisSettings::new(environment, Region::all().to_vec(), "728247919352").unwrap()
    }

    #[test]
    fn test_full_pass() {
        let environments = EnvironmentRegistry::standard().unwrap();
        let domains = DomainRegistry::standard().unwrap();
        let app = Synthesizer::new(&environments, &domains)
            .run(&settings(Environment::Prod))
            .unwrap();

        let ids: Vec<&str> = app.stacks().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "prod-edge-certificates",
                "eu-prod-certificates",
                "us-prod-certificates",
                "eu-prod-app",
                "us-prod-app",
            ]
        );

        let phases: Vec<SynthesisPhase> = app.history().iter().map(|t| t.to).collect();
        assert_eq!(
            phases,
            vec![
                SynthesisPhase::Resolved,
                SynthesisPhase::Composed,
                SynthesisPhase::Synthesized
            ]
        );
    }

    #[test]
    fn test_json_is_deterministic() {
        let environments = EnvironmentRegistry::standard().unwrap();
        let domains = DomainRegistry::standard().unwrap();
        let synthesizer = Synthesizer::new(&environments, &domains);

        let first = synthesizer.run(&settings(Environment::Dev)).unwrap().to_json().unwrap();
        let second = synthesizer.run(&settings(Environment::Dev)).unwrap().to_json().unwrap();
        assert_eq!(first, second);
        assert!(!first.contains("\"history\""));
    }
}
