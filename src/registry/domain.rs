// Copyright (c) 2025 - Cowboy AI, Inc.
//! Region/Domain Registry
//!
//! Two-level table keyed by region, then environment, holding one
//! [`DomainAttributes`] per [`DomainRole`], plus the hosted zones each
//! environment owns. Resolution checks structure only: every role present,
//! its zone known, its domain inside that zone. DNS resolvability is never
//! consulted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::domain::invariants::{validate_domain_in_zone, validate_zone_id};
use crate::domain::{DomainRole, Environment, HostedZoneRef, Hostname, Region, ZoneSelector};
use crate::errors::{SynthesisError, SynthesisResult};

/// Domain and the zone family that owns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainAttributes {
    pub zone: ZoneSelector,
    pub domain: Hostname,
}

/// Domain attributes with the zone reference resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDomain {
    pub role: DomainRole,
    pub zone: HostedZoneRef,
    pub domain: Hostname,
}

/// Every role's domain for one (region, environment) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainSet {
    pub region: Region,
    pub environment: Environment,
    domains: BTreeMap<DomainRole, ResolvedDomain>,
}

impl DomainSet {
    /// Resolved domain for `role`
    ///
    /// A `DomainSet` is only built with every role present.
    pub fn get(&self, role: DomainRole) -> &ResolvedDomain {
        &self.domains[&role]
    }

    pub fn domain(&self, role: DomainRole) -> &Hostname {
        &self.get(role).domain
    }

    pub fn zone(&self, role: DomainRole) -> &HostedZoneRef {
        &self.get(role).zone
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedDomain> {
        self.domains.values()
    }
}

type DomainTable = BTreeMap<DomainRole, DomainAttributes>;

/// Immutable domain and zone table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainRegistry {
    zones: BTreeMap<Environment, BTreeMap<ZoneSelector, HostedZoneRef>>,
    domains: BTreeMap<Region, BTreeMap<Environment, DomainTable>>,
}

/// Stand-in ids for the dev subzones, which have no delegated zone yet
///
/// They pass zone id validation so dev still synthesizes; deployments supply
/// the real ids through `DEV_TOOLS_ZONE_ID` and `DEV_COMMERCE_ZONE_ID`.
pub const DEV_ZONE_PLACEHOLDERS: [(ZoneSelector, &str); 2] = [
    (ZoneSelector::Tools, "ZDEVTOOLSPLACEHOLDER"),
    (ZoneSelector::Commerce, "ZDEVCOMMERCEPLACEHOLDER"),
];

fn placeholder_id(selector: ZoneSelector) -> &'static str {
    DEV_ZONE_PLACEHOLDERS
        .iter()
        .find(|(s, _)| *s == selector)
        .map_or("", |(_, id)| id)
}

/// Label in front of `{region}.{apex}` per role; `None` means the bare name
const ROLE_TEMPLATES: [(DomainRole, ZoneSelector, Option<&str>); 7] = [
    (DomainRole::Main, ZoneSelector::Tools, None),
    (DomainRole::Www, ZoneSelector::Tools, Some("www")),
    (DomainRole::AppCdn, ZoneSelector::Tools, Some("cdn")),
    (DomainRole::Cdn, ZoneSelector::Commerce, Some("cdn")),
    (DomainRole::Com, ZoneSelector::Commerce, None),
    (DomainRole::Email, ZoneSelector::Commerce, None),
    (DomainRole::Tracking, ZoneSelector::Commerce, Some("track")),
];

impl DomainRegistry {
    /// Empty registry; populate with [`with_zone`](Self::with_zone) and
    /// [`with_domain`](Self::with_domain)
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hosted zone for an environment
    pub fn with_zone(
        mut self,
        environment: Environment,
        selector: ZoneSelector,
        zone: HostedZoneRef,
    ) -> SynthesisResult<Self> {
        validate_zone_id(&zone.id)?;
        self.zones.entry(environment).or_default().insert(selector, zone);
        Ok(self)
    }

    /// Replace the id of an already registered zone, keeping its apex
    pub fn with_zone_id(
        mut self,
        environment: Environment,
        selector: ZoneSelector,
        id: impl Into<String>,
    ) -> SynthesisResult<Self> {
        let id = id.into();
        validate_zone_id(&id)?;
        let zone = self
            .zones
            .get_mut(&environment)
            .and_then(|zones| zones.get_mut(&selector))
            .ok_or_else(|| {
                SynthesisError::configuration(format!(
                    "no {} zone registered for {} to override",
                    selector, environment
                ))
            })?;
        debug!(%environment, %selector, %id, "zone id overridden");
        zone.id = id;
        Ok(self)
    }

    /// Apply every `(environment, selector) → id` override
    pub fn with_zone_ids<'a>(
        self,
        overrides: impl IntoIterator<Item = (&'a (Environment, ZoneSelector), &'a String)>,
    ) -> SynthesisResult<Self> {
        overrides
            .into_iter()
            .try_fold(self, |registry, ((environment, selector), id)| {
                registry.with_zone_id(*environment, *selector, id.as_str())
            })
    }

    /// Zones of `environment` still carrying a placeholder id
    pub fn placeholder_zones(&self, environment: Environment) -> Vec<ZoneSelector> {
        self.zones
            .get(&environment)
            .map(|zones| {
                zones
                    .iter()
                    .filter(|(selector, zone)| zone.id == placeholder_id(**selector))
                    .map(|(selector, _)| *selector)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Register one role's domain for a (region, environment) pair
    pub fn with_domain(
        mut self,
        region: Region,
        environment: Environment,
        role: DomainRole,
        attributes: DomainAttributes,
    ) -> Self {
        self.domains
            .entry(region)
            .or_default()
            .entry(environment)
            .or_default()
            .insert(role, attributes);
        self
    }

    /// Populate every role of a pair as `{label.}{region}.{zone apex}`
    pub fn with_templated_domains(mut self, region: Region, environment: Environment) -> SynthesisResult<Self> {
        for (role, selector, label) in ROLE_TEMPLATES {
            let zone = self
                .zones
                .get(&environment)
                .and_then(|zones| zones.get(&selector))
                .ok_or_else(|| SynthesisError::MissingZone {
                    region,
                    environment,
                    role,
                    zone: selector.to_string(),
                })?;

            let regional = Hostname::prefixed(region.as_str(), &zone.name)?;
            let domain = match label {
                Some(label) => Hostname::prefixed(label, &regional)?,
                None => regional,
            };

            self = self.with_domain(region, environment, role, DomainAttributes { zone: selector, domain });
        }
        Ok(self)
    }

    /// The checked-in table for passwordless-tools
    ///
    /// Production apexes are `passwordless.tools` and
    /// `passwordlesstools.com`; dev uses their `dev.` subzones, registered
    /// with [`DEV_ZONE_PLACEHOLDERS`] ids.
    pub fn standard() -> SynthesisResult<Self> {
        let mut registry = Self::new()
            .with_zone(
                Environment::Dev,
                ZoneSelector::Tools,
                HostedZoneRef::new(placeholder_id(ZoneSelector::Tools), "dev.passwordless.tools")?,
            )?
            .with_zone(
                Environment::Dev,
                ZoneSelector::Commerce,
                HostedZoneRef::new(placeholder_id(ZoneSelector::Commerce), "dev.passwordlesstools.com")?,
            )?
            .with_zone(
                Environment::Prod,
                ZoneSelector::Tools,
                HostedZoneRef::new("Z0737569361XQK32FNWPX", "passwordless.tools")?,
            )?
            .with_zone(
                Environment::Prod,
                ZoneSelector::Commerce,
                HostedZoneRef::new("Z06750861RW0K8GN2HE9G", "passwordlesstools.com")?,
            )?;

        for region in Region::all() {
            for environment in Environment::all() {
                registry = registry.with_templated_domains(region, environment)?;
            }
        }
        Ok(registry)
    }

    /// Zone registered for `(environment, selector)`
    pub fn zone(&self, environment: Environment, selector: ZoneSelector) -> Option<&HostedZoneRef> {
        self.zones.get(&environment).and_then(|zones| zones.get(&selector))
    }

    /// Regions with at least one environment table
    pub fn regions(&self) -> impl Iterator<Item = Region> + '_ {
        self.domains.keys().copied()
    }

    /// Resolve every role for a (region, environment) pair
    ///
    /// # Errors
    /// - `Configuration` when the pair or one of its roles has no entry
    /// - `MissingZone` when a role names a zone the environment lacks
    /// - `InvalidDomain` when a domain sits outside its zone
    #[instrument(level = "debug", skip(self))]
    pub fn resolve(&self, region: Region, environment: Environment) -> SynthesisResult<DomainSet> {
        let table = self
            .domains
            .get(&region)
            .ok_or_else(|| SynthesisError::configuration(format!("no domain table for region {}", region)))?
            .get(&environment)
            .ok_or_else(|| {
                SynthesisError::configuration(format!(
                    "no domain table for {} in region {}",
                    environment, region
                ))
            })?;

        let mut domains = BTreeMap::new();
        for role in DomainRole::ALL {
            let attributes = table.get(&role).ok_or_else(|| {
                SynthesisError::configuration(format!(
                    "{}/{} does not define the {} domain",
                    region, environment, role
                ))
            })?;

            let zone = self
                .zone(environment, attributes.zone)
                .ok_or_else(|| SynthesisError::MissingZone {
                    region,
                    environment,
                    role,
                    zone: attributes.zone.to_string(),
                })?;

            validate_domain_in_zone(role, &attributes.domain, zone)?;

            debug!(%role, domain = %attributes.domain, zone = %zone.name, "resolved domain");
            domains.insert(
                role,
                ResolvedDomain {
                    role,
                    zone: zone.clone(),
                    domain: attributes.domain.clone(),
                },
            );
        }

        Ok(DomainSet {
            region,
            environment,
            domains,
        })
    }
}
