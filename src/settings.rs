// Copyright (c) 2025 - Cowboy AI, Inc.
//! Process Settings
//!
//! Everything the pipeline reads from the process environment is read here,
//! once, at the entry point. The `dev` default for an absent environment
//! selector is applied nowhere else.

use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::composer::OBAN_AUTH_KEY_VAR;
use crate::domain::invariants::{validate_account_id, validate_zone_id};
use crate::domain::{Environment, Region, ZoneSelector};
use crate::errors::{SynthesisError, SynthesisResult};

pub const ENVIRONMENT_VAR: &str = "DEPLOYMENT_ENV";
pub const REGIONS_VAR: &str = "DEPLOYMENT_REGIONS";
pub const ACCOUNT_VAR: &str = "CDK_DEFAULT_ACCOUNT";
pub const OUTPUT_VAR: &str = "SYNTH_OUTPUT";

/// Variable overriding a hosted zone id, e.g. `DEV_TOOLS_ZONE_ID`
pub fn zone_id_var(environment: Environment, selector: ZoneSelector) -> String {
    format!(
        "{}_{}_ZONE_ID",
        environment.as_str().to_uppercase(),
        selector.as_str().to_uppercase()
    )
}

/// Settings of one synthesis run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisSettings {
    pub environment: Environment,
    pub regions: Vec<Region>,
    pub account: String,
    /// Manifest destination; `None` writes to stdout
    pub output: Option<PathBuf>,
    /// Hosted zone ids replacing the checked-in table's
    pub zone_ids: BTreeMap<(Environment, ZoneSelector), String>,
}

impl SynthesisSettings {
    /// Settings for explicit values
    pub fn new(environment: Environment, regions: Vec<Region>, account: impl Into<String>) -> SynthesisResult<Self> {
        let account = account.into();
        validate_account_id(&account)?;
        if regions.is_empty() {
            return Err(SynthesisError::configuration("at least one target region is required"));
        }

        Ok(Self {
            environment,
            regions,
            account,
            output: None,
            zone_ids: BTreeMap::new(),
        })
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Load settings from the process environment
    pub fn from_env() -> SynthesisResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through `lookup`, which returns a variable's value
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SynthesisResult<Self> {
        let selector = lookup(ENVIRONMENT_VAR);
        if selector.is_none() {
            warn!("{} not set, defaulting to {}", ENVIRONMENT_VAR, Environment::DEFAULT);
        }
        let environment = Environment::select(selector.as_deref())?;

        let regions = match lookup(REGIONS_VAR) {
            Some(list) => Region::parse_list(&list)?,
            None => Region::all().to_vec(),
        };

        let account = lookup(ACCOUNT_VAR)
            .ok_or_else(|| SynthesisError::configuration(format!("{} is not set", ACCOUNT_VAR)))?;

        // Only presence is checked; the value stays with the build host
        if lookup(OBAN_AUTH_KEY_VAR).map_or(true, |v| v.is_empty()) {
            return Err(SynthesisError::configuration(format!(
                "{} must be set for the container image build",
                OBAN_AUTH_KEY_VAR
            )));
        }

        let mut settings = Self::new(environment, regions, account)?;
        if let Some(output) = lookup(OUTPUT_VAR) {
            settings = settings.with_output(output);
        }

        for environment in Environment::all() {
            for selector in ZoneSelector::all() {
                if let Some(id) = lookup(&zone_id_var(environment, selector)) {
                    validate_zone_id(&id)?;
                    settings.zone_ids.insert((environment, selector), id);
                }
            }
        }

        debug!(
            environment = %settings.environment,
            zone_overrides = settings.zone_ids.len(),
            regions = ?settings.regions,
            "settings loaded"
        );
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const BASE: [(&str, &str); 2] = [(ACCOUNT_VAR, "728247919352"), (OBAN_AUTH_KEY_VAR, "secret")];

    #[test]
    fn test_defaults_to_dev_and_all_regions() {
        let settings = SynthesisSettings::from_lookup(lookup(&BASE)).unwrap();
        assert_eq!(settings.environment, Environment::Dev);
        assert_eq!(settings.regions, vec![Region::Eu, Region::Us]);
        assert_eq!(settings.output, None);
        assert!(settings.zone_ids.is_empty());
    }

    #[test]
    fn test_zone_id_overrides() {
        let mut vars = BASE.to_vec();
        vars.extend([
            ("DEV_TOOLS_ZONE_ID", "Z0123456789ABCDEFGHIJ"),
            ("PROD_COMMERCE_ZONE_ID", "Z06750861RW0K8GN2HE9G"),
        ]);
        let settings = SynthesisSettings::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(
            settings.zone_ids,
            BTreeMap::from([
                ((Environment::Dev, ZoneSelector::Tools), "Z0123456789ABCDEFGHIJ".to_string()),
                ((Environment::Prod, ZoneSelector::Commerce), "Z06750861RW0K8GN2HE9G".to_string()),
            ])
        );

        vars.push(("DEV_COMMERCE_ZONE_ID", "dev-zone"));
        assert!(matches!(
            SynthesisSettings::from_lookup(lookup(&vars)),
            Err(SynthesisError::Configuration(_))
        ));
    }

    #[test]
    fn test_explicit_values() {
        let mut vars = BASE.to_vec();
        vars.extend([
            (ENVIRONMENT_VAR, "prod"),
            (REGIONS_VAR, "us"),
            (OUTPUT_VAR, "cdk.out/manifest.json"),
        ]);
        let settings = SynthesisSettings::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(settings.environment, Environment::Prod);
        assert_eq!(settings.regions, vec![Region::Us]);
        assert_eq!(settings.output, Some(PathBuf::from("cdk.out/manifest.json")));
    }

    #[test]
    fn test_unknown_environment_is_not_defaulted() {
        let mut vars = BASE.to_vec();
        vars.push((ENVIRONMENT_VAR, "staging"));
        assert!(matches!(
            SynthesisSettings::from_lookup(lookup(&vars)),
            Err(SynthesisError::Configuration(_))
        ));
    }

    #[test]
    fn test_required_variables() {
        assert!(SynthesisSettings::from_lookup(lookup(&[(OBAN_AUTH_KEY_VAR, "x")])).is_err());
        assert!(SynthesisSettings::from_lookup(lookup(&[(ACCOUNT_VAR, "728247919352")])).is_err());
        assert!(SynthesisSettings::from_lookup(lookup(&[
            (ACCOUNT_VAR, "728247919352"),
            (OBAN_AUTH_KEY_VAR, "")
        ]))
        .is_err());
        assert!(SynthesisSettings::from_lookup(lookup(&[(ACCOUNT_VAR, "12"), (OBAN_AUTH_KEY_VAR, "x")])).is_err());
    }
}
