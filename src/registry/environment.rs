// Copyright (c) 2025 - Cowboy AI, Inc.
//! Environment Registry
//!
//! Region-independent settings per deployment environment: network block,
//! static app config, general secret and data-tier sizing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::app_config::StaticAppConfig;
use crate::domain::invariants::validate_secret_arn;
use crate::domain::{CidrBlock, Environment};
use crate::errors::{SynthesisError, SynthesisResult};

/// Where the general application secret comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SecretRef {
    /// Pre-existing secret, looked up by ARN
    Imported { arn: String },
    /// Generated inside each application stack
    StackManaged,
}

/// Data tier and retention settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSettings {
    pub database_instance_type: String,
    pub database_replica_instance_type: Option<String>,
    pub cache_node_type: String,
    pub backup_retention_days: u32,
    pub log_retention_days: u32,
    pub deletion_protection: bool,
}

impl TierSettings {
    fn for_environment(environment: Environment) -> Self {
        Self {
            database_instance_type: "t4g.micro".to_string(),
            database_replica_instance_type: None,
            cache_node_type: "cache.t4g.micro".to_string(),
            backup_retention_days: if environment.is_production() { 30 } else { 0 },
            log_retention_days: 7,
            deletion_protection: false,
        }
    }
}

/// Static settings of one environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub environment: Environment,
    pub cidr: CidrBlock,
    pub app_config: StaticAppConfig,
    pub general_secret: SecretRef,
    pub tiers: TierSettings,
}

impl EnvironmentConfig {
    pub fn new(
        environment: Environment,
        cidr: CidrBlock,
        app_config: StaticAppConfig,
        general_secret: SecretRef,
    ) -> SynthesisResult<Self> {
        if let SecretRef::Imported { arn } = &general_secret {
            validate_secret_arn(arn)?;
        }

        Ok(Self {
            environment,
            cidr,
            app_config,
            general_secret,
            tiers: TierSettings::for_environment(environment),
        })
    }

    pub fn with_tiers(mut self, tiers: TierSettings) -> Self {
        self.tiers = tiers;
        self
    }
}

/// Immutable environment table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentRegistry {
    entries: BTreeMap<Environment, EnvironmentConfig>,
}

impl EnvironmentRegistry {
    /// Build a registry from explicit entries
    pub fn from_entries(entries: impl IntoIterator<Item = EnvironmentConfig>) -> SynthesisResult<Self> {
        let mut map = BTreeMap::new();
        for config in entries {
            let environment = config.environment;
            if map.insert(environment, config).is_some() {
                return Err(SynthesisError::configuration(format!(
                    "environment {} registered twice",
                    environment
                )));
            }
        }
        Ok(Self { entries: map })
    }

    /// The checked-in table for passwordless-tools
    pub fn standard() -> SynthesisResult<Self> {
        let static_config = || StaticAppConfig::new([("PORT", "8000"), ("POOL_SIZE", "10")]);

        Self::from_entries([
            EnvironmentConfig::new(
                Environment::Dev,
                CidrBlock::new("10.0.0.0/16")?,
                static_config()?,
                SecretRef::StackManaged,
            )?,
            EnvironmentConfig::new(
                Environment::Prod,
                CidrBlock::new("10.1.0.0/16")?,
                static_config()?,
                SecretRef::Imported {
                    arn: "arn:aws:secretsmanager:eu-west-1:728247919352:secret:general-application-config-uL5n4J"
                        .to_string(),
                },
            )?,
        ])
    }

    /// Settings for `environment`
    pub fn resolve(&self, environment: Environment) -> SynthesisResult<&EnvironmentConfig> {
        debug!(%environment, "resolving environment");
        self.entries.get(&environment).ok_or_else(|| {
            SynthesisError::configuration(format!("environment {} is not registered", environment))
        })
    }

    /// Parse a raw selector and resolve it; no defaulting happens here
    pub fn resolve_selector(&self, selector: &str) -> SynthesisResult<&EnvironmentConfig> {
        self.resolve(selector.parse()?)
    }

    pub fn environments(&self) -> impl Iterator<Item = Environment> + '_ {
        self.entries.keys().copied()
    }
}
