// Copyright (c) 2025 - Cowboy AI, Inc.
//! Application Container Configuration
//!
//! The container environment is the union of a static, per-environment table
//! and values computed while a stack is composed.
//!
//! # Precedence
//!
//! Dynamic values win. Static tables may not even name a dynamic key:
//! [`StaticAppConfig::new`] rejects any key owned by [`DynamicAppConfig`], so
//! the merge can never shadow one with the other. The dynamic side is a
//! struct, and [`DynamicAppConfig::entries`] destructures it without a rest
//! pattern, so a new field cannot be added without also giving it a key.
//!
//! Secrets are bound by name from their secret resources and never appear in
//! the environment map. Their names are reserved the same way.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::composer::{EnvValue, ResourceId, SecretBinding};
use crate::domain::invariants::validate_variable_name;
use crate::domain::{AwsRegion, Hostname};
use crate::errors::{SynthesisError, SynthesisResult};

/// Variable set on the migration task only
pub const MIGRATION_FLAG: &str = "DATABASE_MIGRATION";

/// Container secrets read from the database credentials
pub const DATABASE_SECRET_KEYS: [(&str, &str); 5] = [
    ("POSTGRES_USER", "username"),
    ("POSTGRES_PASSWORD", "password"),
    ("POSTGRES_HOST", "host"),
    ("POSTGRES_PORT", "port"),
    ("POSTGRES_DB_NAME", "dbname"),
];

/// Container secrets read from the general application secret
pub const GENERAL_SECRET_KEYS: [&str; 4] = [
    "SECRET_KEY_BASE",
    "OPEN_AI_KEY",
    "GOOGLE_OAUTH_CLIENT_ID",
    "GOOGLE_OAUTH_SECRET",
];

/// Container secret holding the cache auth token
pub const REDIS_AUTH_KEY: &str = "REDIS_AUTH_TOKEN";

/// Static key/value configuration for one environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct StaticAppConfig(BTreeMap<String, String>);

impl TryFrom<BTreeMap<String, String>> for StaticAppConfig {
    type Error = SynthesisError;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::new(map)
    }
}

impl From<StaticAppConfig> for BTreeMap<String, String> {
    fn from(config: StaticAppConfig) -> Self {
        config.0
    }
}

fn is_reserved(key: &str) -> bool {
    DynamicAppConfig::KEYS.contains(&key)
        || key == MIGRATION_FLAG
        || key == REDIS_AUTH_KEY
        || GENERAL_SECRET_KEYS.contains(&key)
        || DATABASE_SECRET_KEYS.iter().any(|(name, _)| *name == key)
}

impl StaticAppConfig {
    /// Build a static table
    ///
    /// # Invariants
    /// - Keys are `UPPER_SNAKE_CASE`
    /// - No key owned by [`DynamicAppConfig`], [`MIGRATION_FLAG`] or a secret
    ///   binding
    /// - No duplicate keys
    pub fn new<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> SynthesisResult<Self>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (key, value) in entries {
            let key = key.into();
            validate_variable_name(&key)?;

            if is_reserved(&key) {
                return Err(SynthesisError::configuration(format!(
                    "static app config may not set {}: it is computed at composition time",
                    key
                )));
            }

            if map.insert(key.clone(), value.into()).is_some() {
                return Err(SynthesisError::configuration(format!(
                    "duplicate static app config key {}",
                    key
                )));
            }
        }
        Ok(Self(map))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Values derived while composing one regional stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicAppConfig {
    pub phx_host: Hostname,
    pub aws_region: AwsRegion,
    pub aws_account_id: String,
    pub cdn_host: Hostname,
    pub customer_media_bucket: ResourceId,
    pub email_domain: Hostname,
    pub email_events_queue: ResourceId,
    pub redis: ResourceId,
}

impl DynamicAppConfig {
    /// Every variable name this struct produces
    pub const KEYS: [&'static str; 10] = [
        "PHX_HOST",
        "AWS_REGION",
        "AWS_ACCOUNT_ID",
        "CDN_HOST",
        "CUSTOMER_MEDIA_BUCKET",
        "CUSTOMER_MEDIA_CDN_URL",
        "EMAIL_DOMAIN",
        "EMAIL_EVENTS_QUEUE_URL",
        "REDIS_HOST",
        "REDIS_PORT",
    ];

    /// Variables in [`Self::KEYS`] order
    pub fn entries(&self) -> [(&'static str, EnvValue); 10] {
        let Self {
            phx_host,
            aws_region,
            aws_account_id,
            cdn_host,
            customer_media_bucket,
            email_domain,
            email_events_queue,
            redis,
        } = self;

        [
            ("PHX_HOST", EnvValue::literal(phx_host.as_str())),
            ("AWS_REGION", EnvValue::literal(aws_region.as_str())),
            ("AWS_ACCOUNT_ID", EnvValue::literal(aws_account_id.as_str())),
            ("CDN_HOST", EnvValue::literal(cdn_host.as_str())),
            (
                "CUSTOMER_MEDIA_BUCKET",
                EnvValue::attribute(customer_media_bucket, "bucket_name"),
            ),
            (
                "CUSTOMER_MEDIA_CDN_URL",
                EnvValue::literal(format!("https://{}/customer-media/", cdn_host)),
            ),
            ("EMAIL_DOMAIN", EnvValue::literal(email_domain.as_str())),
            (
                "EMAIL_EVENTS_QUEUE_URL",
                EnvValue::attribute(email_events_queue, "queue_url"),
            ),
            ("REDIS_HOST", EnvValue::attribute(redis, "endpoint_address")),
            ("REDIS_PORT", EnvValue::attribute(redis, "endpoint_port")),
        ]
    }
}

/// Merge the application container environment
///
/// Static entries first, dynamic entries last.
pub fn container_environment(
    statics: &StaticAppConfig,
    dynamic: &DynamicAppConfig,
) -> BTreeMap<String, EnvValue> {
    let mut env: BTreeMap<String, EnvValue> = statics
        .iter()
        .map(|(k, v)| (k.to_string(), EnvValue::literal(v)))
        .collect();

    for (key, value) in dynamic.entries() {
        env.insert(key.to_string(), value);
    }
    env
}

/// Environment of the one-shot migration task
pub fn migration_environment(statics: &StaticAppConfig) -> BTreeMap<String, EnvValue> {
    let mut env: BTreeMap<String, EnvValue> = statics
        .iter()
        .map(|(k, v)| (k.to_string(), EnvValue::literal(v)))
        .collect();
    env.insert(MIGRATION_FLAG.to_string(), EnvValue::literal("true"));
    env
}

/// Secrets shared by the migration task and the app container
pub fn database_secrets(general: &ResourceId, postgres: &ResourceId) -> BTreeMap<String, SecretBinding> {
    let mut secrets: BTreeMap<String, SecretBinding> = DATABASE_SECRET_KEYS
        .iter()
        .map(|(name, field)| (name.to_string(), SecretBinding::new(postgres, field)))
        .collect();
    secrets.insert(
        "SECRET_KEY_BASE".to_string(),
        SecretBinding::new(general, "SECRET_KEY_BASE"),
    );
    secrets
}

/// Secrets of the app container
pub fn container_secrets(
    general: &ResourceId,
    postgres: &ResourceId,
    redis_auth: &ResourceId,
) -> BTreeMap<String, SecretBinding> {
    let mut secrets = database_secrets(general, postgres);
    for key in GENERAL_SECRET_KEYS {
        secrets.insert(key.to_string(), SecretBinding::new(general, key));
    }
    secrets.insert(REDIS_AUTH_KEY.to_string(), SecretBinding::new(redis_auth, "auth_token"));
    secrets
}
