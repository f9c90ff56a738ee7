// Copyright (c) 2025 - Cowboy AI, Inc.
//! Declarations Emitted to the Deploy Engine
//!
//! A [`Declaration`] describes one managed resource's desired state: an id, a
//! typed payload, explicit dependency edges, and the grants it carries. The
//! deploy engine owns every real mutation; these are plain data.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::bridge::CrossRegionReference;
use crate::domain::{CidrBlock, Hostname, HostedZoneRef};

/// Unique id of a declaration within a stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `{prefix}-{name}`
    pub fn scoped(prefix: &str, name: &str) -> Self {
        Self(format!("{}-{}", prefix, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value of a container environment variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvValue {
    /// Known at synthesis time
    Literal(String),
    /// Resolved by the deploy engine from another resource's attribute
    Attribute { resource: ResourceId, attribute: String },
}

impl EnvValue {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn attribute(resource: &ResourceId, attribute: &str) -> Self {
        Self::Attribute {
            resource: resource.clone(),
            attribute: attribute.to_string(),
        }
    }

    fn reference(&self) -> Option<&ResourceId> {
        match self {
            Self::Literal(_) => None,
            Self::Attribute { resource, .. } => Some(resource),
        }
    }
}

/// A container secret read from one field of a secret resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretBinding {
    pub secret: ResourceId,
    pub field: String,
}

impl SecretBinding {
    pub fn new(secret: &ResourceId, field: &str) -> Self {
        Self {
            secret: secret.clone(),
            field: field.to_string(),
        }
    }
}

/// Least-privilege permission: `principal` may perform `actions` on `resource`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub principal: ResourceId,
    pub resource: ResourceId,
    pub actions: Vec<String>,
}

impl Grant {
    pub fn new(principal: &ResourceId, resource: &ResourceId, actions: &[&str]) -> Self {
        Self {
            principal: principal.clone(),
            resource: resource.clone(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubnetKind {
    Public,
    PrivateWithEgress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub name: String,
    pub kind: SubnetKind,
    pub cidr_mask: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcSpec {
    pub name: String,
    pub cidr: CidrBlock,
    pub max_azs: u8,
    pub subnets: Vec<Subnet>,
    pub gateway_endpoints: Vec<String>,
    pub interface_endpoints: Vec<String>,
    pub flow_log_retention_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum SecretSpec {
    /// Existing secret looked up by ARN
    Imported { arn: String },
    /// Generated and owned by this stack
    Generated { name: String, description: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSpec {
    pub name: String,
    pub engine: String,
    pub engine_version: String,
    pub port: u16,
    pub instance_type: String,
    pub vpc: ResourceId,
    pub credentials: ResourceId,
    pub backup_retention_days: u32,
    pub deletion_protection: bool,
    pub storage_encrypted: bool,
    pub publicly_accessible: bool,
    pub security_group: ResourceId,
}

/// Read-only copy of a database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaSpec {
    pub name: String,
    pub source: ResourceId,
    pub instance_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPlanSpec {
    pub name: String,
    pub target: ResourceId,
    pub rate_hours: u32,
    pub start_window_hours: u32,
    pub completion_window_hours: u32,
    pub delete_after_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSpec {
    pub name: String,
    pub engine: String,
    pub port: u16,
    pub node_type: String,
    pub vpc: ResourceId,
    pub auth_token: ResourceId,
    pub security_group: ResourceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub name: String,
    pub vpc: ResourceId,
    pub container_insights: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityProviderSpec {
    pub name: String,
    pub cluster: ResourceId,
    pub instance_type: String,
    pub machine_image: String,
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub managed_scaling: bool,
    pub managed_termination_protection: bool,
}

/// Build argument for the container image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildArg {
    Literal(String),
    /// Read from the named variable by the build host; never inlined
    FromEnv(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub name: String,
    pub context: String,
    pub platform: String,
    pub exclude: Vec<String>,
    pub build_args: BTreeMap<String, BuildArg>,
}

/// Account-wide image scanning configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryScanningSpec {
    pub name: String,
    pub scan_type: String,
    /// Scan type restored when the stack is deleted
    pub scan_type_on_delete: String,
    pub scan_frequency: String,
    pub repository_filter: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub name: String,
    pub public_read: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSpec {
    pub name: String,
    pub enforce_ssl: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSpec {
    pub name: String,
    pub image: ResourceId,
    pub vpc: ResourceId,
    pub security_group: ResourceId,
    pub timeout_secs: u32,
    pub memory_mib: u32,
    pub environment: BTreeMap<String, EnvValue>,
    pub secrets: BTreeMap<String, SecretBinding>,
    /// Invoked on every create and update so the schema always leads the app
    pub invoke_on_deploy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingPolicy {
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub target_cpu_percent: u32,
    pub scale_in_cooldown_secs: u32,
    pub scale_out_cooldown_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub path: String,
    pub command: Option<String>,
    pub interval_secs: u32,
    pub timeout_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRedirect {
    pub from: Hostname,
    pub to: Hostname,
    pub permanent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppServiceSpec {
    pub name: String,
    pub cluster: ResourceId,
    pub capacity_provider: ResourceId,
    pub image: ResourceId,
    pub certificate: ResourceId,
    pub security_group: ResourceId,
    pub domain: Hostname,
    pub zone: HostedZoneRef,
    pub command: String,
    pub container_port: u16,
    pub memory_reservation_mib: u32,
    pub min_healthy_percent: u32,
    pub stop_timeout_secs: u32,
    pub environment: BTreeMap<String, EnvValue>,
    pub secrets: BTreeMap<String, SecretBinding>,
    pub health_check: HealthCheck,
    pub scaling: ScalingPolicy,
    pub redirects: Vec<HostRedirect>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupSpec {
    pub name: String,
    pub vpc: ResourceId,
    pub description: String,
}

/// Ingress from one security group to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressSpec {
    pub source: ResourceId,
    pub target: ResourceId,
    pub port: u16,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WafAction {
    Allow,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum WafRule {
    PathPrefix {
        name: String,
        priority: u32,
        prefix: String,
        action: WafAction,
    },
    ManagedGroup {
        name: String,
        priority: u32,
        group: String,
        excluded_rules: Vec<String>,
    },
}

impl WafRule {
    pub fn priority(&self) -> u32 {
        match self {
            Self::PathPrefix { priority, .. } | Self::ManagedGroup { priority, .. } => *priority,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WafSpec {
    pub name: String,
    pub scope: String,
    pub default_action: WafAction,
    pub associations: Vec<ResourceId>,
    pub rules: Vec<WafRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Origin {
    LoadBalancer { service: ResourceId },
    Bucket { bucket: ResourceId },
    Http { host: String },
    Redirect { to: Hostname },
}

impl Origin {
    fn reference(&self) -> Option<&ResourceId> {
        match self {
            Self::LoadBalancer { service } => Some(service),
            Self::Bucket { bucket } => Some(bucket),
            Self::Http { .. } | Self::Redirect { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Behavior {
    pub path_pattern: String,
    pub origin: Origin,
    pub redirect_to_https: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    A,
    #[serde(rename = "AAAA")]
    Aaaa,
    #[serde(rename = "CNAME")]
    Cname,
    #[serde(rename = "TXT")]
    Txt,
    #[serde(rename = "MX")]
    Mx,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub zone: HostedZoneRef,
    pub name: String,
    pub record_type: RecordType,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionSpec {
    pub name: String,
    pub domains: Vec<Hostname>,
    pub certificate: ResourceId,
    pub default_behavior: Behavior,
    pub additional_behaviors: Vec<Behavior>,
    pub records: Vec<DnsRecord>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationSetSpec {
    pub name: String,
    pub tracking_domain: Option<Hostname>,
    pub tracking_distribution: Option<ResourceId>,
    pub require_tls: bool,
    pub reputation_metrics: bool,
    pub suppress_bounces_and_complaints: bool,
    pub event_topic: String,
    pub event_queue: ResourceId,
    pub events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailIdentitySpec {
    pub domain: Hostname,
    pub zone: HostedZoneRef,
    pub mail_from_domain: Hostname,
    pub configuration_set: ResourceId,
    pub dkim_signing: bool,
    pub reject_on_mx_failure: bool,
    pub records: Vec<DnsRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateSpec {
    pub domain: Hostname,
    pub subject_alternative_names: Vec<String>,
    pub validation_zone: HostedZoneRef,
}

/// Typed payload of a declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum ResourceSpec {
    Vpc(VpcSpec),
    DnsNamespace { name: String, vpc: ResourceId },
    Secret(SecretSpec),
    Database(DatabaseSpec),
    DatabaseReplica(ReplicaSpec),
    BackupPlan(BackupPlanSpec),
    Cache(CacheSpec),
    Cluster(ClusterSpec),
    CapacityProvider(CapacityProviderSpec),
    ContainerImage(ImageSpec),
    RegistryScanning(RegistryScanningSpec),
    Bucket(BucketSpec),
    Queue(QueueSpec),
    Migration(MigrationSpec),
    AppService(AppServiceSpec),
    SecurityGroup(SecurityGroupSpec),
    Ingress(IngressSpec),
    Waf(WafSpec),
    Certificate(CertificateSpec),
    ImportedCertificate(CrossRegionReference),
    Distribution(DistributionSpec),
    ConfigurationSet(ConfigurationSetSpec),
    EmailIdentity(EmailIdentitySpec),
}

impl ResourceSpec {
    /// Short type tag, matching the serialized `type` field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Vpc(_) => "vpc",
            Self::DnsNamespace { .. } => "dns-namespace",
            Self::Secret(_) => "secret",
            Self::Database(_) => "database",
            Self::DatabaseReplica(_) => "database-replica",
            Self::BackupPlan(_) => "backup-plan",
            Self::Cache(_) => "cache",
            Self::Cluster(_) => "cluster",
            Self::CapacityProvider(_) => "capacity-provider",
            Self::ContainerImage(_) => "container-image",
            Self::RegistryScanning(_) => "registry-scanning",
            Self::Bucket(_) => "bucket",
            Self::Queue(_) => "queue",
            Self::Migration(_) => "migration",
            Self::AppService(_) => "app-service",
            Self::SecurityGroup(_) => "security-group",
            Self::Ingress(_) => "ingress",
            Self::Waf(_) => "waf",
            Self::Certificate(_) => "certificate",
            Self::ImportedCertificate(_) => "imported-certificate",
            Self::Distribution(_) => "distribution",
            Self::ConfigurationSet(_) => "configuration-set",
            Self::EmailIdentity(_) => "email-identity",
        }
    }

    /// Ids this payload refers to
    pub fn references(&self) -> Vec<&ResourceId> {
        let mut refs = Vec::new();
        match self {
            Self::Vpc(_) | Self::Secret(_) | Self::ContainerImage(_) | Self::RegistryScanning(_) => {}
            Self::Bucket(_) | Self::Queue(_) | Self::Certificate(_) => {}
            Self::ImportedCertificate(_) => {}
            Self::DnsNamespace { vpc, .. } => refs.push(vpc),
            Self::Database(db) => refs.extend([&db.vpc, &db.credentials, &db.security_group]),
            Self::DatabaseReplica(replica) => refs.push(&replica.source),
            Self::BackupPlan(plan) => refs.push(&plan.target),
            Self::Cache(cache) => refs.extend([&cache.vpc, &cache.auth_token, &cache.security_group]),
            Self::Cluster(cluster) => refs.push(&cluster.vpc),
            Self::CapacityProvider(cp) => refs.push(&cp.cluster),
            Self::Migration(m) => {
                refs.extend([&m.image, &m.vpc, &m.security_group]);
                refs.extend(m.environment.values().filter_map(EnvValue::reference));
                refs.extend(m.secrets.values().map(|s| &s.secret));
            }
            Self::AppService(app) => {
                refs.extend([
                    &app.cluster,
                    &app.capacity_provider,
                    &app.image,
                    &app.certificate,
                    &app.security_group,
                ]);
                refs.extend(app.environment.values().filter_map(EnvValue::reference));
                refs.extend(app.secrets.values().map(|s| &s.secret));
            }
            Self::SecurityGroup(group) => refs.push(&group.vpc),
            Self::Ingress(rule) => refs.extend([&rule.source, &rule.target]),
            Self::Waf(waf) => refs.extend(waf.associations.iter()),
            Self::Distribution(dist) => {
                refs.push(&dist.certificate);
                refs.extend(dist.default_behavior.origin.reference());
                refs.extend(
                    dist.additional_behaviors
                        .iter()
                        .filter_map(|b| b.origin.reference()),
                );
            }
            Self::ConfigurationSet(set) => {
                refs.push(&set.event_queue);
                refs.extend(set.tracking_distribution.iter());
            }
            Self::EmailIdentity(identity) => refs.push(&identity.configuration_set),
        }
        refs
    }
}

/// One managed resource in desired state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub id: ResourceId,
    pub spec: ResourceSpec,
    /// Ordering edges that no payload reference implies
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on: BTreeSet<ResourceId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grants: Vec<Grant>,
}

impl Declaration {
    pub fn new(id: ResourceId, spec: ResourceSpec) -> Self {
        Self {
            id,
            spec,
            depends_on: BTreeSet::new(),
            grants: Vec::new(),
        }
    }

    pub fn depends_on(mut self, id: &ResourceId) -> Self {
        self.depends_on.insert(id.clone());
        self
    }

    pub fn grant(mut self, grant: Grant) -> Self {
        self.grants.push(grant);
        self
    }

    /// Every other declaration this one needs to exist first
    ///
    /// Union of explicit edges, payload references and grant parties,
    /// excluding the declaration itself.
    pub fn dependencies(&self) -> BTreeSet<&ResourceId> {
        self.depends_on
            .iter()
            .chain(self.spec.references())
            .chain(self.grants.iter().flat_map(|g| [&g.principal, &g.resource]))
            .filter(|id| **id != self.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_union_excludes_self() {
        let app = ResourceId::new("app");
        let secret = ResourceId::new("secret");
        let queue = ResourceId::new("queue");
        let migration = ResourceId::new("migration");

        let decl = Declaration::new(
            queue.clone(),
            ResourceSpec::Queue(QueueSpec {
                name: "events".into(),
                enforce_ssl: true,
            }),
        )
        .depends_on(&migration)
        .grant(Grant::new(&app, &queue, &["sqs:ReceiveMessage"]))
        .grant(Grant::new(&app, &secret, &["secretsmanager:GetSecretValue"]));

        let deps: Vec<_> = decl.dependencies().into_iter().cloned().collect();
        assert_eq!(deps, vec![app, migration, secret]);
    }

    #[test]
    fn test_spec_serializes_with_type_tag() {
        let spec = ResourceSpec::Bucket(BucketSpec {
            name: "customer-media".into(),
            public_read: true,
        });
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["type"], "bucket");
        assert_eq!(json["name"], "customer-media");
        assert_eq!(spec.kind(), "bucket");
    }

    #[test]
    fn test_attribute_env_value_is_a_reference() {
        let bucket = ResourceId::new("eu-prod-customer-media");
        let value = EnvValue::attribute(&bucket, "bucket_name");
        assert_eq!(value.reference(), Some(&bucket));
        assert_eq!(EnvValue::literal("8000").reference(), None);
    }
}
