// Copyright (c) 2025 - Cowboy AI, Inc.
//! Regional Application Stack Composer
//!
//! Builds the declarations of one (region, environment) application stack:
//! network, data tier, compute, access rules, migration, app service, edge and
//! email, in that order. Every id is prefixed `{region}-{env}-`, so stacks for
//! different pairs never collide.
//!
//! A grant is carried by whichever of its two parties is declared later, so
//! grant edges never point forward. Workloads depend on the ingress rules that
//! open their paths to the data tier, so the migration never runs before it
//! can reach the database.

pub mod declaration;
pub mod graph;

pub use declaration::*;
pub use graph::{DependencyGraph, OrderedDeclarationSet};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info, instrument};

use crate::app_config::{
    container_environment, container_secrets, database_secrets, migration_environment, DynamicAppConfig,
};
use crate::bridge::CrossRegionReference;
use crate::certificates::CertificateSet;
use crate::domain::invariants::{validate_account_id, validate_backup_windows, validate_scaling_bounds};
use crate::domain::{AwsRegion, DomainRole, Environment, Hostname, Region};
use crate::errors::{SynthesisError, SynthesisResult};
use crate::registry::{DomainSet, EnvironmentConfig, EnvironmentRegistry, SecretRef};

/// Build-host variable holding the private package registry key
pub const OBAN_AUTH_KEY_VAR: &str = "OBAN_PRO_AUTH_KEY";

/// Internal service discovery namespace
pub const PRIVATE_NAMESPACE: &str = "passwordless.tools.internal";

const SUBNET_MASK: u8 = 18;
const MAX_AZS: u8 = 3;
const POSTGRES_PORT: u16 = 5432;
const REDIS_PORT: u16 = 6379;
const APP_PORT: u16 = 8000;

const BACKUP_RATE_HOURS: u32 = 6;
const BACKUP_START_WINDOW_HOURS: u32 = 1;
const BACKUP_COMPLETION_WINDOW_HOURS: u32 = 2;
const BACKUP_DELETE_AFTER_DAYS: u32 = 30;

const SCALING: ScalingPolicy = ScalingPolicy {
    min_capacity: 1,
    max_capacity: 4,
    target_cpu_percent: 70,
    scale_in_cooldown_secs: 60,
    scale_out_cooldown_secs: 60,
};

/// SES event types forwarded to the events queue
pub const EMAIL_EVENTS: [&str; 8] = [
    "send",
    "delivery",
    "bounce",
    "complaint",
    "reject",
    "open",
    "click",
    "rendering_failure",
];

/// Name of a deployable stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackId(String);

impl StackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `{region}-{env}-app`
    pub fn app(region: Region, environment: Environment) -> Self {
        Self(format!("{}-{}-app", region, environment))
    }

    /// `{env}-edge-certificates`
    pub fn edge_certificates(environment: Environment) -> Self {
        Self(format!("{}-edge-certificates", environment))
    }

    /// `{region}-{env}-certificates`
    pub fn regional_certificates(region: Region, environment: Environment) -> Self {
        Self(format!("{}-{}-certificates", region, environment))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One stack as handed to the deploy engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackManifest {
    pub id: StackId,
    pub region: AwsRegion,
    pub account: String,
    pub environment: Environment,
    /// Stacks that must deploy first
    pub depends_on: Vec<StackId>,
    /// Whether the stack exports or imports across regions
    pub cross_region_references: bool,
    pub declarations: OrderedDeclarationSet,
}

/// Composes regional application stacks
#[derive(Debug, Clone)]
pub struct StackComposer<'a> {
    environments: &'a EnvironmentRegistry,
    account: String,
}

impl<'a> StackComposer<'a> {
    pub fn new(environments: &'a EnvironmentRegistry, account: impl Into<String>) -> SynthesisResult<Self> {
        let account = account.into();
        validate_account_id(&account)?;
        Ok(Self { environments, account })
    }

    /// Ordered declarations of the `(region, environment)` app stack
    ///
    /// # Errors
    /// - `Configuration` when the environment is unregistered or the inputs
    ///   belong to a different pair
    /// - `CrossRegionReference` when a consumed edge certificate is missing
    /// - `DependencyCycle` / `UnknownDependency` on a malformed graph
    #[instrument(level = "info", skip(self, domains, certificates))]
    pub fn compose(
        &self,
        region: Region,
        environment: Environment,
        domains: &DomainSet,
        certificates: &CertificateSet,
    ) -> SynthesisResult<OrderedDeclarationSet> {
        if (domains.region, domains.environment) != (region, environment) {
            return Err(SynthesisError::configuration(format!(
                "domain set for {}/{} passed to the {}/{} stack",
                domains.region, domains.environment, region, environment
            )));
        }
        if (certificates.region, certificates.environment) != (region, environment) {
            return Err(SynthesisError::configuration(format!(
                "certificate set for {}/{} passed to the {}/{} stack",
                certificates.region, certificates.environment, region, environment
            )));
        }

        let config = self.environments.resolve(environment)?;
        let mut composition = Composition {
            region,
            environment,
            prefix: format!("{}-{}", region, environment),
            account: &self.account,
            config,
            domains,
            certificates,
            graph: DependencyGraph::new(),
        };

        let network = composition.network()?;
        let data = composition.data_tier(&network)?;
        let compute = composition.compute(&network)?;
        let artifacts = composition.artifacts()?;
        let email = composition.email_resources()?;
        let access = composition.access(&network, &data)?;
        let migration = composition.migration(&network, &data, &artifacts, &access)?;
        let app = composition.app_service(&data, &compute, &artifacts, &email, &access, &migration)?;
        composition.waf(&app)?;
        composition.app_cdn(&app, &artifacts)?;
        composition.static_cdn(&artifacts)?;
        composition.com_redirect()?;
        composition.email(&email, &app)?;

        let declarations = composition.graph.len();
        let ordered = composition.graph.order()?;
        info!(declarations, "stack composed");
        Ok(ordered)
    }

    /// [`compose`](Self::compose) wrapped with stack metadata
    pub fn compose_stack(
        &self,
        region: Region,
        environment: Environment,
        domains: &DomainSet,
        certificates: &CertificateSet,
    ) -> SynthesisResult<StackManifest> {
        let declarations = self.compose(region, environment, domains, certificates)?;

        let depends_on: BTreeSet<StackId> = certificates
            .regional_records()
            .values()
            .map(|record| record.handle.stack.clone())
            .chain(
                certificates
                    .edge_references()
                    .values()
                    .map(|reference| reference.handle.stack.clone()),
            )
            .collect();

        Ok(StackManifest {
            id: StackId::app(region, environment),
            region: region.aws_region(),
            account: self.account.clone(),
            environment,
            depends_on: depends_on.into_iter().collect(),
            cross_region_references: true,
            declarations,
        })
    }
}

struct Network {
    vpc: ResourceId,
}

struct DataTier {
    general_secret: ResourceId,
    postgres: ResourceId,
    postgres_credentials: ResourceId,
    postgres_group: ResourceId,
    redis: ResourceId,
    redis_auth: ResourceId,
    redis_group: ResourceId,
}

struct Compute {
    cluster: ResourceId,
    capacity_provider: ResourceId,
}

struct Artifacts {
    image: ResourceId,
    bucket: ResourceId,
    static_assets: ResourceId,
}

struct EmailResources {
    queue: ResourceId,
}

/// Workload security groups and the rules opening the data tier to them
struct Access {
    migration_group: ResourceId,
    app_group: ResourceId,
    migration_rules: Vec<ResourceId>,
    app_rules: Vec<ResourceId>,
}

struct Migration {
    task: ResourceId,
}

struct AppService {
    service: ResourceId,
}

/// Working state of one composition
struct Composition<'c> {
    region: Region,
    environment: Environment,
    prefix: String,
    account: &'c str,
    config: &'c EnvironmentConfig,
    domains: &'c DomainSet,
    certificates: &'c CertificateSet,
    graph: DependencyGraph,
}

impl<'c> Composition<'c> {
    fn id(&self, name: &str) -> ResourceId {
        ResourceId::scoped(&self.prefix, name)
    }

    fn name(&self, name: &str) -> String {
        format!("{}-{}", self.prefix, name)
    }

    fn declare(&mut self, declaration: Declaration) -> SynthesisResult<ResourceId> {
        debug!(id = %declaration.id, kind = declaration.spec.kind(), "declaring");
        self.graph.add(declaration).cloned()
    }

    fn security_group(&mut self, name: &str, vpc: &ResourceId, description: &str) -> SynthesisResult<ResourceId> {
        let group = format!("{}-security-group", name);
        self.declare(Declaration::new(
            self.id(&group),
            ResourceSpec::SecurityGroup(SecurityGroupSpec {
                name: self.name(&group),
                vpc: vpc.clone(),
                description: description.to_string(),
            }),
        ))
    }

    fn import_certificate(&mut self, name: &str, reference: CrossRegionReference) -> SynthesisResult<ResourceId> {
        let id = self.id(name);
        self.declare(Declaration::new(id, ResourceSpec::ImportedCertificate(reference)))
    }

    fn network(&mut self) -> SynthesisResult<Network> {
        self.config.cidr.subnet_capacity(SUBNET_MASK)?;

        let vpc = self.declare(Declaration::new(
            self.id("vpc"),
            ResourceSpec::Vpc(VpcSpec {
                name: self.name("vpc"),
                cidr: self.config.cidr,
                max_azs: MAX_AZS,
                subnets: vec![
                    Subnet {
                        name: "public".into(),
                        kind: SubnetKind::Public,
                        cidr_mask: SUBNET_MASK,
                    },
                    Subnet {
                        name: "private".into(),
                        kind: SubnetKind::PrivateWithEgress,
                        cidr_mask: SUBNET_MASK,
                    },
                ],
                gateway_endpoints: vec!["s3".into()],
                interface_endpoints: ["ecr.api", "ecr.dkr", "logs", "secretsmanager"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                flow_log_retention_days: self.config.tiers.log_retention_days,
            }),
        ))?;

        self.declare(Declaration::new(
            self.id("private-dns-namespace"),
            ResourceSpec::DnsNamespace {
                name: PRIVATE_NAMESPACE.to_string(),
                vpc: vpc.clone(),
            },
        ))?;

        Ok(Network { vpc })
    }

    fn data_tier(&mut self, network: &Network) -> SynthesisResult<DataTier> {
        let general_secret = match &self.config.general_secret {
            SecretRef::Imported { arn } => SecretSpec::Imported { arn: arn.clone() },
            SecretRef::StackManaged => SecretSpec::Generated {
                name: self.name("general-secret"),
                description: "General application configuration".into(),
            },
        };
        let general_secret = self.declare(Declaration::new(
            self.id("general-secret"),
            ResourceSpec::Secret(general_secret),
        ))?;

        let postgres_credentials = self.declare(Declaration::new(
            self.id("postgres-credentials"),
            ResourceSpec::Secret(SecretSpec::Generated {
                name: self.name("postgres-credentials"),
                description: "Postgres master credentials".into(),
            }),
        ))?;

        let postgres_group = self.security_group("postgres", &network.vpc, "Postgres access")?;

        let config = self.config;
        let tiers = &config.tiers;
        let postgres = self.declare(Declaration::new(
            self.id("postgres"),
            ResourceSpec::Database(DatabaseSpec {
                name: self.name("postgres"),
                engine: "postgres".into(),
                engine_version: "17".into(),
                port: POSTGRES_PORT,
                instance_type: tiers.database_instance_type.clone(),
                vpc: network.vpc.clone(),
                credentials: postgres_credentials.clone(),
                backup_retention_days: tiers.backup_retention_days,
                deletion_protection: tiers.deletion_protection,
                storage_encrypted: true,
                publicly_accessible: false,
                security_group: postgres_group.clone(),
            }),
        ))?;

        if let Some(instance_type) = &tiers.database_replica_instance_type {
            self.declare(Declaration::new(
                self.id("postgres-replica"),
                ResourceSpec::DatabaseReplica(ReplicaSpec {
                    name: self.name("postgres-replica"),
                    source: postgres.clone(),
                    instance_type: instance_type.clone(),
                }),
            ))?;
        }

        validate_backup_windows(
            BACKUP_RATE_HOURS,
            BACKUP_START_WINDOW_HOURS,
            BACKUP_COMPLETION_WINDOW_HOURS,
        )?;
        self.declare(Declaration::new(
            self.id("postgres-backup"),
            ResourceSpec::BackupPlan(BackupPlanSpec {
                name: self.name("postgres-backup"),
                target: postgres.clone(),
                rate_hours: BACKUP_RATE_HOURS,
                start_window_hours: BACKUP_START_WINDOW_HOURS,
                completion_window_hours: BACKUP_COMPLETION_WINDOW_HOURS,
                delete_after_days: BACKUP_DELETE_AFTER_DAYS,
            }),
        ))?;

        let redis_auth = self.declare(Declaration::new(
            self.id("redis-auth"),
            ResourceSpec::Secret(SecretSpec::Generated {
                name: self.name("redis-auth"),
                description: "Redis auth token".into(),
            }),
        ))?;

        let redis_group = self.security_group("redis", &network.vpc, "Redis access")?;
        let redis = self.declare(Declaration::new(
            self.id("redis"),
            ResourceSpec::Cache(CacheSpec {
                name: self.name("redis"),
                engine: "redis".into(),
                port: REDIS_PORT,
                node_type: self.config.tiers.cache_node_type.clone(),
                vpc: network.vpc.clone(),
                auth_token: redis_auth.clone(),
                security_group: redis_group.clone(),
            }),
        ))?;

        Ok(DataTier {
            general_secret,
            postgres,
            postgres_credentials,
            postgres_group,
            redis,
            redis_auth,
            redis_group,
        })
    }

    fn compute(&mut self, network: &Network) -> SynthesisResult<Compute> {
        let cluster = self.declare(Declaration::new(
            self.id("cluster"),
            ResourceSpec::Cluster(ClusterSpec {
                name: self.name("cluster"),
                vpc: network.vpc.clone(),
                container_insights: true,
            }),
        ))?;

        let capacity_provider = self.declare(Declaration::new(
            self.id("capacity-provider"),
            ResourceSpec::CapacityProvider(CapacityProviderSpec {
                name: self.name("capacity-provider"),
                cluster: cluster.clone(),
                instance_type: "t4g.micro".into(),
                machine_image: "ecs-optimized-amazon-linux-2023-arm64".into(),
                min_capacity: 2,
                max_capacity: 2,
                managed_scaling: true,
                managed_termination_protection: true,
            }),
        ))?;

        Ok(Compute {
            cluster,
            capacity_provider,
        })
    }

    fn artifacts(&mut self) -> SynthesisResult<Artifacts> {
        let image = self.declare(Declaration::new(
            self.id("image"),
            ResourceSpec::ContainerImage(ImageSpec {
                name: self.name("image"),
                context: "..".into(),
                platform: "linux/arm64".into(),
                exclude: ["node_modules", "_build", "deps", ".git", "infra"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                build_args: BTreeMap::from([(
                    OBAN_AUTH_KEY_VAR.to_string(),
                    BuildArg::FromEnv(OBAN_AUTH_KEY_VAR.to_string()),
                )]),
            }),
        ))?;

        self.declare(Declaration::new(
            self.id("container-scanning"),
            ResourceSpec::RegistryScanning(RegistryScanningSpec {
                name: self.name("container-scanning"),
                scan_type: "ENHANCED".into(),
                scan_type_on_delete: "BASIC".into(),
                scan_frequency: "SCAN_ON_PUSH".into(),
                repository_filter: "*".into(),
                permissions: [
                    "ecr:PutRegistryScanningConfiguration",
                    "inspector2:ListAccountPermissions",
                    "inspector2:Enable",
                    "iam:CreateServiceLinkedRole",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            }),
        ))?;

        let bucket = self.declare(Declaration::new(
            self.id("customer-media"),
            ResourceSpec::Bucket(BucketSpec {
                name: self.name("customer-media"),
                public_read: true,
            }),
        ))?;

        let static_assets = self.declare(Declaration::new(
            self.id("static-assets"),
            ResourceSpec::Bucket(BucketSpec {
                name: self.name("static-assets"),
                public_read: false,
            }),
        ))?;

        Ok(Artifacts {
            image,
            bucket,
            static_assets,
        })
    }

    /// Events queue, referenced by the app before the email layer is built
    fn email_resources(&mut self) -> SynthesisResult<EmailResources> {
        let queue = self.declare(Declaration::new(
            self.id("email-events"),
            ResourceSpec::Queue(QueueSpec {
                name: self.name("email-events"),
                enforce_ssl: true,
            }),
        ))?;

        Ok(EmailResources { queue })
    }

    fn access(&mut self, network: &Network, data: &DataTier) -> SynthesisResult<Access> {
        let migration_group = self.security_group("migration", &network.vpc, "Migration task")?;
        let app_group = self.security_group("app", &network.vpc, "App service")?;

        let (postgres, redis) = (&data.postgres_group, &data.redis_group);
        let mut rule = |name: &str, source: &ResourceId, target: &ResourceId, port| {
            self.declare(Declaration::new(
                self.id(name),
                ResourceSpec::Ingress(IngressSpec {
                    source: source.clone(),
                    target: target.clone(),
                    port,
                    description: format!("{} from {} on {}", target, source, port),
                }),
            ))
        };

        let migration_rules = vec![rule("migration-to-postgres", &migration_group, postgres, POSTGRES_PORT)?];
        let app_rules = vec![
            rule("app-to-postgres", &app_group, postgres, POSTGRES_PORT)?,
            rule("app-to-redis", &app_group, redis, REDIS_PORT)?,
        ];

        Ok(Access {
            migration_group,
            app_group,
            migration_rules,
            app_rules,
        })
    }

    fn migration(
        &mut self,
        network: &Network,
        data: &DataTier,
        artifacts: &Artifacts,
        access: &Access,
    ) -> SynthesisResult<Migration> {
        let id = self.id("migration");
        let mut declaration = Declaration::new(
            id.clone(),
            ResourceSpec::Migration(MigrationSpec {
                name: self.name("migration"),
                image: artifacts.image.clone(),
                vpc: network.vpc.clone(),
                security_group: access.migration_group.clone(),
                timeout_secs: 5 * 60,
                memory_mib: 512,
                environment: migration_environment(&self.config.app_config),
                secrets: database_secrets(&data.general_secret, &data.postgres_credentials),
                invoke_on_deploy: true,
            }),
        )
        .depends_on(&data.postgres)
        .grant(Grant::new(&id, &data.general_secret, &["secretsmanager:GetSecretValue"]))
        .grant(Grant::new(&id, &data.postgres_credentials, &["secretsmanager:GetSecretValue"]));
        for rule in &access.migration_rules {
            declaration = declaration.depends_on(rule);
        }

        let task = self.declare(declaration)?;
        Ok(Migration { task })
    }

    fn app_service(
        &mut self,
        data: &DataTier,
        compute: &Compute,
        artifacts: &Artifacts,
        email: &EmailResources,
        access: &Access,
        migration: &Migration,
    ) -> SynthesisResult<AppService> {
        let domains = self.domains;
        let main = domains.get(DomainRole::Main);
        let www = domains.domain(DomainRole::Www);
        let certificate = self
            .certificates
            .regional(DomainRole::Main)?
            .reference(self.region.aws_region());
        let certificate = self.import_certificate("main-certificate", certificate)?;

        let dynamic = DynamicAppConfig {
            phx_host: main.domain.clone(),
            aws_region: self.region.aws_region(),
            aws_account_id: self.account.to_string(),
            cdn_host: self.domains.domain(DomainRole::AppCdn).clone(),
            customer_media_bucket: artifacts.bucket.clone(),
            email_domain: self.domains.domain(DomainRole::Email).clone(),
            email_events_queue: email.queue.clone(),
            redis: data.redis.clone(),
        };
        let secrets = container_secrets(&data.general_secret, &data.postgres_credentials, &data.redis_auth);

        validate_scaling_bounds(SCALING.min_capacity, SCALING.max_capacity, SCALING.target_cpu_percent)?;

        let id = self.id("app");
        let mut declaration = Declaration::new(
            id.clone(),
            ResourceSpec::AppService(AppServiceSpec {
                name: self.name("app"),
                cluster: compute.cluster.clone(),
                capacity_provider: compute.capacity_provider.clone(),
                image: artifacts.image.clone(),
                certificate,
                security_group: access.app_group.clone(),
                domain: main.domain.clone(),
                zone: main.zone.clone(),
                command: "/app/bin/server".into(),
                container_port: APP_PORT,
                memory_reservation_mib: 512,
                min_healthy_percent: 50,
                stop_timeout_secs: 30,
                environment: container_environment(&self.config.app_config, &dynamic),
                secrets,
                health_check: HealthCheck {
                    path: "/health/ready".into(),
                    command: Some(format!("curl -f http://localhost:{}/health/ready || exit 1", APP_PORT)),
                    interval_secs: 30,
                    timeout_secs: 5,
                },
                scaling: SCALING,
                redirects: vec![HostRedirect {
                    from: www.clone(),
                    to: main.domain.clone(),
                    permanent: true,
                }],
            }),
        )
        .depends_on(&migration.task)
        .depends_on(&data.postgres)
        .depends_on(&data.redis)
        .grant(Grant::new(&id, &data.general_secret, &["secretsmanager:GetSecretValue"]))
        .grant(Grant::new(
            &id,
            &artifacts.bucket,
            &["s3:GetObject", "s3:PutObject", "s3:DeleteObject", "s3:ListBucket"],
        ))
        .grant(Grant::new(
            &id,
            &email.queue,
            &["sqs:ReceiveMessage", "sqs:DeleteMessage", "sqs:GetQueueAttributes"],
        ));
        for rule in &access.app_rules {
            declaration = declaration.depends_on(rule);
        }

        let service = self.declare(declaration)?;
        Ok(AppService { service })
    }

    fn waf(&mut self, app: &AppService) -> SynthesisResult<()> {
        let path_rules = [
            ("allow-api", "/api", WafAction::Allow),
            ("allow-webhook", "/webhook", WafAction::Allow),
            ("block-health", "/health", WafAction::Block),
        ];
        let managed_groups: [(&str, &[&str]); 2] = [
            ("AWSManagedRulesCommonRuleSet", &["SizeRestrictions_BODY"]),
            ("AWSManagedRulesKnownBadInputsRuleSet", &[]),
        ];

        let mut rules = Vec::new();
        for (name, prefix, action) in path_rules {
            rules.push(WafRule::PathPrefix {
                name: name.to_string(),
                priority: rules.len() as u32,
                prefix: prefix.to_string(),
                action,
            });
        }
        for (group, excluded) in managed_groups {
            rules.push(WafRule::ManagedGroup {
                name: group.to_string(),
                priority: rules.len() as u32,
                group: group.to_string(),
                excluded_rules: excluded.iter().map(|r| r.to_string()).collect(),
            });
        }

        self.declare(Declaration::new(
            self.id("waf"),
            ResourceSpec::Waf(WafSpec {
                name: self.name("waf"),
                scope: "REGIONAL".into(),
                default_action: WafAction::Allow,
                associations: vec![app.service.clone()],
                rules,
            }),
        ))?;
        Ok(())
    }

    fn alias_records(&self, role: DomainRole, distribution: &ResourceId) -> Vec<DnsRecord> {
        let resolved = self.domains.get(role);
        [RecordType::A, RecordType::Aaaa]
            .into_iter()
            .map(|record_type| DnsRecord {
                zone: resolved.zone.clone(),
                name: resolved.domain.to_string(),
                record_type,
                values: vec![format!("alias:{}", distribution)],
            })
            .collect()
    }

    fn app_cdn(&mut self, app: &AppService, artifacts: &Artifacts) -> SynthesisResult<()> {
        let reference = self.certificates.edge(DomainRole::AppCdn)?.clone();
        let certificate = self.import_certificate("app-cdn-certificate", reference)?;

        let id = self.id("app-cdn");
        self.declare(Declaration::new(
            id.clone(),
            ResourceSpec::Distribution(DistributionSpec {
                name: self.name("app-cdn"),
                domains: vec![self.domains.domain(DomainRole::AppCdn).clone()],
                certificate,
                default_behavior: Behavior {
                    path_pattern: "*".into(),
                    origin: Origin::LoadBalancer {
                        service: app.service.clone(),
                    },
                    redirect_to_https: true,
                },
                additional_behaviors: vec![Behavior {
                    path_pattern: "customer-media/*".into(),
                    origin: Origin::Bucket {
                        bucket: artifacts.bucket.clone(),
                    },
                    redirect_to_https: true,
                }],
                records: self.alias_records(DomainRole::AppCdn, &id),
                comment: Some(format!("App CDN for {}", self.domains.domain(DomainRole::Main))),
            }),
        ))?;
        Ok(())
    }

    /// Static asset distribution on the `cdn` domain
    fn static_cdn(&mut self, artifacts: &Artifacts) -> SynthesisResult<()> {
        let reference = self.certificates.edge(DomainRole::Cdn)?.clone();
        let certificate = self.import_certificate("cdn-certificate", reference)?;

        let id = self.id("static-cdn");
        self.declare(Declaration::new(
            id.clone(),
            ResourceSpec::Distribution(DistributionSpec {
                name: self.name("static-cdn"),
                domains: vec![self.domains.domain(DomainRole::Cdn).clone()],
                certificate,
                default_behavior: Behavior {
                    path_pattern: "*".into(),
                    origin: Origin::Bucket {
                        bucket: artifacts.static_assets.clone(),
                    },
                    redirect_to_https: true,
                },
                additional_behaviors: Vec::new(),
                records: self.alias_records(DomainRole::Cdn, &id),
                comment: Some("Static assets".into()),
            }),
        ))?;
        Ok(())
    }

    fn com_redirect(&mut self) -> SynthesisResult<()> {
        let reference = self.certificates.edge(DomainRole::Com)?.clone();
        let certificate = self.import_certificate("com-certificate", reference)?;

        let id = self.id("com-redirect");
        let main: Hostname = self.domains.domain(DomainRole::Main).clone();
        self.declare(Declaration::new(
            id.clone(),
            ResourceSpec::Distribution(DistributionSpec {
                name: self.name("com-redirect"),
                domains: vec![self.domains.domain(DomainRole::Com).clone()],
                certificate,
                default_behavior: Behavior {
                    path_pattern: "*".into(),
                    origin: Origin::Redirect { to: main },
                    redirect_to_https: true,
                },
                additional_behaviors: Vec::new(),
                records: self.alias_records(DomainRole::Com, &id),
                comment: None,
            }),
        ))?;
        Ok(())
    }

    fn email(&mut self, resources: &EmailResources, app: &AppService) -> SynthesisResult<()> {
        let reference = self.certificates.edge(DomainRole::Tracking)?.clone();
        let certificate = self.import_certificate("tracking-certificate", reference)?;

        let tracking_domain = self.domains.domain(DomainRole::Tracking).clone();
        let tracking = self.id("tracking");
        self.declare(Declaration::new(
            tracking.clone(),
            ResourceSpec::Distribution(DistributionSpec {
                name: self.name("tracking"),
                domains: vec![tracking_domain.clone()],
                certificate,
                default_behavior: Behavior {
                    path_pattern: "*".into(),
                    origin: Origin::Http {
                        host: format!("r.{}.awstrack.me", self.region.aws_region()),
                    },
                    redirect_to_https: true,
                },
                additional_behaviors: Vec::new(),
                records: self.alias_records(DomainRole::Tracking, &tracking),
                comment: Some("SES click and open tracking".into()),
            }),
        ))?;

        let configuration_set = self.declare(Declaration::new(
            self.id("email-configuration-set"),
            ResourceSpec::ConfigurationSet(ConfigurationSetSpec {
                name: self.name("email"),
                tracking_domain: Some(tracking_domain),
                tracking_distribution: Some(tracking),
                require_tls: true,
                reputation_metrics: true,
                suppress_bounces_and_complaints: true,
                event_topic: self.name("email-events"),
                event_queue: resources.queue.clone(),
                events: EMAIL_EVENTS.iter().map(|e| e.to_string()).collect(),
            }),
        ))?;

        let domains = self.domains;
        let email = domains.get(DomainRole::Email);
        let mail_from = Hostname::prefixed("envelope", &email.domain)?;
        let dmarc_name = format!("_dmarc.{}", email.domain);
        let record = |name: String, record_type, value: String| DnsRecord {
            zone: email.zone.clone(),
            name,
            record_type,
            values: vec![value],
        };

        let records = vec![
            record(
                mail_from.to_string(),
                RecordType::Mx,
                format!("10 feedback-smtp.{}.amazonses.com", self.region.aws_region()),
            ),
            record(
                mail_from.to_string(),
                RecordType::Txt,
                "v=spf1 include:amazonses.com ~all".into(),
            ),
            record(
                dmarc_name,
                RecordType::Txt,
                format!(
                    "v=DMARC1; p=none; rua=mailto:dmarc@{0}; ruf=mailto:dmarc@{0}",
                    email.domain
                ),
            ),
        ];

        let identity = self.id("email-identity");
        let declaration = Declaration::new(
            identity.clone(),
            ResourceSpec::EmailIdentity(EmailIdentitySpec {
                domain: email.domain.clone(),
                zone: email.zone.clone(),
                mail_from_domain: mail_from,
                configuration_set,
                dkim_signing: true,
                reject_on_mx_failure: false,
                records,
            }),
        )
        .grant(Grant::new(&app.service, &identity, &["ses:SendEmail", "ses:SendRawEmail"]));
        self.declare(declaration)?;

        debug!(environment = %self.environment, "email layer composed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificates::CertificateResolver;
    use crate::registry::DomainRegistry;
    use pretty_assertions::assert_eq;

    const ACCOUNT: &str = "728247919352";

    struct Fixture {
        environments: EnvironmentRegistry,
        domains: DomainSet,
        certificates: CertificateSet,
    }

    fn fixture(region: Region, environment: Environment) -> Fixture {
        let registry = DomainRegistry::standard().unwrap();
        Fixture {
            environments: EnvironmentRegistry::standard().unwrap(),
            domains: registry.resolve(region, environment).unwrap(),
            certificates: CertificateResolver::new(&registry)
                .resolve_certificates(region, environment)
                .unwrap(),
        }
    }

    fn compose(fixture: &Fixture, region: Region, environment: Environment) -> SynthesisResult<OrderedDeclarationSet> {
        StackComposer::new(&fixture.environments, ACCOUNT)
            .unwrap()
            .compose(region, environment, &fixture.domains, &fixture.certificates)
    }

    #[test]
    fn test_eu_prod_stack() {
        let fixture = fixture(Region::Eu, Environment::Prod);
        let stack = compose(&fixture, Region::Eu, Environment::Prod).unwrap();

        assert!(stack.ids().all(|id| id.as_str().starts_with("eu-prod-")));

        let position = |name: &str| stack.position(&ResourceId::new(format!("eu-prod-{}", name))).unwrap();
        assert!(position("vpc") < position("postgres"));
        assert!(position("postgres") < position("migration"));
        assert!(position("migration") < position("app"));
        assert!(position("app") < position("waf"));
        assert!(position("app") < position("app-cdn"));
        assert!(position("app-cdn") < position("static-cdn"));
        assert!(position("static-cdn") < position("com-redirect"));
        assert!(position("com-redirect") < position("email-identity"));

        let Some(ResourceSpec::ImportedCertificate(reference)) = stack
            .get(&ResourceId::new("eu-prod-app-cdn-certificate"))
            .map(|d| &d.spec)
        else {
            panic!("app-cdn certificate not imported");
        };
        assert_eq!(reference.producer_region(), AwsRegion::EDGE);
        assert_eq!(reference.domain.as_str(), "cdn.eu.passwordless.tools");
    }

    #[test]
    fn test_app_grants_and_environment() {
        let fixture = fixture(Region::Eu, Environment::Prod);
        let stack = compose(&fixture, Region::Eu, Environment::Prod).unwrap();
        let app = stack.get(&ResourceId::new("eu-prod-app")).unwrap();

        let actions: Vec<&str> = app
            .grants
            .iter()
            .flat_map(|g| g.actions.iter().map(String::as_str))
            .collect();
        assert!(actions.contains(&"secretsmanager:GetSecretValue"));
        assert!(actions.contains(&"s3:PutObject"));
        assert!(actions.contains(&"sqs:ReceiveMessage"));

        let identity = stack.get(&ResourceId::new("eu-prod-email-identity")).unwrap();
        assert_eq!(
            identity.grants,
            vec![Grant::new(
                &app.id,
                &identity.id,
                &["ses:SendEmail", "ses:SendRawEmail"]
            )]
        );

        let ResourceSpec::AppService(spec) = &app.spec else {
            panic!("not an app service");
        };
        assert_eq!(spec.environment["PHX_HOST"], EnvValue::literal("eu.passwordless.tools"));
        assert_eq!(spec.environment["AWS_REGION"], EnvValue::literal("eu-west-1"));
        assert_eq!(spec.scaling, SCALING);
        assert_eq!(spec.redirects[0].from.as_str(), "www.eu.passwordless.tools");
        assert!(app.depends_on.contains(&ResourceId::new("eu-prod-migration")));
    }

    #[test]
    fn test_workload_environment_contract() {
        let fixture = fixture(Region::Eu, Environment::Prod);
        let stack = compose(&fixture, Region::Eu, Environment::Prod).unwrap();
        let credentials = ResourceId::new("eu-prod-postgres-credentials");
        let general = ResourceId::new("eu-prod-general-secret");
        let redis = ResourceId::new("eu-prod-redis");

        let Some(ResourceSpec::AppService(app)) = stack.get(&ResourceId::new("eu-prod-app")).map(|d| &d.spec) else {
            panic!("app missing");
        };
        let mut keys: Vec<&str> = app.secrets.keys().map(String::as_str).collect();
        keys.extend(["REDIS_HOST", "REDIS_PORT"].iter().filter(|k| app.environment.contains_key(**k)));
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "GOOGLE_OAUTH_CLIENT_ID",
                "GOOGLE_OAUTH_SECRET",
                "OPEN_AI_KEY",
                "POSTGRES_DB_NAME",
                "POSTGRES_HOST",
                "POSTGRES_PASSWORD",
                "POSTGRES_PORT",
                "POSTGRES_USER",
                "REDIS_AUTH_TOKEN",
                "REDIS_HOST",
                "REDIS_PORT",
                "SECRET_KEY_BASE",
            ]
        );
        assert_eq!(app.secrets["POSTGRES_USER"], SecretBinding::new(&credentials, "username"));
        assert_eq!(app.secrets["SECRET_KEY_BASE"], SecretBinding::new(&general, "SECRET_KEY_BASE"));
        assert_eq!(app.environment["REDIS_HOST"], EnvValue::attribute(&redis, "endpoint_address"));
        assert_eq!(app.environment["REDIS_PORT"], EnvValue::attribute(&redis, "endpoint_port"));

        let Some(ResourceSpec::Migration(migration)) =
            stack.get(&ResourceId::new("eu-prod-migration")).map(|d| &d.spec)
        else {
            panic!("migration missing");
        };
        let keys: Vec<&str> = migration.secrets.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "POSTGRES_DB_NAME",
                "POSTGRES_HOST",
                "POSTGRES_PASSWORD",
                "POSTGRES_PORT",
                "POSTGRES_USER",
                "SECRET_KEY_BASE",
            ]
        );
        assert_eq!(migration.secrets["POSTGRES_DB_NAME"], SecretBinding::new(&credentials, "dbname"));
    }

    #[test]
    fn test_ingress_rules_precede_workloads() {
        let fixture = fixture(Region::Us, Environment::Dev);
        let stack = compose(&fixture, Region::Us, Environment::Dev).unwrap();
        let id = |name: &str| ResourceId::new(format!("us-dev-{}", name));
        let position = |name: &str| stack.position(&id(name)).unwrap();

        let migration = stack.get(&id("migration")).unwrap();
        assert!(migration.depends_on.contains(&id("migration-to-postgres")));
        assert!(position("migration-to-postgres") < position("migration"));

        let app = stack.get(&id("app")).unwrap();
        for rule in ["app-to-postgres", "app-to-redis"] {
            assert!(app.depends_on.contains(&id(rule)), "{}", rule);
            assert!(position(rule) < position("app"), "{}", rule);
        }

        let Some(ResourceSpec::Ingress(rule)) = stack.get(&id("migration-to-postgres")).map(|d| &d.spec) else {
            panic!("rule missing");
        };
        assert_eq!(rule.source, id("migration-security-group"));
        assert_eq!(rule.target, id("postgres-security-group"));
        assert_eq!(rule.port, POSTGRES_PORT);
        assert!(position("postgres-security-group") < position("migration-to-postgres"));
        assert!(position("migration-security-group") < position("migration-to-postgres"));
    }

    #[test]
    fn test_read_replica_follows_tier_settings() {
        let fixture = fixture(Region::Eu, Environment::Prod);
        assert!(compose(&fixture, Region::Eu, Environment::Prod)
            .unwrap()
            .get(&ResourceId::new("eu-prod-postgres-replica"))
            .is_none());

        let standard = fixture.environments.resolve(Environment::Prod).unwrap().clone();
        let mut tiers = standard.tiers.clone();
        tiers.database_replica_instance_type = Some("t4g.small".into());
        let environments = EnvironmentRegistry::from_entries([standard.with_tiers(tiers)]).unwrap();

        let stack = StackComposer::new(&environments, ACCOUNT)
            .unwrap()
            .compose(Region::Eu, Environment::Prod, &fixture.domains, &fixture.certificates)
            .unwrap();
        let replica = stack.get(&ResourceId::new("eu-prod-postgres-replica")).unwrap();
        assert_eq!(
            replica.spec,
            ResourceSpec::DatabaseReplica(ReplicaSpec {
                name: "eu-prod-postgres-replica".into(),
                source: ResourceId::new("eu-prod-postgres"),
                instance_type: "t4g.small".into(),
            })
        );
        assert!(stack.position(&ResourceId::new("eu-prod-postgres")) < stack.position(&replica.id));
    }

    #[test]
    fn test_static_cdn_serves_static_assets() {
        let fixture = fixture(Region::Eu, Environment::Prod);
        let stack = compose(&fixture, Region::Eu, Environment::Prod).unwrap();
        let Some(ResourceSpec::Distribution(cdn)) = stack.get(&ResourceId::new("eu-prod-static-cdn")).map(|d| &d.spec)
        else {
            panic!("static cdn missing");
        };
        assert_eq!(cdn.domains[0].as_str(), "cdn.eu.passwordlesstools.com");
        assert_eq!(
            cdn.default_behavior.origin,
            Origin::Bucket {
                bucket: ResourceId::new("eu-prod-static-assets")
            }
        );

        let Some(ResourceSpec::ImportedCertificate(reference)) = stack.get(&cdn.certificate).map(|d| &d.spec) else {
            panic!("cdn certificate not imported");
        };
        assert_eq!(reference.producer_region(), AwsRegion::EDGE);
        assert_eq!(reference.handle, fixture.certificates.edge(DomainRole::Cdn).unwrap().handle);
    }

    #[test]
    fn test_container_scanning_declared() {
        let fixture = fixture(Region::Us, Environment::Prod);
        let stack = compose(&fixture, Region::Us, Environment::Prod).unwrap();
        let Some(ResourceSpec::RegistryScanning(scanning)) =
            stack.get(&ResourceId::new("us-prod-container-scanning")).map(|d| &d.spec)
        else {
            panic!("container scanning missing");
        };
        assert_eq!(scanning.scan_type, "ENHANCED");
        assert_eq!(scanning.scan_type_on_delete, "BASIC");
        assert_eq!(scanning.scan_frequency, "SCAN_ON_PUSH");
        assert!(scanning.permissions.contains(&"inspector2:Enable".to_string()));
    }

    #[test]
    fn test_secret_source_follows_environment() {
        let prod = fixture(Region::Eu, Environment::Prod);
        let prod_stack = compose(&prod, Region::Eu, Environment::Prod).unwrap();
        let secret = prod_stack.get(&ResourceId::new("eu-prod-general-secret")).unwrap();
        assert!(matches!(secret.spec, ResourceSpec::Secret(SecretSpec::Imported { .. })));

        let dev = fixture(Region::Us, Environment::Dev);
        let dev_stack = compose(&dev, Region::Us, Environment::Dev).unwrap();
        let secret = dev_stack.get(&ResourceId::new("us-dev-general-secret")).unwrap();
        assert!(matches!(secret.spec, ResourceSpec::Secret(SecretSpec::Generated { .. })));
    }

    #[test]
    fn test_build_arg_is_never_inlined() {
        let fixture = fixture(Region::Eu, Environment::Dev);
        let stack = compose(&fixture, Region::Eu, Environment::Dev).unwrap();
        let Some(ResourceSpec::ContainerImage(image)) =
            stack.get(&ResourceId::new("eu-dev-image")).map(|d| &d.spec)
        else {
            panic!("image missing");
        };
        assert_eq!(
            image.build_args[OBAN_AUTH_KEY_VAR],
            BuildArg::FromEnv(OBAN_AUTH_KEY_VAR.to_string())
        );
    }

    #[test]
    fn test_waf_priorities_are_sequential() {
        let fixture = fixture(Region::Us, Environment::Prod);
        let stack = compose(&fixture, Region::Us, Environment::Prod).unwrap();
        let Some(ResourceSpec::Waf(waf)) = stack.get(&ResourceId::new("us-prod-waf")).map(|d| &d.spec) else {
            panic!("waf missing");
        };
        let priorities: Vec<u32> = waf.rules.iter().map(WafRule::priority).collect();
        assert_eq!(priorities, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_missing_app_cdn_certificate() {
        let mut fixture = fixture(Region::Eu, Environment::Prod);
        let mut edge = fixture.certificates.edge_references().clone();
        edge.remove(&DomainRole::AppCdn);
        fixture.certificates = CertificateSet::new(
            Region::Eu,
            Environment::Prod,
            fixture.certificates.regional_records().clone(),
            edge,
        );

        assert_eq!(
            compose(&fixture, Region::Eu, Environment::Prod).unwrap_err(),
            SynthesisError::CrossRegionReference {
                region: Region::Eu,
                environment: Environment::Prod,
                role: DomainRole::AppCdn,
            }
        );
    }

    #[test]
    fn test_mismatched_inputs() {
        let fixture = fixture(Region::Eu, Environment::Prod);
        assert!(matches!(
            compose(&fixture, Region::Us, Environment::Prod),
            Err(SynthesisError::Configuration(_))
        ));
    }

    #[test]
    fn test_stack_manifest_depends_on_certificate_stacks() {
        let fixture = fixture(Region::Us, Environment::Dev);
        let manifest = StackComposer::new(&fixture.environments, ACCOUNT)
            .unwrap()
            .compose_stack(Region::Us, Environment::Dev, &fixture.domains, &fixture.certificates)
            .unwrap();

        assert_eq!(manifest.id.as_str(), "us-dev-app");
        assert_eq!(manifest.region, AwsRegion::US_EAST_2);
        assert_eq!(
            manifest.depends_on,
            vec![StackId::new("dev-edge-certificates"), StackId::new("us-dev-certificates")]
        );
    }

    #[test]
    fn test_rejects_bad_account() {
        let environments = EnvironmentRegistry::standard().unwrap();
        assert!(StackComposer::new(&environments, "1234").is_err());
    }
}
