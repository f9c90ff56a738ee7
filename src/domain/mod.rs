// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Domain Models
//!
//! Value objects the resolver pipeline is built from. Each one validates on
//! construction so the registries never hold a malformed entry.
//!
//! # Value Objects with Invariants
//!
//! - [`Hostname`] - DNS-validated hostnames (RFC 1123) with zone suffix checks
//! - [`CidrBlock`] - IPv4 VPC network block
//! - [`Environment`] - deployment environment selector
//! - [`Region`] / [`AwsRegion`] - product region and provider region
//! - [`HostedZoneRef`] / [`ZoneSelector`] - DNS zone references
//! - [`DomainRole`] / [`CertificatePlacement`] - per-domain purpose and TLS placement

pub mod domain_role;
pub mod environment;
pub mod hostname;
pub mod invariants;
pub mod network;
pub mod region;
pub mod zone;

pub use domain_role::{CertificatePlacement, DomainRole};
pub use environment::Environment;
pub use hostname::{Hostname, HostnameError};
pub use invariants::{ValidationError, ValidationResult};
pub use network::{CidrBlock, NetworkError};
pub use region::{AwsRegion, Region};
pub use zone::{HostedZoneRef, ZoneSelector};
