// Copyright (c) 2025 - Cowboy AI, Inc.
//! Domain Roles
//!
//! Every (region, environment) pair needs exactly one fully-qualified domain
//! per role. The role also decides where, if anywhere, its TLS certificate is
//! provisioned.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical purpose of a domain in a regional deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainRole {
    /// Application host served by the regional load balancer
    Main,
    /// `www.` alias redirected to main by the load balancer
    Www,
    /// Static asset CDN on the commerce zone
    Cdn,
    /// CDN in front of the application and customer media
    AppCdn,
    /// Commerce apex, redirected to main
    Com,
    /// SES sending identity
    Email,
    /// SES click/open tracking distribution
    Tracking,
}

/// Where a certificate for a role has to live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificatePlacement {
    /// Consumed by a global edge distribution; pinned to the edge region
    Edge,
    /// Consumed by a load balancer; lives in the target region
    Regional,
}

impl DomainRole {
    pub const ALL: [DomainRole; 7] = [
        DomainRole::Main,
        DomainRole::Www,
        DomainRole::Cdn,
        DomainRole::AppCdn,
        DomainRole::Com,
        DomainRole::Email,
        DomainRole::Tracking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Www => "www",
            Self::Cdn => "cdn",
            Self::AppCdn => "app-cdn",
            Self::Com => "com",
            Self::Email => "email",
            Self::Tracking => "tracking",
        }
    }

    /// Certificate placement, or `None` when the role terminates no TLS
    pub fn certificate_placement(&self) -> Option<CertificatePlacement> {
        match self {
            Self::Cdn | Self::AppCdn | Self::Com | Self::Tracking => Some(CertificatePlacement::Edge),
            Self::Main | Self::Www => Some(CertificatePlacement::Regional),
            Self::Email => None,
        }
    }

    pub fn requires_tls(&self) -> bool {
        self.certificate_placement().is_some()
    }
}

impl fmt::Display for DomainRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
