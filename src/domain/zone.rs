// Copyright (c) 2025 - Cowboy AI, Inc.
//! DNS Hosted Zones
//!
//! Zones are looked up, never created: ownership sits with the registrar
//! tooling. This crate only pairs domains with the zone that validates them.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Hostname, HostnameError};

/// Which apex zone family a domain belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneSelector {
    /// `passwordless.tools` family (application)
    Tools,
    /// `passwordlesstools.com` family (commerce, email, tracking)
    Commerce,
}

impl ZoneSelector {
    pub fn all() -> [ZoneSelector; 2] {
        [ZoneSelector::Tools, ZoneSelector::Commerce]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tools => "tools",
            Self::Commerce => "commerce",
        }
    }
}

impl fmt::Display for ZoneSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to an existing public hosted zone
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostedZoneRef {
    /// Provider zone id, e.g. `Z0737569361XQK32FNWPX`
    pub id: String,
    /// Apex name the zone is authoritative for
    pub name: Hostname,
}

impl HostedZoneRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Result<Self, HostnameError> {
        Ok(Self {
            id: id.into(),
            name: Hostname::new(name)?,
        })
    }
}

impl fmt::Display for HostedZoneRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
