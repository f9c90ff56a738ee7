// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Regions
//!
//! A [`Region`] is a product-level deployment target; each one gets its own
//! fully isolated stack set. [`AwsRegion`] is the provider region a stack is
//! actually synthesized into.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::SynthesisError;

/// Product deployment region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Eu,
    Us,
}

impl Region {
    pub fn all() -> [Region; 2] {
        [Region::Eu, Region::Us]
    }

    /// Token used in domain names and resource ids
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eu => "eu",
            Self::Us => "us",
        }
    }

    /// Provider region the regional stacks deploy to
    pub fn aws_region(&self) -> AwsRegion {
        match self {
            Self::Eu => AwsRegion::EU_WEST_1,
            Self::Us => AwsRegion::US_EAST_2,
        }
    }

    /// Parse a comma-separated region list, rejecting duplicates
    pub fn parse_list(list: &str) -> Result<Vec<Region>, SynthesisError> {
        let mut regions = Vec::new();
        for token in list.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let region: Region = token.parse()?;
            if regions.contains(&region) {
                return Err(SynthesisError::configuration(format!(
                    "region '{}' listed twice",
                    token
                )));
            }
            regions.push(region);
        }
        if regions.is_empty() {
            return Err(SynthesisError::configuration("empty region list"));
        }
        Ok(regions)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = SynthesisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eu" => Ok(Self::Eu),
            "us" => Ok(Self::Us),
            other => Err(SynthesisError::configuration(format!(
                "unknown region '{}' (expected one of: eu, us)",
                other
            ))),
        }
    }
}

/// Provider region code, e.g. `eu-west-1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AwsRegion {
    #[serde(rename = "eu-west-1")]
    EuWest1,
    #[serde(rename = "us-east-1")]
    UsEast1,
    #[serde(rename = "us-east-2")]
    UsEast2,
}

impl AwsRegion {
    pub const EU_WEST_1: AwsRegion = AwsRegion::EuWest1;
    pub const US_EAST_1: AwsRegion = AwsRegion::UsEast1;
    pub const US_EAST_2: AwsRegion = AwsRegion::UsEast2;

    /// Region whose certificates the global edge network accepts
    pub const EDGE: AwsRegion = AwsRegion::UsEast1;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EuWest1 => "eu-west-1",
            Self::UsEast1 => "us-east-1",
            Self::UsEast2 => "us-east-2",
        }
    }

    pub fn is_edge(&self) -> bool {
        *self == Self::EDGE
    }
}

impl fmt::Display for AwsRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
