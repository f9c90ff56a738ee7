// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects with Validation Invariants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid VPC prefix length: /{0} (must be /16 to /28)")]
    InvalidPrefixLength(u8),

    #[error("Address {address} is not aligned to /{prefix}")]
    UnalignedNetwork { address: Ipv4Addr, prefix: u8 },

    #[error("Subnet mask /{subnet} must be longer than /{vpc} and at most /28")]
    InvalidSubnetMask { vpc: u8, subnet: u8 },
}

/// IPv4 network block for a VPC
///
/// Invariants:
/// - Prefix length between /16 and /28 (the range a VPC accepts)
/// - Address is the network address (no host bits set)
///
/// # Examples
///
/// ```rust
/// use passwordless_infra::domain::CidrBlock;
///
/// let cidr = CidrBlock::new("10.1.0.0/16").unwrap();
/// assert_eq!(cidr.prefix_length(), 16);
/// assert!(CidrBlock::new("10.1.0.1/16").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CidrBlock {
    address: Ipv4Addr,
    prefix_length: u8,
}

impl CidrBlock {
    /// Smallest VPC prefix (largest network)
    pub const MIN_PREFIX: u8 = 16;

    /// Largest VPC prefix (smallest network)
    pub const MAX_PREFIX: u8 = 28;

    /// Parse `a.b.c.d/n` with validation
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        let cidr = cidr.as_ref();

        let (addr_str, prefix_str) = cidr
            .split_once('/')
            .ok_or_else(|| NetworkError::InvalidCidr(cidr.to_string()))?;

        let address = Ipv4Addr::from_str(addr_str)
            .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;

        let prefix_length = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

        Self::from_parts(address, prefix_length)
    }

    /// Create from separate address and prefix
    pub fn from_parts(address: Ipv4Addr, prefix_length: u8) -> Result<Self, NetworkError> {
        if !(Self::MIN_PREFIX..=Self::MAX_PREFIX).contains(&prefix_length) {
            return Err(NetworkError::InvalidPrefixLength(prefix_length));
        }

        if u32::from(address) & !Self::mask(prefix_length) != 0 {
            return Err(NetworkError::UnalignedNetwork {
                address,
                prefix: prefix_length,
            });
        }

        Ok(Self {
            address,
            prefix_length,
        })
    }

    fn mask(prefix_length: u8) -> u32 {
        u32::MAX
            .checked_shl(32 - u32::from(prefix_length))
            .unwrap_or(0)
    }

    /// Network address
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Prefix length
    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// Number of subnets of the given mask that fit in this block
    ///
    /// Fails when the mask is not strictly longer than the block's prefix.
    pub fn subnet_capacity(&self, subnet_mask: u8) -> Result<u32, NetworkError> {
        if subnet_mask <= self.prefix_length || subnet_mask > Self::MAX_PREFIX {
            return Err(NetworkError::InvalidSubnetMask {
                vpc: self.prefix_length,
                subnet: subnet_mask,
            });
        }
        Ok(1u32 << (subnet_mask - self.prefix_length))
    }

    /// True when the two blocks share any address
    pub fn overlaps(&self, other: &CidrBlock) -> bool {
        let prefix = self.prefix_length.min(other.prefix_length);
        let mask = Self::mask(prefix);
        u32::from(self.address) & mask == u32::from(other.address) & mask
    }
}

impl fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_length)
    }
}

impl FromStr for CidrBlock {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CidrBlock {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CidrBlock> for String {
    fn from(value: CidrBlock) -> Self {
        value.to_string()
    }
}
