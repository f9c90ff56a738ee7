// Copyright (c) 2025 - Cowboy AI, Inc.
//! Static lookup tables
//!
//! Both registries are immutable values built once and passed by reference
//! through the pipeline; nothing here is process-global.

pub mod domain;
pub mod environment;

pub use domain::{DomainAttributes, DomainRegistry, DomainSet, ResolvedDomain};
pub use environment::{EnvironmentConfig, EnvironmentRegistry, SecretRef, TierSettings};
