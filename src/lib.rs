// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment configuration resolver for passwordless-tools
//!
//! Turns the static environment and domain tables into ordered, deployable
//! stack manifests: one edge certificate stack, one certificate stack per
//! target region and one application stack per target region.
//!
//! Resolution is pure and synchronous. Nothing here talks to a cloud API; the
//! manifests are handed to a separate deploy engine.

pub mod app_config;
pub mod bridge;
pub mod certificates;
pub mod composer;
pub mod domain;
pub mod errors;
pub mod registry;
pub mod settings;
pub mod state_machine;
pub mod synthesis;

// Re-export commonly used types
pub use bridge::{CrossRegionBridge, CrossRegionReference};
pub use certificates::{CertificatePlan, CertificateResolver, CertificateSet};
pub use composer::{OrderedDeclarationSet, StackComposer, StackManifest};
pub use domain::{DomainRole, Environment, Region};
pub use errors::{SynthesisError, SynthesisResult};
pub use registry::{DomainRegistry, DomainSet, EnvironmentConfig, EnvironmentRegistry};
pub use settings::SynthesisSettings;
pub use synthesis::{SynthesizedApp, Synthesizer};
