// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for synthesis operations
//!
//! Every error is fail-fast: resolution is pure and deterministic, so a
//! failed pass is never retried and nothing partial is emitted.

use thiserror::Error;

use crate::domain::{DomainRole, Environment, HostnameError, NetworkError, Region};
use crate::state_machine::TransitionError;

/// Errors that can abort a synthesis pass
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    /// Unknown selector or malformed static table entry
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A domain role references a zone the environment does not define
    #[error("No hosted zone {zone} for {role} in {region}/{environment}")]
    MissingZone {
        region: Region,
        environment: Environment,
        role: DomainRole,
        zone: String,
    },

    /// A regional stack imports a certificate never produced in the edge region
    #[error("Cross-region reference error: no edge certificate for {role} in {region}/{environment}")]
    CrossRegionReference {
        region: Region,
        environment: Environment,
        role: DomainRole,
    },

    /// The declaration graph is not a DAG
    #[error("Dependency cycle between: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    /// A declaration depends on an id that was never declared
    #[error("{from} depends on undeclared resource {to}")]
    UnknownDependency { from: String, to: String },

    /// A resource id was declared twice
    #[error("Resource {0} declared more than once")]
    DuplicateResource(String),

    /// Domain is structurally invalid or outside its zone
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    /// Hostname value object rejected its input
    #[error(transparent)]
    Hostname(#[from] HostnameError),

    /// Network value object rejected its input
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Synthesis phase transition was not allowed
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for synthesis operations
pub type SynthesisResult<T> = Result<T, SynthesisError>;

impl SynthesisError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

impl From<serde_json::Error> for SynthesisError {
    fn from(err: serde_json::Error) -> Self {
        SynthesisError::Serialization(err.to_string())
    }
}
