// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Synthesis Invariants
//!
//! Business rules checked while the static tables are built and while a
//! deployment is resolved. All functions are pure (no side effects) and return
//! detailed validation results.
//!
//! # Invariant Categories
//!
//! 1. **Structural Invariants**: identifiers and names are well formed
//! 2. **Pairing Invariants**: a domain belongs to the zone that validates it
//! 3. **Operational Rules**: backup windows, scaling bounds

use crate::domain::{DomainRole, HostedZoneRef, Hostname};
use crate::errors::SynthesisError;

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Domain is not the zone apex nor below it
    #[error("{role} domain {domain} is outside zone {zone}")]
    DomainOutsideZone {
        role: DomainRole,
        domain: String,
        zone: String,
    },

    /// Environment variable key does not follow `UPPER_SNAKE_CASE`
    #[error("Invalid environment variable name: {0}")]
    InvalidVariableName(String),

    /// Identifier has the wrong shape
    #[error("Invalid {kind}: {value}")]
    InvalidIdentifier { kind: &'static str, value: String },

    /// Business rule violation
    #[error("Business rule violated: {0}")]
    BusinessRule(String),
}

impl From<ValidationError> for SynthesisError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::DomainOutsideZone { .. } => SynthesisError::InvalidDomain(err.to_string()),
            other => SynthesisError::Configuration(other.to_string()),
        }
    }
}

/// Validate a domain sits within the zone that owns it
///
/// # Rules
/// - Domain equals the zone apex, or
/// - Domain ends with `.{apex}` on a label boundary
pub fn validate_domain_in_zone(
    role: DomainRole,
    domain: &Hostname,
    zone: &HostedZoneRef,
) -> ValidationResult {
    if !domain.is_within(&zone.name) {
        return Err(ValidationError::DomainOutsideZone {
            role,
            domain: domain.to_string(),
            zone: zone.name.to_string(),
        });
    }
    Ok(())
}

/// Validate an environment variable name
///
/// # Rules
/// - Non-empty
/// - Starts with an uppercase letter
/// - Only `A-Z`, `0-9` and `_`
pub fn validate_variable_name(key: &str) -> ValidationResult {
    let valid = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase())
        && key
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');

    if !valid {
        return Err(ValidationError::InvalidVariableName(key.to_string()));
    }
    Ok(())
}

/// Validate a hosted zone id
///
/// # Rules
/// - Starts with `Z`
/// - Uppercase alphanumeric, 2 to 32 characters
pub fn validate_zone_id(id: &str) -> ValidationResult {
    let valid = id.starts_with('Z')
        && (2..=32).contains(&id.len())
        && id
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());

    if !valid {
        return Err(ValidationError::InvalidIdentifier {
            kind: "hosted zone id",
            value: id.to_string(),
        });
    }
    Ok(())
}

/// Validate an AWS account id (12 digits)
pub fn validate_account_id(account: &str) -> ValidationResult {
    if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidIdentifier {
            kind: "account id",
            value: account.to_string(),
        });
    }
    Ok(())
}

/// Validate a Secrets Manager secret ARN
///
/// # Rules
/// - `arn:aws:secretsmanager:{region}:{account}:secret:{name}`
/// - Account part is a valid account id
/// - Name part is non-empty
pub fn validate_secret_arn(arn: &str) -> ValidationResult {
    let invalid = || ValidationError::InvalidIdentifier {
        kind: "secret ARN",
        value: arn.to_string(),
    };

    let parts: Vec<&str> = arn.splitn(7, ':').collect();
    match parts.as_slice() {
        ["arn", "aws", "secretsmanager", region, account, "secret", name]
            if !region.is_empty() && !name.is_empty() =>
        {
            validate_account_id(account).map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

/// Validate backup plan windows
///
/// # Rules
/// - Completion window exceeds start window by at least one hour
/// - Backup rate divides a day into whole runs (1..=24 hours)
pub fn validate_backup_windows(
    rate_hours: u32,
    start_window_hours: u32,
    completion_window_hours: u32,
) -> ValidationResult {
    if !(1..=24).contains(&rate_hours) {
        return Err(ValidationError::BusinessRule(format!(
            "backup rate of {} hours is outside 1..=24",
            rate_hours
        )));
    }

    if completion_window_hours < start_window_hours + 1 {
        return Err(ValidationError::BusinessRule(
            "Backup completion window must be at least 60 minutes greater than backup start window"
                .to_string(),
        ));
    }
    Ok(())
}

/// Validate autoscaling bounds
///
/// # Rules
/// - `1 <= min <= max`
/// - Target utilisation strictly between 0 and 100 percent
pub fn validate_scaling_bounds(min: u32, max: u32, target_cpu_percent: u32) -> ValidationResult {
    if min == 0 || min > max {
        return Err(ValidationError::BusinessRule(format!(
            "invalid capacity bounds {}..={}",
            min, max
        )));
    }
    if target_cpu_percent == 0 || target_cpu_percent >= 100 {
        return Err(ValidationError::BusinessRule(format!(
            "CPU target {}% must be between 1 and 99",
            target_cpu_percent
        )));
    }
    Ok(())
}
