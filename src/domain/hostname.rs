// Copyright (c) 2025 - Cowboy AI, Inc.
//! Hostname Value Object with DNS Validation Invariants

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Hostname validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostnameError {
    #[error("Hostname is empty")]
    Empty,

    #[error("Hostname exceeds maximum length of 253 characters: {0}")]
    TooLong(usize),

    #[error("Empty label in hostname: {0}")]
    EmptyLabel(String),

    #[error("Label exceeds maximum length of 63 characters: {0}")]
    LabelTooLong(String),

    #[error("Invalid character in hostname: {0}")]
    InvalidCharacter(char),

    #[error("Label cannot start or end with hyphen: {0}")]
    InvalidLabelFormat(String),

    #[error("Top-level label cannot be all numeric: {0}")]
    NumericLabel(String),
}

/// Fully Qualified Domain Name (FQDN) value object
///
/// Represents a valid DNS hostname following RFC 1123 with invariants:
/// - Total length ≤ 253 characters
/// - Each label ≤ 63 characters
/// - Labels contain only alphanumeric and hyphens
/// - Labels cannot start or end with hyphens
/// - The top-level label cannot be all numeric
///
/// Hostnames are stored lowercase so suffix comparisons against zone apexes
/// are case-insensitive.
///
/// # Examples
///
/// ```rust
/// use passwordless_infra::domain::Hostname;
///
/// let host = Hostname::new("cdn.eu.passwordlesstools.com").unwrap();
/// let apex = Hostname::new("passwordlesstools.com").unwrap();
/// assert!(host.is_within(&apex));
///
/// assert!(Hostname::new("").is_err());
/// assert!(Hostname::new("-invalid").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hostname(String);

impl Hostname {
    /// Maximum total length for FQDN (RFC 1123)
    pub const MAX_LENGTH: usize = 253;

    /// Maximum length for a single label (RFC 1123)
    pub const MAX_LABEL_LENGTH: usize = 63;

    /// Create a new hostname with validation
    ///
    /// # Invariants
    /// - Non-empty
    /// - Total length ≤ 253 characters
    /// - Each label ≤ 63 characters
    /// - Valid DNS characters only
    /// - Proper label format
    pub fn new(hostname: impl Into<String>) -> Result<Self, HostnameError> {
        let hostname = hostname.into().to_ascii_lowercase();

        if hostname.is_empty() {
            return Err(HostnameError::Empty);
        }

        if hostname.len() > Self::MAX_LENGTH {
            return Err(HostnameError::TooLong(hostname.len()));
        }

        for label in hostname.split('.') {
            Self::validate_label(&hostname, label)?;
        }

        if let Some(tld) = hostname.rsplit('.').next() {
            if tld.chars().all(|c| c.is_ascii_digit()) {
                return Err(HostnameError::NumericLabel(tld.to_string()));
            }
        }

        Ok(Self(hostname))
    }

    /// Build `{label}.{parent}`
    pub fn prefixed(label: &str, parent: &Hostname) -> Result<Self, HostnameError> {
        Self::new(format!("{}.{}", label, parent.0))
    }

    fn validate_label(hostname: &str, label: &str) -> Result<(), HostnameError> {
        if label.is_empty() {
            return Err(HostnameError::EmptyLabel(hostname.to_string()));
        }

        if label.len() > Self::MAX_LABEL_LENGTH {
            return Err(HostnameError::LabelTooLong(label.to_string()));
        }

        if let Some(ch) = label
            .chars()
            .find(|ch| !ch.is_ascii_alphanumeric() && *ch != '-')
        {
            return Err(HostnameError::InvalidCharacter(ch));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(HostnameError::InvalidLabelFormat(label.to_string()));
        }

        Ok(())
    }

    /// Get the hostname as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the short name (first label before first dot)
    pub fn short_name(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// Get the parent domain (everything after first dot)
    pub fn parent(&self) -> Option<&str> {
        self.0.split_once('.').map(|(_, domain)| domain)
    }

    /// Get labels as a vector
    pub fn labels(&self) -> Vec<&str> {
        self.0.split('.').collect()
    }

    /// True when `self` equals `apex` or sits below it on a label boundary
    ///
    /// `notpasswordless.tools` is not within `passwordless.tools`.
    pub fn is_within(&self, apex: &Hostname) -> bool {
        self.relative_to(apex).is_some()
    }

    /// Labels of `self` in front of `apex`
    ///
    /// Returns `Some("")` when the two are equal and `None` when `self` is not
    /// within `apex`.
    pub fn relative_to<'a>(&'a self, apex: &Hostname) -> Option<&'a str> {
        if self.0 == apex.0 {
            return Some("");
        }
        self.0
            .strip_suffix(apex.as_str())
            .and_then(|prefix| prefix.strip_suffix('.'))
    }

    /// Wildcard name covering every direct child label, e.g. `*.example.com`
    pub fn wildcard(&self) -> String {
        format!("*.{}", self.0)
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Hostname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Hostname {
    type Error = HostnameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Hostname {
    type Error = HostnameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Hostname> for String {
    fn from(value: Hostname) -> Self {
        value.0
    }
}
