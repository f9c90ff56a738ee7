// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Environment

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::SynthesisError;

/// Deployment environment selected once per synthesis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    /// Environment used when no selector is given at the entry point
    pub const DEFAULT: Environment = Environment::Dev;

    /// All environments in declaration order
    pub fn all() -> [Environment; 2] {
        [Environment::Dev, Environment::Prod]
    }

    /// Canonical selector string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }

    /// Resolve an optional selector, defaulting to [`Environment::DEFAULT`]
    ///
    /// Only the outermost entry point calls this. Everything past it takes a
    /// concrete `Environment` and never defaults.
    pub fn select(selector: Option<&str>) -> Result<Self, SynthesisError> {
        match selector {
            None => Ok(Self::DEFAULT),
            Some(s) => s.parse(),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = SynthesisError;

    /// Strict parse: only the exact selector strings are accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(SynthesisError::configuration(format!(
                "unknown environment '{}' (expected one of: dev, prod)",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Dev);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Prod);
    }

    #[test]
    fn test_parse_unknown_is_configuration_error() {
        let err = "staging".parse::<Environment>().unwrap_err();
        assert!(matches!(err, SynthesisError::Configuration(_)));
        assert!(err.to_string().contains("staging"));

        // No case folding
        assert!("PROD".parse::<Environment>().is_err());
    }

    #[test]
    fn test_select_defaults_to_dev() {
        assert_eq!(Environment::select(None).unwrap(), Environment::Dev);
        assert_eq!(Environment::select(Some("prod")).unwrap(), Environment::Prod);
        assert!(Environment::select(Some("")).is_err());
    }
}
