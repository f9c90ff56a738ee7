// Copyright (c) 2025 - Cowboy AI, Inc.
//! Synthesis Phase State Machine
//!
//! # States
//!
//! - Unsynthesized: nothing resolved yet
//! - Resolved: registries and certificates resolved
//! - Composed: every regional stack composed
//! - Synthesized: manifest emitted (terminal)
//!
//! # Inputs
//!
//! - Resolve: Unsynthesized → Resolved
//! - Compose: Resolved → Composed
//! - Emit: Composed → Synthesized
//!
//! Any other pair is rejected. There is no way back: a failed pass is
//! discarded, never resumed.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SynthesisPhase {
    Unsynthesized,
    Resolved,
    Composed,
    Synthesized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SynthesisInput {
    Resolve,
    Compose,
    Emit,
}

impl SynthesisPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unsynthesized => "UNSYNTHESIZED",
            Self::Resolved => "RESOLVED",
            Self::Composed => "COMPOSED",
            Self::Synthesized => "SYNTHESIZED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Synthesized)
    }
}

impl fmt::Display for SynthesisPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for SynthesisPhase {
    type Input = SynthesisInput;
    type Output = ();

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use SynthesisInput::*;
        use SynthesisPhase::*;

        match (self, input) {
            (Unsynthesized, Resolve) => Ok((Resolved, ())),
            (Resolved, Compose) => Ok((Composed, ())),
            (Composed, Emit) => Ok((Synthesized, ())),
            (Synthesized, _) => Err(TransitionError::BusinessRuleViolation(
                "synthesis already completed".to_string(),
            )),
            (from, input) => Err(TransitionError::InvalidTransition {
                from: from.to_string(),
                to: format!("{:?}", input),
            }),
        }
    }

    fn valid_inputs(&self) -> Vec<Self::Input> {
        match self {
            Self::Unsynthesized => vec![SynthesisInput::Resolve],
            Self::Resolved => vec![SynthesisInput::Compose],
            Self::Composed => vec![SynthesisInput::Emit],
            Self::Synthesized => Vec::new(),
        }
    }
}
