//! The two pipeline stages.
//!
//! Each stage sends one chat-completion request per attempt, coerces the
//! reply into its response shape, and runs inside a named span.

mod counter;
mod understand;

pub use counter::{generate_counter, CounterRequest};
pub use understand::understand_arguments;

use rebuttal_core::SchemaValidationError;
use std::fmt;
use thiserror::Error;

use crate::coercion::{CoercionError, CoercionPolicy};
use crate::providers::{CompletionConfig, LlmProvider, ProviderError};
use crate::telemetry::Tracer;

/// Collaborators shared by both stages.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub provider: &'a dyn LlmProvider,
    pub completion: &'a CompletionConfig,
    pub policy: &'a CoercionPolicy,
    pub tracer: &'a Tracer,
}

/// Pipeline stage, used to tag failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Understand,
    Generate,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Understand => "understand",
            Stage::Generate => "generate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from a stage.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("{stage} stage: transport failure: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: ProviderError,
    },

    #[error("{stage} stage: reply rejected after {attempts} attempt(s): {source}")]
    Validation {
        stage: Stage,
        attempts: u32,
        #[source]
        source: SchemaValidationError,
    },
}

impl AgentError {
    /// A descriptor that failed to load before any request was sent.
    pub(crate) fn schema_unavailable(stage: Stage, source: SchemaValidationError) -> Self {
        AgentError::Validation {
            stage,
            attempts: 0,
            source,
        }
    }

    pub(crate) fn from_coercion(stage: Stage, error: CoercionError) -> Self {
        match error {
            CoercionError::Transport(source) => AgentError::Transport { stage, source },
            CoercionError::Exhausted { attempts, last } => AgentError::Validation {
                stage,
                attempts,
                source: last,
            },
        }
    }

    /// The stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            AgentError::Transport { stage, .. } | AgentError::Validation { stage, .. } => *stage,
        }
    }

    /// The offending field of a validation failure.
    pub fn field(&self) -> Option<&str> {
        match self {
            AgentError::Transport { .. } => None,
            AgentError::Validation { source, .. } => source.field(),
        }
    }
}
