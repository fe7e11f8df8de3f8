//! Structured-output coercion with bounded re-asking.
//!
//! A reply that fails validation is sent back to the model together with a
//! corrective message naming the failure. The delay between attempts and the
//! attempt bound come from a `backon` constant backoff. Transport failures
//! are returned immediately and never retried.

use backon::{BackoffBuilder, ConstantBuilder};
use rebuttal_core::SchemaValidationError;
use std::time::Duration;
use thiserror::Error;

use crate::config::{Settings, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use crate::prompts;
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider, ProviderError, TokenUsage};

/// Errors from coercing a model reply.
#[derive(Error, Debug)]
pub enum CoercionError {
    #[error(transparent)]
    Transport(#[from] ProviderError),

    #[error("reply rejected after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        last: SchemaValidationError,
    },
}

/// Retry bound and pacing for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoercionPolicy {
    /// Total attempts, including the first (at least 1)
    pub max_attempts: u32,
    /// Pause before each re-ask
    pub retry_delay: Duration,
}

impl Default for CoercionPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl CoercionPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            retry_delay: settings.retry_delay,
        }
    }

    /// Delays before each re-ask; yields `max_attempts - 1` items.
    fn delays(&self) -> impl Iterator<Item = Duration> {
        ConstantBuilder::default()
            .with_delay(self.retry_delay)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
            .build()
    }
}

/// A validated value and what it cost.
#[derive(Debug, Clone)]
pub struct Coerced<T> {
    pub value: T,
    pub attempts: u32,
    pub usage: TokenUsage,
}

/// Ask the model until `parse` accepts a reply or the policy is exhausted.
pub async fn coerce<T, F>(
    provider: &dyn LlmProvider,
    config: &CompletionConfig,
    mut messages: Vec<ChatMessage>,
    policy: &CoercionPolicy,
    stage: &str,
    parse: F,
) -> Result<Coerced<T>, CoercionError>
where
    F: Fn(&str) -> Result<T, SchemaValidationError>,
{
    let mut delays = policy.delays();
    let mut attempts = 0u32;
    let mut usage = TokenUsage::default();

    loop {
        attempts += 1;
        let response = provider.complete(messages.clone(), config).await?;
        usage.prompt_tokens += response.usage.prompt_tokens;
        usage.completion_tokens += response.usage.completion_tokens;

        let error = match parse(&response.content) {
            Ok(value) => {
                return Ok(Coerced {
                    value,
                    attempts,
                    usage,
                })
            }
            Err(error) => error,
        };

        let Some(delay) = delays.next() else {
            return Err(CoercionError::Exhausted {
                attempts,
                last: error,
            });
        };

        tracing::warn!(
            stage,
            attempt = attempts,
            field = error.field().unwrap_or("$"),
            error = %error,
            "Reply failed validation, re-asking"
        );

        messages.push(ChatMessage::assistant(response.content));
        messages.push(ChatMessage::user(prompts::corrective_message(&error)));
        tokio::time::sleep(delay).await;
    }
}
