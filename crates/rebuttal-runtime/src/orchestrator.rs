//! Runtime orchestrator for the understand-then-counter pipeline.
//!
//! The orchestrator runs the two stages strictly in sequence:
//! - Stage 1 extracts the student's claims
//! - Stage 2 argues the opposing side in the requested format
//!
//! The Stage 2 value is returned as-is.

use std::sync::Arc;
use thiserror::Error;

use rebuttal_core::{CounterArgument, OutputFormat, StudentSubmission};

use crate::agents::{generate_counter, understand_arguments, AgentError, CounterRequest, StageContext};
use crate::coercion::CoercionPolicy;
use crate::config::{Settings, DEFAULT_ENVIRONMENT};
use crate::providers::{CompletionConfig, LlmProvider, OpenAiCompatibleProvider};
use crate::telemetry::Tracer;

/// Errors from the runtime orchestrator.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl RuntimeError {
    /// The offending field, for validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            RuntimeError::Agent(e) => e.field(),
            RuntimeError::ProviderNotConfigured(_) => None,
        }
    }
}

/// Runs one submission through both stages.
pub struct DebateOrchestrator {
    provider: Arc<dyn LlmProvider>,
    completion: CompletionConfig,
    policy: CoercionPolicy,
    tracer: Tracer,
}

impl DebateOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        completion: CompletionConfig,
        policy: CoercionPolicy,
        tracer: Tracer,
    ) -> Self {
        Self {
            provider,
            completion,
            policy,
            tracer,
        }
    }

    /// Wire the HTTP provider, retry policy and tracer from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, RuntimeError> {
        let provider = OpenAiCompatibleProvider::from_settings(settings)
            .map_err(|e| RuntimeError::ProviderNotConfigured(e.to_string()))?;

        DebateOrchestratorBuilder::new()
            .provider(Arc::new(provider))
            .settings(settings)
            .tracer(Tracer::from_settings(settings))
            .build()
    }

    /// The tracer spans are recorded into.
    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Produce a counter-argument against `submission`.
    ///
    /// # Execution Flow
    /// 1. Pick the opposing side
    /// 2. Understand the student's argument
    /// 3. Generate the counter-argument from what was understood
    pub async fn run(
        &self,
        submission: &StudentSubmission,
        format: OutputFormat,
    ) -> Result<CounterArgument, RuntimeError> {
        let agent_side = submission.side().opposing();
        let ctx = StageContext {
            provider: self.provider.as_ref(),
            completion: &self.completion,
            policy: &self.policy,
            tracer: &self.tracer,
        };

        tracing::info!(
            provider = self.provider.name(),
            model = %self.completion.model,
            student_side = %submission.side(),
            %agent_side,
            %format,
            "Starting understand stage"
        );
        let understood = understand_arguments(ctx, submission).await?;

        tracing::info!(claims = understood.main_claims().len(), "Starting generate stage");
        let request = CounterRequest {
            motion: submission.motion(),
            student_side: submission.side(),
            agent_side,
            format,
        };
        let counter = generate_counter(ctx, request, &understood).await?;

        tracing::info!(format = %counter.format(), "Pipeline finished");
        Ok(counter)
    }
}

/// Builder for DebateOrchestrator.
pub struct DebateOrchestratorBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    completion: CompletionConfig,
    policy: CoercionPolicy,
    tracer: Option<Tracer>,
}

impl DebateOrchestratorBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            provider: None,
            completion: CompletionConfig::default(),
            policy: CoercionPolicy::default(),
            tracer: None,
        }
    }

    /// Set the LLM provider.
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Take completion parameters and the retry policy from settings.
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.completion = settings.completion_config();
        self.policy = CoercionPolicy::from_settings(settings);
        self
    }

    /// Set the completion parameters.
    pub fn completion(mut self, completion: CompletionConfig) -> Self {
        self.completion = completion;
        self
    }

    /// Set the retry policy.
    pub fn policy(mut self, policy: CoercionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the tracer.
    pub fn tracer(mut self, tracer: Tracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> Result<DebateOrchestrator, RuntimeError> {
        let provider = self
            .provider
            .ok_or_else(|| RuntimeError::ProviderNotConfigured("No provider set".to_string()))?;

        Ok(DebateOrchestrator::new(
            provider,
            self.completion,
            self.policy,
            self.tracer.unwrap_or_else(|| Tracer::new(DEFAULT_ENVIRONMENT)),
        ))
    }
}

impl Default for DebateOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Stage;
    use crate::test_support::ScriptedProvider;
    use rebuttal_core::Side;
    use std::time::Duration;

    const UNDERSTOOD: &str = r#"{"main_claims": ["X causes harm"], "key_points": []}"#;
    const PARAGRAPHS: &str = r#"{"paragraphs": ["First rebuttal.", "Second rebuttal."]}"#;

    fn orchestrator(provider: Arc<ScriptedProvider>) -> DebateOrchestrator {
        DebateOrchestratorBuilder::new()
            .provider(provider)
            .policy(CoercionPolicy {
                max_attempts: 3,
                retry_delay: Duration::ZERO,
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_without_provider_fails() {
        let result = DebateOrchestratorBuilder::new().build();
        assert!(matches!(result, Err(RuntimeError::ProviderNotConfigured(_))));
    }

    #[tokio::test]
    async fn test_con_submission_is_answered_from_pro() {
        let provider = Arc::new(ScriptedProvider::new([Ok(UNDERSTOOD), Ok(PARAGRAPHS)]));
        let orchestrator = orchestrator(provider.clone());
        let submission = StudentSubmission::new("Ban X", Side::Con, "X is harmless").unwrap();

        let counter = orchestrator
            .run(&submission, OutputFormat::RebuttalParagraphs)
            .await
            .unwrap();
        assert_eq!(counter.format(), OutputFormat::RebuttalParagraphs);

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1][0].content.contains("You argue the pro side"));

        let spans = orchestrator.tracer().records();
        let names: Vec<_> = spans.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["understand_arguments", "generate_counter"]);
        assert_eq!(spans[1].attributes["agent_side"], "pro");
    }

    #[tokio::test]
    async fn test_stage_one_failure_skips_stage_two() {
        let provider = Arc::new(ScriptedProvider::new([Ok("no"), Ok("no"), Ok("no")]));
        let orchestrator = orchestrator(provider.clone());
        let submission = StudentSubmission::new("Ban X", Side::Pro, "X causes harm").unwrap();

        let err = orchestrator
            .run(&submission, OutputFormat::Points)
            .await
            .unwrap_err();

        match &err {
            RuntimeError::Agent(agent) => assert_eq!(agent.stage(), Stage::Understand),
            other => panic!("expected agent error, got {other:?}"),
        }
        assert_eq!(err.field(), Some("$"));
        assert_eq!(provider.call_count(), 3);
        assert_eq!(orchestrator.tracer().records().len(), 1);
    }
}
