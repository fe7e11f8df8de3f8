//! Stage 1: understand the student's argument.

use rebuttal_core::{ResponseSchema, StudentSubmission, UnderstoodArguments};

use super::{AgentError, Stage, StageContext};
use crate::coercion::coerce;
use crate::prompts;
use crate::providers::ChatMessage;
use crate::telemetry::attributes;

/// Extract the student's claims without arguing against them.
pub async fn understand_arguments(
    ctx: StageContext<'_>,
    submission: &StudentSubmission,
) -> Result<UnderstoodArguments, AgentError> {
    let span_attributes = attributes([
        ("motion", submission.motion()),
        ("student_side", submission.side().as_str()),
    ]);

    ctx.tracer
        .in_span("understand_arguments", span_attributes, async {
            let schema = UnderstoodArguments::schema()
                .map_err(|e| AgentError::schema_unavailable(Stage::Understand, e))?;

            let messages = vec![
                ChatMessage::system(prompts::UNDERSTAND_SYSTEM_PROMPT),
                ChatMessage::user(prompts::understand_user_message(submission, schema)),
            ];

            let coerced = coerce(
                ctx.provider,
                ctx.completion,
                messages,
                ctx.policy,
                Stage::Understand.as_str(),
                UnderstoodArguments::coerce,
            )
            .await
            .map_err(|e| AgentError::from_coercion(Stage::Understand, e))?;

            tracing::info!(
                stage = %Stage::Understand,
                attempts = coerced.attempts,
                claims = coerced.value.main_claims().len(),
                prompt_tokens = coerced.usage.prompt_tokens,
                completion_tokens = coerced.usage.completion_tokens,
                total_tokens = coerced.usage.total(),
                "Understood student argument"
            );

            Ok::<_, AgentError>(coerced.value)
        })
        .await
}
