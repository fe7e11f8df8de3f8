//! Stage 2: argue the opposing side.

use rebuttal_core::{CounterArgument, OutputFormat, Side, UnderstoodArguments};

use super::{AgentError, Stage, StageContext};
use crate::coercion::coerce;
use crate::prompts;
use crate::providers::ChatMessage;
use crate::telemetry::attributes;

/// What Stage 2 argues against, and how.
#[derive(Debug, Clone, Copy)]
pub struct CounterRequest<'a> {
    pub motion: &'a str,
    pub student_side: Side,
    pub agent_side: Side,
    pub format: OutputFormat,
}

/// Produce a counter-argument in the requested format.
pub async fn generate_counter(
    ctx: StageContext<'_>,
    request: CounterRequest<'_>,
    understood: &UnderstoodArguments,
) -> Result<CounterArgument, AgentError> {
    let binding = request.format.binding();
    let span_attributes = attributes([
        ("motion", request.motion),
        ("student_side", request.student_side.as_str()),
        ("agent_side", request.agent_side.as_str()),
        ("format", request.format.as_str()),
    ]);

    ctx.tracer
        .in_span("generate_counter", span_attributes, async {
            let schema = binding
                .schema()
                .map_err(|e| AgentError::schema_unavailable(Stage::Generate, e))?;

            let messages = vec![
                ChatMessage::system(prompts::counter_system_prompt(
                    request.agent_side,
                    request.format,
                )),
                ChatMessage::user(prompts::counter_user_message(
                    request.motion,
                    request.student_side,
                    request.agent_side,
                    understood,
                    schema,
                )),
            ];

            let coerced = coerce(
                ctx.provider,
                ctx.completion,
                messages,
                ctx.policy,
                Stage::Generate.as_str(),
                |reply| binding.coerce(reply),
            )
            .await
            .map_err(|e| AgentError::from_coercion(Stage::Generate, e))?;

            tracing::info!(
                stage = %Stage::Generate,
                shape = binding.shape,
                attempts = coerced.attempts,
                prompt_tokens = coerced.usage.prompt_tokens,
                completion_tokens = coerced.usage.completion_tokens,
                total_tokens = coerced.usage.total(),
                "Generated counter-argument"
            );

            Ok::<_, AgentError>(coerced.value)
        })
        .await
}
