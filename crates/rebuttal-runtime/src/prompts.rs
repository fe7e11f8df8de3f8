//! Prompts for the two pipeline stages.
//!
//! Each request is assembled from:
//! 1. A stage system prompt (static, or parameterised by the agent's side)
//! 2. Format-specific instructions (Stage 2 only)
//! 3. Dynamic content: the submission, the understood arguments, and the
//!    JSON Schema the reply must satisfy

use rebuttal_core::{OutputFormat, SchemaValidationError, Side, StudentSubmission, UnderstoodArguments};
use serde_json::Value;

/// Stage 1 system prompt: understand, never argue.
pub const UNDERSTAND_SYSTEM_PROMPT: &str = "You are a world-class debate analyst. \
Your job is to accurately understand the student's argument. \
Do not argue yet. Identify the core claims and key supporting points succinctly.";

/// Stage 1 output constraints appended after the schema.
const UNDERSTAND_RULES: &str = r#"
## Rules
- Report only what the student actually argues; do not invent claims
- `main_claims` lists the core claims in the order the student makes them
- `key_points` lists the supporting points (may be empty)
- `summary` is one or two sentences, or null
- Reply with a single JSON object and nothing else
"#;

/// Stage 2 base system prompt. `{agent_side}` and `{student_side}` are filled in.
const COUNTER_SYSTEM_PROMPT: &str = r#"You are a skilled competitive debater.
You argue the {agent_side} side of the motion. Your opponent, a student, argued the {student_side} side.

## Your Task
Rebut the student's argument directly. Address their claims, not a strawman.
Stay on the {agent_side} side throughout; never concede the motion.
Be concise and concrete. Prefer reasoning and evidence over rhetoric.

## Output
Reply with a single JSON object matching the schema you are given, and nothing else."#;

/// Instructions for `points`.
pub const POINTS_FORMAT_PROMPT: &str = r#"
## Format: Points
Give between 3 and 6 counter-points.
- `point`: one sentence stating the counter-point
- `support`: a short justification, or null
"#;

/// Instructions for `rebuttal_paragraphs`.
pub const REBUTTAL_PARAGRAPHS_FORMAT_PROMPT: &str = r#"
## Format: Rebuttal Paragraphs
Write between 2 and 4 paragraphs of connected rebuttal prose.
Each paragraph answers one or more of the student's claims.
"#;

/// Instructions for `referenced_paragraphs`.
pub const REFERENCED_PARAGRAPHS_FORMAT_PROMPT: &str = r#"
## Format: Referenced Paragraphs
Write between 2 and 4 paragraphs of rebuttal prose.
Every paragraph cites at least one source in `references`.
- `url`: an absolute http(s) URL of a real, authoritative source
- `label`: the source title, or null
Never cite the same URL twice across the response.
"#;

/// Get the instructions for an output format.
pub fn format_instructions(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Points => POINTS_FORMAT_PROMPT,
        OutputFormat::RebuttalParagraphs => REBUTTAL_PARAGRAPHS_FORMAT_PROMPT,
        OutputFormat::ReferencedParagraphs => REFERENCED_PARAGRAPHS_FORMAT_PROMPT,
    }
}

/// Stage 2 system prompt for the side the agent argues.
pub fn counter_system_prompt(agent_side: Side, format: OutputFormat) -> String {
    let base = COUNTER_SYSTEM_PROMPT
        .replace("{agent_side}", agent_side.as_str())
        .replace("{student_side}", agent_side.opposing().as_str());
    format!("{}\n{}", base, format_instructions(format))
}

/// Stage 1 user message.
pub fn understand_user_message(submission: &StudentSubmission, schema: &Value) -> String {
    format!(
        "Motion: {}\nStudent side: {}\nStudent argument:\n{}\n\n## Response Schema\n{}\n{}",
        submission.motion(),
        submission.side(),
        submission.argument(),
        pretty(schema),
        UNDERSTAND_RULES,
    )
}

/// Stage 2 user message.
pub fn counter_user_message(
    motion: &str,
    student_side: Side,
    agent_side: Side,
    understood: &UnderstoodArguments,
    schema: &Value,
) -> String {
    let mut message = format!(
        "Motion: {}\nStudent side: {}\nYour side: {}\n\n## Student's Main Claims\n",
        motion, student_side, agent_side
    );

    for (i, claim) in understood.main_claims().iter().enumerate() {
        message.push_str(&format!("{}. {}\n", i + 1, claim));
    }

    if !understood.key_points().is_empty() {
        message.push_str("\n## Student's Supporting Points\n");
        for point in understood.key_points() {
            message.push_str(&format!("- {}\n", point));
        }
    }

    if let Some(summary) = understood.summary() {
        message.push_str(&format!("\n## Summary\n{}\n", summary));
    }

    message.push_str(&format!("\n## Response Schema\n{}\n", pretty(schema)));
    message
}

/// Re-ask message sent after a reply failed validation.
pub fn corrective_message(error: &SchemaValidationError) -> String {
    format!(
        "Your previous reply was rejected: {}\n\
         Fix the problem and reply again with a single JSON object that matches the schema exactly.",
        error
    )
}

fn pretty(schema: &Value) -> String {
    serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebuttal_core::{PointsResponse, ResponseSchema};
    use serde_json::json;

    #[test]
    fn test_format_instructions_retrieval() {
        assert!(format_instructions(OutputFormat::Points).contains("between 3 and 6"));
        assert!(format_instructions(OutputFormat::RebuttalParagraphs).contains("between 2 and 4"));
        assert!(format_instructions(OutputFormat::ReferencedParagraphs).contains("references"));
    }

    #[test]
    fn test_understand_prompt_does_not_argue() {
        assert!(UNDERSTAND_SYSTEM_PROMPT.contains("debate analyst"));
        assert!(UNDERSTAND_SYSTEM_PROMPT.contains("Do not argue yet"));
        assert!(UNDERSTAND_RULES.contains("do not invent claims"));
    }

    #[test]
    fn test_understand_message_carries_submission() {
        let submission = StudentSubmission::new("Ban X", Side::Pro, "X causes harm").unwrap();
        let message = understand_user_message(&submission, &json!({"type": "object"}));

        assert!(message.starts_with("Motion: Ban X\nStudent side: pro\nStudent argument:\nX causes harm"));
        assert!(message.contains("\"type\": \"object\""));
    }

    #[test]
    fn test_counter_prompt_names_both_sides() {
        let prompt = counter_system_prompt(Side::Con, OutputFormat::Points);
        assert!(prompt.contains("You argue the con side"));
        assert!(prompt.contains("argued the pro side"));
        assert!(prompt.contains("Format: Points"));
        assert!(!prompt.contains("{agent_side}"));
    }

    #[test]
    fn test_counter_message_lists_claims() {
        let understood = UnderstoodArguments::new(
            vec!["X causes harm".into(), "Bans work".into()],
            vec!["Studies show harm".into()],
            Some("Ban it.".into()),
        )
        .unwrap();

        let message = counter_user_message(
            "Ban X",
            Side::Pro,
            Side::Con,
            &understood,
            &json!({"type": "object"}),
        );

        assert!(message.contains("Your side: con"));
        assert!(message.contains("1. X causes harm\n2. Bans work\n"));
        assert!(message.contains("- Studies show harm"));
        assert!(message.contains("## Summary\nBan it."));
    }

    #[test]
    fn test_corrective_message_names_field() {
        let err = PointsResponse::coerce(r#"{"points": []}"#).unwrap_err();
        let message = corrective_message(&err);
        assert!(message.contains("`points`"));
        assert!(message.contains("single JSON object"));
    }
}
