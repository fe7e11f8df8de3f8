//! # rebuttal-runtime
//!
//! Model-backed half of rebuttal: takes a student's debate argument,
//! understands it, and argues the opposing side.
//!
//! ## Pipeline
//!
//! 1. **Understand**: extract the student's claims into `UnderstoodArguments`
//! 2. **Counter**: argue the opposite side in the requested `OutputFormat`
//!
//! Every model reply is coerced into its response shape. Invalid replies are
//! re-asked with corrective feedback up to a bounded number of attempts;
//! transport failures are fatal. Both stages run inside recorded spans.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rebuttal_core::{OutputFormat, Side, StudentSubmission};
//! use rebuttal_runtime::{DebateOrchestrator, Settings};
//!
//! let settings = Settings::from_env()?;
//! let orchestrator = DebateOrchestrator::from_settings(&settings)?;
//!
//! let submission = StudentSubmission::new("Ban X", Side::Pro, "X causes harm.")?;
//! let counter = orchestrator.run(&submission, OutputFormat::Points).await?;
//! orchestrator.tracer().flush().await;
//! ```

pub mod agents;
pub mod coercion;
pub mod config;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod telemetry;

#[cfg(test)]
mod test_support;

pub use agents::{AgentError, Stage};
pub use coercion::{CoercionError, CoercionPolicy};
pub use config::{ConfigError, Settings};
pub use orchestrator::{DebateOrchestrator, DebateOrchestratorBuilder, RuntimeError};
pub use providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, OpenAiCompatibleProvider,
    ProviderError, TokenUsage,
};
pub use telemetry::{SpanRecord, SpanStatus, Tracer};
