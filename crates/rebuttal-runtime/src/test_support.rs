//! Scripted in-memory provider for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};

/// Replays canned replies in order and records every request.
pub(crate) struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    pub(crate) fn new<const N: usize>(replies: [Result<&str, ProviderError>; N]) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string))
                    .collect(),
            ),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.lock().push(messages);

        let reply = self.replies.lock().pop_front().unwrap_or_else(|| {
            Err(ProviderError::ApiError {
                status: 500,
                message: "script exhausted".to_string(),
            })
        })?;

        Ok(CompletionResponse {
            content: reply,
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
            },
            model: config.model.clone(),
            stop_reason: Some("stop".to_string()),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
