//! Shared utilities for use cases.
//!
//! Cancellable provider calls and usage accounting used by both the agent
//! loop and the task decomposer.

use crate::ports::llm_provider::{LlmProvider, ProviderError};
use conductor_domain::{ChatResponse, Message, TokenUsage};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Outcome of a provider call raced against cancellation and a deadline.
pub(crate) enum ChatOutcome {
    Response(ChatResponse),
    Cancelled,
    DeadlineExceeded,
}

/// Send `messages` to the provider unless `token` fires or `deadline`
/// elapses first.
pub(crate) async fn chat_cancellable(
    provider: &dyn LlmProvider,
    messages: &[Message],
    tools: &[serde_json::Value],
    token: Option<&CancellationToken>,
    deadline: Option<Duration>,
) -> Result<ChatOutcome, ProviderError> {
    if token.is_some_and(|t| t.is_cancelled()) {
        return Ok(ChatOutcome::Cancelled);
    }
    let call = async {
        match deadline {
            Some(limit) => match tokio::time::timeout(limit, provider.chat(messages, tools)).await {
                Ok(response) => response.map(ChatOutcome::Response),
                Err(_) => Ok(ChatOutcome::DeadlineExceeded),
            },
            None => provider.chat(messages, tools).await.map(ChatOutcome::Response),
        }
    };
    match token {
        Some(token) => {
            tokio::select! {
                _ = token.cancelled() => Ok(ChatOutcome::Cancelled),
                outcome = call => outcome,
            }
        }
        None => call.await,
    }
}

/// Usage reported by the response, or estimated with the provider's token
/// counter when the response carries none.
pub(crate) fn usage_for(provider: &dyn LlmProvider, messages: &[Message], response: &ChatResponse) -> TokenUsage {
    if let Some(usage) = response.usage {
        return usage;
    }
    let input = messages
        .iter()
        .map(|m| provider.count_tokens(&m.content))
        .sum();
    let mut output = provider.count_tokens(&response.text_content());
    for call in response.tool_calls() {
        output += provider.count_tokens(&call.tool_name);
        output += provider.count_tokens(&call.arguments_json());
    }
    TokenUsage::new(input, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    #[test]
    fn reported_usage_wins() {
        let provider = ScriptedProvider::new(vec![]);
        let response = ChatResponse::from_text("hi").with_usage(7, 3);
        assert_eq!(usage_for(&provider, &[], &response), TokenUsage::new(7, 3));
    }

    #[test]
    fn missing_usage_is_estimated() {
        let provider = ScriptedProvider::new(vec![]);
        let messages = vec![Message::user("abcdefgh")];
        let response = ChatResponse::from_text("abcd");
        assert_eq!(usage_for(&provider, &messages, &response), TokenUsage::new(2, 1));
    }

    #[tokio::test]
    async fn cancelled_token_skips_the_call() {
        let provider = ScriptedProvider::new(vec![]);
        let token = CancellationToken::new();
        token.cancel();
        let outcome = chat_cancellable(&provider, &[], &[], Some(&token), None).await.unwrap();
        assert!(matches!(outcome, ChatOutcome::Cancelled));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_slow_call() {
        let provider = ScriptedProvider::new(vec![]).with_delay(Duration::from_secs(30));
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });
        let outcome = chat_cancellable(&provider, &[], &[], Some(&token), None).await.unwrap();
        assert!(matches!(outcome, ChatOutcome::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_bounds_a_slow_call() {
        let provider = ScriptedProvider::new(vec![]).with_delay(Duration::from_secs(3600));
        let started = tokio::time::Instant::now();
        let outcome = chat_cancellable(&provider, &[], &[], None, Some(Duration::from_millis(100)))
            .await
            .unwrap();
        assert!(matches!(outcome, ChatOutcome::DeadlineExceeded));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
