//! LLM provider port
//!
//! Defines the interface the agent loop and the task decomposer use to talk to
//! a language model. Vendor clients live outside this crate.

use async_trait::async_trait;
use conductor_domain::{ChatResponse, Message};
use thiserror::Error;

/// Errors that can occur while talking to a provider
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Provider exhausted: {0}")]
    Exhausted(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// A chat-completion backend with native tool use.
///
/// `tools` are provider-neutral JSON Schema objects as produced by
/// [`ToolRegistry::schemas`](crate::services::tool_registry::ToolRegistry::schemas).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send the full conversation and return the model's next turn.
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<ChatResponse, ProviderError>;

    /// Token estimate used when a response carries no usage.
    fn count_tokens(&self, text: &str) -> u64 {
        // Roughly four characters per token for English text and code.
        (text.chars().count() as u64).div_ceil(4)
    }

    /// Cost of one call in the provider's currency units.
    fn calculate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64;

    fn model_name(&self) -> &str;

    fn provider_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl LlmProvider for Fixed {
        async fn chat(
            &self,
            _messages: &[Message],
            _tools: &[serde_json::Value],
        ) -> Result<ChatResponse, ProviderError> {
            Ok(ChatResponse::from_text("ok"))
        }

        fn calculate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
            (input_tokens + output_tokens) as f64 * 0.001
        }

        fn model_name(&self) -> &str {
            "fixed"
        }

        fn provider_name(&self) -> &str {
            "test"
        }
    }

    #[test]
    fn default_token_estimate_rounds_up() {
        assert_eq!(Fixed.count_tokens(""), 0);
        assert_eq!(Fixed.count_tokens("abc"), 1);
        assert_eq!(Fixed.count_tokens("abcdefgh"), 2);
        assert_eq!(Fixed.count_tokens("abcdefghi"), 3);
    }

    #[test]
    fn error_messages() {
        assert_eq!(ProviderError::Timeout.to_string(), "Timeout");
        assert_eq!(
            ProviderError::RateLimited("slow down".into()).to_string(),
            "Rate limited: slow down"
        );
    }
}
