//! Provider replaying canned responses from a script file.
//!
//! The script is JSON: either a bare array of entries or an object with
//! `responses` plus optional `model`, `cost_per_1k_tokens` and `fallback`.
//! An entry is a plain string (a text-only turn) or a full
//! [`ChatResponse`]:
//!
//! ```json
//! {
//!   "model": "replay",
//!   "responses": [
//!     {"content": [{"type": "tool_use", "id": "c1", "name": "read_file",
//!                   "input": {"path": "Cargo.toml"}}]},
//!     "The crate is called demo."
//!   ]
//! }
//! ```
//!
//! Responses are handed out in order to whichever agent asks next.

use async_trait::async_trait;
use conductor_application::{LlmProvider, ProviderError};
use conductor_domain::{ChatResponse, Message};
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Failed to read script {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid script: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptEntry {
    Text(String),
    Response(ChatResponse),
}

impl From<ScriptEntry> for ChatResponse {
    fn from(entry: ScriptEntry) -> Self {
        match entry {
            ScriptEntry::Text(text) => ChatResponse::from_text(text),
            ScriptEntry::Response(response) => response,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptFile {
    Bare(Vec<ScriptEntry>),
    Full {
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        cost_per_1k_tokens: f64,
        #[serde(default)]
        fallback: Option<String>,
        responses: Vec<ScriptEntry>,
    },
}

pub struct ScriptedProvider {
    responses: Mutex<VecDeque<ChatResponse>>,
    model: String,
    cost_per_1k_tokens: f64,
    fallback: Option<String>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            model: "scripted".to_string(),
            cost_per_1k_tokens: 0.0,
            fallback: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        let provider = match serde_json::from_str::<ScriptFile>(json)? {
            ScriptFile::Bare(entries) => Self::new(entries.into_iter().map(Into::into).collect()),
            ScriptFile::Full {
                model,
                cost_per_1k_tokens,
                fallback,
                responses,
            } => {
                let mut provider = Self::new(responses.into_iter().map(Into::into).collect())
                    .with_cost_per_1k_tokens(cost_per_1k_tokens);
                if let Some(model) = model {
                    provider = provider.with_model(model);
                }
                if let Some(fallback) = fallback {
                    provider = provider.with_fallback(fallback);
                }
                provider
            }
        };
        Ok(provider)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_cost_per_1k_tokens(mut self, cost: f64) -> Self {
        self.cost_per_1k_tokens = cost;
        self
    }

    /// Text answered once the script runs out, instead of an error.
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    pub fn remaining(&self) -> usize {
        match self.responses.lock() {
            Ok(queue) => queue.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(&self, messages: &[Message], _tools: &[serde_json::Value]) -> Result<ChatResponse, ProviderError> {
        let next = match self.responses.lock() {
            Ok(mut queue) => queue.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        debug!(messages = messages.len(), remaining = self.remaining(), "Scripted response");
        match (next, &self.fallback) {
            (Some(response), _) => Ok(response),
            (None, Some(text)) => Ok(ChatResponse::from_text(text.clone())),
            (None, None) => Err(ProviderError::Exhausted("script has no more responses".into())),
        }
    }

    fn calculate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens + output_tokens) as f64 / 1000.0 * self.cost_per_1k_tokens
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bare_array_mixes_text_and_tool_use() {
        let provider = ScriptedProvider::from_json(
            r#"[
                {"content": [{"type": "tool_use", "id": "c1", "name": "read_file", "input": {"path": "a.txt"}}],
                 "usage": {"input_tokens": 10, "output_tokens": 2}},
                "All done."
            ]"#,
        )
        .unwrap();

        let first = provider.chat(&[], &[]).await.unwrap();
        let calls = first.tool_calls();
        assert_eq!(calls[0].tool_name, "read_file");
        assert_eq!(calls[0].get_string("path"), Some("a.txt"));
        assert_eq!(first.usage.unwrap().total(), 12);

        let second = provider.chat(&[], &[]).await.unwrap();
        assert_eq!(second.text_content(), "All done.");

        let err = provider.chat(&[], &[]).await.unwrap_err();
        assert!(matches!(err, ProviderError::Exhausted(_)));
    }

    #[tokio::test]
    async fn full_form_sets_model_cost_and_fallback() {
        let provider = ScriptedProvider::from_json(
            r#"{"model": "replay-1", "cost_per_1k_tokens": 2.0, "fallback": "nothing left", "responses": ["hi"]}"#,
        )
        .unwrap();

        assert_eq!(provider.model_name(), "replay-1");
        assert_eq!(provider.calculate_cost(400, 100), 1.0);
        assert_eq!(provider.chat(&[], &[]).await.unwrap().text_content(), "hi");
        assert_eq!(provider.chat(&[], &[]).await.unwrap().text_content(), "nothing left");
        assert_eq!(provider.remaining(), 0);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.json");
        std::fs::write(&path, r#"["one", "two"]"#).unwrap();
        assert_eq!(ScriptedProvider::from_file(&path).unwrap().remaining(), 2);

        let missing = ScriptedProvider::from_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ScriptError::Io { .. })));
    }

    #[test]
    fn rejects_malformed_scripts() {
        assert!(matches!(
            ScriptedProvider::from_json(r#"{"responses": 3}"#),
            Err(ScriptError::Parse(_))
        ));
    }
}
