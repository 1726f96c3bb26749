//! LLM Provider Abstraction
//!
//! Defines the ChatProvider trait: one network call, one classified outcome.
//! Providers never retry; recovery policy lives in the dispatcher.

mod anthropic;
mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::request::{ProviderKind, RequestConfig};
use crate::config::Config;
use crate::types::{ProviderError, Result};

// =============================================================================
// Chat Response with Usage Metrics
// =============================================================================

/// Completion returned by a provider
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Provider name
    pub provider: String,
    /// Model reported by the provider
    pub model: String,
    /// Provider-assigned response id
    pub id: Option<String>,
    /// One entry per returned choice (OpenAI) or the joined text blocks (Anthropic)
    pub completions: Vec<String>,
    /// Stop/finish reason per completion, when reported
    pub stop_reasons: Vec<Option<String>>,
    /// Token usage metrics
    pub usage: TokenUsage,
    /// Unmodified response body
    pub raw: Value,
}

/// Token usage metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens (prompt)
    pub input_tokens: u32,
    /// Output tokens (response)
    pub output_tokens: u32,
    /// Cache read tokens (if applicable)
    pub cache_read_tokens: u32,
    /// Cache write tokens (if applicable)
    pub cache_write_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// Create from OpenAI-style usage response
    pub fn from_openai(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            input_tokens: prompt_tokens,
            output_tokens: completion_tokens,
            cache_read_tokens: 0,
            cache_write_tokens: 0,
        }
    }

    /// Sum usage across several responses (split batches)
    pub fn sum<'a>(usages: impl IntoIterator<Item = &'a TokenUsage>) -> Self {
        usages.into_iter().fold(Self::default(), |acc, u| Self {
            input_tokens: acc.input_tokens + u.input_tokens,
            output_tokens: acc.output_tokens + u.output_tokens,
            cache_read_tokens: acc.cache_read_tokens + u.cache_read_tokens,
            cache_write_tokens: acc.cache_write_tokens + u.cache_write_tokens,
        })
    }
}

/// Shared provider type for concurrent access across requests.
pub type SharedProvider = Arc<dyn ChatProvider>;

// =============================================================================
// Provider Trait
// =============================================================================

/// A single-shot chat completion backend
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Perform exactly one provider call
    async fn complete(
        &self,
        request: &RequestConfig,
    ) -> std::result::Result<ChatResponse, ProviderError>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Request family this provider accepts
    fn kind(&self) -> ProviderKind;
}

/// Pull `(code, message)` out of an error body.
///
/// Both provider families nest details under `error`; OpenAI-compatible
/// servers put the machine-readable tag in `code`, Anthropic in `type`.
/// Unparseable bodies are returned whole as the message.
pub(super) fn parse_error_body(body: &str) -> (Option<String>, String) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return (None, body.to_string());
    };
    let error = value.get("error").unwrap_or(&value);

    let code = error
        .get("code")
        .and_then(Value::as_str)
        .or_else(|| error.get("type").and_then(Value::as_str))
        .map(str::to_string);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string());

    (code, message)
}

/// Create a shared provider client for a provider family
pub fn create_provider(kind: ProviderKind, config: &Config) -> Result<SharedProvider> {
    match kind {
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::new(&config.openai)?)),
        ProviderKind::Anthropic => Ok(Arc::new(AnthropicProvider::new(&config.anthropic)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_from_openai() {
        let usage = TokenUsage::from_openai(100, 50);
        assert_eq!(usage.input_tokens, 100);
        assert_eq!(usage.output_tokens, 50);
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_parse_error_body_openai() {
        let body = r#"{"error":{"message":"This model's maximum context length is 8192 tokens","type":"invalid_request_error","code":"context_length_exceeded"}}"#;
        let (code, message) = parse_error_body(body);
        assert_eq!(code.as_deref(), Some("context_length_exceeded"));
        assert!(message.starts_with("This model's maximum context length"));
    }

    #[test]
    fn test_parse_error_body_anthropic() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let (code, message) = parse_error_body(body);
        assert_eq!(code.as_deref(), Some("overloaded_error"));
        assert_eq!(message, "Overloaded");
    }

    #[test]
    fn test_parse_error_body_plain_text() {
        let (code, message) = parse_error_body("upstream exploded");
        assert!(code.is_none());
        assert_eq!(message, "upstream exploded");
    }

    #[test]
    fn test_token_usage_sum() {
        let parts = [
            TokenUsage::from_openai(10, 5),
            TokenUsage {
                input_tokens: 1,
                output_tokens: 2,
                cache_read_tokens: 3,
                cache_write_tokens: 4,
            },
        ];
        let total = TokenUsage::sum(parts.iter());
        assert_eq!(total.input_tokens, 11);
        assert_eq!(total.output_tokens, 7);
        assert_eq!(total.cache_read_tokens, 3);
        assert_eq!(total.cache_write_tokens, 4);
    }
}
