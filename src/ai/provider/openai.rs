//! OpenAI-Compatible Provider
//!
//! Single-shot calls against a Chat Completions endpoint. Every failure is
//! returned as a classified [`ProviderError`]; retries belong to the dispatcher.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{ChatProvider, ChatResponse, TokenUsage, parse_error_body};
use crate::ai::request::{ProviderKind, RequestConfig};
use crate::config::OpenAiConfig;
use crate::constants::provider as provider_constants;
use crate::types::{DispatchError, ErrorClassifier, ErrorKind, ProviderError, Result};

const PROVIDER_NAME: &str = "openai";

/// OpenAI-compatible provider with secure API key handling
pub struct OpenAiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl OpenAiProvider {
    /// Build a client; config values win over `OPENAI_API_KEY` / `OPENAI_API_BASE`
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                DispatchError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;

        let api_base = config
            .api_base
            .clone()
            .or_else(|| std::env::var("OPENAI_API_BASE").ok())
            .unwrap_or_else(|| provider_constants::OPENAI_DEFAULT_API_BASE.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DispatchError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn parse_response(raw: Value) -> std::result::Result<ChatResponse, ProviderError> {
        let body: ChatCompletionResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            ProviderError::new(
                ErrorKind::Other,
                PROVIDER_NAME,
                format!("Failed to parse OpenAI response: {}", e),
            )
        })?;

        let usage = body
            .usage
            .map(|u| TokenUsage::from_openai(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let (completions, stop_reasons) = body
            .choices
            .into_iter()
            .map(|c| (c.message.content.unwrap_or_default(), c.finish_reason))
            .unzip();

        Ok(ChatResponse {
            provider: PROVIDER_NAME.to_string(),
            model: body.model.unwrap_or_default(),
            id: body.id,
            completions,
            stop_reasons,
            usage,
            raw,
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn complete(
        &self,
        request: &RequestConfig,
    ) -> std::result::Result<ChatResponse, ProviderError> {
        if matches!(request, RequestConfig::Messages(_)) {
            return Err(ProviderError::new(
                ErrorKind::BadRequest,
                PROVIDER_NAME,
                "Anthropic messages request cannot be sent to an OpenAI-compatible endpoint",
            ));
        }

        let body = request
            .to_body()
            .map_err(|e| ProviderError::new(ErrorKind::BadRequest, PROVIDER_NAME, e.to_string()))?;
        let url = format!("{}/chat/completions", self.api_base);

        debug!(model = request.model(), n = request.sample_count().get(), "Sending request to OpenAI API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, PROVIDER_NAME))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let (code, message) = parse_error_body(&text);
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                code.as_deref(),
                &message,
                PROVIDER_NAME,
            ));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, PROVIDER_NAME))?;

        Self::parse_response(raw)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }
}

// Response types

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    id: Option<String>,
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::request::RequestOptions;
    use serde_json::json;
    use std::io::Write;

    fn provider_for(api_base: &str) -> OpenAiProvider {
        OpenAiProvider::new(&OpenAiConfig {
            api_base: Some(api_base.to_string()),
            api_key: Some("test-key".to_string()),
            timeout_secs: 5,
            ..OpenAiConfig::default()
        })
        .unwrap()
    }

    fn request() -> RequestConfig {
        RequestOptions::new("gpt-4o").samples(2).chat("hello").unwrap()
    }

    #[tokio::test]
    async fn test_success_parses_choices() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(mockito::Matcher::PartialJson(json!({"model": "gpt-4o", "n": 2})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": "chatcmpl-1",
                    "model": "gpt-4o-2024-08-06",
                    "choices": [
                        {"index": 0, "message": {"role": "assistant", "content": "a"}, "finish_reason": "stop"},
                        {"index": 1, "message": {"role": "assistant", "content": "b"}, "finish_reason": "length"}
                    ],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let response = provider_for(&server.url()).complete(&request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.completions, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(response.stop_reasons[1].as_deref(), Some("length"));
        assert_eq!(response.usage.total(), 15);
        assert_eq!(response.id.as_deref(), Some("chatcmpl-1"));
        assert_eq!(response.model, "gpt-4o-2024-08-06");
    }

    async fn error_kind_for(status: usize, body: &str) -> ErrorKind {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(status)
            .with_body(body)
            .create_async()
            .await;
        provider_for(&server.url())
            .complete(&request())
            .await
            .unwrap_err()
            .kind
    }

    #[tokio::test]
    async fn test_status_mapping() {
        assert_eq!(
            error_kind_for(429, r#"{"error":{"message":"Rate limit reached","code":"rate_limit_exceeded"}}"#).await,
            ErrorKind::RateLimit
        );
        assert_eq!(
            error_kind_for(409, r#"{"error":{"message":"payload too long"}}"#).await,
            ErrorKind::Conflict
        );
        assert_eq!(
            error_kind_for(400, r#"{"error":{"message":"Invalid 'messages': empty array","code":null}}"#).await,
            ErrorKind::BadRequest
        );
        assert_eq!(
            error_kind_for(400, r#"{"error":{"message":"Input length 200001 exceeds limit","code":null}}"#).await,
            ErrorKind::ContextLength
        );
        assert_eq!(
            error_kind_for(400, r#"{"error":{"message":"too big","code":"context_length_exceeded"}}"#).await,
            ErrorKind::ContextLength
        );
        assert_eq!(error_kind_for(502, "bad gateway").await, ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connection_error() {
        let err = provider_for("http://127.0.0.1:1")
            .complete(&request())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Connection);
    }

    #[tokio::test]
    async fn test_rejects_anthropic_request() {
        let request = RequestOptions::new("claude").anthropic("hi").unwrap();
        let err = provider_for("http://127.0.0.1:1")
            .complete(&request)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_other() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"unexpected": true}"#)
            .create_async()
            .await;
        let err = provider_for(&server.url())
            .complete(&request())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_other() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;
        let err = provider_for(&server.url())
            .complete(&request())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_stalled_body_is_connection_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_chunked_body(|w| {
                w.write_all(b"{\"id\":")?;
                w.flush()?;
                std::thread::sleep(Duration::from_secs(3));
                w.write_all(b"null}")
            })
            .create_async()
            .await;

        let provider = OpenAiProvider::new(&OpenAiConfig {
            api_base: Some(server.url()),
            api_key: Some("test-key".to_string()),
            timeout_secs: 1,
            ..OpenAiConfig::default()
        })
        .unwrap();
        let err = provider.complete(&request()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Connection);
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = provider_for("http://localhost:9");
        let debug = format!("{:?}", provider);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("test-key"));
    }
}
