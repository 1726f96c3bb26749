//! Anthropic-Compatible Provider
//!
//! Single-shot calls against a Messages endpoint. Sends the prompt-caching
//! beta header whenever the request carries a cache marker.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{ChatProvider, ChatResponse, TokenUsage, parse_error_body};
use crate::ai::request::{ProviderKind, RequestConfig};
use crate::config::AnthropicConfig;
use crate::constants::provider as provider_constants;
use crate::types::{DispatchError, ErrorClassifier, ErrorKind, ProviderError, Result};

const PROVIDER_NAME: &str = "anthropic";

pub struct AnthropicProvider {
    api_key: SecretString,
    api_base: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl AnthropicProvider {
    /// Build a client; config values win over `ANTHROPIC_API_KEY` / `ANTHROPIC_BASE_URL`
    pub fn new(config: &AnthropicConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| {
                DispatchError::Config(
                    "Anthropic API key not found. Set ANTHROPIC_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;

        let api_base = config
            .api_base
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_BASE_URL").ok())
            .unwrap_or_else(|| provider_constants::ANTHROPIC_DEFAULT_API_BASE.to_string());

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
        let body: MessagesResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            ProviderError::new(
                ErrorKind::Other,
                PROVIDER_NAME,
                format!("Failed to parse Anthropic response: {}", e),
            )
        })?;

        let text: Vec<&str> = body
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        let usage = body
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
                cache_read_tokens: u.cache_read_input_tokens.unwrap_or(0),
                cache_write_tokens: u.cache_creation_input_tokens.unwrap_or(0),
            })
            .unwrap_or_default();

        Ok(ChatResponse {
            provider: PROVIDER_NAME.to_string(),
            model: body.model.unwrap_or_default(),
            id: body.id,
            completions: vec![text.join("")],
            stop_reasons: vec![body.stop_reason],
            usage,
            raw,
        })
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    async fn complete(
        &self,
        request: &RequestConfig,
    ) -> std::result::Result<ChatResponse, ProviderError> {
        if !matches!(request, RequestConfig::Messages(_)) {
            return Err(ProviderError::new(
                ErrorKind::BadRequest,
                PROVIDER_NAME,
                "Chat completion request cannot be sent to an Anthropic-compatible endpoint",
            ));
        }

        let body = request
            .to_body()
            .map_err(|e| ProviderError::new(ErrorKind::BadRequest, PROVIDER_NAME, e.to_string()))?;
        let url = format!(
            "{}{}",
            self.api_base,
            provider_constants::ANTHROPIC_MESSAGES_PATH
        );
        let cached = request.has_cache_marker();

        debug!(model = request.model(), cached, "Sending request to Anthropic API");

        let mut builder = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", provider_constants::ANTHROPIC_VERSION);
        if cached {
            builder = builder.header(
                "anthropic-beta",
                provider_constants::ANTHROPIC_PROMPT_CACHING_BETA,
            );
        }

        let response = builder
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
        ProviderKind::Anthropic
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    id: Option<String>,
    model: Option<String>,
    #[serde(default)]
    content: Vec<ResponseBlock>,
    stop_reason: Option<String>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    input_tokens: u32,
    output_tokens: u32,
    cache_creation_input_tokens: Option<u32>,
    cache_read_input_tokens: Option<u32>,
}
