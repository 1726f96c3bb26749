//! Request Configurations
//!
//! One variant per request style, built through [`RequestOptions`] so the
//! invariants (non-empty model, positive sample count, sane temperature) hold
//! before anything reaches the network.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::tokens as token_constants;
use crate::types::{DispatchError, Result};

pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful assistant.";

// =============================================================================
// Messages
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Developer,
    User,
    Assistant,
}

/// Plain-text chat message (OpenAI wire shape)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Caller input: a bare prompt or an already-structured conversation
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    Text(String),
    Messages(Vec<ChatMessage>),
}

impl From<&str> for Prompt {
    fn from(s: &str) -> Self {
        Prompt::Text(s.to_string())
    }
}

impl From<String> for Prompt {
    fn from(s: String) -> Self {
        Prompt::Text(s)
    }
}

impl From<Vec<ChatMessage>> for Prompt {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Prompt::Messages(messages)
    }
}

/// Ephemeral cache-control marker for Anthropic prompt caching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheControl {
    #[serde(rename = "type")]
    pub cache_type: String,
}

impl CacheControl {
    pub fn ephemeral() -> Self {
        Self {
            cache_type: "ephemeral".to_string(),
        }
    }
}

/// Anthropic content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(flatten)]
    pub body: BlockBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockBody {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: Value,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            body: BlockBody::Text { text: text.into() },
            cache_control: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnthropicMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

/// Tool definition forwarded verbatim to the Anthropic API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
}

// =============================================================================
// Request Variants
// =============================================================================

/// OpenAI-compatible chat completion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub n: NonZeroU32,
}

/// OpenAI-compatible request for reasoning models
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasoningRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_completion_tokens: u32,
    pub temperature: f32,
    pub n: NonZeroU32,
    pub reasoning_effort: String,
    pub verbosity: String,
}

/// Anthropic-compatible messages request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    /// System and developer turns, lifted out of `messages`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<AnthropicMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    /// Whether the dispatcher should mark the leading segment cacheable
    #[serde(skip)]
    pub prompt_cache: bool,
}

/// Which provider family a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            _ => Err(format!(
                "Unknown provider: {}. Valid values: openai, anthropic",
                s
            )),
        }
    }
}

/// A fully-formed provider request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestConfig {
    Chat(ChatRequest),
    Reasoning(ReasoningRequest),
    Messages(MessagesRequest),
}

impl RequestConfig {
    pub fn provider_kind(&self) -> ProviderKind {
        match self {
            RequestConfig::Chat(_) | RequestConfig::Reasoning(_) => ProviderKind::OpenAi,
            RequestConfig::Messages(_) => ProviderKind::Anthropic,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            RequestConfig::Chat(r) => &r.model,
            RequestConfig::Reasoning(r) => &r.model,
            RequestConfig::Messages(r) => &r.model,
        }
    }

    /// Requested number of samples (Anthropic requests always ask for one)
    pub fn sample_count(&self) -> NonZeroU32 {
        match self {
            RequestConfig::Chat(r) => r.n,
            RequestConfig::Reasoning(r) => r.n,
            RequestConfig::Messages(_) => NonZeroU32::MIN,
        }
    }

    /// Clone with a different sample count; a no-op for Anthropic requests
    pub fn with_sample_count(&self, n: NonZeroU32) -> Self {
        let mut next = self.clone();
        match &mut next {
            RequestConfig::Chat(r) => r.n = n,
            RequestConfig::Reasoning(r) => r.n = n,
            RequestConfig::Messages(_) => {}
        }
        next
    }

    pub fn wants_prompt_cache(&self) -> bool {
        matches!(self, RequestConfig::Messages(r) if r.prompt_cache)
    }

    /// Mark the first content block of the first message as cacheable.
    ///
    /// Returns false when there is nothing to mark.
    pub fn apply_prompt_cache(&mut self) -> bool {
        let RequestConfig::Messages(request) = self else {
            return false;
        };
        match request
            .messages
            .first_mut()
            .and_then(|m| m.content.first_mut())
        {
            Some(block) => {
                block.cache_control = Some(CacheControl::ephemeral());
                true
            }
            None => false,
        }
    }

    /// Whether any content block carries a cache marker
    pub fn has_cache_marker(&self) -> bool {
        match self {
            RequestConfig::Messages(r) => r
                .messages
                .iter()
                .flat_map(|m| m.content.iter())
                .any(|b| b.cache_control.is_some()),
            _ => false,
        }
    }

    /// Serialize to the provider's JSON body
    pub fn to_body(&self) -> Result<Value> {
        let body = match self {
            RequestConfig::Chat(r) => serde_json::to_value(r)?,
            RequestConfig::Reasoning(r) => serde_json::to_value(r)?,
            RequestConfig::Messages(r) => serde_json::to_value(r)?,
        };
        Ok(body)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Output-token ceiling for chat-style requests on a given model
pub fn chat_max_tokens(model: &str) -> u32 {
    let lower = model.to_lowercase();
    if lower.contains("deepseek-reasoner") || lower.contains("gemini") {
        token_constants::LONG_REASONING_MAX_TOKENS
    } else if lower.contains("qwen3")
        || lower.contains("deepseek-chat")
        || lower.contains("gpt-5")
    {
        token_constants::COMPACT_MAX_TOKENS
    } else {
        token_constants::DEFAULT_MAX_TOKENS
    }
}

/// Validating builder shared by the three request styles
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub model: String,
    pub temperature: f32,
    pub samples: u32,
    pub system_message: String,
    /// Caller output budget; clamped to the model ceiling, ceiling when unset
    pub max_tokens: Option<u32>,
    pub tools: Vec<ToolDefinition>,
    pub prompt_cache: bool,
}

impl RequestOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 1.0,
            samples: 1,
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            max_tokens: None,
            tools: Vec::new(),
            prompt_cache: false,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    pub fn system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = message.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn prompt_cache(mut self, enabled: bool) -> Self {
        self.prompt_cache = enabled;
        self
    }

    /// OpenAI-compatible chat completion
    pub fn chat(&self, prompt: impl Into<Prompt>) -> Result<RequestConfig> {
        let n = self.validate()?;
        let mut messages = vec![ChatMessage::new(Role::System, &self.system_message)];
        messages.extend(into_chat_messages(prompt.into()));

        Ok(RequestConfig::Chat(ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.budget(chat_max_tokens(&self.model)),
            temperature: self.temperature,
            n,
        }))
    }

    /// OpenAI-compatible reasoning-model request
    pub fn reasoning(&self, prompt: impl Into<Prompt>) -> Result<RequestConfig> {
        let n = self.validate()?;
        let prompt = prompt.into();
        let system_role = match prompt {
            Prompt::Messages(_) => Role::Developer,
            Prompt::Text(_) => Role::System,
        };
        let mut messages = vec![ChatMessage::new(system_role, &self.system_message)];
        messages.extend(into_chat_messages(prompt));

        Ok(RequestConfig::Reasoning(ReasoningRequest {
            model: self.model.clone(),
            messages,
            max_completion_tokens: self.budget(token_constants::REASONING_MAX_TOKENS),
            temperature: 1.0,
            n,
            reasoning_effort: "medium".to_string(),
            verbosity: "medium".to_string(),
        }))
    }

    /// Anthropic-compatible messages request
    pub fn anthropic(&self, prompt: impl Into<Prompt>) -> Result<RequestConfig> {
        self.validate()?;
        let mut system = Vec::new();
        let messages = match prompt.into() {
            Prompt::Text(text) => vec![AnthropicMessage {
                role: Role::User,
                content: vec![ContentBlock::text(text)],
            }],
            Prompt::Messages(messages) => messages
                .into_iter()
                .filter_map(|m| match m.role {
                    Role::System | Role::Developer => {
                        system.push(m.content);
                        None
                    }
                    Role::User | Role::Assistant => Some(AnthropicMessage {
                        role: m.role,
                        content: vec![ContentBlock::text(m.content)],
                    }),
                })
                .collect(),
        };

        Ok(RequestConfig::Messages(MessagesRequest {
            model: self.model.clone(),
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages,
            max_tokens: self.budget(token_constants::ANTHROPIC_MAX_TOKENS),
            temperature: self.temperature,
            tools: self.tools.clone(),
            prompt_cache: self.prompt_cache,
        }))
    }

    fn budget(&self, ceiling: u32) -> u32 {
        self.max_tokens.map_or(ceiling, |t| t.min(ceiling))
    }

    fn validate(&self) -> Result<NonZeroU32> {
        if self.model.trim().is_empty() {
            return Err(DispatchError::Config("Model must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(DispatchError::Config(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        NonZeroU32::new(self.samples).ok_or_else(|| {
            DispatchError::Config("Sample count must be at least 1".to_string())
        })
    }
}

fn into_chat_messages(prompt: Prompt) -> Vec<ChatMessage> {
    match prompt {
        Prompt::Text(text) => vec![ChatMessage::user(text)],
        Prompt::Messages(messages) => messages,
    }
}
