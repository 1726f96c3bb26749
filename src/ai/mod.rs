//! LLM Dispatch Layer
//!
//! Request building, provider clients, retry policy and batch splitting.

pub mod batch;
pub mod dispatch;
pub mod provider;
pub mod request;
pub mod retry;
pub mod tokenizer;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{BatchDispatcher, BatchPlan, collect_completions, total_usage};
pub use dispatch::Dispatcher;
pub use provider::{
    AnthropicProvider, ChatProvider, ChatResponse, OpenAiProvider, SharedProvider, TokenUsage,
    create_provider,
};
pub use request::{
    AnthropicMessage, BlockBody, CacheControl, ChatMessage, ContentBlock, Prompt, ProviderKind,
    RequestConfig, RequestOptions, Role, ToolDefinition,
};
pub use retry::{Clock, RetryDecision, RetryPolicy, RetryState, RetryStrategy, TokioClock};
pub use tokenizer::{count_prompt_tokens, count_tokens};
