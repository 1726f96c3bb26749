//! Complete Command
//!
//! Build one request, run it through the batch splitter and print the
//! completions.
//!
//! Usage:
//!   llm-dispatch complete --model gpt-4o --samples 20 --prompt "..."
//!   llm-dispatch complete --provider anthropic --model claude-sonnet-4 --prompt-file p.txt --prompt-cache

use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use crate::ai::request::{ChatMessage, Role};
use crate::ai::{
    BatchDispatcher, ChatResponse, Dispatcher, ProviderKind, RequestConfig, RequestOptions,
    collect_completions, count_tokens, total_usage,
};
use crate::cli::Output;
use crate::config::{Config, ConfigLoader};
use crate::types::{DispatchError, Result};

#[derive(Debug, Clone)]
pub struct CompleteOptions {
    pub provider: ProviderKind,
    pub model: String,
    pub reasoning: bool,
    pub samples: u32,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub system: Option<String>,
    pub prompt: Option<String>,
    pub prompt_file: Option<PathBuf>,
    pub prompt_cache: bool,
    pub json: bool,
}

impl CompleteOptions {
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            reasoning: false,
            samples: 1,
            temperature: 1.0,
            max_tokens: None,
            system: None,
            prompt: None,
            prompt_file: None,
            prompt_cache: false,
            json: false,
        }
    }

    /// Prompt text from `--prompt`, else the contents of `--prompt-file`
    pub fn resolve_prompt(&self) -> Result<String> {
        match (&self.prompt, &self.prompt_file) {
            (Some(prompt), _) => Ok(prompt.clone()),
            (None, Some(path)) => Ok(std::fs::read_to_string(path)?),
            (None, None) => Err(DispatchError::Config(
                "Either --prompt or --prompt-file is required".to_string(),
            )),
        }
    }

    pub fn build_request(&self, prompt: String) -> Result<RequestConfig> {
        let mut options = RequestOptions::new(&self.model)
            .temperature(self.temperature)
            .samples(self.samples)
            .prompt_cache(self.prompt_cache);
        if let Some(system) = &self.system {
            options = options.system_message(system);
        }
        if let Some(max_tokens) = self.max_tokens {
            options = options.max_tokens(max_tokens);
        }

        match (self.provider, self.reasoning) {
            (ProviderKind::OpenAi, false) => options.chat(prompt),
            (ProviderKind::OpenAi, true) => options.reasoning(prompt),
            (ProviderKind::Anthropic, false) if self.samples > 1 => {
                Err(DispatchError::Config(format!(
                    "--samples {} is not supported by the anthropic provider (one completion per request)",
                    self.samples
                )))
            }
            (ProviderKind::Anthropic, false) => match &self.system {
                Some(system) => options.anthropic(vec![
                    ChatMessage::new(Role::System, system),
                    ChatMessage::user(prompt),
                ]),
                None => options.anthropic(prompt),
            },
            (ProviderKind::Anthropic, true) => Err(DispatchError::Config(
                "--reasoning is only available for the openai provider".to_string(),
            )),
        }
    }
}

/// Run the request against the configured provider
pub async fn execute(
    options: &CompleteOptions,
    config: &Config,
) -> Result<Vec<Option<ChatResponse>>> {
    let prompt = options.resolve_prompt()?;
    let tokens = count_tokens(&prompt, &options.model)?;
    info!(model = %options.model, tokens, "Prompt token count");

    let request = options.build_request(prompt)?;
    let dispatcher = Dispatcher::from_config(options.provider, config)?;
    let batcher = BatchDispatcher::from_config(dispatcher, config)?;
    batcher.dispatch_batched(&request).await
}

pub async fn run(options: CompleteOptions) -> Result<()> {
    let config = ConfigLoader::load()?;
    let results = execute(&options, &config).await?;
    let completions = collect_completions(&results);
    let empty = results.iter().filter(|r| r.is_none()).count();

    if options.json {
        let output = json!({
            "provider": options.provider.to_string(),
            "model": options.model,
            "completions": completions,
            "empty_batches": empty,
            "usage": total_usage(&results),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let out = Output::new();
    for (index, text) in completions.iter().enumerate() {
        out.section(&format!("Completion {}", index + 1));
        println!("{}", text);
    }

    let usage = total_usage(&results);
    println!();
    out.field("Input", usage.input_tokens);
    out.field("Output", usage.output_tokens);
    if empty > 0 {
        out.warning(&format!(
            "{} of {} batch(es) returned no response",
            empty,
            results.len()
        ));
    }
    if completions.is_empty() {
        out.error("No completions received");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "from file").unwrap();

        let mut options = CompleteOptions::new(ProviderKind::OpenAi, "gpt-4o");
        assert!(options.resolve_prompt().is_err());

        options.prompt_file = Some(path);
        assert_eq!(options.resolve_prompt().unwrap(), "from file");

        options.prompt = Some("inline".to_string());
        assert_eq!(options.resolve_prompt().unwrap(), "inline");
    }

    #[test]
    fn test_build_request_variants() {
        let mut options = CompleteOptions::new(ProviderKind::OpenAi, "gpt-5");
        options.system = Some("Be terse.".to_string());
        options.max_tokens = Some(100);

        let chat = options.build_request("x".to_string()).unwrap();
        assert!(matches!(chat, RequestConfig::Chat(_)));
        let body = chat.to_body().unwrap();
        assert_eq!(body["messages"][0]["content"], "Be terse.");
        assert_eq!(body["max_tokens"], 100);

        options.reasoning = true;
        assert!(matches!(
            options.build_request("x".to_string()).unwrap(),
            RequestConfig::Reasoning(_)
        ));

        options.provider = ProviderKind::Anthropic;
        assert!(options.build_request("x".to_string()).is_err());

        options.reasoning = false;
        options.prompt_cache = true;
        let messages = options.build_request("x".to_string()).unwrap();
        assert!(messages.wants_prompt_cache());
        let body = messages.to_body().unwrap();
        assert_eq!(body["system"], "Be terse.");
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_anthropic_rejects_multiple_samples() {
        let mut options = CompleteOptions::new(ProviderKind::Anthropic, "claude-sonnet-4");
        options.samples = 20;
        let err = options.build_request("x".to_string()).unwrap_err();
        assert!(err.to_string().contains("--samples 20"));

        options.samples = 1;
        assert!(options.build_request("x".to_string()).is_ok());
    }

    #[tokio::test]
    async fn test_execute_splits_against_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(
                json!({
                    "id": "chatcmpl-1",
                    "model": "gpt-4o",
                    "choices": [
                        {"index": 0, "message": {"role": "assistant", "content": "ok"}, "finish_reason": "stop"}
                    ],
                    "usage": {"prompt_tokens": 3, "completion_tokens": 1}
                })
                .to_string(),
            )
            .expect(2)
            .create_async()
            .await;

        let mut config = Config::default();
        config.openai.api_base = Some(server.url());
        config.openai.api_key = Some("test-key".to_string());

        let mut options = CompleteOptions::new(ProviderKind::OpenAi, "gpt-4o");
        options.prompt = Some("hello".to_string());
        options.samples = 10;

        let results = execute(&options, &config).await.unwrap();

        mock.assert_async().await;
        assert_eq!(results.len(), 2);
        assert_eq!(collect_completions(&results), vec!["ok", "ok"]);
    }
}
