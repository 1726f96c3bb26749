//! Test doubles for the dispatch layer.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;

use super::provider::{ChatProvider, ChatResponse, TokenUsage};
use super::request::{ProviderKind, RequestConfig};
use super::retry::Clock;
use crate::types::{ErrorKind, ProviderError};

type Scripted = Result<ChatResponse, ProviderError>;

/// Provider that replays a fixed script of outcomes and records every request
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Option<ErrorKind>,
    kind: ProviderKind,
    requests: Mutex<Vec<RequestConfig>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            kind: ProviderKind::OpenAi,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Accept requests of another family (OpenAI by default)
    pub fn with_kind(mut self, kind: ProviderKind) -> Self {
        self.kind = kind;
        self
    }

    /// Fails with `kind` on every call
    pub fn always(kind: ErrorKind) -> Self {
        Self {
            fallback: Some(kind),
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RequestConfig> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn complete(&self, request: &RequestConfig) -> Result<ChatResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.script.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => Err(failure(self.fallback.unwrap_or(ErrorKind::Other))),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }
}

pub fn success(text: &str) -> Scripted {
    Ok(ChatResponse {
        provider: "scripted".to_string(),
        model: "test-model".to_string(),
        id: Some("resp-1".to_string()),
        completions: vec![text.to_string()],
        stop_reasons: vec![Some("stop".to_string())],
        usage: TokenUsage::from_openai(10, 2),
        raw: json!({}),
    })
}

pub fn failure(kind: ErrorKind) -> ProviderError {
    ProviderError::new(kind, "scripted", format!("scripted {}", kind))
}

/// Clock whose time only moves when something sleeps on it
pub struct FakeClock {
    start: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        *self.offset.lock().unwrap() += duration;
    }
}
