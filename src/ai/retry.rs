//! Retry Policy
//!
//! Decides, per failed attempt, whether the dispatcher waits and tries again,
//! gives up with an empty result, or raises to the caller.
//!
//! ## Strategies
//!
//! - **Classified** (OpenAI-compatible): switches on the error's disposition,
//!   backoff depends on the error kind
//! - **Uniform** (Anthropic-compatible): every error is retried with a linearly
//!   growing backoff; the soft timeout only changes the log line

use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::request::ProviderKind;
use crate::config::Config;
use crate::constants::retry as retry_constants;
use crate::types::{Disposition, ProviderError};

// =============================================================================
// Clock
// =============================================================================

/// Time source for the retry loop
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

// =============================================================================
// Policy
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    Classified,
    Uniform,
}

/// Outcome of a single failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then attempt again
    Retry(Duration),
    /// Stop and return an empty result
    GiveUp,
    /// Stop and surface the error
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub strategy: RetryStrategy,
    /// Soft budget measured from the first attempt; logged, never enforced
    pub timeout: Option<Duration>,
}

impl RetryPolicy {
    pub fn classified(max_retries: u32) -> Self {
        Self {
            max_retries,
            strategy: RetryStrategy::Classified,
            timeout: None,
        }
    }

    pub fn uniform(max_retries: u32, timeout: Duration) -> Self {
        Self {
            max_retries,
            strategy: RetryStrategy::Uniform,
            timeout: Some(timeout),
        }
    }

    /// Policy matching a provider family's configured limits
    pub fn for_provider(kind: ProviderKind, config: &Config) -> Self {
        match kind {
            ProviderKind::OpenAi => Self::classified(config.openai.max_retries),
            ProviderKind::Anthropic => Self::uniform(
                config.anthropic.max_retries,
                Duration::from_secs(config.anthropic.soft_timeout_secs),
            ),
        }
    }

    /// Decide what to do after a failure, given the retries already taken
    pub fn decide(&self, err: &ProviderError, retries: u32) -> RetryDecision {
        match self.strategy {
            RetryStrategy::Uniform => RetryDecision::Retry(Duration::from_secs(
                retry_constants::UNIFORM_STEP_SECS * u64::from(retries),
            )),
            RetryStrategy::Classified => match err.disposition() {
                Disposition::Retry => RetryDecision::Retry(err.kind.backoff(retries)),
                Disposition::TerminalEmpty => RetryDecision::GiveUp,
                Disposition::Fatal => RetryDecision::Fail,
            },
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::classified(retry_constants::DEFAULT_MAX_RETRIES)
    }
}

// =============================================================================
// Per-dispatch state
// =============================================================================

/// Retry bookkeeping owned by one dispatch call
#[derive(Debug, Clone)]
pub struct RetryState {
    pub retries: u32,
    pub max_retries: u32,
    pub start_time: Instant,
    pub timeout: Option<Duration>,
}

impl RetryState {
    pub fn new(policy: &RetryPolicy, start_time: Instant) -> Self {
        Self {
            retries: 0,
            max_retries: policy.max_retries,
            start_time,
            timeout: policy.timeout,
        }
    }

    pub fn exhausted(&self) -> bool {
        self.retries >= self.max_retries
    }

    pub fn record_retry(&mut self) {
        self.retries += 1;
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start_time)
    }

    pub fn timed_out(&self, now: Instant) -> bool {
        self.timeout
            .is_some_and(|timeout| self.elapsed(now) >= timeout)
    }
}
