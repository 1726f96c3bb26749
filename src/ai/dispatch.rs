//! Request Dispatcher
//!
//! Performs one logical request: calls the provider, classifies failures and
//! follows the [`RetryPolicy`] until a response arrives, the policy gives up
//! (`Ok(None)`), or the request is rejected as invalid.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::provider::{ChatResponse, SharedProvider, create_provider};
use super::request::{ProviderKind, RequestConfig};
use super::retry::{Clock, RetryDecision, RetryPolicy, RetryState, RetryStrategy, TokioClock};
use crate::config::Config;
use crate::types::{DispatchError, ErrorKind, ProviderError, Result};

pub struct Dispatcher {
    provider: SharedProvider,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(provider: SharedProvider, policy: RetryPolicy) -> Self {
        Self {
            provider,
            policy,
            clock: Arc::new(TokioClock),
        }
    }

    /// Provider client and retry policy for a provider family
    pub fn from_config(kind: ProviderKind, config: &Config) -> Result<Self> {
        let provider = create_provider(kind, config)?;
        Ok(Self::new(provider, RetryPolicy::for_provider(kind, config)))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run one logical request to completion.
    ///
    /// The caller's request is never modified; a prompt-cache marker is
    /// applied to a private copy before the first attempt.
    pub async fn dispatch(&self, request: &RequestConfig) -> Result<Option<ChatResponse>> {
        let provider = self.provider.name();
        if request.provider_kind() != self.provider.kind() {
            let err = ProviderError::new(
                ErrorKind::BadRequest,
                provider,
                format!(
                    "{} request cannot be sent to a {} provider",
                    request.provider_kind(),
                    self.provider.kind()
                ),
            );
            error!(provider, error = %err, "Invalid API request");
            return Err(DispatchError::InvalidRequest(err));
        }

        let request = self.prepare(request);
        let mut state = RetryState::new(&self.policy, self.clock.now());

        while !state.exhausted() {
            info!(
                provider,
                model = request.model(),
                attempt = state.retries + 1,
                "Creating API request"
            );

            let err = match self.provider.complete(&request).await {
                Ok(response) => {
                    debug!(
                        provider,
                        retries = state.retries,
                        input_tokens = response.usage.input_tokens,
                        output_tokens = response.usage.output_tokens,
                        "Request succeeded"
                    );
                    return Ok(Some(response));
                }
                Err(err) => err,
            };

            match self.policy.decide(&err, state.retries) {
                RetryDecision::Retry(delay) => {
                    if self.policy.strategy == RetryStrategy::Uniform {
                        if state.timed_out(self.clock.now()) {
                            warn!(
                                provider,
                                retries = state.retries,
                                elapsed_secs = state.elapsed(self.clock.now()).as_secs(),
                                error = %err,
                                "Request timed out, retrying"
                            );
                        } else {
                            warn!(
                                provider,
                                retries = state.retries,
                                delay_secs = delay.as_secs(),
                                error = %err,
                                "Retrying after unknown error"
                            );
                        }
                    } else {
                        warn!(
                            provider,
                            retries = state.retries,
                            kind = %err.kind,
                            delay_secs = delay.as_secs(),
                            error = %err.message,
                            "Retrying after provider error"
                        );
                    }
                    self.clock.sleep(delay).await;
                    state.record_retry();
                }
                RetryDecision::GiveUp => {
                    info!(
                        provider,
                        kind = %err.kind,
                        error = %err.message,
                        "Request cannot succeed, returning empty result"
                    );
                    return Ok(None);
                }
                RetryDecision::Fail => {
                    error!(provider, error = %err, "Invalid API request");
                    return Err(DispatchError::InvalidRequest(err));
                }
            }
        }

        warn!(
            provider,
            max_retries = state.max_retries,
            "Retries exhausted, returning empty result"
        );
        Ok(None)
    }

    fn prepare<'a>(&self, request: &'a RequestConfig) -> Cow<'a, RequestConfig> {
        if !request.wants_prompt_cache() {
            return Cow::Borrowed(request);
        }
        let mut cached = request.clone();
        if !cached.apply_prompt_cache() {
            debug!("Prompt cache requested but request has no content to mark");
        }
        Cow::Owned(cached)
    }
}
