//! Batch Splitter
//!
//! Providers cap how many samples one call may request. Larger requests are
//! split into sub-batches that are dispatched one after another.

use std::num::NonZeroU32;

use tracing::{debug, info};

use super::dispatch::Dispatcher;
use super::provider::{ChatResponse, TokenUsage};
use super::request::RequestConfig;
use crate::config::Config;
use crate::types::{DispatchError, Result};

/// Sub-batch sizes for `n` samples under a per-call ceiling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    sizes: Vec<NonZeroU32>,
}

impl BatchPlan {
    pub fn new(n: NonZeroU32, ceiling: NonZeroU32) -> Self {
        let mut sizes = Vec::with_capacity(n.get().div_ceil(ceiling.get()) as usize);
        let mut remaining = n.get();
        while let Some(left) = NonZeroU32::new(remaining) {
            let size = left.min(ceiling);
            sizes.push(size);
            remaining -= size.get();
        }
        Self { sizes }
    }

    pub fn sizes(&self) -> &[NonZeroU32] {
        &self.sizes
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn needs_split(&self) -> bool {
        self.sizes.len() > 1
    }
}

pub struct BatchDispatcher {
    dispatcher: Dispatcher,
    max_n_supported: NonZeroU32,
}

impl BatchDispatcher {
    pub fn new(dispatcher: Dispatcher, max_n_supported: NonZeroU32) -> Self {
        Self {
            dispatcher,
            max_n_supported,
        }
    }

    pub fn from_config(dispatcher: Dispatcher, config: &Config) -> Result<Self> {
        let ceiling = NonZeroU32::new(config.dispatch.max_n_supported).ok_or_else(|| {
            DispatchError::Config("dispatch.max_n_supported must be at least 1".to_string())
        })?;
        Ok(Self::new(dispatcher, ceiling))
    }

    /// Dispatch a request, splitting it when it asks for more samples than one
    /// call supports.
    ///
    /// Results are in submission order. Empty results do not stop later
    /// sub-batches; an invalid-request error aborts the rest.
    pub async fn dispatch_batched(
        &self,
        request: &RequestConfig,
    ) -> Result<Vec<Option<ChatResponse>>> {
        let n = request.sample_count();
        let plan = BatchPlan::new(n, self.max_n_supported);

        if !plan.needs_split() {
            return Ok(vec![self.dispatcher.dispatch(request).await?]);
        }

        info!(
            n = n.get(),
            max_n_supported = self.max_n_supported.get(),
            batches = plan.len(),
            "Splitting request into sub-batches"
        );

        let mut results = Vec::with_capacity(plan.len());
        for (index, size) in plan.sizes().iter().enumerate() {
            debug!(batch = index + 1, n = size.get(), "Dispatching sub-batch");
            let sub_request = request.with_sample_count(*size);
            results.push(self.dispatcher.dispatch(&sub_request).await?);
        }
        Ok(results)
    }
}

/// All completions across batch results, in order
pub fn collect_completions(results: &[Option<ChatResponse>]) -> Vec<String> {
    results
        .iter()
        .flatten()
        .flat_map(|response| response.completions.iter().cloned())
        .collect()
}

/// Summed token usage across batch results
pub fn total_usage(results: &[Option<ChatResponse>]) -> TokenUsage {
    TokenUsage::sum(results.iter().flatten().map(|response| &response.usage))
}
