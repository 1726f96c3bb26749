//! llm-dispatch - Retrying, Batch-Splitting LLM Client
//!
//! A thin client layer over OpenAI-compatible and Anthropic-compatible chat
//! APIs. Failed calls are classified and retried according to a provider
//! policy; requests for more samples than a provider accepts per call are
//! split into sequential sub-batches.
//!
//! ## Quick Start
//!
//! ```ignore
//! use llm_dispatch::{BatchDispatcher, Config, Dispatcher, ProviderKind, RequestOptions};
//!
//! let config = Config::default();
//! let request = RequestOptions::new("gpt-4o").samples(20).chat("Fix the failing test")?;
//! let dispatcher = Dispatcher::from_config(ProviderKind::OpenAi, &config)?;
//! let results = BatchDispatcher::from_config(dispatcher, &config)?
//!     .dispatch_batched(&request)
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: request builders, provider clients, retry policy, batch splitting
//! - [`structure`]: concurrent repository-structure extraction
//! - [`config`]: layered configuration
//! - [`types`]: error types and classification

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod structure;
pub mod types;

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::{DispatchError, ErrorKind, ProviderError, Result};

// Dispatch
pub use ai::{
    BatchDispatcher, BatchPlan, ChatResponse, Dispatcher, ProviderKind, RequestConfig,
    RequestOptions, RetryPolicy,
};

// Structure fan-out
pub use structure::{Job, RunSummary, StructureRunner};
