//! Global Constants
//!
//! Centralized constants for dispatch tuning and defaults.
//! All magic numbers should be defined here with documentation.

/// Retry/backoff constants for the dispatcher
pub mod retry {
    /// Default ceiling on attempts per dispatch
    pub const DEFAULT_MAX_RETRIES: u32 = 40;

    /// Rate-limit backoff grows linearly by this many seconds per prior retry
    pub const RATE_LIMIT_STEP_SECS: u64 = 10;

    /// Fixed wait after a connectivity failure (seconds)
    pub const CONNECTION_DELAY_SECS: u64 = 5;

    /// Fixed wait after an unclassified failure (seconds)
    pub const OTHER_DELAY_SECS: u64 = 1;

    /// Uniform strategy backoff step (seconds per prior retry)
    pub const UNIFORM_STEP_SECS: u64 = 10;
}

/// Batch splitting constants
pub mod batch {
    /// Largest sample count a single provider call may request
    pub const MAX_N_SUPPORTED: u32 = 8;
}

/// Provider endpoint constants
pub mod provider {
    pub const OPENAI_DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
    /// Host-only; the messages path carries the version prefix
    pub const ANTHROPIC_DEFAULT_API_BASE: &str = "https://api.anthropic.com";
    pub const ANTHROPIC_MESSAGES_PATH: &str = "/v1/messages";

    /// Anthropic API version header value
    pub const ANTHROPIC_VERSION: &str = "2023-06-01";

    /// Beta flag enabling prompt caching on the messages endpoint
    pub const ANTHROPIC_PROMPT_CACHING_BETA: &str = "prompt-caching-2024-07-31";

    /// OpenAI HTTP request timeout (seconds)
    pub const OPENAI_TIMEOUT_SECS: u64 = 900;

    /// Anthropic HTTP request timeout (seconds)
    pub const ANTHROPIC_TIMEOUT_SECS: u64 = 600;

    /// Anthropic soft timeout used for logging only (seconds)
    pub const ANTHROPIC_SOFT_TIMEOUT_SECS: u64 = 500;
}

/// Output-token ceilings per request style
pub mod tokens {
    pub const LONG_REASONING_MAX_TOKENS: u32 = 64_000;
    pub const COMPACT_MAX_TOKENS: u32 = 16_000;
    pub const DEFAULT_MAX_TOKENS: u32 = 128_000;
    pub const REASONING_MAX_TOKENS: u32 = 128_000;
    pub const ANTHROPIC_MAX_TOKENS: u32 = 32_000;

    /// Encoding used when the model is unknown to the tokenizer
    pub const FALLBACK_ENCODING: &str = "cl100k_base";
}

/// Error message fragments that mark a request as exceeding the model's window
pub mod classify {
    pub const CONTEXT_LENGTH_PATTERNS: &[&str] = &[
        "max_prompt_tokens",
        "max_total_tokens",
        "maximum context length",
        "input length",
    ];

    /// Structured error code emitted by OpenAI-compatible servers
    pub const CONTEXT_LENGTH_CODE: &str = "context_length_exceeded";
}

/// Structure fan-out constants
pub mod structure {
    /// Upper bound on concurrent extraction jobs
    pub const MAX_WORKERS: usize = 32;

    pub const DEFAULT_OUTPUT_DIR: &str = "repo_structures";
    pub const DEFAULT_WORKDIR: &str = "playground";
    pub const DEFAULT_CLONE_BASE: &str = "https://github.com";
}
