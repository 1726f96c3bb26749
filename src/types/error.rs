//! Unified Error Type System
//!
//! Centralized error types for the entire crate.
//! Provides provider-error classification for the dispatcher's retry decisions.
//!
//! ## Error Kinds
//!
//! - **RateLimit**: API rate limiting (wait, linearly growing)
//! - **Connection**: Connectivity issues (fixed wait)
//! - **ContextLength**: Prompt exceeds the model window (give up, empty result)
//! - **Conflict**: Payload rejected as too long (give up, empty result)
//! - **BadRequest**: Malformed request (fatal, surfaced to caller)
//! - **Other**: Anything unclassified (short fixed wait)

use std::time::Duration;
use thiserror::Error;

use crate::constants::{classify as classify_constants, retry as retry_constants};

// =============================================================================
// Error Kinds
// =============================================================================

/// Provider failure kinds the dispatcher switches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rate limited - wait then retry
    RateLimit,
    /// Network/connectivity issues, including transport timeouts
    Connection,
    /// Context/token limit exceeded - retrying cannot help
    ContextLength,
    /// Resource conflict (HTTP 409, payload too long)
    Conflict,
    /// Invalid request - don't retry, raise to caller
    BadRequest,
    /// Unknown error - conservative retry
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Connection => write!(f, "CONNECTION"),
            Self::ContextLength => write!(f, "CONTEXT_LENGTH"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

/// What the dispatcher does with a failure of a given kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Transient: back off and try again
    Retry,
    /// Stop retrying and hand back an empty result
    TerminalEmpty,
    /// Stop retrying and raise to the caller
    Fatal,
}

impl ErrorKind {
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::RateLimit | Self::Connection | Self::Other => Disposition::Retry,
            Self::ContextLength | Self::Conflict => Disposition::TerminalEmpty,
            Self::BadRequest => Disposition::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.disposition() == Disposition::Retry
    }

    /// Backoff before the next attempt, given how many retries came before
    pub fn backoff(&self, retries: u32) -> Duration {
        match self {
            Self::RateLimit => {
                Duration::from_secs(retry_constants::RATE_LIMIT_STEP_SECS * u64::from(retries))
            }
            Self::Connection => Duration::from_secs(retry_constants::CONNECTION_DELAY_SECS),
            Self::Other => Duration::from_secs(retry_constants::OTHER_DELAY_SECS),
            Self::ContextLength | Self::Conflict | Self::BadRequest => Duration::ZERO,
        }
    }
}

// =============================================================================
// Provider Error
// =============================================================================

/// A single failed provider call, already classified
#[derive(Debug, Clone)]
pub struct ProviderError {
    /// Classification used for retry decisions
    pub kind: ErrorKind,
    /// Provider that produced the error
    pub provider: String,
    /// HTTP status, if the failure came from a response
    pub status: Option<u16>,
    /// Structured error code from the response body, if any
    pub code: Option<String>,
    /// Detailed error message
    pub message: String,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "[{}:{}] ({}) {}",
                self.provider, self.kind, status, self.message
            ),
            None => write!(f, "[{}:{}] {}", self.provider, self.kind, self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    pub fn new(kind: ErrorKind, provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            provider: provider.into(),
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn disposition(&self) -> Disposition {
        self.kind.disposition()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps raw provider failures onto [`ErrorKind`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an HTTP error response.
    ///
    /// A structured `code` wins over message matching; message matching stays
    /// for servers that only report the limit in prose.
    pub fn classify_http_status(
        status: u16,
        code: Option<&str>,
        message: &str,
        provider: &str,
    ) -> ProviderError {
        let kind = match status {
            400 if Self::is_context_overflow(code, message) => ErrorKind::ContextLength,
            400 => ErrorKind::BadRequest,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::RateLimit,
            _ => ErrorKind::Other,
        };

        let err = ProviderError::new(kind, provider, message).with_status(status);
        match code {
            Some(code) => err.with_code(code),
            None => err,
        }
    }

    /// Classify a transport-level failure (no response received)
    pub fn classify_transport(err: &reqwest::Error, provider: &str) -> ProviderError {
        let kind = if err.is_connect() || err.is_timeout() || err.is_request() {
            ErrorKind::Connection
        } else {
            ErrorKind::Other
        };
        ProviderError::new(kind, provider, err.to_string())
    }

    /// Whether a bad-request error reports an exceeded context/token limit
    pub fn is_context_overflow(code: Option<&str>, message: &str) -> bool {
        if code == Some(classify_constants::CONTEXT_LENGTH_CODE) {
            return true;
        }
        let lower = message.to_lowercase();
        classify_constants::CONTEXT_LENGTH_PATTERNS
            .iter()
            .any(|pattern| lower.contains(pattern))
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed request rejected by the provider; never retried
    #[error("Invalid API request: {0}")]
    InvalidRequest(ProviderError),

    /// Provider failure surfaced outside the retry loop
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Structure extraction failed for {instance_id}: {message}")]
    Structure {
        instance_id: String,
        message: String,
    },

    #[error("Git error: {0}")]
    Git(String),
}

pub type Result<T> = std::result::Result<T, DispatchError>;

impl DispatchError {
    pub fn structure(instance_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Structure {
            instance_id: instance_id.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from a request the provider refused outright
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}

// =============================================================================
// Tests
// =============================================================================
