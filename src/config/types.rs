//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/llm-dispatch/) and project (.llm-dispatch/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{batch, provider, retry, structure};
use crate::types::{DispatchError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenAI-compatible provider settings
    pub openai: OpenAiConfig,

    /// Anthropic-compatible provider settings
    pub anthropic: AnthropicConfig,

    /// Batch splitting settings
    pub dispatch: DispatchConfig,

    /// Repository structure fan-out settings
    pub structure: StructureConfig,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `DispatchError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.openai.timeout_secs == 0 {
            return Err(DispatchError::Config(
                "openai.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.openai.max_retries == 0 {
            return Err(DispatchError::Config(
                "openai.max_retries must be greater than 0".to_string(),
            ));
        }
        if self.anthropic.timeout_secs == 0 || self.anthropic.soft_timeout_secs == 0 {
            return Err(DispatchError::Config(
                "anthropic timeouts must be greater than 0".to_string(),
            ));
        }
        if self.anthropic.max_retries == 0 {
            return Err(DispatchError::Config(
                "anthropic.max_retries must be greater than 0".to_string(),
            ));
        }
        if self.dispatch.max_n_supported == 0 {
            return Err(DispatchError::Config(
                "dispatch.max_n_supported must be greater than 0".to_string(),
            ));
        }

        if let Some(base) = &self.openai.api_base {
            validate_base_url("openai.api_base", base)?;
        }
        if let Some(base) = &self.anthropic.api_base {
            validate_base_url("anthropic.api_base", base)?;
        }
        validate_base_url("structure.clone_base", &self.structure.clone_base)?;

        Ok(())
    }
}

/// Only http/https endpoints are accepted
fn validate_base_url(field: &str, value: &str) -> Result<()> {
    let url = url::Url::parse(value)
        .map_err(|e| DispatchError::Config(format!("Invalid {} '{}': {}", field, value, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(DispatchError::Config(format!(
            "{} must use http or https scheme, got: {}",
            field,
            url.scheme()
        )));
    }
    Ok(())
}

// =============================================================================
// Provider Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Endpoint base; falls back to `OPENAI_API_BASE`, then the public API
    pub api_base: Option<String>,

    /// API key; falls back to `OPENAI_API_KEY`. Never written out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,

    /// Attempts per dispatch
    pub max_retries: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            api_key: None,
            timeout_secs: provider::OPENAI_TIMEOUT_SECS,
            max_retries: retry::DEFAULT_MAX_RETRIES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    /// Endpoint base; falls back to `ANTHROPIC_BASE_URL`, then the public API
    pub api_base: Option<String>,

    /// API key; falls back to `ANTHROPIC_API_KEY`. Never written out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,

    /// Elapsed time after which retries log as timed out (retrying continues)
    pub soft_timeout_secs: u64,

    /// Attempts per dispatch
    pub max_retries: u32,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            api_key: None,
            timeout_secs: provider::ANTHROPIC_TIMEOUT_SECS,
            soft_timeout_secs: provider::ANTHROPIC_SOFT_TIMEOUT_SECS,
            max_retries: retry::DEFAULT_MAX_RETRIES,
        }
    }
}

// =============================================================================
// Dispatch Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Largest sample count sent in one provider call
    pub max_n_supported: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_n_supported: batch::MAX_N_SUPPORTED,
        }
    }
}

// =============================================================================
// Structure Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Where `{instance_id}.json` documents are written
    pub output_dir: PathBuf,

    /// Scratch directory for repository checkouts
    pub workdir: PathBuf,

    /// Concurrent jobs (0 = number of CPUs, capped)
    pub workers: usize,

    /// Prefix for `{clone_base}/{repo}.git`
    pub clone_base: String,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(structure::DEFAULT_OUTPUT_DIR),
            workdir: PathBuf::from(structure::DEFAULT_WORKDIR),
            workers: 0,
            clone_base: structure::DEFAULT_CLONE_BASE.to_string(),
        }
    }
}

impl StructureConfig {
    /// Effective worker count
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(structure::MAX_WORKERS)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.openai.timeout_secs, 900);
        assert_eq!(config.anthropic.timeout_secs, 600);
        assert_eq!(config.anthropic.soft_timeout_secs, 500);
        assert_eq!(config.openai.max_retries, 40);
        assert_eq!(config.dispatch.max_n_supported, 8);
        assert_eq!(config.structure.output_dir, PathBuf::from("repo_structures"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = Config::default();
        config.dispatch.max_n_supported = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.anthropic.soft_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.openai.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let mut config = Config::default();
        config.openai.api_base = Some("ftp://example.com".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.anthropic.api_base = Some("not a url".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.openai.api_base = Some("http://localhost:8000/v1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_api_keys_never_serialized() {
        let mut config = Config::default();
        config.openai.api_key = Some("sk-secret".to_string());
        config.anthropic.api_key = Some("sk-ant-secret".to_string());

        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("api_key"));
    }

    #[test]
    fn test_effective_workers() {
        let mut structure = StructureConfig::default();
        let auto = structure.effective_workers();
        assert!((1..=32).contains(&auto));

        structure.workers = 3;
        assert_eq!(structure.effective_workers(), 3);
    }
}
