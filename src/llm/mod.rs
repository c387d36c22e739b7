//! LLM integration.
//!
//! Supports:
//! - **Gemini**: Google `generateContent` REST API
//! - **Anthropic**: Messages REST API
//!
//! Both backends implement the `LlmProvider` trait over plain reqwest —
//! one synchronous request/response round trip, no streaming, no retry.

mod anthropic;
mod gemini;
pub mod provider;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use provider::*;

use std::str::FromStr;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::ConfigError;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Gemini,
    Anthropic,
}

impl LlmBackend {
    /// Default model when `TRIAGE_MODEL` is not set.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-flash",
            Self::Anthropic => "claude-sonnet-4-20250514",
        }
    }
}

impl FromStr for LlmBackend {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(ConfigError::InvalidValue {
                key: "TRIAGE_LLM_BACKEND".to_string(),
                message: format!("'{other}' is not a supported backend (gemini, anthropic)"),
            }),
        }
    }
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Arc<dyn LlmProvider> {
    let provider: Arc<dyn LlmProvider> = match config.backend {
        LlmBackend::Gemini => Arc::new(GeminiProvider::new(
            config.api_key.clone(),
            config.model.clone(),
        )),
        LlmBackend::Anthropic => Arc::new(AnthropicProvider::new(
            config.api_key.clone(),
            config.model.clone(),
        )),
    };
    tracing::info!(model = %config.model, "LLM provider created");
    provider
}
