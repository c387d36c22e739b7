//! Error types for the triage toolkit.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
///
/// Transport and auth failures propagate to the caller; there is no retry.
/// A response that is not valid JSON is *not* an error — the classifier
/// degrades to a raw-text wrapper instead.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Outbound email errors.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Invalid {kind} address '{address}': {reason}")]
    InvalidAddress {
        kind: &'static str,
        address: String,
        reason: String,
    },

    #[error("Failed to build email message: {0}")]
    Build(String),

    #[error("SMTP relay error: {0}")]
    Relay(String),

    #[error("SMTP send failed: {0}")]
    Send(String),
}

/// Triage pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Email composition failed: {0}")]
    Composition(String),

    #[error("Email dispatch failed: {0}")]
    Dispatch(#[from] EmailError),
}
