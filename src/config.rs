//! Configuration types.
//!
//! Credentials and addresses are injected once at process start via
//! environment variables and passed explicitly into constructors —
//! nothing is hardcoded in the call sites.

use std::str::FromStr;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::LlmBackend;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: SecretString,
    pub model: String,
}

impl LlmConfig {
    /// Build config from environment variables.
    ///
    /// - `TRIAGE_LLM_BACKEND`: `gemini` (default) or `anthropic`
    /// - `GEMINI_API_KEY` / `ANTHROPIC_API_KEY`: required, per backend
    /// - `TRIAGE_MODEL`: optional, defaults to a sensible model per backend
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = match std::env::var("TRIAGE_LLM_BACKEND") {
            Ok(raw) => LlmBackend::from_str(&raw)?,
            Err(_) => LlmBackend::Gemini,
        };

        let key_var = match backend {
            LlmBackend::Gemini => "GEMINI_API_KEY",
            LlmBackend::Anthropic => "ANTHROPIC_API_KEY",
        };
        let api_key = std::env::var(key_var)
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingEnvVar(key_var.to_string()))?;

        let model = std::env::var("TRIAGE_MODEL")
            .unwrap_or_else(|_| backend.default_model().to_string());

        Ok(Self {
            backend,
            api_key,
            model,
        })
    }
}

/// Outbound email configuration.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    /// Fixed sender address for all outbound mail.
    pub from_address: String,
    /// Fixed recipient address for all outbound mail.
    pub to_address: String,
}

impl EmailConfig {
    /// Build config from environment variables.
    ///
    /// `SMTP_HOST` and `EMAIL_TO_ADDRESS` are required; the rest have
    /// defaults (`SMTP_PORT` 587, `EMAIL_FROM_ADDRESS` falls back to the
    /// SMTP username).
    pub fn from_env() -> Result<Self, ConfigError> {
        let smtp_host = std::env::var("SMTP_HOST")
            .map_err(|_| ConfigError::MissingEnvVar("SMTP_HOST".to_string()))?;

        let smtp_port: u16 = match std::env::var("SMTP_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "SMTP_PORT".to_string(),
                message: format!("'{raw}' is not a valid port"),
            })?,
            Err(_) => 587,
        };

        let username = std::env::var("SMTP_USERNAME").unwrap_or_default();
        let password = std::env::var("SMTP_PASSWORD").unwrap_or_default();
        let from_address =
            std::env::var("EMAIL_FROM_ADDRESS").unwrap_or_else(|_| username.clone());
        let to_address = std::env::var("EMAIL_TO_ADDRESS")
            .map_err(|_| ConfigError::MissingEnvVar("EMAIL_TO_ADDRESS".to_string()))?;

        Ok(Self {
            smtp_host,
            smtp_port,
            username,
            password,
            from_address,
            to_address,
        })
    }
}
