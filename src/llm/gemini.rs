//! Google Gemini provider — `generateContent` over REST.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role,
};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini completion client.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
        }
    }
}

// ── Wire format ─────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: UsageMetadata,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// Map provider-agnostic messages to Gemini's request shape.
///
/// System messages become the `systemInstruction` block; user/assistant
/// messages become `contents` entries ("model" is Gemini's assistant role).
fn build_request(request: &CompletionRequest) -> GenerateContentRequest {
    let system_instruction = request.system_text().map(|text| SystemInstruction {
        parts: vec![Part { text }],
    });

    let contents = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m: &ChatMessage| Content {
            role: match m.role {
                Role::Assistant => "model".to_string(),
                _ => "user".to_string(),
            },
            parts: vec![Part {
                text: m.content.clone(),
            }],
        })
        .collect();

    GenerateContentRequest {
        system_instruction,
        contents,
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
        },
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = build_request(&request);
        let url = format!("{API_BASE}/{}:generateContent", self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => LlmError::AuthFailed {
                    provider: "gemini".to_string(),
                },
                429 => LlmError::RateLimited {
                    provider: "gemini".to_string(),
                    retry_after: None,
                },
                _ => LlmError::RequestFailed {
                    provider: "gemini".to_string(),
                    reason: format!("HTTP {status}: {detail}"),
                },
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: "gemini".to_string(),
                reason: "no candidates in response".to_string(),
            })?;

        let content: String = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();

        Ok(CompletionResponse {
            content,
            input_tokens: parsed.usage_metadata.prompt_token_count,
            output_tokens: parsed.usage_metadata.candidates_token_count,
        })
    }
}
