//! Conversation classifier — one LLM round trip in, one JSON value out.
//!
//! The model is instructed to return only JSON matching the advisory
//! schema. When it complies (or returns any valid JSON at all), the parsed
//! value is surfaced unchanged. When it doesn't, the raw text is wrapped
//! losslessly as `{"text": <raw>}` — parse failure is never an error.

pub mod schema;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

pub use schema::{Classification, Flags, Sentiment, schema_deviations};

/// Max tokens for the classification call.
const CLASSIFY_MAX_TOKENS: u32 = 1024;

/// Temperature for classification (deterministic-ish).
const CLASSIFY_TEMPERATURE: f32 = 0.1;

/// Fixed instruction prompt enumerating the output schema.
const CLASSIFY_INSTRUCTIONS: &str = "\
You are a JSON formatter for chatbot-customer conversations.

Extract the following:
- ticket_summary: a breakdown of customer requests and context
- sentiment: overall tone of the customer (positive, negative, neutral)
- ticket_type: category (e.g., integration_request, bug_report, billing_issue)
- is_resolved: true or false
- requires_email: true if email notification or follow-up is needed
- email_context: a short paragraph describing what the email should say
- flags: additional booleans (schedule_demo, needs_consultation, compliance_support_needed, follow_up_required)

Return only a JSON response.";

/// Result of classifying a conversation.
///
/// Serializes as the parsed JSON itself, or as `{"text": ...}` for the
/// raw-text fallback.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TicketAnalysis {
    /// The model returned valid JSON — surfaced unchanged.
    Json(Value),
    /// The model returned something else — preserved losslessly.
    Raw { text: String },
}

impl TicketAnalysis {
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Json(_))
    }

    /// Lenient read of `requires_email`. Missing, mistyped, or fallback
    /// output all mean "no email".
    pub fn requires_email(&self) -> bool {
        match self {
            Self::Json(value) => value
                .get("requires_email")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            Self::Raw { .. } => false,
        }
    }

    /// Lenient read of `email_context`.
    pub fn email_context(&self) -> Option<&str> {
        match self {
            Self::Json(value) => value.get("email_context").and_then(Value::as_str),
            Self::Raw { .. } => None,
        }
    }

    /// Lenient read of `ticket_type`.
    pub fn ticket_type(&self) -> Option<&str> {
        match self {
            Self::Json(value) => value.get("ticket_type").and_then(Value::as_str),
            Self::Raw { .. } => None,
        }
    }

    /// Strict decode into the typed schema, if the value conforms.
    pub fn classification(&self) -> Option<Classification> {
        match self {
            Self::Json(value) => serde_json::from_value(value.clone()).ok(),
            Self::Raw { .. } => None,
        }
    }
}

/// Conversation classifier.
pub struct Classifier {
    llm: Arc<dyn LlmProvider>,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Classify a conversation transcript.
    ///
    /// Exactly one completion call; transport failures propagate. The
    /// response is parsed as JSON after code-fence stripping — on success
    /// the value passes through unchanged, on failure the raw text is
    /// wrapped as `TicketAnalysis::Raw`.
    pub async fn classify(&self, conversation: &str) -> Result<TicketAnalysis, LlmError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(CLASSIFY_INSTRUCTIONS),
            ChatMessage::user(conversation),
        ])
        .with_temperature(CLASSIFY_TEMPERATURE)
        .with_max_tokens(CLASSIFY_MAX_TOKENS);

        let response = self.llm.complete(request).await?;
        debug!(
            model = self.llm.model_name(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Classification completed"
        );

        let analysis = parse_analysis(&response.content);
        match &analysis {
            TicketAnalysis::Json(value) => {
                let deviations = schema_deviations(value);
                if !deviations.is_empty() {
                    warn!(
                        deviations = ?deviations,
                        "Classification deviates from advisory schema"
                    );
                }
            }
            TicketAnalysis::Raw { .. } => {
                warn!("Model response was not valid JSON; wrapping raw text");
            }
        }

        Ok(analysis)
    }
}

/// Parse a model response into a `TicketAnalysis`.
///
/// The raw text is preserved exactly in the fallback — stripping only
/// affects what we *attempt* to parse.
fn parse_analysis(raw: &str) -> TicketAnalysis {
    let candidate = strip_code_fences(raw);
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => TicketAnalysis::Json(value),
        Err(_) => TicketAnalysis::Raw {
            text: raw.to_string(),
        },
    }
}

/// Strip a surrounding markdown code fence (```json ... ```), if present.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── Prompt tests ────────────────────────────────────────────────

    #[test]
    fn instructions_enumerate_schema_fields() {
        for field in [
            "ticket_summary",
            "sentiment",
            "ticket_type",
            "is_resolved",
            "requires_email",
            "email_context",
            "flags",
        ] {
            assert!(
                CLASSIFY_INSTRUCTIONS.contains(field),
                "prompt missing {field}"
            );
        }
        assert!(CLASSIFY_INSTRUCTIONS.contains("Return only a JSON response"));
    }

    // ── Fence stripping tests ───────────────────────────────────────

    #[test]
    fn strip_fences_plain_passthrough() {
        assert_eq!(strip_code_fences(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn strip_fences_json_block() {
        assert_eq!(
            strip_code_fences("```json\n{\"a\": 1}\n```"),
            r#"{"a": 1}"#
        );
    }

    #[test]
    fn strip_fences_bare_block() {
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), r#"{"a": 1}"#);
    }

    // ── Parse tests ─────────────────────────────────────────────────

    #[test]
    fn valid_json_passes_through_exactly() {
        let raw = r#"{"ticket_type": "bug_report", "nested": {"deep": [1, 2, 3]}}"#;
        let analysis = parse_analysis(raw);
        match analysis {
            TicketAnalysis::Json(value) => {
                assert_eq!(value, serde_json::from_str::<Value>(raw).unwrap());
            }
            TicketAnalysis::Raw { .. } => panic!("expected Json"),
        }
    }

    #[test]
    fn fenced_json_parses() {
        let raw = "```json\n{\"is_resolved\": true}\n```";
        let analysis = parse_analysis(raw);
        assert!(analysis.is_structured());
    }

    #[test]
    fn non_json_falls_back_to_raw_wrapper() {
        let raw = "Sorry, I cannot help with that.";
        let analysis = parse_analysis(raw);
        let serialized = serde_json::to_value(&analysis).unwrap();
        assert_eq!(serialized, json!({"text": "Sorry, I cannot help with that."}));
    }

    #[test]
    fn fallback_preserves_raw_text_losslessly() {
        let raw = "  leading space and a stray { brace";
        match parse_analysis(raw) {
            TicketAnalysis::Raw { text } => assert_eq!(text, raw),
            TicketAnalysis::Json(_) => panic!("expected Raw"),
        }
    }

    #[test]
    fn json_analysis_serializes_as_the_value_itself() {
        let value = json!({"requires_email": true, "flags": {}});
        let analysis = TicketAnalysis::Json(value.clone());
        assert_eq!(serde_json::to_value(&analysis).unwrap(), value);
    }

    // ── Accessor tests ──────────────────────────────────────────────

    #[test]
    fn requires_email_reads_bool() {
        let analysis = TicketAnalysis::Json(json!({"requires_email": true}));
        assert!(analysis.requires_email());
    }

    #[test]
    fn requires_email_lenient_on_missing_or_mistyped() {
        assert!(!TicketAnalysis::Json(json!({})).requires_email());
        assert!(!TicketAnalysis::Json(json!({"requires_email": "yes"})).requires_email());
        assert!(
            !TicketAnalysis::Raw {
                text: "nope".into()
            }
            .requires_email()
        );
    }

    #[test]
    fn email_context_reads_string() {
        let analysis = TicketAnalysis::Json(json!({"email_context": "Apologize."}));
        assert_eq!(analysis.email_context(), Some("Apologize."));
    }

    #[test]
    fn strict_classification_decode() {
        let analysis = TicketAnalysis::Json(json!({
            "ticket_summary": "summary",
            "sentiment": "positive",
            "ticket_type": "billing_issue",
            "is_resolved": true,
            "requires_email": false,
            "email_context": "",
            "flags": {}
        }));
        let typed = analysis.classification().unwrap();
        assert_eq!(typed.sentiment, Sentiment::Positive);
        assert!(typed.is_resolved);
    }

    #[test]
    fn strict_classification_decode_fails_on_deviating_value() {
        let analysis = TicketAnalysis::Json(json!({"sentiment": "furious"}));
        assert!(analysis.classification().is_none());
    }
}
