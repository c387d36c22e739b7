//! Triage pipeline — classification drives a deterministic email dispatch.
//!
//! Flow:
//! 1. Classifier → structured JSON (or raw-text fallback)
//! 2. Decision: `requires_email` from the classification, nothing else
//! 3. Composition: one LLM call turns `email_context` into an HTML body
//!    (content generation only — the model never decides *whether* to send)
//! 4. Dispatch: direct SMTP send through the `EmailSender` seam

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classifier::{Classifier, TicketAnalysis};
use crate::error::PipelineError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::mailer::{EmailRequest, EmailSender};

/// Max tokens for the composition call.
const COMPOSE_MAX_TOKENS: u32 = 1024;

/// Temperature for composition (prose, so a little looser).
const COMPOSE_TEMPERATURE: f32 = 0.7;

const COMPOSE_INSTRUCTIONS: &str = "\
You write HTML bodies for customer-support follow-up emails. \
Use HTML tags to format the message beautifully. \
Return only the HTML body, with no subject line and no commentary.";

/// Outcome of running a conversation through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct TriageReport {
    /// The classification, passed through unchanged.
    pub analysis: TicketAnalysis,
    /// Whether a follow-up email was dispatched.
    pub email_dispatched: bool,
    /// Subject of the dispatched email, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_subject: Option<String>,
    pub processed_at: DateTime<Utc>,
}

/// Classifies a conversation and dispatches a follow-up email when the
/// classification calls for one.
pub struct TriagePipeline {
    classifier: Classifier,
    llm: Arc<dyn LlmProvider>,
    mailer: Arc<dyn EmailSender>,
}

impl TriagePipeline {
    pub fn new(llm: Arc<dyn LlmProvider>, mailer: Arc<dyn EmailSender>) -> Self {
        Self {
            classifier: Classifier::new(Arc::clone(&llm)),
            llm,
            mailer,
        }
    }

    /// Run the full pipeline on one conversation.
    pub async fn run(&self, conversation: &str) -> Result<TriageReport, PipelineError> {
        let analysis = self
            .classifier
            .classify(conversation)
            .await
            .map_err(|e| PipelineError::Classification(format!("{e}")))?;

        if !analysis.requires_email() {
            debug!("Classification does not request an email");
            return Ok(TriageReport {
                analysis,
                email_dispatched: false,
                email_subject: None,
                processed_at: Utc::now(),
            });
        }

        let context = analysis.email_context().unwrap_or_default().trim().to_string();
        if context.is_empty() {
            warn!("requires_email set but email_context is empty; skipping dispatch");
            return Ok(TriageReport {
                analysis,
                email_dispatched: false,
                email_subject: None,
                processed_at: Utc::now(),
            });
        }

        let subject = derive_subject(&analysis);
        let html_body = self.compose_body(&context).await?;
        self.mailer
            .send(&EmailRequest::new(subject.clone(), html_body))
            .await?;

        info!(
            to = self.mailer.recipient(),
            subject = %subject,
            "Follow-up email dispatched"
        );

        Ok(TriageReport {
            analysis,
            email_dispatched: true,
            email_subject: Some(subject),
            processed_at: Utc::now(),
        })
    }

    /// One LLM call that turns the email context into an HTML body.
    async fn compose_body(&self, email_context: &str) -> Result<String, PipelineError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(COMPOSE_INSTRUCTIONS),
            ChatMessage::user(format!(
                "Write the follow-up email described below.\n\nContext: {email_context}"
            )),
        ])
        .with_temperature(COMPOSE_TEMPERATURE)
        .with_max_tokens(COMPOSE_MAX_TOKENS);

        let response = self
            .llm
            .complete(request)
            .await
            .map_err(|e| PipelineError::Composition(format!("{e}")))?;

        Ok(response.content.trim().to_string())
    }
}

/// Derive an email subject from the classification.
fn derive_subject(analysis: &TicketAnalysis) -> String {
    match analysis.ticket_type() {
        Some(ticket_type) if !ticket_type.trim().is_empty() => {
            format!("Support follow-up: {}", ticket_type.replace('_', " "))
        }
        _ => "Support follow-up".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use crate::error::{EmailError, LlmError};
    use crate::llm::CompletionResponse;

    /// Mock LLM that replays scripted responses in order.
    struct ScriptedLlm {
        responses: Mutex<VecDeque<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<&str>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().map(String::from).collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let content = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted LLM ran out of responses");
            Ok(CompletionResponse {
                content,
                input_tokens: 100,
                output_tokens: 50,
            })
        }
    }

    /// Stub mailer that records every send.
    struct RecordingMailer {
        sent: Mutex<Vec<EmailRequest>>,
    }

    impl RecordingMailer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<EmailRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl EmailSender for RecordingMailer {
        fn recipient(&self) -> &str {
            "customer@example.com"
        }

        async fn send(&self, email: &EmailRequest) -> Result<(), EmailError> {
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    fn classification_requiring_email() -> String {
        json!({
            "ticket_summary": "Integration broke, refund requested",
            "sentiment": "negative",
            "ticket_type": "integration_request",
            "is_resolved": false,
            "requires_email": true,
            "email_context": "Apologize and offer refund.",
            "flags": {
                "schedule_demo": false,
                "needs_consultation": true,
                "compliance_support_needed": false,
                "follow_up_required": true
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn dispatches_email_when_classification_requires_it() {
        let classification = classification_requiring_email();
        let llm = ScriptedLlm::new(vec![
            classification.as_str(),
            "<p>We're sorry, a refund is on its way.</p>",
        ]);
        let mailer = RecordingMailer::new();
        let pipeline = TriagePipeline::new(llm.clone(), mailer.clone());

        let report = pipeline
            .run("Customer: my integration broke and I need a refund")
            .await
            .unwrap();

        assert!(report.email_dispatched);
        assert_eq!(
            report.email_subject.as_deref(),
            Some("Support follow-up: integration request")
        );
        assert_eq!(llm.call_count(), 2); // classify + compose

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].html_body, "<p>We're sorry, a refund is on its way.</p>");
    }

    #[tokio::test]
    async fn skips_email_when_not_required() {
        let response = json!({
            "ticket_summary": "Asked about pricing, answered",
            "sentiment": "positive",
            "ticket_type": "billing_issue",
            "is_resolved": true,
            "requires_email": false,
            "email_context": "",
            "flags": {}
        })
        .to_string();
        let llm = ScriptedLlm::new(vec![response.as_str()]);
        let mailer = RecordingMailer::new();
        let pipeline = TriagePipeline::new(llm.clone(), mailer.clone());

        let report = pipeline.run("Customer: how much is the pro plan?").await.unwrap();

        assert!(!report.email_dispatched);
        assert!(report.email_subject.is_none());
        // Only the classification call — no composition.
        assert_eq!(llm.call_count(), 1);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn skips_email_on_fallback_classification() {
        let llm = ScriptedLlm::new(vec!["Sorry, I cannot help with that."]);
        let mailer = RecordingMailer::new();
        let pipeline = TriagePipeline::new(llm.clone(), mailer.clone());

        let report = pipeline.run("Customer: hello?").await.unwrap();

        assert!(!report.email_dispatched);
        assert!(!report.analysis.is_structured());
        assert_eq!(llm.call_count(), 1);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn skips_email_when_context_empty() {
        let response = json!({
            "requires_email": true,
            "email_context": "   "
        })
        .to_string();
        let llm = ScriptedLlm::new(vec![response.as_str()]);
        let mailer = RecordingMailer::new();
        let pipeline = TriagePipeline::new(llm.clone(), mailer.clone());

        let report = pipeline.run("Customer: hi").await.unwrap();

        assert!(!report.email_dispatched);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn report_serializes_analysis_unchanged() {
        let classification = classification_requiring_email();
        let llm = ScriptedLlm::new(vec![classification.as_str(), "<p>body</p>"]);
        let mailer = RecordingMailer::new();
        let pipeline = TriagePipeline::new(llm, mailer);

        let report = pipeline.run("Customer: broken").await.unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["analysis"]["ticket_type"], "integration_request");
        assert_eq!(json["email_dispatched"], true);
    }

    #[test]
    fn derive_subject_falls_back_without_ticket_type() {
        let analysis = TicketAnalysis::Json(json!({"requires_email": true}));
        assert_eq!(derive_subject(&analysis), "Support follow-up");
    }
}
