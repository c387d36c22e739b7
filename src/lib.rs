//! Support ticket triage toolkit.
//!
//! Classifies customer-support conversations into structured JSON via an
//! LLM, and dispatches HTML follow-up emails over SMTP. The triage
//! pipeline ties the two together: the classification decides whether an
//! email goes out, the model only ever writes content.

pub mod classifier;
pub mod config;
pub mod error;
pub mod llm;
pub mod mailer;
pub mod pipeline;
