//! Advisory classification schema and its validator.
//!
//! The schema is enforced only by the instruction prompt upstream — the
//! model may deviate. Validation never rejects a response; it reports
//! which fields are missing or mistyped so deviations are observable,
//! while the parsed JSON is surfaced unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Customer sentiment, as the prompt asks the model to report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Follow-up condition flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    #[serde(default)]
    pub schedule_demo: bool,
    #[serde(default)]
    pub needs_consultation: bool,
    #[serde(default)]
    pub compliance_support_needed: bool,
    #[serde(default)]
    pub follow_up_required: bool,
}

/// A schema-conforming classification.
///
/// Only used where the full shape is needed (tests, typed consumers);
/// the classifier itself passes the parsed JSON through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub ticket_summary: String,
    pub sentiment: Sentiment,
    pub ticket_type: String,
    pub is_resolved: bool,
    pub requires_email: bool,
    pub email_context: String,
    pub flags: Flags,
}

const STRING_FIELDS: [&str; 3] = ["ticket_summary", "ticket_type", "email_context"];
const BOOL_FIELDS: [&str; 2] = ["is_resolved", "requires_email"];
const FLAG_KEYS: [&str; 4] = [
    "schedule_demo",
    "needs_consultation",
    "compliance_support_needed",
    "follow_up_required",
];

/// Report every way `value` deviates from the advisory schema.
///
/// Empty result means the value conforms. Unknown extra keys are not
/// deviations — the schema is a floor, not a ceiling.
pub fn schema_deviations(value: &Value) -> Vec<String> {
    let Some(map) = value.as_object() else {
        return vec!["response is not a JSON object".to_string()];
    };

    let mut deviations = Vec::new();

    for field in STRING_FIELDS {
        match map.get(field) {
            None => deviations.push(format!("{field}: missing")),
            Some(v) if !v.is_string() => deviations.push(format!("{field}: expected string")),
            Some(_) => {}
        }
    }

    match map.get("sentiment").and_then(Value::as_str) {
        None => deviations.push("sentiment: missing or not a string".to_string()),
        Some(s) if !matches!(s, "positive" | "negative" | "neutral") => {
            deviations.push(format!(
                "sentiment: '{s}' is not one of positive|negative|neutral"
            ));
        }
        Some(_) => {}
    }

    for field in BOOL_FIELDS {
        match map.get(field) {
            None => deviations.push(format!("{field}: missing")),
            Some(v) if !v.is_boolean() => deviations.push(format!("{field}: expected boolean")),
            Some(_) => {}
        }
    }

    match map.get("flags") {
        None => deviations.push("flags: missing".to_string()),
        Some(Value::Object(flags)) => {
            for key in FLAG_KEYS {
                match flags.get(key) {
                    None => deviations.push(format!("flags.{key}: missing")),
                    Some(v) if !v.is_boolean() => {
                        deviations.push(format!("flags.{key}: expected boolean"));
                    }
                    Some(_) => {}
                }
            }
        }
        Some(_) => deviations.push("flags: expected object".to_string()),
    }

    deviations
}
