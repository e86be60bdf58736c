// SPDX-License-Identifier: MIT

//! External capabilities used by the workflow
//!
//! - [`Classifier`] - structured triage of the conversation
//! - [`Responder`] - free-text conversational reply
//!
//! [llm] adapts both onto an [`crate::adk::model::Model`]; [fixed] holds
//! deterministic doubles.

pub mod fixed;
pub mod llm;

pub use fixed::{FixedClassifier, FixedResponder};
pub use llm::{LlmClassifier, LlmResponder};

use crate::adk::error::{ClassificationError, ResponseError};
use crate::sentinel::state::{Intent, Message, Sentiment};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured triage result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TriageData {
    /// The main intent of the user.
    pub intent: Intent,
    /// The emotional tone of the user.
    pub sentiment: Sentiment,
    /// The amount of money requested for refund, if any.
    #[serde(default)]
    pub refund_amount: Option<f64>,
    /// The reason stated for the refund request.
    #[serde(default)]
    pub refund_reason: Option<String>,
}

/// JSON schema for [`TriageData`] with every subschema inlined
pub static TRIAGE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let root = settings.into_generator().into_root_schema_for::<TriageData>();
    let mut schema = serde_json::to_value(root).unwrap_or_default();
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("title");
        obj.remove("definitions");
    }
    schema
});

impl TriageData {
    pub fn new(intent: Intent, sentiment: Sentiment) -> Self {
        Self {
            intent,
            sentiment,
            refund_amount: None,
            refund_reason: None,
        }
    }

    pub fn refund(amount: f64, reason: Option<&str>) -> Self {
        Self {
            intent: Intent::Refund,
            sentiment: Sentiment::Neutral,
            refund_amount: Some(amount),
            refund_reason: reason.map(str::to_string),
        }
    }

    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment = sentiment;
        self
    }

    /// Parse and validate a raw model answer
    pub fn from_json(text: &str) -> Result<Self, ClassificationError> {
        let trimmed = strip_code_fence(text.trim());
        if trimmed.is_empty() {
            return Err(ClassificationError::EmptyResult);
        }
        let data: TriageData = serde_json::from_str(trimmed)
            .map_err(|e| ClassificationError::malformed(e.to_string()))?;
        data.validate()
    }

    /// Reject amounts that are negative or not finite
    pub fn validate(self) -> Result<Self, ClassificationError> {
        match self.refund_amount {
            Some(amount) if !amount.is_finite() || amount < 0.0 => Err(
                ClassificationError::malformed(format!("invalid refund amount {}", amount)),
            ),
            _ => Ok(self),
        }
    }
}

/// Models sometimes wrap JSON in a ```json fence even in JSON mode
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Classifies a conversation into triage fields
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, messages: &[Message]) -> Result<TriageData, ClassificationError>;
}

/// Produces a conversational reply to a conversation
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, messages: &[Message]) -> Result<String, ResponseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_full() {
        let data = TriageData::from_json(
            r#"{"intent":"refund","sentiment":"angry","refund_amount":80.0,"refund_reason":"late"}"#,
        )
        .unwrap();
        assert_eq!(data.intent, Intent::Refund);
        assert_eq!(data.sentiment, Sentiment::Angry);
        assert_eq!(data.refund_amount, Some(80.0));
        assert_eq!(data.refund_reason.as_deref(), Some("late"));
    }

    #[test]
    fn test_from_json_optional_fields_absent() {
        let data = TriageData::from_json(r#"{"intent":"general_inquiry","sentiment":"positive"}"#)
            .unwrap();
        assert_eq!(data.refund_amount, None);
        assert_eq!(data.refund_reason, None);
    }

    #[test]
    fn test_from_json_strips_code_fence() {
        let data = TriageData::from_json(
            "```json\n{\"intent\":\"refund\",\"sentiment\":\"neutral\",\"refund_amount\":30}\n```",
        )
        .unwrap();
        assert_eq!(data.refund_amount, Some(30.0));
    }

    #[test]
    fn test_from_json_rejects_unknown_intent() {
        let err =
            TriageData::from_json(r#"{"intent":"cancel","sentiment":"neutral"}"#).unwrap_err();
        assert!(matches!(err, ClassificationError::Malformed(_)));
    }

    #[test]
    fn test_from_json_rejects_negative_amount() {
        let err = TriageData::from_json(
            r#"{"intent":"refund","sentiment":"neutral","refund_amount":-5}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ClassificationError::Malformed(_)));
    }

    #[test]
    fn test_from_json_empty_is_empty_result() {
        assert!(matches!(
            TriageData::from_json("  "),
            Err(ClassificationError::EmptyResult)
        ));
    }

    #[test]
    fn test_schema_lists_enum_values() {
        let schema = &*TRIAGE_SCHEMA;
        assert_eq!(schema["type"], "object");
        let intents = schema["properties"]["intent"]["enum"].as_array().unwrap();
        assert!(intents.contains(&Value::from("refund")));
        assert!(intents.contains(&Value::from("general_inquiry")));
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&Value::from("intent")));
        assert!(!required.contains(&Value::from("refund_amount")));
        assert!(schema.get("$schema").is_none());
    }
}
