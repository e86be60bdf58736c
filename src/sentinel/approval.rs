// SPDX-License-Identifier: MIT

//! Human approval payloads
//!
//! The engine emits an [`ApprovalRequest`] when it suspends and accepts a
//! [`ResumeInput`] when the host resumes it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const APPROVAL_REQUIRED: &str = "approval_required";
pub const DEFAULT_APPROVAL_REASON: &str = "High value refund";

/// Payload handed to the host at suspension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
    pub reason: String,
}

impl ApprovalRequest {
    /// Empty or missing reasons fall back to [`DEFAULT_APPROVAL_REASON`]
    pub fn new(amount: f64, reason: Option<&str>) -> Self {
        let reason = reason
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_APPROVAL_REASON);
        Self {
            kind: APPROVAL_REQUIRED.to_string(),
            amount,
            reason: reason.to_string(),
        }
    }
}

/// Value supplied by the host to continue a suspended run
///
/// Either an object carrying a `status` field or any other JSON value,
/// which is read through its string form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeInput(pub Value);

impl ResumeInput {
    /// The raw decision text this input stands for
    pub fn decision_text(&self) -> String {
        match &self.0 {
            Value::Object(obj) if obj.contains_key("status") => value_as_text(&obj["status"]),
            other => value_as_text(other),
        }
    }

    pub fn decision(&self) -> Decision {
        Decision::parse(&self.decision_text())
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<Value> for ResumeInput {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<&str> for ResumeInput {
    fn from(s: &str) -> Self {
        Self(Value::String(s.to_string()))
    }
}

impl From<String> for ResumeInput {
    fn from(s: String) -> Self {
        Self(Value::String(s))
    }
}

/// Outcome of a human review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Denied,
}

impl Decision {
    /// Anything starting with "approve" (any case) approves; everything else denies
    pub fn parse(text: &str) -> Self {
        if text.to_lowercase().starts_with("approve") {
            Decision::Approved
        } else {
            Decision::Denied
        }
    }
}
