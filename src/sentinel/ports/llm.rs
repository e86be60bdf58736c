// SPDX-License-Identifier: MIT

//! Model-backed classifier and responder

use super::{Classifier, Responder, TriageData, TRIAGE_SCHEMA};
use crate::adk::error::{ClassificationError, ResponseError};
use crate::adk::model::{Content, GenerationConfig, Model};
use crate::sentinel::state::{Message, Role};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const TRIAGE_INSTRUCTIONS: &str = "You triage customer support conversations. \
Analyze the conversation and extract: the user's main intent (refund or general_inquiry), \
their emotional tone, the refund amount requested if any, and the stated reason for the refund. \
Answer with JSON only.";

/// Map conversation messages onto provider-neutral model content
pub fn to_contents(messages: &[Message]) -> Vec<Content> {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::Human => "user",
                Role::Assistant => "model",
                Role::System => "system",
            };
            Content::text(role, m.content.clone())
        })
        .collect()
}

/// Classifier asking a model for structured [`TriageData`]
pub struct LlmClassifier {
    model: Arc<dyn Model>,
    instructions: String,
    config: GenerationConfig,
    timeout: Duration,
}

impl LlmClassifier {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self {
            model,
            instructions: TRIAGE_INSTRUCTIONS.to_string(),
            config: GenerationConfig::structured(TRIAGE_SCHEMA.clone()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, messages: &[Message]) -> Result<TriageData, ClassificationError> {
        let mut history = vec![Content::text("system", self.instructions.clone())];
        history.extend(to_contents(messages));

        let response = tokio::time::timeout(
            self.timeout,
            self.model.generate_content(&history, Some(&self.config)),
        )
        .await
        .map_err(|_| ClassificationError::Timeout)??;

        TriageData::from_json(&response.joined_text())
    }
}

/// Responder that returns the model's plain-text reply
pub struct LlmResponder {
    model: Arc<dyn Model>,
    config: GenerationConfig,
    timeout: Duration,
}

impl LlmResponder {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self {
            model,
            config: GenerationConfig::default().with_temperature(0.0),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Responder for LlmResponder {
    async fn respond(&self, messages: &[Message]) -> Result<String, ResponseError> {
        let history = to_contents(messages);

        let response = tokio::time::timeout(
            self.timeout,
            self.model.generate_content(&history, Some(&self.config)),
        )
        .await
        .map_err(|_| ResponseError::Timeout)??;

        let text = response.joined_text();
        if text.trim().is_empty() {
            return Err(ResponseError::EmptyReply);
        }
        Ok(text)
    }
}
