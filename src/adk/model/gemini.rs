// SPDX-License-Identifier: MIT

//! Gemini Model - Google's Gemini API implementation

use super::{Content, GenerationConfig, Model, Part};
use crate::adk::error::ModelError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::env;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini model implementation
pub struct GeminiModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl GeminiModel {
    /// Create a new GeminiModel
    ///
    /// Requires `GOOGLE_API_KEY` environment variable to be set.
    /// Optionally uses `GEMINI_BASE_URL` for custom endpoints.
    pub fn new(model_name: impl Into<String>) -> Result<Self, ModelError> {
        let api_key = env::var("GOOGLE_API_KEY")
            .map_err(|_| ModelError::ApiKeyMissing("Gemini".to_string()))?;
        let base_url = env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client: Client::new(),
            api_key,
            model_name: model_name.into(),
            base_url,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[async_trait]
impl Model for GeminiModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, ModelError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model_name, self.api_key
        );

        let body = build_request_body(history, config);

        log::debug!(
            "Gemini request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self.client.post(&url).json(&body).send().await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ModelError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let text = resp.text().await?;
            return Err(ModelError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let text = resp.text().await?;
        log::debug!("Gemini response: {}", text);

        parse_response_text(&text)
    }
}

/// Build the `generateContent` request body
///
/// System content is lifted into `systemInstruction`; Gemini only accepts
/// `user` and `model` turns in `contents`.
pub fn build_request_body(history: &[Content], config: Option<&GenerationConfig>) -> Value {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();

    for c in history {
        let parts: Vec<Value> = c.parts.iter().filter_map(part_to_gemini_json).collect();
        if parts.is_empty() {
            continue;
        }
        match c.role.as_str() {
            "system" => system_parts.extend(parts),
            "model" | "assistant" => contents.push(json!({ "role": "model", "parts": parts })),
            _ => contents.push(json!({ "role": "user", "parts": parts })),
        }
    }

    let mut body = json!({ "contents": contents });

    if !system_parts.is_empty() {
        body["systemInstruction"] = json!({ "parts": system_parts });
    }

    if let Some(config) = config {
        let generation_config = generation_config_json(config);
        if generation_config
            .as_object()
            .is_some_and(|obj| !obj.is_empty())
        {
            body["generationConfig"] = generation_config;
        }
    }

    body
}

fn generation_config_json(config: &GenerationConfig) -> Value {
    let mut gc = serde_json::Map::new();
    if let Some(t) = config.temperature {
        gc.insert("temperature".to_string(), json!(t));
    }
    if let Some(n) = config.max_output_tokens {
        gc.insert("maxOutputTokens".to_string(), json!(n));
    }
    if let Some(p) = config.top_p {
        gc.insert("topP".to_string(), json!(p));
    }
    if let Some(k) = config.top_k {
        gc.insert("topK".to_string(), json!(k));
    }
    if let Some(mime) = &config.response_mime_type {
        gc.insert("responseMimeType".to_string(), json!(mime));
    }
    if let Some(schema) = &config.response_schema {
        gc.insert("responseJsonSchema".to_string(), schema.clone());
    }
    Value::Object(gc)
}

/// Serialize a Part to Gemini API JSON format
/// Returns None for parts that shouldn't be sent (e.g., Thinking)
pub fn part_to_gemini_json(part: &Part) -> Option<Value> {
    match part {
        Part::Text(t) => Some(json!({ "text": t })),
        Part::Thinking(_) => None,
    }
}

/// Parse a Gemini API JSON part into Parts
pub fn parse_gemini_part(p: &Value) -> Vec<Part> {
    let mut parts = Vec::new();

    // Newer models flag thought summaries with `"thought": true` on a text part
    if p.get("thought").and_then(|t| t.as_bool()) == Some(true) {
        if let Some(text) = p["text"].as_str() {
            parts.push(Part::Thinking(text.to_string()));
        }
        return parts;
    }

    if let Some(thought) = p.get("thought").and_then(|t| t.as_str()) {
        if !thought.is_empty() {
            parts.push(Part::Thinking(thought.to_string()));
        }
    }

    if let Some(text) = p["text"].as_str() {
        parts.push(Part::Text(text.to_string()));
    }

    parts
}

/// Parse a raw `generateContent` response body
pub fn parse_response_text(body: &str) -> Result<Content, ModelError> {
    let resp_json: Value = serde_json::from_str(body)?;
    parse_response(&resp_json)
}

/// Parse a full `generateContent` response into Content
pub fn parse_response(resp_json: &Value) -> Result<Content, ModelError> {
    if let Some(reason) = resp_json
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(|r| r.as_str())
    {
        return Err(ModelError::Blocked(reason.to_string()));
    }

    let candidate = resp_json["candidates"]
        .as_array()
        .and_then(|c| c.first())
        .ok_or_else(|| ModelError::InvalidResponse("No candidates in response".to_string()))?;

    if let Some(finish_reason) = candidate.get("finishReason").and_then(|v| v.as_str()) {
        log::debug!("Gemini finish reason: {}", finish_reason);
        if finish_reason == "SAFETY" {
            return Err(ModelError::Blocked(
                "Gemini blocked response due to safety filters".to_string(),
            ));
        }
    }

    let parts_json = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            log::error!("No content parts in candidate: {}", candidate);
            ModelError::InvalidResponse(format!("No content in Gemini candidate: {}", candidate))
        })?;

    Ok(Content {
        role: "model".to_string(),
        parts: parts_json.iter().flat_map(parse_gemini_part).collect(),
    })
}
