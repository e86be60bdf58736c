// SPDX-License-Identifier: MIT

//! Configuration loading
//!
//! Settings come from an optional YAML file, then environment overrides.
//! Every field has a default so an empty file (or none) is valid.

use crate::adk::error::SentinelError;
use crate::sentinel::graph::DEFAULT_MAX_STEPS;
use crate::sentinel::policy::{RefundPolicy, DEFAULT_APPROVAL_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SentinelConfig {
    pub model: ModelSettings,
    pub policy: PolicySettings,
    pub workflow: WorkflowSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelSettings {
    pub model_name: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicySettings {
    pub approval_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowSettings {
    pub max_steps: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            timeout_secs: 30,
        }
    }
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            approval_threshold: DEFAULT_APPROVAL_THRESHOLD,
        }
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl ModelSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SentinelConfig {
    /// Load from a YAML file, apply env overrides and validate
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SentinelError> {
        let content = fs::read_to_string(path)?;
        let mut config = Self::parse_yaml(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with env overrides, for running without a config file
    pub fn from_env() -> Result<Self, SentinelError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML string. Empty documents yield the defaults.
    pub fn parse_yaml(content: &str) -> Result<Self, SentinelError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: SentinelConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// `MODEL_NAME` (or `GEMINI_MODEL`) and `SENTINEL_APPROVAL_THRESHOLD`
    pub fn apply_env_overrides(&mut self) -> Result<(), SentinelError> {
        if let Ok(name) = env::var("MODEL_NAME").or_else(|_| env::var("GEMINI_MODEL")) {
            log::debug!("Model name overridden from environment: {}", name);
            self.model.model_name = name;
        }
        if let Ok(raw) = env::var("SENTINEL_APPROVAL_THRESHOLD") {
            self.policy.approval_threshold = raw.trim().parse().map_err(|_| {
                SentinelError::config(format!(
                    "SENTINEL_APPROVAL_THRESHOLD is not a number: {}",
                    raw
                ))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SentinelError> {
        let threshold = self.policy.approval_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(SentinelError::config(format!(
                "approval_threshold must be a non-negative number, got {}",
                threshold
            )));
        }
        if self.model.model_name.trim().is_empty() {
            return Err(SentinelError::config("model_name must not be empty"));
        }
        if self.model.timeout_secs == 0 {
            return Err(SentinelError::config("timeout_secs must be greater than 0"));
        }
        if self.workflow.max_steps == 0 {
            return Err(SentinelError::config("max_steps must be greater than 0"));
        }
        Ok(())
    }

    pub fn refund_policy(&self) -> RefundPolicy {
        RefundPolicy::new(self.policy.approval_threshold)
    }
}
