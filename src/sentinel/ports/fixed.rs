// SPDX-License-Identifier: MIT

//! Deterministic ports returning canned results

use super::{Classifier, Responder, TriageData};
use crate::adk::error::{ClassificationError, ResponseError};
use crate::sentinel::state::Message;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Classifier that always returns the same result, or always fails
pub struct FixedClassifier {
    result: Option<TriageData>,
    calls: AtomicUsize,
}

impl FixedClassifier {
    pub fn new(result: TriageData) -> Self {
        Self {
            result: Some(result),
            calls: AtomicUsize::new(0),
        }
    }

    /// A classifier whose every call fails with `EmptyResult`
    pub fn failing() -> Self {
        Self {
            result: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for FixedClassifier {
    async fn classify(&self, _messages: &[Message]) -> Result<TriageData, ClassificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().ok_or(ClassificationError::EmptyResult)
    }
}

/// Responder that always returns the same reply, or always fails
pub struct FixedResponder {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl FixedResponder {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A responder whose every call fails with `EmptyReply`
    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Responder for FixedResponder {
    async fn respond(&self, _messages: &[Message]) -> Result<String, ResponseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().ok_or(ResponseError::EmptyReply)
    }
}
