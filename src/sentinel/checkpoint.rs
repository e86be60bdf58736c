// SPDX-License-Identifier: MIT

//! Run snapshots for suspended workflows
//!
//! A suspended run is fully described by a [`RunSnapshot`]: the state at
//! the moment of suspension, the step waiting for input, and the path taken
//! so far. Snapshots are keyed by an opaque [`ResumeToken`].

use crate::adk::error::WorkflowError;
use crate::sentinel::approval::ApprovalRequest;
use crate::sentinel::graph::Step;
use crate::sentinel::state::ConversationState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Opaque reference to a suspended run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeToken(String);

impl ResumeToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ResumeToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResumeToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Everything needed to continue a suspended run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub token: ResumeToken,
    pub ticket_id: String,
    pub state: ConversationState,
    /// Step that suspended and will receive the resume input
    pub pending_step: Step,
    pub request: ApprovalRequest,
    /// Steps visited before suspension, `pending_step` included
    pub path: Vec<Step>,
    pub suspended_at: DateTime<Utc>,
}

impl RunSnapshot {
    pub fn new(
        state: ConversationState,
        pending_step: Step,
        request: ApprovalRequest,
        path: Vec<Step>,
    ) -> Self {
        Self {
            token: ResumeToken::generate(),
            ticket_id: state.ticket_id.clone(),
            state,
            pending_step,
            request,
            path,
            suspended_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Storage for suspended runs
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist a snapshot under its token
    async fn save(&self, snapshot: RunSnapshot) -> Result<(), WorkflowError>;

    /// Look at a snapshot without consuming it
    async fn get(&self, token: &ResumeToken) -> Option<RunSnapshot>;

    /// Remove and return a snapshot. Tokens are single-use.
    async fn take(&self, token: &ResumeToken) -> Option<RunSnapshot>;

    /// Tokens of all runs currently waiting for input
    async fn pending(&self) -> Vec<ResumeToken>;
}

/// In-process checkpoint store
#[derive(Clone, Default)]
pub struct MemoryCheckpointStore {
    snapshots: Arc<RwLock<HashMap<ResumeToken, RunSnapshot>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, snapshot: RunSnapshot) -> Result<(), WorkflowError> {
        let mut snapshots = self.snapshots.write().await;
        if snapshots.contains_key(&snapshot.token) {
            return Err(WorkflowError::Checkpoint(format!(
                "token {} already in use",
                snapshot.token
            )));
        }
        snapshots.insert(snapshot.token.clone(), snapshot);
        Ok(())
    }

    async fn get(&self, token: &ResumeToken) -> Option<RunSnapshot> {
        self.snapshots.read().await.get(token).cloned()
    }

    async fn take(&self, token: &ResumeToken) -> Option<RunSnapshot> {
        self.snapshots.write().await.remove(token)
    }

    async fn pending(&self) -> Vec<ResumeToken> {
        self.snapshots.read().await.keys().cloned().collect()
    }
}
