// SPDX-License-Identifier: MIT

//! Refund triage workflow
//!
//! A ticket is classified, checked against the refund policy, optionally
//! held for a human decision and then either refunded or answered.

pub mod approval;
pub mod checkpoint;
pub mod config;
pub mod graph;
pub mod policy;
pub mod ports;
pub mod state;
pub mod steps;

pub use approval::{ApprovalRequest, Decision, ResumeInput};
pub use checkpoint::{CheckpointStore, MemoryCheckpointStore, ResumeToken, RunSnapshot};
pub use config::SentinelConfig;
pub use graph::{CompletedRun, RunOutcome, Step, SupportWorkflow, SuspendedRun};
pub use policy::{RefundPolicy, DEFAULT_APPROVAL_THRESHOLD};
pub use state::{ConversationState, Intent, Message, Role, Sentiment, StateUpdate};
