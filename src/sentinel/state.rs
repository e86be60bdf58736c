// SPDX-License-Identifier: MIT

//! Conversation state threaded through the support workflow
//!
//! Steps never mutate a `ConversationState` directly. Each returns a
//! `StateUpdate` holding only the fields it changes, and the engine folds it
//! in with [`ConversationState::merge`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    System,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Refund,
    #[default]
    GeneralInquiry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
    Angry,
}

/// The shared record every step reads from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationState {
    pub ticket_id: String,
    /// Chronological and append-only
    pub messages: Vec<Message>,
    pub intent: Intent,
    pub sentiment: Sentiment,
    pub refund_amount: Option<f64>,
    pub refund_reason: Option<String>,
    pub requires_approval: bool,
}

impl ConversationState {
    /// Fresh state for an incoming ticket, seeded with the customer message
    pub fn new(ticket_id: impl Into<String>, seed_message: impl Into<String>) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            messages: vec![Message::human(seed_message)],
            ..Default::default()
        }
    }

    /// Fold a step's partial update into this state
    ///
    /// | field               | strategy |
    /// |---------------------|----------|
    /// | `messages`          | append   |
    /// | `intent`            | replace  |
    /// | `sentiment`         | replace  |
    /// | `refund_amount`     | replace  |
    /// | `refund_reason`     | replace (`Some(None)` clears) |
    /// | `requires_approval` | replace  |
    ///
    /// Fields left as `None` in the update are untouched. `ticket_id` is
    /// fixed for the lifetime of the run.
    pub fn merge(mut self, update: StateUpdate) -> Self {
        self.messages.extend(update.messages);
        if let Some(intent) = update.intent {
            self.intent = intent;
        }
        if let Some(sentiment) = update.sentiment {
            self.sentiment = sentiment;
        }
        if let Some(amount) = update.refund_amount {
            self.refund_amount = Some(amount);
        }
        if let Some(reason) = update.refund_reason {
            self.refund_reason = reason;
        }
        if let Some(requires_approval) = update.requires_approval {
            self.requires_approval = requires_approval;
        }
        self
    }

    /// Most recent message, if any
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Partial update produced by a single step
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
    pub intent: Option<Intent>,
    pub sentiment: Option<Sentiment>,
    pub refund_amount: Option<f64>,
    pub refund_reason: Option<Option<String>>,
    pub requires_approval: Option<bool>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn intent(mut self, intent: Intent) -> Self {
        self.intent = Some(intent);
        self
    }

    pub fn sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment = Some(sentiment);
        self
    }

    pub fn refund_amount(mut self, amount: f64) -> Self {
        self.refund_amount = Some(amount);
        self
    }

    pub fn refund_reason(mut self, reason: Option<String>) -> Self {
        self.refund_reason = Some(reason);
        self
    }

    pub fn requires_approval(mut self, requires_approval: bool) -> Self {
        self.requires_approval = Some(requires_approval);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_defaults() {
        let state = ConversationState::new("T-1", "hello");
        assert_eq!(state.ticket_id, "T-1");
        assert_eq!(state.messages, vec![Message::human("hello")]);
        assert_eq!(state.intent, Intent::GeneralInquiry);
        assert_eq!(state.sentiment, Sentiment::Neutral);
        assert_eq!(state.refund_amount, None);
        assert_eq!(state.refund_reason, None);
        assert!(!state.requires_approval);
    }

    #[test]
    fn test_merge_appends_messages() {
        let state = ConversationState::new("T-1", "first");
        let state = state.merge(StateUpdate::new().message(Message::system("second")));
        let state = state.merge(StateUpdate::new().message(Message::assistant("third")));

        let contents: Vec<_> = state.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert_eq!(state.messages[2].role, Role::Assistant);
    }

    #[test]
    fn test_merge_replaces_scalars() {
        let state = ConversationState::new("T-1", "refund please").merge(
            StateUpdate::new()
                .intent(Intent::Refund)
                .sentiment(Sentiment::Angry)
                .refund_amount(75.0)
                .refund_reason(Some("broken".to_string())),
        );
        assert_eq!(state.intent, Intent::Refund);
        assert_eq!(state.sentiment, Sentiment::Angry);
        assert_eq!(state.refund_amount, Some(75.0));
        assert_eq!(state.refund_reason.as_deref(), Some("broken"));

        let state = state.merge(StateUpdate::new().intent(Intent::GeneralInquiry));
        assert_eq!(state.intent, Intent::GeneralInquiry);
        // untouched fields survive
        assert_eq!(state.sentiment, Sentiment::Angry);
        assert_eq!(state.refund_amount, Some(75.0));
    }

    #[test]
    fn test_merge_can_clear_refund_reason() {
        let state = ConversationState::new("T-1", "x")
            .merge(StateUpdate::new().refund_reason(Some("late".to_string())));
        assert!(state.refund_reason.is_some());

        let state = state.merge(StateUpdate::new().refund_reason(None));
        assert!(state.refund_reason.is_none());
    }

    #[test]
    fn test_empty_update_is_identity() {
        let state =
            ConversationState::new("T-1", "x").merge(StateUpdate::new().requires_approval(true));
        let merged = state.clone().merge(StateUpdate::new());
        assert_eq!(merged, state);
    }

    #[test]
    fn test_state_serializes_enums_in_wire_form() {
        let state = ConversationState::new("T-9", "hi").merge(
            StateUpdate::new()
                .intent(Intent::GeneralInquiry)
                .sentiment(Sentiment::Positive),
        );
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["intent"], "general_inquiry");
        assert_eq!(json["sentiment"], "positive");
        assert_eq!(json["messages"][0]["role"], "human");
    }
}
