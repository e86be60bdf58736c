// SPDX-License-Identifier: MIT

//! The five workflow steps
//!
//! Each step reads the current state and returns the partial update it
//! wants merged. Only `human_approval` is split in two: it first produces an
//! [`ApprovalRequest`] and, once the host resumes, turns the supplied
//! [`ResumeInput`] into an update.

use crate::adk::error::ResponseError;
use crate::sentinel::approval::{ApprovalRequest, Decision, ResumeInput};
use crate::sentinel::policy::RefundPolicy;
use crate::sentinel::ports::{Classifier, Responder, TriageData};
use crate::sentinel::state::{ConversationState, Intent, Message, Sentiment, StateUpdate};

pub const APPROVED_MESSAGE: &str = "Human approved the refund request";
pub const DENIED_MESSAGE: &str = "Human denied the refund request";

/// Classify the conversation. Never fails: any classifier error, or a
/// result with an unusable amount, yields the general-inquiry defaults.
pub async fn triage(classifier: &dyn Classifier, state: &ConversationState) -> StateUpdate {
    let result = classifier
        .classify(&state.messages)
        .await
        .and_then(TriageData::validate);
    match result {
        Ok(data) => {
            log::info!(
                "Ticket {} triaged as {:?} ({:?}), amount {:?}",
                state.ticket_id,
                data.intent,
                data.sentiment,
                data.refund_amount
            );
            StateUpdate::new()
                .intent(data.intent)
                .sentiment(data.sentiment)
                .refund_amount(data.refund_amount.unwrap_or(0.0))
                .refund_reason(data.refund_reason)
        }
        Err(e) => {
            log::warn!(
                "Triage failed for ticket {}: {}. Defaulting to general_inquiry.",
                state.ticket_id,
                e
            );
            StateUpdate::new()
                .intent(Intent::GeneralInquiry)
                .sentiment(Sentiment::Neutral)
                .refund_amount(0.0)
                .refund_reason(None)
        }
    }
}

/// Decide whether the refund needs a human sign-off
pub fn policy_check(policy: &RefundPolicy, state: &ConversationState) -> StateUpdate {
    let amount = state.refund_amount.unwrap_or(0.0);
    let requires_approval = policy.evaluate(amount);
    log::info!(
        "Policy check for ticket {}: amount {} requires_approval={}",
        state.ticket_id,
        format_amount(amount),
        requires_approval
    );
    StateUpdate::new().requires_approval(requires_approval)
}

/// Payload emitted when the run suspends at `human_approval`
pub fn request_approval(state: &ConversationState) -> ApprovalRequest {
    ApprovalRequest::new(
        state.refund_amount.unwrap_or(0.0),
        state.refund_reason.as_deref(),
    )
}

/// Turn the host's resume input into the approval outcome
pub fn apply_approval(state: &ConversationState, input: &ResumeInput) -> StateUpdate {
    let decision = input.decision();
    log::info!(
        "Decision received for ticket {}: {:?} ({:?})",
        state.ticket_id,
        input.decision_text(),
        decision
    );
    match decision {
        Decision::Approved => StateUpdate::new()
            .requires_approval(false)
            .message(Message::system(APPROVED_MESSAGE)),
        Decision::Denied => StateUpdate::new()
            .intent(Intent::GeneralInquiry)
            .message(Message::system(DENIED_MESSAGE)),
    }
}

/// Acknowledge the refund in the transcript
pub fn process_refund(state: &ConversationState) -> StateUpdate {
    let amount = state.refund_amount.unwrap_or_else(|| {
        log::warn!(
            "Ticket {} reached process_refund without an amount",
            state.ticket_id
        );
        0.0
    });
    let text = format!("Processing refund of {}", format_amount(amount));
    log::info!("Ticket {}: {}", state.ticket_id, text);
    StateUpdate::new().message(Message::system(text))
}

/// Ask the responder for a reply and append it
pub async fn general_response(
    responder: &dyn Responder,
    state: &ConversationState,
) -> Result<StateUpdate, ResponseError> {
    let reply = responder.respond(&state.messages).await?;
    Ok(StateUpdate::new().message(Message::assistant(reply)))
}

/// Render an amount with at least one decimal place (`75.0`, `80.25`)
pub fn format_amount(amount: f64) -> String {
    // Debug formatting keeps the trailing ".0" that Display drops
    format!("{:?}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::ClassificationError;
    use crate::sentinel::ports::{FixedClassifier, FixedResponder};
    use crate::sentinel::state::Role;
    use async_trait::async_trait;
    use serde_json::json;

    /// Classifier that hands back its result without any checks
    struct RawClassifier(TriageData);

    #[async_trait]
    impl Classifier for RawClassifier {
        async fn classify(&self, _messages: &[Message]) -> Result<TriageData, ClassificationError> {
            Ok(self.0.clone())
        }
    }

    fn refund_state(amount: f64, reason: Option<&str>) -> ConversationState {
        ConversationState::new("T-1", "refund please").merge(
            StateUpdate::new()
                .intent(Intent::Refund)
                .refund_amount(amount)
                .refund_reason(reason.map(str::to_string)),
        )
    }

    #[tokio::test]
    async fn test_triage_success() {
        let classifier = FixedClassifier::new(
            TriageData::refund(30.0, Some("late delivery")).with_sentiment(Sentiment::Negative),
        );
        let state = ConversationState::new("T-1", "I want a refund of $30 for a late delivery");

        let update = triage(&classifier, &state).await;
        assert_eq!(update.intent, Some(Intent::Refund));
        assert_eq!(update.sentiment, Some(Sentiment::Negative));
        assert_eq!(update.refund_amount, Some(30.0));
        assert_eq!(update.refund_reason, Some(Some("late delivery".to_string())));
        assert!(update.messages.is_empty());
    }

    #[tokio::test]
    async fn test_triage_defaults_missing_amount() {
        let classifier =
            FixedClassifier::new(TriageData::new(Intent::GeneralInquiry, Sentiment::Positive));
        let update = triage(&classifier, &ConversationState::new("T-1", "thanks!")).await;
        assert_eq!(update.refund_amount, Some(0.0));
        assert_eq!(update.refund_reason, Some(None));
    }

    #[tokio::test]
    async fn test_triage_failure_returns_safe_defaults() {
        let classifier = FixedClassifier::failing();
        let state = refund_state(99.0, Some("stale"));

        let merged = state.clone().merge(triage(&classifier, &state).await);
        assert_eq!(merged.intent, Intent::GeneralInquiry);
        assert_eq!(merged.sentiment, Sentiment::Neutral);
        assert_eq!(merged.refund_amount, Some(0.0));
        assert_eq!(merged.refund_reason, None);
    }

    #[tokio::test]
    async fn test_triage_rejects_unusable_amounts() {
        for amount in [-10.0, f64::NAN, f64::INFINITY] {
            let classifier = RawClassifier(TriageData::refund(amount, Some("broken")));
            let state = ConversationState::new("T-1", "refund please");

            let merged = state.clone().merge(triage(&classifier, &state).await);
            assert_eq!(merged.intent, Intent::GeneralInquiry);
            assert_eq!(merged.sentiment, Sentiment::Neutral);
            assert_eq!(merged.refund_amount, Some(0.0));
            assert_eq!(merged.refund_reason, None);
        }
    }

    #[test]
    fn test_policy_check_boundary() {
        let policy = RefundPolicy::default();
        assert_eq!(
            policy_check(&policy, &refund_state(49.99, None)).requires_approval,
            Some(false)
        );
        assert_eq!(
            policy_check(&policy, &refund_state(50.0, None)).requires_approval,
            Some(true)
        );
    }

    #[test]
    fn test_request_approval_payload() {
        let request = request_approval(&refund_state(80.0, None));
        assert_eq!(request.kind, "approval_required");
        assert_eq!(request.amount, 80.0);
        assert_eq!(request.reason, "High value refund");
    }

    #[test]
    fn test_apply_approval_approved() {
        let state = refund_state(75.0, None).merge(StateUpdate::new().requires_approval(true));
        let update = apply_approval(&state, &ResumeInput::from(json!({ "status": "approved" })));
        assert_eq!(update.requires_approval, Some(false));
        assert_eq!(update.intent, None);
        assert_eq!(update.messages, vec![Message::system(APPROVED_MESSAGE)]);
    }

    #[test]
    fn test_apply_approval_denied() {
        let state = refund_state(75.0, None).merge(StateUpdate::new().requires_approval(true));
        let update = apply_approval(&state, &ResumeInput::from("nope"));
        assert_eq!(update.intent, Some(Intent::GeneralInquiry));
        assert_eq!(update.requires_approval, None);
        assert_eq!(update.messages, vec![Message::system(DENIED_MESSAGE)]);
    }

    #[test]
    fn test_process_refund_message() {
        let update = process_refund(&refund_state(75.0, None));
        assert_eq!(update.messages.len(), 1);
        assert_eq!(update.messages[0].role, Role::System);
        assert_eq!(update.messages[0].content, "Processing refund of 75.0");
    }

    #[test]
    fn test_process_refund_without_amount() {
        let update = process_refund(&ConversationState::new("T-1", "x"));
        assert_eq!(update.messages[0].content, "Processing refund of 0.0");
    }

    #[tokio::test]
    async fn test_general_response_appends_assistant_message() {
        let responder = FixedResponder::new("How can I help?");
        let update = general_response(&responder, &ConversationState::new("T-1", "hi"))
            .await
            .unwrap();
        assert_eq!(update.messages, vec![Message::assistant("How can I help?")]);
    }

    #[tokio::test]
    async fn test_general_response_propagates_failure() {
        let responder = FixedResponder::failing();
        let result = general_response(&responder, &ConversationState::new("T-1", "hi")).await;
        assert!(matches!(result, Err(ResponseError::EmptyReply)));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(75.0), "75.0");
        assert_eq!(format_amount(80.25), "80.25");
        assert_eq!(format_amount(0.0), "0.0");
    }
}
