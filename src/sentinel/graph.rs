// SPDX-License-Identifier: MIT

//! Support workflow engine
//!
//! ```text
//! triage          refund            -> policy_check
//!                 otherwise         -> general_response
//! policy_check    requires approval -> human_approval
//!                 otherwise         -> process_refund
//! human_approval  approved          -> process_refund
//!                 denied            -> general_response
//! process_refund, general_response  -> end
//! ```
//!
//! Runs are driven step by step. A step either returns a state update,
//! after which the router for that step picks the next one, or interrupts.
//! An interrupt checkpoints the run and hands a resume token back to the
//! caller; [`SupportWorkflow::resume`] picks it up again.

use crate::adk::error::WorkflowError;
use crate::adk::model::Model;
use crate::sentinel::approval::{ApprovalRequest, ResumeInput};
use crate::sentinel::checkpoint::{CheckpointStore, MemoryCheckpointStore, ResumeToken, RunSnapshot};
use crate::sentinel::config::SentinelConfig;
use crate::sentinel::policy::RefundPolicy;
use crate::sentinel::ports::{Classifier, LlmClassifier, LlmResponder, Responder};
use crate::sentinel::state::{ConversationState, Intent, StateUpdate};
use crate::sentinel::steps;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_MAX_STEPS: u32 = 16;

/// Named workflow steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Triage,
    PolicyCheck,
    HumanApproval,
    ProcessRefund,
    GeneralResponse,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Triage => "triage",
            Step::PolicyCheck => "policy_check",
            Step::HumanApproval => "human_approval",
            Step::ProcessRefund => "process_refund",
            Step::GeneralResponse => "general_response",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::ProcessRefund | Step::GeneralResponse)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Next(Step),
    End,
}

pub fn route_after_triage(state: &ConversationState) -> Step {
    if state.intent == Intent::Refund {
        Step::PolicyCheck
    } else {
        Step::GeneralResponse
    }
}

pub fn route_after_policy_check(state: &ConversationState) -> Step {
    if state.requires_approval {
        Step::HumanApproval
    } else {
        Step::ProcessRefund
    }
}

pub fn route_after_approval(state: &ConversationState) -> Step {
    if !state.requires_approval {
        Step::ProcessRefund
    } else {
        Step::GeneralResponse
    }
}

/// Where to go once `step` has produced `state`
pub fn next_step(step: Step, state: &ConversationState) -> Transition {
    match step {
        Step::Triage => Transition::Next(route_after_triage(state)),
        Step::PolicyCheck => Transition::Next(route_after_policy_check(state)),
        Step::HumanApproval => Transition::Next(route_after_approval(state)),
        Step::ProcessRefund | Step::GeneralResponse => Transition::End,
    }
}

enum StepOutcome {
    Update(StateUpdate),
    Interrupt(ApprovalRequest),
}

/// A run that reached a terminal step
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRun {
    pub state: ConversationState,
    pub terminal: Step,
    pub path: Vec<Step>,
}

/// A run waiting for human input
#[derive(Debug, Clone, PartialEq)]
pub struct SuspendedRun {
    pub token: ResumeToken,
    pub request: ApprovalRequest,
    pub step: Step,
    pub path: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(CompletedRun),
    Suspended(SuspendedRun),
}

impl RunOutcome {
    pub fn is_suspended(&self) -> bool {
        matches!(self, RunOutcome::Suspended(_))
    }

    pub fn completed(&self) -> Option<&CompletedRun> {
        match self {
            RunOutcome::Completed(run) => Some(run),
            RunOutcome::Suspended(_) => None,
        }
    }

    pub fn suspended(&self) -> Option<&SuspendedRun> {
        match self {
            RunOutcome::Suspended(run) => Some(run),
            RunOutcome::Completed(_) => None,
        }
    }

    pub fn path(&self) -> &[Step] {
        match self {
            RunOutcome::Completed(run) => &run.path,
            RunOutcome::Suspended(run) => &run.path,
        }
    }
}

/// The refund triage workflow
pub struct SupportWorkflow {
    classifier: Arc<dyn Classifier>,
    responder: Arc<dyn Responder>,
    policy: RefundPolicy,
    store: Arc<dyn CheckpointStore>,
    max_steps: u32,
}

impl SupportWorkflow {
    pub fn new(classifier: Arc<dyn Classifier>, responder: Arc<dyn Responder>) -> Self {
        Self {
            classifier,
            responder,
            policy: RefundPolicy::default(),
            store: Arc::new(MemoryCheckpointStore::new()),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Wire both ports onto `model` with the configured policy and limits
    pub fn from_config(config: &SentinelConfig, model: Arc<dyn Model>) -> Self {
        let timeout = config.model.timeout();
        let classifier = LlmClassifier::new(model.clone())
            .with_temperature(config.model.temperature)
            .with_timeout(timeout);
        let responder = LlmResponder::new(model)
            .with_temperature(config.model.temperature)
            .with_timeout(timeout);

        Self::new(Arc::new(classifier), Arc::new(responder))
            .with_policy(config.refund_policy())
            .with_max_steps(config.workflow.max_steps)
    }

    pub fn with_policy(mut self, policy: RefundPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn policy(&self) -> &RefundPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// Start a run for a new ticket seeded with the customer's message
    pub async fn start(
        &self,
        ticket_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<RunOutcome, WorkflowError> {
        self.run(ConversationState::new(ticket_id, message)).await
    }

    /// Run from `triage` until a terminal step or a suspension
    pub async fn run(&self, state: ConversationState) -> Result<RunOutcome, WorkflowError> {
        log::info!("Starting run for ticket {}", state.ticket_id);
        self.drive(state, Step::Triage, Vec::new()).await
    }

    /// Continue a suspended run with the host's input
    ///
    /// The snapshot is claimed for the duration of the resume. A resume that
    /// ends in a completed run or a new suspension consumes the token; one
    /// that fails puts the snapshot back so the same token can be retried.
    pub async fn resume(
        &self,
        token: &ResumeToken,
        input: impl Into<ResumeInput>,
    ) -> Result<RunOutcome, WorkflowError> {
        let pending = self
            .store
            .get(token)
            .await
            .ok_or_else(|| WorkflowError::UnknownResumeToken(token.to_string()))?;
        let input = input.into();
        let update = resume_update(pending.pending_step, &pending.state, &input)?;

        let snapshot = self
            .store
            .take(token)
            .await
            .ok_or_else(|| WorkflowError::UnknownResumeToken(token.to_string()))?;

        log::info!(
            "Resuming ticket {} at {} (suspended since {})",
            snapshot.ticket_id,
            snapshot.pending_step,
            snapshot.suspended_at
        );

        let step = snapshot.pending_step;
        let state = snapshot.state.clone().merge(update);
        match self.advance(state, step, snapshot.path.clone()).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                // the token stays valid until a resume completes
                log::warn!(
                    "Resume of ticket {} failed ({}), restoring token {}",
                    snapshot.ticket_id,
                    e,
                    token
                );
                if let Err(restore) = self.store.save(snapshot).await {
                    log::error!("Could not restore token {}: {}", token, restore);
                }
                Err(e)
            }
        }
    }

    /// The approval request behind a token, if the run is still waiting
    pub async fn pending_approval(&self, token: &ResumeToken) -> Option<ApprovalRequest> {
        self.store.get(token).await.map(|s| s.request)
    }

    async fn drive(
        &self,
        mut state: ConversationState,
        mut step: Step,
        mut path: Vec<Step>,
    ) -> Result<RunOutcome, WorkflowError> {
        loop {
            if path.len() >= self.max_steps as usize {
                log::error!(
                    "Ticket {} exceeded {} steps",
                    state.ticket_id,
                    self.max_steps
                );
                return Err(WorkflowError::StepLimitExceeded {
                    limit: self.max_steps,
                });
            }
            path.push(step);
            log::info!("Ticket {} executing step {}", state.ticket_id, step);

            match self.execute(step, &state).await? {
                StepOutcome::Interrupt(request) => {
                    let snapshot = RunSnapshot::new(state, step, request.clone(), path.clone());
                    let token = snapshot.token.clone();
                    self.store.save(snapshot).await?;
                    log::info!("Suspended at {} awaiting approval, token {}", step, token);
                    return Ok(RunOutcome::Suspended(SuspendedRun {
                        token,
                        request,
                        step,
                        path,
                    }));
                }
                StepOutcome::Update(update) => {
                    state = state.merge(update);
                }
            }

            match next_step(step, &state) {
                Transition::Next(next) => {
                    log::info!("Ticket {} routed {} -> {}", state.ticket_id, step, next);
                    step = next;
                }
                Transition::End => {
                    log::info!("Ticket {} finished at {}", state.ticket_id, step);
                    return Ok(RunOutcome::Completed(CompletedRun {
                        state,
                        terminal: step,
                        path,
                    }));
                }
            }
        }
    }

    /// Route out of a step that already ran, then keep driving
    async fn advance(
        &self,
        state: ConversationState,
        step: Step,
        path: Vec<Step>,
    ) -> Result<RunOutcome, WorkflowError> {
        match next_step(step, &state) {
            Transition::Next(next) => {
                log::info!("Ticket {} routed {} -> {}", state.ticket_id, step, next);
                self.drive(state, next, path).await
            }
            Transition::End => Ok(RunOutcome::Completed(CompletedRun {
                state,
                terminal: step,
                path,
            })),
        }
    }

    async fn execute(
        &self,
        step: Step,
        state: &ConversationState,
    ) -> Result<StepOutcome, WorkflowError> {
        let outcome = match step {
            Step::Triage => {
                StepOutcome::Update(steps::triage(self.classifier.as_ref(), state).await)
            }
            Step::PolicyCheck => StepOutcome::Update(steps::policy_check(&self.policy, state)),
            Step::HumanApproval => StepOutcome::Interrupt(steps::request_approval(state)),
            Step::ProcessRefund => StepOutcome::Update(steps::process_refund(state)),
            Step::GeneralResponse => StepOutcome::Update(
                steps::general_response(self.responder.as_ref(), state).await?,
            ),
        };
        Ok(outcome)
    }
}

/// Output of an interrupted step once its resume input arrives
fn resume_update(
    step: Step,
    state: &ConversationState,
    input: &ResumeInput,
) -> Result<StateUpdate, WorkflowError> {
    match step {
        Step::HumanApproval => Ok(steps::apply_approval(state, input)),
        other => Err(WorkflowError::NotResumable {
            step: other.to_string(),
        }),
    }
}
