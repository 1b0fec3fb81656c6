//! Activation workflow.
//!
//! This module coordinates the activation state machine and its side effects.
//!
//! ```text
//! submit_code / remote responses
//!   ↓
//! ActivationWorkflow (resolves linked account, derives prefix)
//!   ↓
//! ActivationStateMachine (pure transitions)
//!   ↓
//! ActivationActions (remote calls spawned, sink requests delivered)
//! ```

use std::sync::Arc;
use std::time::Duration;

use aa_core::ports::{AccountCreatorPort, LinkedAccountStorePort, OutcomeSinkPort, PhoneNumberPort};
use aa_core::{
    AccountActivationResponse, ActivationAction, ActivationConfig, ActivationError,
    ActivationEvent, ActivationMode, ActivationRequest, ActivationState, ActivationStateMachine,
    ActivationStatus, ActivationSubmission, LinkedAccount, Outcome,
};
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::usecases::activation::context::ActivationContext;

/// Errors returned synchronously by the activation workflow.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Activation(#[from] ActivationError),
    #[error("linked account lookup failed: {0}")]
    LinkedAccountStore(#[source] anyhow::Error),
}

/// Collaborators the workflow talks to.
#[derive(Clone)]
pub struct ActivationPorts {
    pub account_creator: Arc<dyn AccountCreatorPort>,
    pub outcome_sink: Arc<dyn OutcomeSinkPort>,
    pub linked_accounts: Arc<dyn LinkedAccountStorePort>,
    pub phone_numbers: Arc<dyn PhoneNumberPort>,
}

/// Drives one activation attempt from code entry to a terminal outcome.
///
/// Cheap to clone; clones share state, which is how spawned remote calls
/// deliver their responses back.
#[derive(Clone)]
pub struct ActivationWorkflow {
    machine: Arc<ActivationStateMachine>,
    context: ActivationContext,
    response_timeout: Duration,
    ports: ActivationPorts,
}

impl ActivationWorkflow {
    pub fn new(request: ActivationRequest, config: &ActivationConfig, ports: ActivationPorts) -> Self {
        let policy = config.policy();
        let context = ActivationContext::new(ActivationState::Idle, policy.required_code_length);
        Self {
            machine: Arc::new(ActivationStateMachine::new(policy, request)),
            context,
            response_timeout: config.response_timeout(),
            ports,
        }
    }

    pub fn request(&self) -> &ActivationRequest {
        self.machine.request()
    }

    pub async fn state(&self) -> ActivationState {
        self.context.get_state().await
    }

    /// Code entry changed; returns whether submit should be enabled.
    ///
    /// The enable signal goes through the dispatch lock like every other
    /// sink delivery.
    pub async fn code_changed(&self, raw: &str) -> bool {
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;
        let enabled = self.context.update_code(raw).await;
        self.ports.outcome_sink.submit_enabled_changed(enabled).await;
        enabled
    }

    /// Waits until no submit or response is being dispatched.
    ///
    /// An outcome reaches the sink before the actions that follow it, so
    /// callers tearing down their sink on an outcome call this first.
    pub async fn settled(&self) {
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;
    }

    /// Submits an activation code.
    ///
    /// Returns once the remote call is dispatched. Remote failures are
    /// reported later through the outcome sink, never from here.
    pub async fn submit_code(&self, code: impl Into<String>) -> Result<(), WorkflowError> {
        let code = code.into();
        let span = info_span!(
            "usecase.activation.submit_code",
            mode = ?self.machine.request().mode()
        );
        async {
            let _dispatch_guard = self.context.acquire_dispatch_lock().await;
            let current = self.context.get_state().await;
            self.machine.check_submit(&current, &code)?;

            let linked_account = self.resolve_linked_account().await?;
            let attempt = self.context.next_attempt();
            let event = ActivationEvent::SubmitCode {
                attempt,
                code,
                linked_account,
            };
            self.apply(current, event).await?;
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Delivers an account activation response for the call in flight.
    ///
    /// Returns the outcome handed to the sink, or `None` when no account
    /// activation was waiting for an answer.
    pub async fn on_activate_account_response(
        &self,
        status: ActivationStatus,
        identity: Option<String>,
    ) -> Option<Outcome> {
        let event = ActivationEvent::AccountActivationResponded {
            response: AccountActivationResponse::new(status, identity),
        };
        self.deliver(None, event).await
    }

    /// Delivers an alias activation response for the call in flight.
    pub async fn on_activate_alias_response(&self, status: ActivationStatus) -> Option<Outcome> {
        let event = self.alias_event(status);
        self.deliver(None, event).await
    }

    async fn resolve_linked_account(&self) -> Result<Option<LinkedAccount>, WorkflowError> {
        let ActivationMode::Link { account_index } = self.machine.request().mode() else {
            return Ok(None);
        };
        self.ports
            .linked_accounts
            .load_account(account_index)
            .await
            .map_err(|err| {
                error!(error = %err, account_index, "failed to load linked account");
                WorkflowError::LinkedAccountStore(err)
            })
    }

    fn alias_event(&self, status: ActivationStatus) -> ActivationEvent {
        let derived_prefix = status.is_activated().then(|| {
            let e164 = self.machine.request().canonical_phone();
            self.ports
                .phone_numbers
                .prefix_from_e164(&e164)
                .unwrap_or_else(|| {
                    warn!(phone = %e164, "no dial prefix matches linked phone");
                    String::new()
                })
        });
        ActivationEvent::AliasActivationResponded {
            status,
            derived_prefix,
        }
    }

    /// Runs a response through the state machine.
    ///
    /// `attempt` pins the delivery to one remote call; responses for a call
    /// that is no longer in flight are dropped.
    async fn deliver(&self, attempt: Option<u64>, event: ActivationEvent) -> Option<Outcome> {
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;
        let current = self.context.get_state().await;
        if let Some(attempt) = attempt {
            if current.in_flight_attempt() != Some(attempt) {
                debug!(attempt, state = ?current, "dropping response for stale attempt");
                return None;
            }
        }
        match self.apply(current, event).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "activation response ignored");
                None
            }
        }
    }

    /// Transition + state update + action execution. Callers hold the dispatch lock.
    async fn apply(
        &self,
        current: ActivationState,
        event: ActivationEvent,
    ) -> Result<Option<Outcome>, ActivationError> {
        let from = current.clone();
        let (next, actions) = self.machine.transition(current, event)?;
        info!(from = ?from, to = ?next, "activation state transition");
        self.context.set_state(next).await;
        Ok(self.execute_actions(actions).await)
    }

    async fn execute_actions(&self, actions: Vec<ActivationAction>) -> Option<Outcome> {
        let sink = &self.ports.outcome_sink;
        let mut delivered = None;
        for action in actions {
            debug!(?action, "activation executing action");
            match action {
                ActivationAction::SetSubmitEnabled { enabled } => {
                    sink.submit_enabled_changed(enabled).await;
                }
                ActivationAction::ActivateAccount {
                    attempt,
                    submission,
                } => self.spawn_account_activation(attempt, submission),
                ActivationAction::ActivateAlias {
                    attempt,
                    submission,
                } => self.spawn_alias_activation(attempt, submission),
                ActivationAction::RequestLogin { account } => {
                    sink.request_login(account).await;
                }
                ActivationAction::Notify { outcome } => {
                    delivered = Some(outcome.clone());
                    sink.notify(outcome).await;
                }
                ActivationAction::RequestVerificationFlow { identity } => {
                    sink.request_verification_flow(identity).await;
                }
                ActivationAction::RequestFallbackLoginFlow { phone, dial_code } => {
                    sink.request_fallback_login_flow(phone, dial_code).await;
                }
                ActivationAction::PersistDerivedPrefix {
                    account_index,
                    prefix,
                } => {
                    sink.persist_derived_prefix(account_index, prefix).await;
                }
                ActivationAction::ClearLinkReminderTimer => {
                    sink.clear_link_reminder_timer().await;
                }
            }
        }
        delivered
    }

    fn spawn_account_activation(&self, attempt: u64, submission: ActivationSubmission) {
        let workflow = self.clone();
        let span = info_span!("usecase.activation.activate_account", attempt);
        tokio::spawn(
            async move {
                let call = workflow.ports.account_creator.activate_account(&submission);
                let response = match timeout(workflow.response_timeout, call).await {
                    Ok(Ok(response)) => response,
                    Ok(Err(err)) => {
                        warn!(error = %err, "account activation call failed");
                        AccountActivationResponse::request_failed()
                    }
                    Err(_) => {
                        warn!(
                            timeout_secs = workflow.response_timeout.as_secs(),
                            "account activation timed out"
                        );
                        AccountActivationResponse::request_failed()
                    }
                };
                let event = ActivationEvent::AccountActivationResponded { response };
                workflow.deliver(Some(attempt), event).await;
            }
            .instrument(span),
        );
    }

    fn spawn_alias_activation(&self, attempt: u64, submission: ActivationSubmission) {
        let workflow = self.clone();
        let span = info_span!("usecase.activation.activate_alias", attempt);
        tokio::spawn(
            async move {
                let call = workflow.ports.account_creator.activate_alias(&submission);
                let status = match timeout(workflow.response_timeout, call).await {
                    Ok(Ok(status)) => status,
                    Ok(Err(err)) => {
                        warn!(error = %err, "alias activation call failed");
                        ActivationStatus::RequestFailed
                    }
                    Err(_) => {
                        warn!(
                            timeout_secs = workflow.response_timeout.as_secs(),
                            "alias activation timed out"
                        );
                        ActivationStatus::RequestFailed
                    }
                };
                let event = workflow.alias_event(status);
                workflow.deliver(Some(attempt), event).await;
            }
            .instrument(span),
        );
    }
}
